use super::helpers::{file_len, temp_store};
use crate::Store;
use anyhow::Result;
use record::frame_len;
use tempfile::tempdir;

// --------------------- Equivalence ---------------------

#[test]
fn mapping_is_unchanged() -> Result<()> {
    let (_dir, store) = temp_store();

    store.put(b"Tom", b"Washington")?;
    store.put(b"Dick", b"Oregon")?;
    store.put(b"Tom", b"New York")?;
    store.remove(b"Dick")?;
    store.put(b"Harry", b"Wisconsin")?;

    let before = store.to_map();
    store.consolidate()?;

    assert_eq!(store.to_map(), before);
    assert_eq!(store.get(b"Tom"), Some(b"New York".to_vec()));
    assert_eq!(store.get(b"Dick"), None);
    Ok(())
}

// --------------------- Compaction ---------------------

#[test]
fn file_shrinks_to_exactly_the_live_records() -> Result<()> {
    let (_dir, store) = temp_store();

    store.put(b"Tom", b"Washington")?;
    store.put(b"Dick", b"Oregon")?;
    store.put(b"Harry", b"Wisconsin")?;
    store.put(b"Tom", b"New York")?;
    store.put(b"Dick", b"Florida")?;
    store.remove(b"Harry")?;

    store.consolidate()?;

    // one record per live key: 12+3+8 for Tom, 12+4+7 for Dick
    assert_eq!(file_len(&store), 46);
    assert_eq!(
        file_len(&store),
        frame_len(b"Tom", b"New York") + frame_len(b"Dick", b"Florida")
    );
    Ok(())
}

#[test]
fn consolidation_is_idempotent() -> Result<()> {
    let (_dir, store) = temp_store();

    for i in 0..50u32 {
        store.put(b"churn", format!("v{}", i).as_bytes())?;
    }
    store.put(b"other", b"value")?;

    store.consolidate()?;
    let compacted = file_len(&store);
    store.consolidate()?;

    assert_eq!(file_len(&store), compacted);
    assert_eq!(
        compacted,
        frame_len(b"churn", b"v49") + frame_len(b"other", b"value")
    );
    Ok(())
}

#[test]
fn empty_store_consolidates_to_empty_file() -> Result<()> {
    let (_dir, store) = temp_store();

    store.put(b"k", b"v")?;
    store.remove(b"k")?;
    store.consolidate()?;

    assert_eq!(file_len(&store), 0);
    assert!(store.is_empty());
    Ok(())
}

// --------------------- Life after consolidation ---------------------

#[test]
fn appends_continue_after_consolidation() -> Result<()> {
    let (_dir, store) = temp_store();

    store.put(b"a", b"1")?;
    store.put(b"b", b"2")?;
    store.remove(b"a")?;
    store.consolidate()?;

    store.put(b"c", b"3")?;
    store.put(b"a", b"returned")?;

    assert_eq!(store.get(b"a"), Some(b"returned".to_vec()));
    assert_eq!(store.get(b"b"), Some(b"2".to_vec()));
    assert_eq!(store.get(b"c"), Some(b"3".to_vec()));
    Ok(())
}

#[test]
fn consolidated_log_survives_verified_reopen() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("data.ebb");

    {
        let store = Store::create(&path)?;
        store.put(b"Tom", b"Washington")?;
        store.put(b"Tom", b"New York")?;
        store.remove(b"Tom")?;
        store.put(b"Dick", b"Florida")?;
        store.consolidate()?;
        store.put(b"Tom", b"Oregon")?;
        // dropped without close
    }

    let (store, corruption) = Store::open_verified(&path)?;
    assert!(corruption.is_none());
    assert_eq!(store.get(b"Tom"), Some(b"Oregon".to_vec()));
    assert_eq!(store.get(b"Dick"), Some(b"Florida".to_vec()));
    Ok(())
}

#[test]
fn consolidated_log_survives_fast_reopen() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("data.ebb");

    {
        let store = Store::create(&path)?;
        for i in 0..100u32 {
            store.put(format!("k{}", i).as_bytes(), b"old")?;
        }
        for i in 0..100u32 {
            store.put(format!("k{}", i).as_bytes(), b"new")?;
        }
        store.consolidate()?;
        store.close()?;
    }

    let store = Store::open(&path)?;
    assert_eq!(store.len(), 100);
    for i in 0..100u32 {
        assert_eq!(store.get(format!("k{}", i).as_bytes()), Some(b"new".to_vec()));
    }
    Ok(())
}

#[test]
fn heavy_churn_compacts_to_one_frame() -> Result<()> {
    let (_dir, store) = temp_store();

    for i in 0..1_000u32 {
        store.put(b"only", format!("value-{}", i).as_bytes())?;
    }
    let before = file_len(&store);
    store.consolidate()?;

    assert!(file_len(&store) < before);
    assert_eq!(file_len(&store), frame_len(b"only", b"value-999"));
    assert_eq!(store.get(b"only"), Some(b"value-999".to_vec()));
    Ok(())
}
