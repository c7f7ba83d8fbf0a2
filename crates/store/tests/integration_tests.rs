/// End-to-end walkthrough of a store's life: fill, update, delete,
/// consolidate, close/reopen both ways, and finally survive a damaged
/// tail. Each stage continues from the previous one, the way a real
/// embedded deployment would.
use anyhow::Result;
use std::fs::OpenOptions;
use store::Store;
use tempfile::tempdir;

#[test]
fn full_lifecycle() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("data.ebb");

    // -------- stage 1: fresh store --------
    let store = Store::create(&path)?;
    store.put(b"Tom", b"Washington")?;
    store.put(b"Dick", b"Oregon")?;
    store.put(b"Harry", b"Wisconsin")?;
    store.sync()?;

    assert_eq!(store.get(b"Tom"), Some(b"Washington".to_vec()));
    assert_eq!(store.get(b"Dick"), Some(b"Oregon".to_vec()));
    assert_eq!(store.get(b"Harry"), Some(b"Wisconsin".to_vec()));
    assert_eq!(store.len(), 3);

    // -------- stage 2: updates and a delete --------
    store.put(b"Tom", b"New York")?;
    store.put(b"Dick", b"Florida")?;
    store.remove(b"Harry")?;

    assert_eq!(store.get(b"Tom"), Some(b"New York".to_vec()));
    assert_eq!(store.get(b"Dick"), Some(b"Florida".to_vec()));
    assert_eq!(store.get(b"Harry"), None);
    assert_eq!(store.len(), 2);

    // -------- stage 3: consolidation --------
    store.consolidate()?;

    assert_eq!(store.get(b"Tom"), Some(b"New York".to_vec()));
    assert_eq!(store.get(b"Dick"), Some(b"Florida".to_vec()));
    assert_eq!(store.get(b"Harry"), None);
    // exactly one record per live key: (12+3+8) + (12+4+7)
    assert_eq!(std::fs::metadata(&path)?.len(), 46);

    // -------- stage 4: clean close, fast reopen --------
    store.put(b"Tom", b"Washington")?;
    assert_eq!(store.get(b"Tom"), Some(b"Washington".to_vec()));
    store.close()?;

    let store = Store::open(&path)?;
    assert_eq!(store.get(b"Tom"), Some(b"Washington".to_vec()));
    assert_eq!(store.get(b"Dick"), Some(b"Florida".to_vec()));

    // -------- stage 5: clean close, verified reopen --------
    store.put(b"Tom", b"Oregon")?;
    assert_eq!(store.get(b"Tom"), Some(b"Oregon".to_vec()));
    store.close()?;

    let (store, corruption) = Store::open_verified(&path)?;
    assert!(corruption.is_none());
    assert_eq!(store.get(b"Tom"), Some(b"Oregon".to_vec()));
    assert_eq!(store.get(b"Dick"), Some(b"Florida".to_vec()));

    // -------- stage 6: damaged tail --------
    let pre_damage = store.to_map();
    let last_frame_len = 12 + 3 + 6; // the "Tom" -> "Oregon" append
    let file_len = std::fs::metadata(&path)?.len();
    store.close()?;

    let file = OpenOptions::new().write(true).open(&path)?;
    file.set_len(file_len - 1)?;
    drop(file);

    let (store, corruption) = Store::open_verified(&path)?;
    let report = corruption.expect("truncated tail must be reported");
    assert_eq!(report.offset, file_len - last_frame_len);

    // everything before the damaged record is intact
    let mut expected = pre_damage;
    expected.insert(b"Tom".to_vec(), b"Washington".to_vec()); // pre-damage value
    assert_eq!(store.to_map(), expected);
    Ok(())
}

#[test]
fn location_reports_the_backing_file() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("data.ebb");

    let store = Store::create(&path)?;
    assert_eq!(store.location(), path.as_path());
    Ok(())
}
