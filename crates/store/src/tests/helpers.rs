use crate::Store;
use std::fs;
use tempfile::TempDir;

pub fn temp_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::create(dir.path().join("data.ebb")).unwrap();
    (dir, store)
}

pub fn file_len(store: &Store) -> u64 {
    fs::metadata(store.location()).unwrap().len()
}
