//! Consolidation: rewrites the log to contain only live records.
//!
//! Updates and deletes never mutate existing bytes, so the log
//! accumulates superseded values and tombstones until this pass discards
//! them. The rewrite streams every live entry through the memory map into
//! a fresh temp file, then atomically renames it over the data file.
//!
//! The handle is mutated only after every fallible step has succeeded:
//! a failure anywhere leaves the store exactly as it was (the temp file
//! is removed when it drops), so the index and the file can never
//! disagree.

use crate::{map, open_append, Store};
use anyhow::{Context, Result};
use keydir::KeyDir;
use record::ValuePointer;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;

impl Store {
    /// Rewrites the data file to exactly one record per live key.
    ///
    /// Runs synchronously under the exclusive lock; readers and writers
    /// block until it finishes. Afterwards the file length equals the sum
    /// over live keys of `12 + key_len + val_len` (no tombstones, no
    /// superseded values) and the observable mapping is unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure while writing the temp file,
    /// renaming it over the location, or re-establishing the file handle
    /// and map. In every case the handle keeps serving its pre-call state.
    pub fn consolidate(&self) -> Result<()> {
        let mut inner = self.inner.write();
        let inner = &mut *inner;

        let mut tmp = NamedTempFile::new().context("failed to create consolidation file")?;
        let mut fresh = KeyDir::new();
        let mut pos = 0u64;
        let mut frame = Vec::with_capacity(256);

        for (key, ptr) in inner.keydir.iter() {
            let value = inner.value_at(*ptr);
            record::encode_into(&mut frame, key, value);
            tmp.write_all(&frame)
                .context("failed to write consolidated record")?;
            fresh.insert(
                key.clone(),
                ValuePointer::for_frame(pos, key.len(), value.len()),
            );
            pos += frame.len() as u64;
        }

        tmp.as_file().sync_all()?;

        // Everything after this point replaces the handle's state; the
        // old file handle and map stay alive (and consistent with the
        // index) until the swap below.
        tmp.persist(&self.location)
            .map_err(|e| e.error)
            .context("failed to replace data file")?;

        let file = open_append(&self.location)?;
        let new_map = map::establish(&file, map::initial_len(pos))?;

        debug!(
            location = %self.location.display(),
            live = fresh.len(),
            bytes = pos,
            "consolidated log"
        );

        inner.file = file;
        inner.map = new_map;
        inner.keydir = fresh;
        inner.write_pos = pos;
        Ok(())
    }
}
