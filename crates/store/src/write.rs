//! Write path: `put()`, `remove()`, and `sync()`.
//!
//! Every mutation appends one fully-formed, checksummed frame in a single
//! write under the exclusive lock. The index and write position advance
//! only after the append succeeded, so a failed write never leaves the
//! index pointing at bytes that were not accounted for. Durability is the
//! caller's call: nothing here forces data to media, that is `sync()`.

use crate::{map, Store};
use anyhow::{ensure, Context, Result};
use record::ValuePointer;
use std::io::Write;

impl Store {
    /// Inserts or updates `key` with `value`.
    ///
    /// Appends a frame encoding the pair and points the index at the new
    /// value, replacing any previous mapping.
    ///
    /// An empty `value` is indistinguishable from a tombstone on disk, so
    /// `put(key, b"")` behaves exactly like [`Store::remove`]; the index
    /// never holds a zero-length pointer.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or value exceeds a u32 length, if the
    /// append fails, or if the map had to grow and could not be
    /// re-established. On an append failure the index is untouched.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        ensure!(
            key.len() <= u32::MAX as usize,
            "key too large: {} bytes",
            key.len()
        );
        ensure!(
            value.len() <= u32::MAX as usize,
            "value too large: {} bytes",
            value.len()
        );
        if value.is_empty() {
            return self.remove(key);
        }

        let mut inner = self.inner.write();
        let inner = &mut *inner;

        record::encode_into(&mut inner.scratch, key, value);
        inner
            .file
            .write_all(&inner.scratch)
            .context("record append failed")?;

        let pointer = ValuePointer::for_frame(inner.write_pos, key.len(), value.len());
        inner.write_pos += inner.scratch.len() as u64;
        inner.keydir.insert(key.to_vec(), pointer);

        if inner.write_pos > inner.map.len() as u64 {
            let grown = map::grown_len(inner.map.len() as u64, inner.write_pos);
            inner.map = map::establish(&inner.file, grown)?;
        }
        Ok(())
    }

    /// Removes `key`, recording the deletion in the log.
    ///
    /// The tombstone frame is appended even when the key is absent from
    /// the index, so that a later full-log recovery still sees the
    /// deletion. The log grows by each tombstone until a
    /// [`Store::consolidate`] discards them.
    pub fn remove(&self, key: &[u8]) -> Result<()> {
        ensure!(
            key.len() <= u32::MAX as usize,
            "key too large: {} bytes",
            key.len()
        );

        let mut inner = self.inner.write();
        let inner = &mut *inner;

        record::encode_into(&mut inner.scratch, key, b"");
        inner
            .file
            .write_all(&inner.scratch)
            .context("tombstone append failed")?;

        inner.write_pos += inner.scratch.len() as u64;
        inner.keydir.remove(key);

        if inner.write_pos > inner.map.len() as u64 {
            let grown = map::grown_len(inner.map.len() as u64, inner.write_pos);
            inner.map = map::establish(&inner.file, grown)?;
        }
        Ok(())
    }

    /// Flushes all appended records to durable media (`fsync`).
    pub fn sync(&self) -> Result<()> {
        let inner = self.inner.write();
        inner.file.sync_all().context("fsync of data file failed")?;
        Ok(())
    }
}
