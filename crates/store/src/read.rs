//! Read path: point lookups, enumeration, and streaming enumeration.
//!
//! Reads never touch the file handle. Every lookup resolves through the
//! key dir to a `(offset, len)` pointer and slices the memory map: zero
//! copies until the value is handed to the caller, and zero read
//! syscalls ever. All operations here take the shared lock; the streaming variants
//! hold it until the sink is exhausted or disconnected.

use crate::Store;
use crossbeam_channel::Sender;
use std::collections::HashMap;

impl Store {
    /// Returns the value associated with `key`, or `None` when the key is
    /// absent or deleted.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let inner = self.inner.read();
        let ptr = inner.keydir.get(key)?;
        Some(inner.value_at(ptr).to_vec())
    }

    /// Whether `key` currently has a live value. A pure index lookup;
    /// never touches the data file or the map.
    #[must_use]
    pub fn contains(&self, key: &[u8]) -> bool {
        self.inner.read().keydir.contains(key)
    }

    /// Number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().keydir.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().keydir.is_empty()
    }

    /// All current keys, in unspecified order.
    #[must_use]
    pub fn keys(&self) -> Vec<Vec<u8>> {
        let inner = self.inner.read();
        inner.keydir.iter().map(|(k, _)| k.clone()).collect()
    }

    /// All current values, in unspecified order.
    #[must_use]
    pub fn values(&self) -> Vec<Vec<u8>> {
        let inner = self.inner.read();
        inner
            .keydir
            .iter()
            .map(|(_, ptr)| inner.value_at(*ptr).to_vec())
            .collect()
    }

    /// All current key/value pairs, in unspecified order.
    #[must_use]
    pub fn pairs(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let inner = self.inner.read();
        inner
            .keydir
            .iter()
            .map(|(k, ptr)| (k.clone(), inner.value_at(*ptr).to_vec()))
            .collect()
    }

    /// The store's current contents as an owned map.
    #[must_use]
    pub fn to_map(&self) -> HashMap<Vec<u8>, Vec<u8>> {
        let inner = self.inner.read();
        inner
            .keydir
            .iter()
            .map(|(k, ptr)| (k.clone(), inner.value_at(*ptr).to_vec()))
            .collect()
    }

    /// Streams every current key into `tx` until exhausted or the
    /// receiving side disconnects.
    ///
    /// The shared lock is held for the full duration of the stream, so a
    /// slow consumer starves writers. Bound the channel accordingly.
    pub fn send_keys(&self, tx: &Sender<Vec<u8>>) {
        let inner = self.inner.read();
        for (key, _) in inner.keydir.iter() {
            if tx.send(key.clone()).is_err() {
                break;
            }
        }
    }

    /// Streams every current value into `tx` until exhausted or the
    /// receiving side disconnects. Holds the shared lock throughout.
    pub fn send_values(&self, tx: &Sender<Vec<u8>>) {
        let inner = self.inner.read();
        for (_, ptr) in inner.keydir.iter() {
            if tx.send(inner.value_at(*ptr).to_vec()).is_err() {
                break;
            }
        }
    }

    /// Streams every current key/value pair into `tx` until exhausted or
    /// the receiving side disconnects. Holds the shared lock throughout.
    pub fn send_pairs(&self, tx: &Sender<(Vec<u8>, Vec<u8>)>) {
        let inner = self.inner.read();
        for (key, ptr) in inner.keydir.iter() {
            if tx.send((key.clone(), inner.value_at(*ptr).to_vec())).is_err() {
                break;
            }
        }
    }
}
