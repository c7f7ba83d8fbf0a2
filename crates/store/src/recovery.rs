//! Verified log scan: the cold-start path after an unclean shutdown.
//!
//! Rebuilds the key dir by replaying the data file frame by frame with
//! checksum verification, applying upserts and tombstones in append order
//! so that the latest surviving frame for each key wins.

use keydir::KeyDir;
use record::Scan;
use thiserror::Error;

/// Diagnostic returned by [`Store::open_verified`](crate::Store::open_verified)
/// when the scan hit a frame that failed verification.
///
/// `offset` is the start of the first bad frame; every frame before it
/// verified and is reflected in the returned handle's index. Whether to
/// proceed (accepting truncation of the tail) or abort is the caller's
/// choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("corruption detected starting at offset {offset}")]
pub struct Corruption {
    pub offset: u64,
}

/// Replays `log` into a fresh key dir.
///
/// Later frames supersede earlier ones, a tombstone erases its key, and a
/// reappearance after a tombstone reinstates it. Returns the rebuilt
/// index together with the scan outcome (clean tail position, corruption
/// flag).
pub(crate) fn rebuild(log: &[u8]) -> (KeyDir, Scan) {
    let mut keydir = KeyDir::new();
    let scan = record::replay(log, |key, pointer| match pointer {
        Some(ptr) => keydir.insert(key.to_vec(), ptr),
        None => {
            keydir.remove(key);
        }
    });
    (keydir, scan)
}
