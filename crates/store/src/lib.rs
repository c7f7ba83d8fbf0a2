//! # Store - EbbtideKV Database Handle
//!
//! The central orchestrator tying the [`record`] and [`keydir`] crates into
//! a complete embedded key-value store: one append-only data file, one
//! in-memory index, and a read-only memory map serving every lookup.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌──────────────────────────────────────────────────┐
//! │                    STORE                         │
//! │           (RwLock over all mutable state)        │
//! │                                                  │
//! │ write.rs → encode frame → single append          │
//! │              |                                   │
//! │              v                                   │
//! │           key dir update → remap if outgrown     │
//! │                                                  │
//! │ read.rs  → key dir → mmap slice (zero syscalls)  │
//! │                                                  │
//! │ consolidate.rs → rewrite live records → rename   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module           | Purpose                                            |
//! |------------------|----------------------------------------------------|
//! | [`lib.rs`]       | `Store` struct, open modes, `close()`, `Debug`     |
//! | [`map`]          | Memory-map establishment and growth arithmetic      |
//! | [`write`]        | `put()`, `remove()`, `sync()`                      |
//! | [`read`]         | `get()`, `contains()`, enumeration, streaming      |
//! | [`recovery`]     | Verified log scan, `Corruption` report             |
//! | [`consolidate`]  | Live-record rewrite with atomic file replacement   |
//! | [`snapshot`]     | `<data-file>.keys` accelerator (atomic rewrite)    |
//!
//! ## Crash Safety
//!
//! Every mutation is one fully-formed, checksummed frame appended in a
//! single write. The index is updated only after the append reached the
//! write-position accounting. [`Store::close`] writes the key snapshot;
//! a crash leaves it stale or absent, which is exactly what
//! [`Store::open_verified`] exists for: it ignores the snapshot and
//! rebuilds the index from the log, stopping at the first frame that
//! fails its checksum.

mod consolidate;
mod map;
mod read;
mod recovery;
mod snapshot;
mod write;

use anyhow::{Context, Result};
use keydir::KeyDir;
use memmap2::Mmap;
use parking_lot::RwLock;
use record::ValuePointer;
pub use recovery::Corruption;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// An embedded key-value store backed by a single append-only data file.
///
/// All reads are served from a shared read-only memory map over the file;
/// all mutations append checksummed frames through the file handle. One
/// reader/writer lock guards the mutable state, so a handle can be shared
/// across threads behind an `Arc`. Two processes opening the same file is
/// undefined behaviour; the store is strictly single-process.
pub struct Store {
    location: PathBuf,
    inner: RwLock<Inner>,
}

pub(crate) struct Inner {
    file: File,
    /// Read-only map over the data file, oversized per [`map::initial_len`]
    /// so appends rarely force a remap.
    map: Mmap,
    /// Logical length of the log; where the next append begins.
    write_pos: u64,
    keydir: KeyDir,
    /// Reusable frame-encoding buffer, kept under the lock with the rest
    /// of the mutable state.
    scratch: Vec<u8>,
}

impl Inner {
    /// Value bytes for a pointer taken from this store's key dir.
    ///
    /// Pointers only enter the key dir for frames whose append succeeded
    /// or whose checksum verified, so the slice lies within the written
    /// prefix of the map.
    pub(crate) fn value_at(&self, ptr: ValuePointer) -> &[u8] {
        &self.map[ptr.offset as usize..(ptr.offset + u64::from(ptr.len)) as usize]
    }
}

/// Opens the data file the way every non-truncating path needs it:
/// readable (for the map), created if missing, append-only writes.
pub(crate) fn open_append(location: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .create(true)
        .append(true)
        .open(location)
        .with_context(|| format!("failed to open data file at {}", location.display()))
}

impl Store {
    /// Creates a new store at `location`, **deleting** any data there.
    ///
    /// The file is opened with truncation, the index starts empty, and the
    /// write position starts at 0.
    pub fn create<P: AsRef<Path>>(location: P) -> Result<Self> {
        let location = location.as_ref().to_path_buf();
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&location)
            .with_context(|| format!("failed to create data file at {}", location.display()))?;
        let file = open_append(&location)?;
        let map = map::establish(&file, map::initial_len(0))?;

        info!(location = %location.display(), "created store");
        Ok(Self {
            location,
            inner: RwLock::new(Inner {
                file,
                map,
                write_pos: 0,
                keydir: KeyDir::new(),
                scratch: Vec::with_capacity(256),
            }),
        })
    }

    /// Opens a pre-existing store, trusting the key snapshot.
    ///
    /// The data file is not scanned and no integrity check runs: the index
    /// is populated straight from `<location>.keys` (empty if the snapshot
    /// is missing) and the write position is set to the file length. Use
    /// [`Store::open_verified`] after an unclean shutdown.
    pub fn open<P: AsRef<Path>>(location: P) -> Result<Self> {
        let location = location.as_ref().to_path_buf();
        let file = open_append(&location)?;
        let write_pos = file.metadata()?.len();
        let map = map::establish(&file, map::initial_len(write_pos))?;
        let keydir = snapshot::load(&location)?;

        info!(
            location = %location.display(),
            keys = keydir.len(),
            "opened store from snapshot"
        );
        Ok(Self {
            location,
            inner: RwLock::new(Inner {
                file,
                map,
                write_pos,
                keydir,
                scratch: Vec::with_capacity(256),
            }),
        })
    }

    /// Opens a pre-existing store by scanning the full log, verifying
    /// every frame's checksum and rebuilding the index from scratch. Any
    /// key snapshot is ignored.
    ///
    /// A later valid frame for a key supersedes an earlier one, a
    /// tombstone erases the key, and a reappearance after a tombstone
    /// reinstates it.
    ///
    /// On a checksum mismatch the scan stops and `Some(Corruption)` is
    /// returned alongside the handle: the index reflects only the frames
    /// before the bad one and the write position is its start offset. The
    /// bad bytes are left in place, so a caller accepting truncation of the
    /// tail should [`Store::consolidate`] before writing, which rewrites
    /// the file from the verified index.
    pub fn open_verified<P: AsRef<Path>>(location: P) -> Result<(Self, Option<Corruption>)> {
        let location = location.as_ref().to_path_buf();
        let file = open_append(&location)?;
        let file_len = file.metadata()?.len();
        let map = map::establish(&file, map::initial_len(file_len))?;

        let (keydir, scan) = recovery::rebuild(&map[..file_len as usize]);
        let corruption = scan.corrupt.then_some(Corruption { offset: scan.end });

        match corruption {
            Some(c) => warn!(
                location = %location.display(),
                offset = c.offset,
                "verified open stopped at corrupt record"
            ),
            None => info!(
                location = %location.display(),
                keys = keydir.len(),
                "verified open rebuilt index from log"
            ),
        }

        let store = Self {
            location,
            inner: RwLock::new(Inner {
                file,
                map,
                write_pos: scan.end,
                keydir,
                scratch: Vec::with_capacity(256),
            }),
        };
        Ok((store, corruption))
    }

    /// Closes the store, writing the key snapshot for the fast-open path.
    ///
    /// Consuming `self` makes use-after-close unrepresentable. The map and
    /// file handle are released when the handle drops. Dropping a `Store`
    /// *without* calling `close` skips the snapshot; the log itself is
    /// the source of durability, and [`Store::open_verified`] recovers
    /// from it.
    pub fn close(self) -> Result<()> {
        let inner = self.inner.into_inner();
        snapshot::write(&self.location, &inner.keydir)?;
        info!(location = %self.location.display(), keys = inner.keydir.len(), "closed store");
        Ok(())
    }

    /// The path of the data file backing this store.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Store")
            .field("location", &self.location)
            .field("write_pos", &inner.write_pos)
            .field("keys", &inner.keydir.len())
            .field("map_len", &inner.map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
