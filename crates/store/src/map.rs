//! Memory-map establishment and growth arithmetic.
//!
//! The map is deliberately oversized (at least [`MIN_LEN`] bytes, or
//! twice the file length if the file is already bigger) so that ordinary
//! appends never force a remap. The mapping is `MAP_SHARED` and read-only:
//! bytes appended through the file handle become visible through the
//! kernel's unified page cache without touching the mapping. Only when the
//! write position outgrows the map does the store tear it down and
//! establish one of double the previous length.

use anyhow::{Context, Result};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;

/// Floor for the mapping length: 4 × 10⁹ bytes. Reserving this much
/// address space up front costs nothing on 64-bit targets and avoids
/// remapping on every append.
pub(crate) const MIN_LEN: u64 = 4_000_000_000;

/// Mapping length for a freshly opened file of `file_len` bytes.
pub(crate) fn initial_len(file_len: u64) -> u64 {
    if file_len < MIN_LEN {
        MIN_LEN
    } else {
        file_len * 2
    }
}

/// Mapping length after growth: doubled from `current` until it covers
/// `required`. A single doubling suffices for ordinary appends; the loop
/// covers one frame outgrowing the map by more than 2x.
pub(crate) fn grown_len(current: u64, required: u64) -> u64 {
    let mut len = current.max(1);
    while len < required {
        len *= 2;
    }
    len
}

/// Establishes a read-only shared mapping of `len` bytes over `file`.
///
/// `len` may exceed the file length; the store never reads past its write
/// position, which never passes the on-disk length, so the pages beyond
/// EOF are reserved but untouched.
///
/// # Safety
///
/// `Mmap::map` is unsafe because the underlying file could change beneath
/// the mapping. The store owns the file exclusively for the life of the
/// handle and only ever appends through it; sharing the file with another
/// process is documented as undefined behaviour.
pub(crate) fn establish(file: &File, len: u64) -> Result<Mmap> {
    let len = usize::try_from(len).context("map length exceeds address space")?;
    let map = unsafe { MmapOptions::new().len(len).map(file) }
        .context("failed to map data file")?;
    Ok(map)
}
