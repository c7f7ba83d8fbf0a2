//! # Key snapshot - the `<data-file>.keys` accelerator
//!
//! Written once, at [`Store::close`](crate::Store::close), and trusted
//! only by the fast-open path. The snapshot lets a reopen skip the full
//! log scan by persisting the key dir directly.
//!
//! ## File Format
//!
//! One entry per live key, concatenated in unspecified order:
//!
//! ```text
//! [key_len: u32 LE][val_len: u32 LE][val_offset: u64 LE][key bytes]
//! ```
//!
//! No checksum, no ordering constraint, no count header; entries are
//! read until EOF. A process crash leaves the snapshot stale or absent,
//! which is why the verified-open path ignores it entirely.
//!
//! ## Crash Safety
//!
//! The snapshot is rewritten atomically: write to a `.keys.tmp` file,
//! fsync, then rename over the previous snapshot. A close interrupted
//! mid-snapshot leaves the old file intact rather than a half-written
//! one, and repeated close/open cycles never accumulate stale entries.

use anyhow::{Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use keydir::KeyDir;
use record::ValuePointer;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// `<location>.keys`
fn snapshot_path(location: &Path) -> PathBuf {
    let mut os = location.as_os_str().to_os_string();
    os.push(".keys");
    PathBuf::from(os)
}

/// `<location>.keys.tmp`
fn tmp_path(location: &Path) -> PathBuf {
    let mut os = location.as_os_str().to_os_string();
    os.push(".keys.tmp");
    PathBuf::from(os)
}

/// Persists the key dir next to the data file, atomically.
pub(crate) fn write(location: &Path, keydir: &KeyDir) -> Result<()> {
    let tmp = tmp_path(location);
    {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .with_context(|| format!("failed to create snapshot tmp at {}", tmp.display()))?;
        let mut w = BufWriter::new(file);

        for (key, ptr) in keydir.iter() {
            w.write_u32::<LittleEndian>(key.len() as u32)?;
            w.write_u32::<LittleEndian>(ptr.len)?;
            w.write_u64::<LittleEndian>(ptr.offset)?;
            w.write_all(key)?;
        }

        w.flush()?;
        w.get_ref().sync_all()?;
    }

    fs::rename(&tmp, snapshot_path(location)).context("failed to replace key snapshot")?;
    Ok(())
}

/// Loads the key dir from the snapshot next to the data file.
///
/// A missing snapshot is a fresh start: the store existed but was never
/// cleanly closed, or never held keys. No integrity verification is
/// performed: the fast-open path trusts what it reads.
pub(crate) fn load(location: &Path) -> Result<KeyDir> {
    let path = snapshot_path(location);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(KeyDir::new()),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to open key snapshot at {}", path.display()))
        }
    };
    let mut rd = BufReader::new(file);
    let mut keydir = KeyDir::new();

    loop {
        // entry boundary: a clean EOF here means we consumed every entry
        let key_len = match rd.read_u32::<LittleEndian>() {
            Ok(v) => v as usize,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("failed to read key snapshot"),
        };
        let len = rd.read_u32::<LittleEndian>()?;
        let offset = rd.read_u64::<LittleEndian>()?;
        let mut key = vec![0u8; key_len];
        rd.read_exact(&mut key)?;

        keydir.insert(key, ValuePointer { offset, len });
    }

    Ok(keydir)
}
