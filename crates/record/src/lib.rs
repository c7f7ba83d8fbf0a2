//! # Record - Append-Only Log Frame Codec
//!
//! Defines the on-disk format of the EbbtideKV data file and the scan used
//! to rebuild the index from it.
//!
//! The data file is nothing but a concatenation of self-describing,
//! checksummed frames in append order. There is no file header, no magic
//! bytes, and no version field: the file length *is* the write position.
//!
//! ## Binary Frame Format
//!
//! ```text
//! [crc: u32 LE][key_len: u32 LE][val_len: u32 LE][key bytes][value bytes]
//! ```
//!
//! `crc` is CRC-32C (Castagnoli) over every byte after the checksum field,
//! i.e. both length fields and both payloads. `val_len == 0` marks a
//! tombstone; tombstones carry no value bytes.
//!
//! ## Example
//!
//! ```rust
//! use record::{encode_into, replay};
//!
//! let mut log = Vec::new();
//! let mut frame = Vec::new();
//! encode_into(&mut frame, b"hello", b"world");
//! log.extend_from_slice(&frame);
//!
//! let scan = replay(&log, |key, pointer| {
//!     assert_eq!(key, b"hello");
//!     assert_eq!(pointer.unwrap().len, 5);
//! });
//! assert!(!scan.corrupt);
//! assert_eq!(scan.end, log.len() as u64);
//! ```

use byteorder::{LittleEndian, ReadBytesExt};

/// Fixed frame header size: checksum + key length + value length.
pub const HEADER_LEN: usize = 12;

/// Total on-disk size of the frame encoding `(key, value)`.
#[must_use]
pub fn frame_len(key: &[u8], value: &[u8]) -> u64 {
    (HEADER_LEN + key.len() + value.len()) as u64
}

/// Locates a value payload inside the data file.
///
/// `offset` is the absolute byte position of the value bytes (frame start
/// + header + key); `len` is the value length. A pointer with `len == 0`
/// is never handed out; tombstones are reported as `None` by [`replay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuePointer {
    /// Absolute byte position of the value payload in the data file.
    pub offset: u64,
    /// Length of the value payload in bytes.
    pub len: u32,
}

impl ValuePointer {
    /// Pointer for the value of a frame encoding a `key_len`-byte key and
    /// `val_len`-byte value, were the frame written at `frame_start`.
    #[must_use]
    pub fn for_frame(frame_start: u64, key_len: usize, val_len: usize) -> Self {
        Self {
            offset: frame_start + HEADER_LEN as u64 + key_len as u64,
            len: val_len as u32,
        }
    }
}

/// Parsed frame header. The checksum is stored, not yet verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub crc: u32,
    pub key_len: u32,
    pub val_len: u32,
}

/// Reads the three header fields at the start of `frame`.
///
/// Returns `None` if fewer than [`HEADER_LEN`] bytes are available (a
/// truncated tail, from the scanner's point of view).
#[must_use]
pub fn read_header(frame: &[u8]) -> Option<FrameHeader> {
    if frame.len() < HEADER_LEN {
        return None;
    }
    let mut rd = frame;
    Some(FrameHeader {
        crc: rd.read_u32::<LittleEndian>().ok()?,
        key_len: rd.read_u32::<LittleEndian>().ok()?,
        val_len: rd.read_u32::<LittleEndian>().ok()?,
    })
}

/// Serializes `(key, value)` into `buf` as one fully-formed frame.
///
/// The buffer is cleared first; callers keep a scratch `Vec` around and
/// reuse its allocation across appends. An empty `value` produces a
/// tombstone frame.
///
/// The checksum is computed last, over `buf[4..]`, so the length fields
/// and payloads are covered before the bytes ever leave memory.
pub fn encode_into(buf: &mut Vec<u8>, key: &[u8], value: &[u8]) {
    buf.clear();
    buf.reserve(HEADER_LEN + key.len() + value.len());

    // crc placeholder, filled once the body is in place
    buf.extend_from_slice(&[0u8; 4]);
    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);

    let crc = crc32c::crc32c(&buf[4..]);
    buf[..4].copy_from_slice(&crc.to_le_bytes());
}

/// Checks a complete frame against its stored checksum.
///
/// A frame is valid iff the stored `crc` equals CRC-32C of `frame[4..]`.
/// Any single-bit flip in the length fields or payloads fails this check.
#[must_use]
pub fn verify(frame: &[u8]) -> bool {
    match read_header(frame) {
        Some(header) => header.crc == crc32c::crc32c(&frame[4..]),
        None => false,
    }
}

/// Outcome of a log scan.
///
/// `end` is the clean tail position: the full log length after a clean
/// scan, or the start offset of the first bad frame when `corrupt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    pub end: u64,
    pub corrupt: bool,
}

/// Replays every frame in `log` from offset 0, calling `apply` for each
/// one that verifies.
///
/// `apply` receives the key bytes and `Some(pointer)` for a live frame or
/// `None` for a tombstone. Later frames for a key supersede earlier ones,
/// so applying in scan order reproduces the writer's final state.
///
/// # Termination
///
/// - **Clean end** (all frames consumed) -> `Scan { end: log.len(), corrupt: false }`.
/// - **Truncated header or body** (fewer bytes remain than the frame
///   claims, e.g. a crash mid-append) -> stops, `corrupt: true`.
/// - **Checksum mismatch** -> stops, `corrupt: true`.
///
/// In the corrupt cases `end` is the start of the offending frame and
/// everything applied so far reflects only verified frames.
pub fn replay<F>(log: &[u8], mut apply: F) -> Scan
where
    F: FnMut(&[u8], Option<ValuePointer>),
{
    let mut pos = 0usize;

    while pos < log.len() {
        let header = match read_header(&log[pos..]) {
            Some(h) => h,
            None => {
                return Scan {
                    end: pos as u64,
                    corrupt: true,
                }
            }
        };

        let key_len = header.key_len as usize;
        let val_len = header.val_len as usize;
        let frame_end = pos + HEADER_LEN + key_len + val_len;
        if frame_end > log.len() {
            // claimed lengths run past the buffer: partial append or
            // corrupted length fields, and either way the crc can't save us
            return Scan {
                end: pos as u64,
                corrupt: true,
            };
        }

        let frame = &log[pos..frame_end];
        if !verify(frame) {
            return Scan {
                end: pos as u64,
                corrupt: true,
            };
        }

        let key = &frame[HEADER_LEN..HEADER_LEN + key_len];
        let pointer =
            (val_len > 0).then(|| ValuePointer::for_frame(pos as u64, key_len, val_len));
        apply(key, pointer);

        pos = frame_end;
    }

    Scan {
        end: pos as u64,
        corrupt: false,
    }
}
