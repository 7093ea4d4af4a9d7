//! TEAM_478: Directory entry records for `getdents`.
//!
//! Record layout, native endian:
//!
//! | offset | field      | type  |
//! |--------|------------|-------|
//! | 0      | `d_ino`    | `u32` |
//! | 4      | reserved   | 4 B   |
//! | 8      | `d_off`    | `i64` |
//! | 16     | `d_reclen` | `u16` |
//! | 18     | `d_type`   | `u8`  |
//! | 19     | `d_name`   | NUL-terminated |
//!
//! Records are padded to 4 bytes. A record with `d_reclen == 0` ends the
//! listing; callers keep calling `getdents` until they see it.

use alloc::borrow::ToOwned;
use alloc::collections::BTreeMap;
use alloc::collections::btree_map::Range;
use alloc::string::String;
use core::ops::Bound;

use crate::error::{VfsError, VfsResult};
use crate::mode::{S_IFDIR, dirent_type};

/// Header bytes before `d_name`.
pub const DIRENT_HEADER_NO_PADDING: usize = 19;
/// Space taken by the terminating record.
pub const DIRENT_HEADER_SIZE: usize = (DIRENT_HEADER_NO_PADDING + 3 + 3) / 4 * 4;
/// Smallest buffer `getdents` accepts: room for `.`, `..` and the terminator.
pub const DIRENT_MIN_BUFFER: usize = 3 * DIRENT_HEADER_SIZE;

const D_INO: usize = 0;
const D_OFF: usize = 8;
const D_RECLEN: usize = 16;
const D_TYPE: usize = 18;

/// Bytes a record for `name` occupies.
pub fn record_len(name: &str) -> usize {
    (DIRENT_HEADER_NO_PADDING + name.len() + 1 + 3) & !3
}

/// TEAM_478: Packs records into a caller buffer.
pub struct DirentWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> DirentWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// Appends one record; `false` (and nothing written) if it does not fit.
    pub fn push(&mut self, ino: u32, d_type: u8, name: &str) -> bool {
        let reclen = record_len(name);
        if reclen > u16::MAX as usize || self.pos + reclen > self.buf.len() {
            return false;
        }
        let rec = &mut self.buf[self.pos..self.pos + reclen];
        rec.fill(0);
        rec[D_INO..D_INO + 4].copy_from_slice(&ino.to_ne_bytes());
        rec[D_OFF..D_OFF + 8].copy_from_slice(&0i64.to_ne_bytes());
        rec[D_RECLEN..D_RECLEN + 2].copy_from_slice(&(reclen as u16).to_ne_bytes());
        rec[D_TYPE] = d_type;
        let name_at = DIRENT_HEADER_NO_PADDING;
        rec[name_at..name_at + name.len()].copy_from_slice(name.as_bytes());
        self.pos += reclen;
        true
    }

    /// `.` and `..`; the minimum buffer size guarantees both fit.
    pub fn push_default_entries(&mut self, this_ino: u32, parent_ino: u32) -> bool {
        let dir = dirent_type(S_IFDIR);
        self.push(this_ino, dir, ".") && self.push(parent_ino, dir, "..")
    }

    /// The zeroed end-of-listing record.
    pub fn push_terminator(&mut self) -> bool {
        if self.pos + DIRENT_HEADER_SIZE > self.buf.len() {
            return false;
        }
        self.buf[self.pos..self.pos + DIRENT_HEADER_SIZE].fill(0);
        self.pos += DIRENT_HEADER_SIZE;
        true
    }
}

/// One entry handed to [`DirCursor::fill`].
#[derive(Debug, Clone, Copy)]
pub struct DirEntry<'a> {
    pub ino: u32,
    pub d_type: u8,
    pub name: &'a str,
}

/// TEAM_478: Where a listing of a name-ordered directory stands.
///
/// Resumes by name, so entries added or removed between two calls do not
/// derail the listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DirCursor {
    #[default]
    Fresh,
    /// `.`/`..` done; the next entry to emit is the named one (or the first).
    Entries(Option<String>),
    /// Every entry emitted, terminator still pending.
    Tail,
    Finished,
}

impl DirCursor {
    /// Fills `buf` starting where the previous call stopped.
    ///
    /// `entries` receives the name to resume from and must return the
    /// directory's entries in name order starting at that name.
    pub fn fill<'e, F, I>(
        &mut self,
        buf: &mut [u8],
        this_ino: u32,
        parent_ino: u32,
        entries: F,
    ) -> VfsResult<usize>
    where
        F: FnOnce(Option<&str>) -> I,
        I: Iterator<Item = DirEntry<'e>>,
    {
        if buf.len() < DIRENT_MIN_BUFFER {
            return Err(VfsError::InvalidArgument);
        }
        if *self == DirCursor::Finished {
            return Ok(0);
        }
        let mut w = DirentWriter::new(buf);
        if *self == DirCursor::Fresh {
            w.push_default_entries(this_ino, parent_ino);
            *self = DirCursor::Entries(None);
        }
        if let DirCursor::Entries(from) = self {
            for entry in entries(from.as_deref()) {
                if !w.push(entry.ino, entry.d_type, entry.name) {
                    if w.is_empty() {
                        return Err(VfsError::InvalidArgument);
                    }
                    *self = DirCursor::Entries(Some(entry.name.to_owned()));
                    return Ok(w.len());
                }
            }
            *self = DirCursor::Tail;
        }
        if w.push_terminator() {
            *self = DirCursor::Finished;
        }
        Ok(w.len())
    }
}

/// Entries of a name-keyed map from `from` (inclusive) onwards, for the
/// `entries` callback of [`DirCursor::fill`].
pub fn btree_range_from<'m, V>(map: &'m BTreeMap<String, V>, from: Option<&str>) -> Range<'m, String, V> {
    let start = from.map_or(Bound::Unbounded, Bound::Included);
    map.range::<str, _>((start, Bound::Unbounded))
}

/// A parsed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirentRecord<'a> {
    pub ino: u32,
    pub d_type: u8,
    pub name: &'a str,
}

/// TEAM_478: Walks the records of a filled buffer.
pub struct DirentIter<'a> {
    buf: &'a [u8],
    pos: usize,
    terminated: bool,
}

impl<'a> DirentIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            terminated: false,
        }
    }

    /// Whether the end-of-listing record has been reached.
    pub fn terminated(&self) -> bool {
        self.terminated
    }
}

impl<'a> Iterator for DirentIter<'a> {
    type Item = DirentRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rec = self.buf.get(self.pos..self.pos + DIRENT_HEADER_NO_PADDING)?;
        let reclen = u16::from_ne_bytes([rec[D_RECLEN], rec[D_RECLEN + 1]]) as usize;
        if reclen == 0 {
            self.terminated = true;
            self.pos = self.buf.len();
            return None;
        }
        if reclen < DIRENT_HEADER_NO_PADDING {
            return None;
        }
        let body = self.buf.get(self.pos..self.pos + reclen)?;
        let ino = u32::from_ne_bytes([body[0], body[1], body[2], body[3]]);
        let raw_name = &body[DIRENT_HEADER_NO_PADDING..];
        let name_len = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
        let name = core::str::from_utf8(&raw_name[..name_len]).ok()?;
        self.pos += reclen;
        Some(DirentRecord {
            ino,
            d_type: body[D_TYPE],
            name,
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
