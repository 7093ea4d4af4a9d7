//! TEAM_478: Path views
//!
//! Resolution works on one owned, mutable `String` per call. Everything that
//! only needs to look at part of it borrows: [`SubPath`] is a start/end window
//! into that buffer and [`Path`] is a `str` newtype with component-aware
//! helpers. Nothing here allocates except [`absolute_path`].

use alloc::string::String;
use core::fmt;

use crate::error::{VfsError, VfsResult};

/// TEAM_478: Borrowed path slice, analogous to `std::path::Path`
#[repr(transparent)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    inner: str,
}

impl Path {
    pub fn new<S: AsRef<str> + ?Sized>(s: &S) -> &Path {
        // SAFETY: Path is repr(transparent) over str
        unsafe { &*(s.as_ref() as *const str as *const Path) }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_absolute(&self) -> bool {
        self.inner.starts_with('/')
    }

    /// Non-empty components, skipping the empty ones produced by `//`.
    pub fn components(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.inner.split('/').filter(|c| !c.is_empty())
    }

    /// Component-wise prefix test: `/a/b` starts with `/a` but `/ab` does not.
    /// The empty path and `/` are prefixes of everything.
    pub fn starts_with(&self, base: &Path) -> bool {
        let mut mine = self.components();
        base.components().all(|b| mine.next() == Some(b))
    }

    pub fn file_name(&self) -> Option<&str> {
        self.components().next_back()
    }

    /// A single directory-entry name: not empty, no separator.
    pub fn is_plain_name(&self) -> bool {
        !self.inner.is_empty() && !self.inner.contains('/')
    }
}

impl AsRef<Path> for str {
    fn as_ref(&self) -> &Path {
        Path::new(self)
    }
}

impl AsRef<Path> for String {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

/// TEAM_478: A `start..end` window into a path buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SubPath<'a> {
    buf: &'a str,
    start: usize,
    end: usize,
}

impl<'a> SubPath<'a> {
    /// The whole buffer.
    pub fn new(buf: &'a str) -> Self {
        Self {
            buf,
            start: 0,
            end: buf.len(),
        }
    }

    /// `buf[start..end]`, clamped to the buffer and to char boundaries.
    pub fn window(buf: &'a str, start: usize, end: usize) -> Self {
        let end = floor_boundary(buf, end.min(buf.len()));
        let start = floor_boundary(buf, start.min(end));
        Self { buf, start, end }
    }

    /// The first `end` bytes.
    pub fn prefix(buf: &'a str, end: usize) -> Self {
        Self::window(buf, 0, end)
    }

    pub fn as_str(&self) -> &'a str {
        &self.buf[self.start..self.end]
    }

    pub fn as_path(&self) -> &'a Path {
        Path::new(self.as_str())
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Absolute buffer index of the last `/` at or before `pos`.
    pub fn rfind_slash(&self, pos: usize) -> Option<usize> {
        let stop = (pos + 1).min(self.end);
        if stop <= self.start {
            return None;
        }
        self.buf[self.start..stop]
            .rfind('/')
            .map(|i| i + self.start)
    }
}

impl fmt::Debug for SubPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// TEAM_478: Turn a user path into the absolute working copy resolution needs.
///
/// `cwd` is stored with a trailing `/`, so relative names are appended as-is.
pub fn absolute_path(cwd: &str, name: &str, path_max: usize) -> VfsResult<String> {
    if name.is_empty() {
        return Err(VfsError::NotFound);
    }
    if name.len() > path_max {
        return Err(VfsError::NameTooLong);
    }
    if Path::new(name).is_absolute() {
        return Ok(String::from(name));
    }
    if cwd.len() + name.len() > path_max {
        return Err(VfsError::NameTooLong);
    }
    let mut path = String::with_capacity(cwd.len() + name.len());
    path.push_str(cwd);
    path.push_str(name);
    Ok(path)
}

// ============================================================================
// Unit Tests
// ============================================================================
