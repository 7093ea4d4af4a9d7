//! TEAM_478: Open file handles
//!
//! A file is whatever a backend's `open` returns: a device node, a block
//! file, a directory being listed. Handles are shared (`Arc`) between
//! descriptor slots and in-flight calls, so every method takes `&self` and
//! backends keep their cursor behind an atomic or a lock.

use alloc::sync::Arc;

use super::filesystem::FsRef;
use crate::error::{VfsError, VfsResult};
use crate::flags::{F_GETFD, F_SETFD, FD_CLOEXEC, IoctlArg, SeekWhence};
use crate::mode::Stat;

/// TEAM_478: Reference to an open file
pub type FileRef = Arc<dyn File>;

/// TEAM_478: Back reference from a file to its filesystem.
///
/// Creating one counts an open file on the filesystem; dropping it (when the
/// last `Arc` to the file goes away) uncounts it. Files with no filesystem,
/// like the stdio terminal, use [`FileBase::detached`].
#[derive(Debug)]
pub struct FileBase {
    parent: Option<FsRef>,
}

impl FileBase {
    /// Fails with `NotFound` if the filesystem is being unmounted.
    pub fn new(parent: FsRef) -> VfsResult<Self> {
        parent.base().file_opened()?;
        Ok(Self {
            parent: Some(parent),
        })
    }

    pub const fn detached() -> Self {
        Self { parent: None }
    }

    pub fn parent(&self) -> Option<&FsRef> {
        self.parent.as_ref()
    }
}

impl Drop for FileBase {
    fn drop(&mut self) {
        if let Some(fs) = &self.parent {
            fs.base().file_closed();
        }
    }
}

/// TEAM_478: File contract
pub trait File: Send + Sync {
    fn base(&self) -> &FileBase;

    fn read(&self, buf: &mut [u8]) -> VfsResult<usize>;

    fn write(&self, buf: &[u8]) -> VfsResult<usize>;

    /// Returns the new offset.
    fn lseek(&self, pos: i64, whence: SeekWhence) -> VfsResult<u64>;

    fn fstat(&self) -> VfsResult<Stat>;

    fn isatty(&self) -> bool {
        false
    }

    /// Only close-on-exec bookkeeping is understood at this layer; the flag
    /// itself lives with the process, which has no `exec`.
    fn fcntl(&self, cmd: u32, opt: u32) -> VfsResult<i32> {
        match cmd {
            F_GETFD => Ok(0),
            F_SETFD if opt == FD_CLOEXEC || opt == 0 => Ok(0),
            _ => Err(VfsError::InvalidArgument),
        }
    }

    fn ioctl(&self, _cmd: u32, _arg: IoctlArg<'_>) -> VfsResult<i32> {
        Err(VfsError::NotATerminal)
    }

    fn getdents(&self, _buf: &mut [u8]) -> VfsResult<usize> {
        Err(VfsError::NotADirectory)
    }

    fn parent(&self) -> Option<&FsRef> {
        self.base().parent()
    }
}

/// Applies `pos`/`whence` to `current` for a file of `size` bytes.
///
/// Negative results and results past `limit` are `Overflow`.
pub fn seek_target(current: u64, size: u64, pos: i64, whence: SeekWhence, limit: u64) -> VfsResult<u64> {
    let base = match whence {
        SeekWhence::Set => 0i128,
        SeekWhence::Cur => i128::from(current),
        SeekWhence::End => i128::from(size),
    };
    let target = base + i128::from(pos);
    if target < 0 || target > i128::from(limit) {
        return Err(VfsError::Overflow);
    }
    Ok(target as u64)
}
