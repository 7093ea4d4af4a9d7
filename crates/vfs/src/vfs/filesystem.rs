//! TEAM_478: Filesystem contract and the per-filesystem bookkeeping.

use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use super::file::FileRef;
use crate::error::{VfsError, VfsResult};
use crate::flags::OpenFlags;
use crate::mode::Stat;

/// TEAM_478: Reference-counted filesystem handle
pub type FsRef = Arc<dyn Filesystem>;

/// Process-unique ids, handed out as `st_dev`. Zero is never used.
static NEXT_FS_ID: AtomicU32 = AtomicU32::new(1);

/// TEAM_478: State every backend embeds.
///
/// The open-file counter is touched with plain atomics so opening and closing
/// files never contends with mount-table activity. Unmount raises `draining`
/// before it scans, which makes [`FsBase::file_opened`] refuse new files.
#[derive(Debug)]
pub struct FsBase {
    id: u32,
    open_files: AtomicUsize,
    parent_mountpoint_inode: AtomicU32,
    draining: AtomicBool,
}

impl FsBase {
    pub fn new() -> Self {
        Self {
            id: NEXT_FS_ID.fetch_add(1, Ordering::Relaxed),
            open_files: AtomicUsize::new(0),
            parent_mountpoint_inode: AtomicU32::new(1),
            draining: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn open_files(&self) -> usize {
        self.open_files.load(Ordering::SeqCst)
    }

    pub fn all_files_closed(&self) -> bool {
        self.open_files() == 0
    }

    /// Inode of the directory this filesystem is mounted on, inside the
    /// parent filesystem. Reported as `..` of the root directory.
    pub fn parent_mountpoint_inode(&self) -> u32 {
        self.parent_mountpoint_inode.load(Ordering::Relaxed)
    }

    pub fn set_parent_mountpoint_inode(&self, ino: u32) {
        self.parent_mountpoint_inode.store(ino, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub(crate) fn set_draining(&self, draining: bool) {
        self.draining.store(draining, Ordering::SeqCst);
    }

    /// Counts a new open file, unless an unmount is draining this filesystem.
    ///
    /// Increment first, check second: paired with unmount's store-then-poll
    /// this guarantees one side sees the other.
    pub(crate) fn file_opened(&self) -> VfsResult<()> {
        self.open_files.fetch_add(1, Ordering::SeqCst);
        if self.is_draining() {
            self.file_closed();
            return Err(VfsError::NotFound);
        }
        Ok(())
    }

    #[allow(clippy::panic)]
    pub(crate) fn file_closed(&self) {
        let prev = self.open_files.fetch_sub(1, Ordering::SeqCst);
        if prev == 0 {
            log::error!("[VFS] fs {}: open file counter underflow", self.id);
            panic!("open file counter underflow on filesystem {}", self.id);
        }
    }
}

impl Default for FsBase {
    fn default() -> Self {
        Self::new()
    }
}

/// TEAM_478: Filesystem contract
///
/// Names passed in are relative to the filesystem root, already canonical
/// (no `.`, `..`, or repeated `/`); the empty name is the root itself.
pub trait Filesystem: Send + Sync {
    fn base(&self) -> &FsBase;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Opens `name`. Takes the `Arc` so the file can point back at us.
    fn open(self: Arc<Self>, name: &str, flags: OpenFlags, mode: u32) -> VfsResult<FileRef>;

    /// Stats `name` without following a trailing symlink.
    fn lstat(&self, name: &str) -> VfsResult<Stat>;

    fn unlink(&self, name: &str) -> VfsResult<()>;

    fn rename(&self, old_name: &str, new_name: &str) -> VfsResult<()>;

    fn mkdir(&self, name: &str, mode: u32) -> VfsResult<()>;

    fn rmdir(&self, name: &str) -> VfsResult<()>;

    fn readlink(&self, _name: &str) -> VfsResult<String> {
        Err(VfsError::NotSupported)
    }

    /// Resolution only stats path components of filesystems that answer yes.
    fn supports_symlinks(&self) -> bool {
        false
    }
}

impl core::fmt::Debug for dyn Filesystem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Filesystem")
            .field("name", &self.name())
            .field("id", &self.base().id())
            .finish()
    }
}

/// Identity of two handles, by filesystem id.
pub fn same_fs(a: &FsRef, b: &FsRef) -> bool {
    a.base().id() == b.base().id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = FsBase::new();
        let b = FsBase::new();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), 0);
        assert_eq!(a.parent_mountpoint_inode(), 1);
    }

    /// Tests: a draining filesystem refuses new files and leaves the counter alone
    #[test]
    fn test_draining_refuses_open() {
        let base = FsBase::new();
        base.file_opened().unwrap();
        assert_eq!(base.open_files(), 1);
        base.set_draining(true);
        assert_eq!(base.file_opened(), Err(VfsError::NotFound));
        assert_eq!(base.open_files(), 1);
        base.file_closed();
        assert!(base.all_files_closed());
    }
}
