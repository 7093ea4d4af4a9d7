//! TEAM_478: Mount-point scaffolding filesystem
//!
//! Directories only, one level deep, all in memory. It is mounted at `/` so
//! the real filesystems have somewhere to be mounted on (`/dev`, `/sd`, ...).

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{VfsError, VfsResult};
use crate::flags::{OpenFlags, SeekWhence};
use crate::mode::{DEFAULT_BLKSIZE, MODE_0755, S_IFDIR, Stat, dirent_type};
use crate::path::Path;
use crate::sync::Mutex;
use crate::vfs::dirent::{DirCursor, DirEntry, btree_range_from};
use crate::vfs::{File, FileBase, FileRef, Filesystem, FsBase, FsRef};

const ROOT_INODE: u32 = 1;

pub struct MountpointFs {
    base: FsBase,
    /// Directory name → synthetic inode
    dirs: Mutex<BTreeMap<String, u32>>,
    next_inode: AtomicU32,
}

impl MountpointFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            base: FsBase::new(),
            dirs: Mutex::new(BTreeMap::new()),
            next_inode: AtomicU32::new(ROOT_INODE + 1),
        })
    }

    fn inode_of(&self, name: &str) -> VfsResult<u32> {
        if name.is_empty() {
            return Ok(ROOT_INODE);
        }
        self.dirs.lock().get(name).copied().ok_or(VfsError::NotFound)
    }

    fn dir_stat(&self, ino: u32) -> Stat {
        Stat {
            st_blksize: DEFAULT_BLKSIZE,
            ..Stat::new(self.base.id(), ino, S_IFDIR | MODE_0755)
        }
    }
}

impl Filesystem for MountpointFs {
    fn base(&self) -> &FsBase {
        &self.base
    }

    fn name(&self) -> &'static str {
        "mountpointfs"
    }

    fn open(self: Arc<Self>, name: &str, flags: OpenFlags, _mode: u32) -> VfsResult<FileRef> {
        if flags.wants_modification() {
            return Err(VfsError::AccessDenied);
        }
        let ino = self.inode_of(name)?;
        let parent: FsRef = self.clone();
        Ok(Arc::new(MountpointDirectory {
            base: FileBase::new(parent)?,
            fs: self,
            ino,
            cursor: Mutex::new(DirCursor::default()),
        }))
    }

    fn lstat(&self, name: &str) -> VfsResult<Stat> {
        Ok(self.dir_stat(self.inode_of(name)?))
    }

    /// Only directories live here, and those go through `rmdir`.
    fn unlink(&self, _name: &str) -> VfsResult<()> {
        Err(VfsError::NotFound)
    }

    fn rename(&self, old_name: &str, new_name: &str) -> VfsResult<()> {
        let mut dirs = self.dirs.lock();
        if !dirs.contains_key(old_name) {
            return Err(VfsError::NotFound);
        }
        if !Path::new(new_name).is_plain_name() {
            return Err(VfsError::AccessDenied);
        }
        if old_name != new_name {
            if let Some(ino) = dirs.remove(old_name) {
                dirs.insert(new_name.to_string(), ino);
            }
        }
        Ok(())
    }

    fn mkdir(&self, name: &str, _mode: u32) -> VfsResult<()> {
        if name.is_empty() {
            return Err(VfsError::AlreadyExists);
        }
        if !Path::new(name).is_plain_name() {
            return Err(VfsError::AccessDenied);
        }
        let mut dirs = self.dirs.lock();
        if dirs.contains_key(name) {
            return Err(VfsError::AlreadyExists);
        }
        let ino = self.next_inode.fetch_add(1, Ordering::Relaxed);
        dirs.insert(name.to_string(), ino);
        Ok(())
    }

    fn rmdir(&self, name: &str) -> VfsResult<()> {
        if name.is_empty() {
            return Err(VfsError::Busy);
        }
        self.dirs
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or(VfsError::NotFound)
    }
}

/// TEAM_478: A scaffold directory opened for listing.
///
/// Only the root has entries; the directories under it are always empty
/// (whatever is mounted on them is listed by that filesystem instead).
struct MountpointDirectory {
    base: FileBase,
    fs: Arc<MountpointFs>,
    ino: u32,
    cursor: Mutex<DirCursor>,
}

fn dir_entry<'a>((name, ino): (&'a String, &'a u32)) -> DirEntry<'a> {
    DirEntry {
        ino: *ino,
        d_type: dirent_type(S_IFDIR),
        name,
    }
}

impl File for MountpointDirectory {
    fn base(&self) -> &FileBase {
        &self.base
    }

    fn read(&self, _buf: &mut [u8]) -> VfsResult<usize> {
        Err(VfsError::IsADirectory)
    }

    fn write(&self, _buf: &[u8]) -> VfsResult<usize> {
        Err(VfsError::IsADirectory)
    }

    fn lseek(&self, _pos: i64, _whence: SeekWhence) -> VfsResult<u64> {
        Err(VfsError::BadFd)
    }

    fn fstat(&self) -> VfsResult<Stat> {
        Ok(self.fs.dir_stat(self.ino))
    }

    fn getdents(&self, buf: &mut [u8]) -> VfsResult<usize> {
        let mut cursor = self.cursor.lock();
        if self.ino != ROOT_INODE {
            return cursor.fill(buf, self.ino, ROOT_INODE, |_| core::iter::empty());
        }
        let dirs = self.fs.dirs.lock();
        let parent_ino = self.fs.base().parent_mountpoint_inode();
        cursor.fill(buf, ROOT_INODE, parent_ino, |from| {
            btree_range_from(&dirs, from).map(dir_entry)
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
