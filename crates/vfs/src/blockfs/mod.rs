//! TEAM_478: Block-storage filesystem adapter
//!
//! Exposes a [`BlockVolume`] (an external on-disk filesystem library) through
//! the [`Filesystem`] contract. One lock around the volume serializes every
//! library call; library errors are translated before they leave here.

mod file;
pub mod volume;

use alloc::string::String;
use alloc::sync::Arc;

pub use file::{BlockDirectory, BlockFile};
pub use volume::{
    BlockVolume, EntryKind, VolumeAccess, VolumeDirEntry, VolumeError, VolumeResult, VolumeStat,
};

use crate::error::{VfsError, VfsResult};
use crate::flags::OpenFlags;
use crate::mode::{DEFAULT_BLKSIZE, MODE_0755, S_IFDIR, S_IFLNK, S_IFREG, Stat};
use crate::sync::{Mutex, MutexGuard};
use crate::vfs::{FileBase, FileRef, Filesystem, FsBase, FsRef};

/// Inode reported for the volume root.
pub const BLOCKFS_ROOT_INODE: u32 = 1;

pub struct BlockFs<V: BlockVolume> {
    base: FsBase,
    volume: Mutex<V>,
}

impl<V: BlockVolume> BlockFs<V> {
    /// Mounts `volume`. A volume the library cannot mount is not exposed.
    pub fn mount(mut volume: V) -> VfsResult<Arc<Self>> {
        volume.mount().map_err(|e| {
            log::warn!("[BLOCKFS] volume mount failed: {:?}", e);
            VfsError::from(e)
        })?;
        Ok(Arc::new(Self {
            base: FsBase::new(),
            volume: Mutex::new(volume),
        }))
    }

    pub(crate) fn volume(&self) -> MutexGuard<'_, V> {
        self.volume.lock()
    }

    fn mode_of(kind: EntryKind) -> u32 {
        match kind {
            EntryKind::File => S_IFREG | MODE_0755,
            EntryKind::Directory => S_IFDIR | MODE_0755,
            EntryKind::Symlink => S_IFLNK | 0o777,
        }
    }

    fn stat_of(&self, st: VolumeStat) -> Stat {
        Stat {
            st_size: st.size,
            st_blksize: DEFAULT_BLKSIZE,
            st_blocks: st.size.div_ceil(u64::from(DEFAULT_BLKSIZE)),
            ..Stat::new(self.base.id(), st.ino, Self::mode_of(st.kind))
        }
    }

    /// Library stat, with the root answered locally.
    fn lookup(volume: &mut V, name: &str) -> VolumeResult<VolumeStat> {
        if name.is_empty() {
            return Ok(VolumeStat {
                ino: BLOCKFS_ROOT_INODE,
                kind: EntryKind::Directory,
                size: 0,
            });
        }
        volume.stat(name)
    }

    /// Inode to report as `..` of directory `name`.
    fn parent_inode(&self, volume: &mut V, name: &str) -> u32 {
        if name.is_empty() {
            return self.base.parent_mountpoint_inode();
        }
        let parent = name.rfind('/').map_or("", |i| &name[..i]);
        Self::lookup(volume, parent).map_or(BLOCKFS_ROOT_INODE, |st| st.ino)
    }

    fn access_for(flags: OpenFlags) -> VfsResult<VolumeAccess> {
        let mut access = VolumeAccess::empty();
        if flags.is_readable() {
            access |= VolumeAccess::READ;
        }
        if flags.is_writable() {
            access |= VolumeAccess::WRITE;
        }
        let create = flags.contains(OpenFlags::O_CREAT);
        let excl = flags.contains(OpenFlags::O_EXCL);
        let trunc = flags.contains(OpenFlags::O_TRUNC);
        if trunc && !flags.is_writable() {
            return Err(VfsError::AccessDenied);
        }
        access |= match (create, excl, trunc) {
            (true, true, _) => VolumeAccess::CREATE_NEW,
            (_, _, true) => VolumeAccess::CREATE_ALWAYS,
            (true, false, false) => VolumeAccess::OPEN_ALWAYS,
            (false, _, false) => VolumeAccess::empty(),
        };
        Ok(access)
    }
}

impl<V: BlockVolume> Drop for BlockFs<V> {
    fn drop(&mut self) {
        self.volume.get_mut().unmount();
    }
}

impl<V: BlockVolume> Filesystem for BlockFs<V> {
    fn base(&self) -> &FsBase {
        &self.base
    }

    fn name(&self) -> &'static str {
        "blockfs"
    }

    fn open(self: Arc<Self>, name: &str, flags: OpenFlags, _mode: u32) -> VfsResult<FileRef> {
        let parent: FsRef = self.clone();
        let base = FileBase::new(parent)?;
        let mut volume = self.volume.lock();

        let existing = match Self::lookup(&mut volume, name) {
            Ok(st) => Some(st),
            Err(VolumeError::NoFile) => None,
            Err(e) => return Err(e.into()),
        };
        match existing {
            Some(st) if st.kind == EntryKind::Directory => {
                if flags.wants_modification() {
                    return Err(VfsError::IsADirectory);
                }
                let parent_ino = self.parent_inode(&mut volume, name);
                let dir = volume.open_dir(name)?;
                drop(volume);
                return Ok(Arc::new(BlockDirectory::new(base, self, dir, st.ino, parent_ino)));
            }
            Some(st) if st.kind == EntryKind::Symlink => return Err(VfsError::TooManySymlinks),
            Some(_) if flags.contains(OpenFlags::O_CREAT | OpenFlags::O_EXCL) => {
                return Err(VfsError::AlreadyExists);
            }
            None if !flags.contains(OpenFlags::O_CREAT) => return Err(VfsError::NotFound),
            _ => {}
        }

        let mut handle = volume.open(name, Self::access_for(flags)?)?;
        let ino = match volume.stat(name) {
            Ok(st) => st.ino,
            Err(e) => {
                let _ = volume.close(&mut handle);
                return Err(e.into());
            }
        };
        if flags.contains(OpenFlags::O_APPEND) {
            let end = volume.size(&handle);
            if let Err(e) = volume.seek(&mut handle, end) {
                let _ = volume.close(&mut handle);
                return Err(e.into());
            }
        }
        drop(volume);
        Ok(Arc::new(BlockFile::new(base, self, handle, ino, flags)))
    }

    fn lstat(&self, name: &str) -> VfsResult<Stat> {
        let st = Self::lookup(&mut self.volume.lock(), name)?;
        Ok(self.stat_of(st))
    }

    fn unlink(&self, name: &str) -> VfsResult<()> {
        let mut volume = self.volume.lock();
        if Self::lookup(&mut volume, name)?.kind == EntryKind::Directory {
            return Err(VfsError::IsADirectory);
        }
        Ok(volume.unlink(name)?)
    }

    fn rename(&self, old_name: &str, new_name: &str) -> VfsResult<()> {
        if old_name.is_empty() || new_name.is_empty() {
            return Err(VfsError::Busy);
        }
        Ok(self.volume.lock().rename(old_name, new_name)?)
    }

    fn mkdir(&self, name: &str, _mode: u32) -> VfsResult<()> {
        if name.is_empty() {
            return Err(VfsError::AlreadyExists);
        }
        Ok(self.volume.lock().mkdir(name)?)
    }

    fn rmdir(&self, name: &str) -> VfsResult<()> {
        if name.is_empty() {
            return Err(VfsError::Busy);
        }
        let mut volume = self.volume.lock();
        if volume.stat(name)?.kind != EntryKind::Directory {
            return Err(VfsError::NotADirectory);
        }
        Ok(volume.unlink(name)?)
    }

    fn readlink(&self, name: &str) -> VfsResult<String> {
        let mut volume = self.volume.lock();
        if !volume.supports_symlinks() {
            return Err(VfsError::NotSupported);
        }
        volume.readlink(name).map_err(|e| match e {
            VolumeError::InvalidParameter => VfsError::InvalidArgument,
            other => other.into(),
        })
    }

    fn supports_symlinks(&self) -> bool {
        self.volume.lock().supports_symlinks()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
