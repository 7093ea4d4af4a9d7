//! TEAM_478: Open files of the device filesystem.

use alloc::string::String;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use super::{DEVFS_ROOT_INODE, DevFs};
use crate::device::DeviceRef;
use crate::error::{VfsError, VfsResult};
use crate::flags::{IoctlArg, OpenFlags, SeekWhence};
use crate::mode::{Stat, dirent_type};
use crate::sync::Mutex;
use crate::vfs::dirent::{DirCursor, DirEntry, btree_range_from};
use crate::vfs::file::seek_target;
use crate::vfs::{File, FileBase, Filesystem};

/// TEAM_478: A device opened through `/dev`, with a private seek point.
///
/// Non-seekable devices always see offset 0 and keep no cursor.
pub struct DevFsFile {
    base: FileBase,
    device: DeviceRef,
    flags: OpenFlags,
    seek_point: AtomicU64,
}

impl DevFsFile {
    pub(super) fn new(base: FileBase, device: DeviceRef, flags: OpenFlags) -> Self {
        Self {
            base,
            device,
            flags,
            seek_point: AtomicU64::new(0),
        }
    }

    fn offset(&self) -> u64 {
        if self.device.info().is_seekable() {
            self.seek_point.load(Ordering::Acquire)
        } else {
            0
        }
    }

    fn advance(&self, n: usize) {
        if self.device.info().is_seekable() {
            self.seek_point.fetch_add(n as u64, Ordering::AcqRel);
        }
    }
}

impl File for DevFsFile {
    fn base(&self) -> &FileBase {
        &self.base
    }

    fn read(&self, buf: &mut [u8]) -> VfsResult<usize> {
        if !self.flags.is_readable() {
            return Err(VfsError::BadFd);
        }
        let n = self.device.read_block(buf, self.offset())?;
        self.advance(n);
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> VfsResult<usize> {
        if !self.flags.is_writable() {
            return Err(VfsError::BadFd);
        }
        let n = self.device.write_block(buf, self.offset())?;
        self.advance(n);
        Ok(n)
    }

    fn lseek(&self, pos: i64, whence: SeekWhence) -> VfsResult<u64> {
        if !self.device.info().is_seekable() {
            return Err(VfsError::BadFd);
        }
        if whence == SeekWhence::End {
            // A device has no known end
            return Err(VfsError::InvalidArgument);
        }
        let current = self.seek_point.load(Ordering::Acquire);
        let target = seek_target(current, 0, pos, whence, i64::MAX as u64)?;
        self.seek_point.store(target, Ordering::Release);
        Ok(target)
    }

    fn fstat(&self) -> VfsResult<Stat> {
        Ok(self.device.stat())
    }

    fn isatty(&self) -> bool {
        self.device.info().is_tty()
    }

    fn ioctl(&self, cmd: u32, mut arg: IoctlArg<'_>) -> VfsResult<i32> {
        self.device.ioctl(cmd, &mut arg)
    }
}

/// TEAM_478: The `/dev` directory opened for listing.
pub struct DevFsDirectory {
    base: FileBase,
    fs: Arc<DevFs>,
    cursor: Mutex<DirCursor>,
}

impl DevFsDirectory {
    pub(super) fn new(base: FileBase, fs: Arc<DevFs>) -> Self {
        Self {
            base,
            fs,
            cursor: Mutex::new(DirCursor::default()),
        }
    }
}

fn device_entry<'a>((name, device): (&'a String, &'a DeviceRef)) -> DirEntry<'a> {
    DirEntry {
        ino: device.info().ino(),
        d_type: dirent_type(device.stat().st_mode),
        name,
    }
}

impl File for DevFsDirectory {
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
        Ok(self.fs.root_stat())
    }

    fn getdents(&self, buf: &mut [u8]) -> VfsResult<usize> {
        let mut cursor = self.cursor.lock();
        let files = self.fs.files.lock();
        let parent_ino = self.fs.base().parent_mountpoint_inode();
        cursor.fill(buf, DEVFS_ROOT_INODE, parent_ino, |from| {
            btree_range_from(&files, from).map(device_entry)
        })
    }
}
