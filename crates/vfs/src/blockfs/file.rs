//! TEAM_478: Open files and directories of a block volume.

use alloc::sync::Arc;

use super::volume::{BlockVolume, EntryKind, VolumeDirEntry, VolumeStat};
use super::BlockFs;
use crate::error::{VfsError, VfsResult};
use crate::flags::{IOCTL_SYNC, IoctlArg, OpenFlags, SeekWhence};
use crate::mode::{Stat, dirent_type};
use crate::sync::Mutex;
use crate::vfs::dirent::{DIRENT_MIN_BUFFER, DirentWriter};
use crate::vfs::file::seek_target;
use crate::vfs::{File, FileBase};

/// TEAM_478: A regular file on the volume.
///
/// Lock order is handle, then volume.
pub struct BlockFile<V: BlockVolume> {
    base: FileBase,
    fs: Arc<BlockFs<V>>,
    handle: Mutex<V::File>,
    ino: u32,
    flags: OpenFlags,
}

impl<V: BlockVolume> BlockFile<V> {
    pub(super) fn new(
        base: FileBase,
        fs: Arc<BlockFs<V>>,
        handle: V::File,
        ino: u32,
        flags: OpenFlags,
    ) -> Self {
        Self {
            base,
            fs,
            handle: Mutex::new(handle),
            ino,
            flags,
        }
    }
}

impl<V: BlockVolume> Drop for BlockFile<V> {
    fn drop(&mut self) {
        if let Err(e) = self.fs.volume().close(self.handle.get_mut()) {
            log::warn!("[BLOCKFS] close of inode {} failed: {:?}", self.ino, e);
        }
    }
}

impl<V: BlockVolume> File for BlockFile<V> {
    fn base(&self) -> &FileBase {
        &self.base
    }

    fn read(&self, buf: &mut [u8]) -> VfsResult<usize> {
        if !self.flags.is_readable() {
            return Err(VfsError::BadFd);
        }
        let mut handle = self.handle.lock();
        Ok(self.fs.volume().read(&mut handle, buf)?)
    }

    fn write(&self, buf: &[u8]) -> VfsResult<usize> {
        if !self.flags.is_writable() {
            return Err(VfsError::BadFd);
        }
        let mut handle = self.handle.lock();
        let mut volume = self.fs.volume();
        if self.flags.contains(OpenFlags::O_APPEND) {
            let end = volume.size(&handle);
            volume.seek(&mut handle, end)?;
        }
        Ok(volume.write(&mut handle, buf)?)
    }

    /// Seeking past the end of the file is refused; the volume cannot
    /// represent holes.
    fn lseek(&self, pos: i64, whence: SeekWhence) -> VfsResult<u64> {
        let mut handle = self.handle.lock();
        let mut volume = self.fs.volume();
        let size = volume.size(&handle);
        let target = seek_target(volume.tell(&handle), size, pos, whence, size)?;
        volume.seek(&mut handle, target)?;
        Ok(target)
    }

    fn fstat(&self) -> VfsResult<Stat> {
        let handle = self.handle.lock();
        let size = self.fs.volume().size(&handle);
        Ok(self.fs.stat_of(VolumeStat {
            ino: self.ino,
            kind: EntryKind::File,
            size,
        }))
    }

    fn ioctl(&self, cmd: u32, _arg: IoctlArg<'_>) -> VfsResult<i32> {
        match cmd {
            IOCTL_SYNC => {
                let mut handle = self.handle.lock();
                self.fs.volume().sync(&mut handle)?;
                Ok(0)
            }
            _ => Err(VfsError::NotATerminal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Streaming,
    Tail,
    Finished,
}

struct Listing<D> {
    dir: D,
    phase: Phase,
    /// Entry read from the volume that did not fit the previous buffer.
    pending: Option<VolumeDirEntry>,
}

/// TEAM_478: A volume directory opened for listing.
///
/// The volume hands out entries one at a time and cannot rewind, so an entry
/// that does not fit is parked until the next call.
pub struct BlockDirectory<V: BlockVolume> {
    base: FileBase,
    fs: Arc<BlockFs<V>>,
    ino: u32,
    parent_ino: u32,
    listing: Mutex<Listing<V::Dir>>,
}

impl<V: BlockVolume> BlockDirectory<V> {
    pub(super) fn new(
        base: FileBase,
        fs: Arc<BlockFs<V>>,
        dir: V::Dir,
        ino: u32,
        parent_ino: u32,
    ) -> Self {
        Self {
            base,
            fs,
            ino,
            parent_ino,
            listing: Mutex::new(Listing {
                dir,
                phase: Phase::Fresh,
                pending: None,
            }),
        }
    }
}

impl<V: BlockVolume> Drop for BlockDirectory<V> {
    fn drop(&mut self) {
        if let Err(e) = self.fs.volume().close_dir(&mut self.listing.get_mut().dir) {
            log::warn!("[BLOCKFS] close of directory {} failed: {:?}", self.ino, e);
        }
    }
}

impl<V: BlockVolume> File for BlockDirectory<V> {
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
        Ok(self.fs.stat_of(VolumeStat {
            ino: self.ino,
            kind: EntryKind::Directory,
            size: 0,
        }))
    }

    fn getdents(&self, buf: &mut [u8]) -> VfsResult<usize> {
        if buf.len() < DIRENT_MIN_BUFFER {
            return Err(VfsError::InvalidArgument);
        }
        let mut listing = self.listing.lock();
        if listing.phase == Phase::Finished {
            return Ok(0);
        }
        let mut w = DirentWriter::new(buf);
        if listing.phase == Phase::Fresh {
            w.push_default_entries(self.ino, self.parent_ino);
            listing.phase = Phase::Streaming;
        }
        if listing.phase == Phase::Streaming {
            let mut volume = self.fs.volume();
            loop {
                let entry = match listing.pending.take() {
                    Some(entry) => entry,
                    None => match volume.read_dir(&mut listing.dir)? {
                        Some(entry) => entry,
                        None => break,
                    },
                };
                let d_type = dirent_type(BlockFs::<V>::mode_of(entry.stat.kind));
                if !w.push(entry.stat.ino, d_type, &entry.name) {
                    let empty = w.is_empty();
                    listing.pending = Some(entry);
                    if empty {
                        return Err(VfsError::InvalidArgument);
                    }
                    return Ok(w.len());
                }
            }
            listing.phase = Phase::Tail;
        }
        if w.push_terminator() {
            listing.phase = Phase::Finished;
        }
        Ok(w.len())
    }
}
