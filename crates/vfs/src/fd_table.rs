//! TEAM_478: File descriptor table
//!
//! One table per execution context: a fixed number of slots and a working
//! directory. Descriptors 0, 1 and 2 start out as one shared terminal over
//! the console device.
//!
//! Slots are read without the table lock: [`FileSlot::load`] hands out a
//! strong reference, so a concurrent `close` only drops the slot's own
//! reference and an in-flight `read` keeps its file alive until it returns.
//! Writers (`open`, `dup`, `dup_to`, `duplicate`) are serialized by the
//! table's writer lock.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;

use crate::device::TerminalDevice;
use crate::error::{VfsError, VfsResult};
use crate::flags::{IoctlArg, OpenFlags, SeekWhence};
use crate::manager::FilesystemManager;
use crate::mode::Stat;
use crate::path::absolute_path;
use crate::sync::Mutex;
use crate::vfs::FileRef;

pub const STDIN_FILENO: usize = 0;
pub const STDOUT_FILENO: usize = 1;
pub const STDERR_FILENO: usize = 2;
/// TEAM_478: First descriptor `open` hands out.
pub const FIRST_FREE_FD: usize = 3;

/// TEAM_478: One descriptor slot, an arc-in-a-cell.
///
/// The lock is held only for the reference-count bump or the pointer swap;
/// the file a swap replaces is dropped after the lock is released.
pub struct FileSlot {
    file: Mutex<Option<FileRef>>,
}

impl FileSlot {
    pub const fn empty() -> Self {
        Self {
            file: Mutex::new(None),
        }
    }

    pub fn load(&self) -> Option<FileRef> {
        self.file.lock().clone()
    }

    pub fn store(&self, file: Option<FileRef>) {
        drop(self.swap(file));
    }

    /// Replaces the slot's file, returning the previous one.
    pub fn swap(&self, file: Option<FileRef>) -> Option<FileRef> {
        let mut slot = self.file.lock();
        core::mem::replace(&mut *slot, file)
    }

    pub fn take(&self) -> Option<FileRef> {
        self.swap(None)
    }

    pub fn is_empty(&self) -> bool {
        self.file.lock().is_none()
    }
}

/// TEAM_478: Per-context descriptor table.
pub struct FileDescriptorTable {
    manager: Arc<FilesystemManager>,
    writer: Mutex<()>,
    /// Canonical, always with a trailing `/`.
    cwd: Mutex<String>,
    files: Box<[FileSlot]>,
}

impl FileDescriptorTable {
    /// A table with stdio on the console and `/` as working directory,
    /// registered with `manager`.
    pub fn new(manager: &Arc<FilesystemManager>) -> Arc<Self> {
        let terminal: FileRef = Arc::new(TerminalDevice::new(manager.console().get()));
        let files = Self::empty_slots(manager.config().max_open_files);
        for slot in files.iter().take(FIRST_FREE_FD) {
            slot.store(Some(terminal.clone()));
        }
        Self::register(manager, files, String::from("/"))
    }

    /// TEAM_478: Copy for a forked context: same open files, same cwd.
    pub fn duplicate(&self) -> Arc<Self> {
        let _writer = self.writer.lock();
        let files = Self::empty_slots(self.files.len());
        for (dst, src) in files.iter().zip(self.files.iter()) {
            dst.store(src.load());
        }
        let cwd = self.cwd.lock().clone();
        Self::register(&self.manager, files, cwd)
    }

    fn empty_slots(n: usize) -> Box<[FileSlot]> {
        (0..n).map(|_| FileSlot::empty()).collect()
    }

    fn register(manager: &Arc<FilesystemManager>, files: Box<[FileSlot]>, cwd: String) -> Arc<Self> {
        let table = Arc::new(Self {
            manager: manager.clone(),
            writer: Mutex::new(()),
            cwd: Mutex::new(cwd),
            files,
        });
        manager.register_table(&table);
        table
    }

    pub fn manager(&self) -> &Arc<FilesystemManager> {
        &self.manager
    }

    pub(crate) fn slots(&self) -> &[FileSlot] {
        &self.files
    }

    fn slot(&self, fd: usize) -> VfsResult<&FileSlot> {
        self.files.get(fd).ok_or(VfsError::BadFd)
    }

    /// The file behind `fd`.
    pub fn get_file(&self, fd: usize) -> VfsResult<FileRef> {
        self.slot(fd)?.load().ok_or(VfsError::BadFd)
    }

    fn absolute(&self, name: &str) -> VfsResult<String> {
        let cwd = self.cwd.lock();
        absolute_path(&cwd, name, self.manager.config().path_max)
    }

    /// TEAM_478: Open `name` into the lowest free descriptor from 3 up.
    pub fn open(&self, name: &str, flags: OpenFlags, mode: u32) -> VfsResult<usize> {
        if name.is_empty() {
            return Err(VfsError::NotFound);
        }
        let _writer = self.writer.lock();
        let fd = (FIRST_FREE_FD..self.files.len())
            .find(|&fd| self.files[fd].is_empty())
            .ok_or(VfsError::TooManyOpenFiles)?;

        let mut path = self.absolute(name)?;
        let target = self
            .manager
            .resolve(&mut path, !flags.contains(OpenFlags::O_NOFOLLOW))?;
        let file = target.fs.clone().open(target.sub_path(&path), flags, mode)?;
        if flags.contains(OpenFlags::O_DIRECTORY) && !file.fstat()?.is_dir() {
            return Err(VfsError::NotADirectory);
        }
        self.files[fd].store(Some(file));
        log::trace!("[FD] open {} -> {}", path, fd);
        Ok(fd)
    }

    pub fn close(&self, fd: usize) -> VfsResult<()> {
        self.slot(fd)?.take().map(drop).ok_or(VfsError::BadFd)
    }

    /// TEAM_478: Close all file descriptors (context exit).
    pub fn close_all(&self) {
        for slot in self.files.iter() {
            slot.take();
        }
    }

    /// Duplicate `fd` into the lowest free descriptor.
    pub fn dup(&self, fd: usize) -> VfsResult<usize> {
        let _writer = self.writer.lock();
        let file = self.get_file(fd)?;
        let new_fd = self
            .files
            .iter()
            .position(FileSlot::is_empty)
            .ok_or(VfsError::TooManyOpenFiles)?;
        self.files[new_fd].store(Some(file));
        Ok(new_fd)
    }

    /// Make `new_fd` refer to the file of `fd`, closing what it held.
    pub fn dup_to(&self, fd: usize, new_fd: usize) -> VfsResult<usize> {
        let _writer = self.writer.lock();
        let file = self.get_file(fd)?;
        let slot = self.slot(new_fd)?;
        if fd != new_fd {
            slot.store(Some(file));
        }
        Ok(new_fd)
    }

    pub fn read(&self, fd: usize, buf: &mut [u8]) -> VfsResult<usize> {
        self.get_file(fd)?.read(buf)
    }

    pub fn write(&self, fd: usize, buf: &[u8]) -> VfsResult<usize> {
        self.get_file(fd)?.write(buf)
    }

    pub fn lseek(&self, fd: usize, pos: i64, whence: SeekWhence) -> VfsResult<u64> {
        self.get_file(fd)?.lseek(pos, whence)
    }

    pub fn fstat(&self, fd: usize) -> VfsResult<Stat> {
        self.get_file(fd)?.fstat()
    }

    pub fn isatty(&self, fd: usize) -> VfsResult<bool> {
        Ok(self.get_file(fd)?.isatty())
    }

    pub fn fcntl(&self, fd: usize, cmd: u32, arg: u32) -> VfsResult<i32> {
        self.get_file(fd)?.fcntl(cmd, arg)
    }

    pub fn ioctl(&self, fd: usize, cmd: u32, arg: IoctlArg<'_>) -> VfsResult<i32> {
        self.get_file(fd)?.ioctl(cmd, arg)
    }

    pub fn getdents(&self, fd: usize, buf: &mut [u8]) -> VfsResult<usize> {
        self.get_file(fd)?.getdents(buf)
    }

    pub fn stat(&self, name: &str) -> VfsResult<Stat> {
        self.manager.stat(&self.absolute(name)?, true)
    }

    pub fn lstat(&self, name: &str) -> VfsResult<Stat> {
        self.manager.stat(&self.absolute(name)?, false)
    }

    pub fn mkdir(&self, name: &str, mode: u32) -> VfsResult<()> {
        self.manager.mkdir(&self.absolute(name)?, mode)
    }

    pub fn rmdir(&self, name: &str) -> VfsResult<()> {
        self.manager.rmdir(&self.absolute(name)?)
    }

    pub fn unlink(&self, name: &str) -> VfsResult<()> {
        self.manager.unlink(&self.absolute(name)?)
    }

    pub fn rename(&self, old_name: &str, new_name: &str) -> VfsResult<()> {
        self.manager
            .rename(&self.absolute(old_name)?, &self.absolute(new_name)?)
    }

    /// The working directory, without a trailing `/` unless it is the root.
    ///
    /// Fails with `NotFound` once the directory has gone away.
    pub fn getcwd(&self) -> VfsResult<String> {
        let mut cwd = self.cwd.lock().clone();
        if !self.manager.stat(&cwd, true)?.is_dir() {
            return Err(VfsError::NotFound);
        }
        if cwd.len() > 1 {
            cwd.pop();
        }
        Ok(cwd)
    }

    pub fn chdir(&self, name: &str) -> VfsResult<()> {
        let mut path = self.absolute(name)?;
        let target = self.manager.resolve(&mut path, true)?;
        if !target.fs.lstat(target.sub_path(&path))?.is_dir() {
            return Err(VfsError::NotADirectory);
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        log::debug!("[FD] chdir {}", path);
        *self.cwd.lock() = path;
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
