//! TEAM_478: Syscall-facing surface.
//!
//! Thin wrappers over a [`FileDescriptorTable`] that take the raw integers a
//! trap handler decodes (signed descriptors, flag words, whence) and return
//! [`SyscallResult`]. User memory has already been copied in or validated by
//! the caller; paths arrive as `&str` and out-parameters as Rust references.

use linux_raw_sys::general::O_ACCMODE;

use crate::error::VfsError;
use crate::fd_table::FileDescriptorTable;
use crate::flags::{IoctlArg, OpenFlags, SeekWhence};
use crate::mode::Stat;

/// TEAM_478: Result of a syscall: the return value, or a positive errno.
pub type SyscallResult = Result<i64, u32>;

/// Folds a [`SyscallResult`] into the register value: negative errno on
/// failure.
pub fn to_return_value(result: SyscallResult) -> i64 {
    match result {
        Ok(v) => v,
        Err(errno) => -i64::from(errno),
    }
}

fn fail(e: VfsError) -> u32 {
    log::trace!("[SYSCALL] failed: {}", e);
    e.errno()
}

fn fd_index(fd: i32) -> Result<usize, u32> {
    usize::try_from(fd).map_err(|_| fail(VfsError::BadFd))
}

fn count(n: usize) -> SyscallResult {
    i64::try_from(n).map_err(|_| fail(VfsError::Overflow))
}

fn done(result: Result<(), VfsError>) -> SyscallResult {
    result.map(|()| 0).map_err(fail)
}

/// Access mode 3 is not a thing; every other bit is passed through.
fn open_flags(raw: u32) -> Result<OpenFlags, u32> {
    if raw & O_ACCMODE == O_ACCMODE {
        return Err(fail(VfsError::InvalidArgument));
    }
    Ok(OpenFlags::from_raw(raw))
}

pub fn sys_open(table: &FileDescriptorTable, path: &str, flags: u32, mode: u32) -> SyscallResult {
    let fd = table.open(path, open_flags(flags)?, mode).map_err(fail)?;
    count(fd)
}

pub fn sys_close(table: &FileDescriptorTable, fd: i32) -> SyscallResult {
    done(table.close(fd_index(fd)?))
}

pub fn sys_read(table: &FileDescriptorTable, fd: i32, buf: &mut [u8]) -> SyscallResult {
    count(table.read(fd_index(fd)?, buf).map_err(fail)?)
}

pub fn sys_write(table: &FileDescriptorTable, fd: i32, buf: &[u8]) -> SyscallResult {
    count(table.write(fd_index(fd)?, buf).map_err(fail)?)
}

pub fn sys_lseek(table: &FileDescriptorTable, fd: i32, offset: i64, whence: i32) -> SyscallResult {
    let fd = fd_index(fd)?;
    let whence = u32::try_from(whence)
        .ok()
        .and_then(SeekWhence::from_raw)
        .ok_or_else(|| fail(VfsError::InvalidArgument))?;
    let pos = table.lseek(fd, offset, whence).map_err(fail)?;
    i64::try_from(pos).map_err(|_| fail(VfsError::Overflow))
}

pub fn sys_fstat(table: &FileDescriptorTable, fd: i32, out: &mut Stat) -> SyscallResult {
    *out = table.fstat(fd_index(fd)?).map_err(fail)?;
    Ok(0)
}

pub fn sys_stat(table: &FileDescriptorTable, path: &str, out: &mut Stat) -> SyscallResult {
    *out = table.stat(path).map_err(fail)?;
    Ok(0)
}

pub fn sys_lstat(table: &FileDescriptorTable, path: &str, out: &mut Stat) -> SyscallResult {
    *out = table.lstat(path).map_err(fail)?;
    Ok(0)
}

/// 1 for a terminal, `ENOTTY` for anything else.
pub fn sys_isatty(table: &FileDescriptorTable, fd: i32) -> SyscallResult {
    if table.isatty(fd_index(fd)?).map_err(fail)? {
        Ok(1)
    } else {
        Err(VfsError::NotATerminal.errno())
    }
}

pub fn sys_fcntl(table: &FileDescriptorTable, fd: i32, cmd: u32, arg: u32) -> SyscallResult {
    table
        .fcntl(fd_index(fd)?, cmd, arg)
        .map(i64::from)
        .map_err(fail)
}

pub fn sys_ioctl(table: &FileDescriptorTable, fd: i32, cmd: u32, arg: IoctlArg<'_>) -> SyscallResult {
    table
        .ioctl(fd_index(fd)?, cmd, arg)
        .map(i64::from)
        .map_err(fail)
}

pub fn sys_getdents(table: &FileDescriptorTable, fd: i32, buf: &mut [u8]) -> SyscallResult {
    count(table.getdents(fd_index(fd)?, buf).map_err(fail)?)
}

/// Copies the working directory into `buf`, NUL-terminated.
///
/// Returns the length including the NUL; `ERANGE` if `buf` is too small.
pub fn sys_getcwd(table: &FileDescriptorTable, buf: &mut [u8]) -> SyscallResult {
    let cwd = table.getcwd().map_err(fail)?;
    let len = cwd.len() + 1;
    let dst = buf.get_mut(..len).ok_or_else(|| fail(VfsError::Range))?;
    dst[..cwd.len()].copy_from_slice(cwd.as_bytes());
    dst[cwd.len()] = 0;
    count(len)
}

pub fn sys_chdir(table: &FileDescriptorTable, path: &str) -> SyscallResult {
    done(table.chdir(path))
}

pub fn sys_mkdir(table: &FileDescriptorTable, path: &str, mode: u32) -> SyscallResult {
    done(table.mkdir(path, mode))
}

pub fn sys_rmdir(table: &FileDescriptorTable, path: &str) -> SyscallResult {
    done(table.rmdir(path))
}

pub fn sys_unlink(table: &FileDescriptorTable, path: &str) -> SyscallResult {
    done(table.unlink(path))
}

pub fn sys_rename(table: &FileDescriptorTable, old_path: &str, new_path: &str) -> SyscallResult {
    done(table.rename(old_path, new_path))
}

pub fn sys_dup(table: &FileDescriptorTable, fd: i32) -> SyscallResult {
    count(table.dup(fd_index(fd)?).map_err(fail)?)
}

pub fn sys_dup2(table: &FileDescriptorTable, fd: i32, new_fd: i32) -> SyscallResult {
    let fd = fd_index(fd)?;
    let new_fd = fd_index(new_fd)?;
    count(table.dup_to(fd, new_fd).map_err(fail)?)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VfsConfig;
    use crate::device::DeviceKind;
    use crate::flags::{ECHO, F_GETFD, IOCTL_SYNC, IOCTL_TCGETATTR, Termios};
    use crate::manager::FilesystemManager;
    use crate::setup::{basic_filesystem_setup, mount_block_volume};
    use crate::testing::{RamVolume, RecordingDevice};
    use alloc::sync::Arc;
    use linux_raw_sys::errno::{EBADF, EINVAL, ENOENT, ENOTTY, ERANGE};
    use linux_raw_sys::general::{O_CREAT, O_RDONLY, O_RDWR, SEEK_END, SEEK_SET};

    fn table() -> Arc<FileDescriptorTable> {
        let mgr = FilesystemManager::new(VfsConfig::new());
        basic_filesystem_setup(&mgr, None).unwrap();
        mount_block_volume(&mgr, "/sd", RamVolume::new()).unwrap();
        FileDescriptorTable::new(&mgr)
    }

    #[test]
    fn test_return_value_convention() {
        assert_eq!(to_return_value(Ok(7)), 7);
        assert_eq!(to_return_value(Err(ENOENT)), -i64::from(ENOENT));
    }

    #[test]
    fn test_file_round_trip() {
        let t = table();
        let fd = sys_open(&t, "/sd/log.txt", O_RDWR | O_CREAT, 0o644).unwrap();
        let fd = i32::try_from(fd).unwrap();
        assert_eq!(sys_write(&t, fd, b"hello"), Ok(5));
        assert_eq!(sys_lseek(&t, fd, 0, SEEK_END as i32), Ok(5));
        assert_eq!(sys_lseek(&t, fd, 1, SEEK_SET as i32), Ok(1));
        let mut buf = [0u8; 8];
        assert_eq!(sys_read(&t, fd, &mut buf), Ok(4));
        assert_eq!(&buf[..4], b"ello");

        let mut st = Stat::default();
        assert_eq!(sys_fstat(&t, fd, &mut st), Ok(0));
        assert_eq!(st.st_size, 5);
        assert_eq!(sys_ioctl(&t, fd, IOCTL_SYNC, IoctlArg::None), Ok(0));
        assert_eq!(sys_close(&t, fd), Ok(0));
        assert_eq!(sys_close(&t, fd), Err(EBADF));
    }

    #[test]
    fn test_raw_argument_validation() {
        let t = table();
        assert_eq!(sys_read(&t, -1, &mut [0u8; 1]), Err(EBADF));
        assert_eq!(sys_open(&t, "/dev/null", O_ACCMODE, 0), Err(EINVAL));
        let fd = sys_open(&t, "/dev/null", O_RDONLY, 0).unwrap();
        let fd = i32::try_from(fd).unwrap();
        assert_eq!(sys_lseek(&t, fd, 0, -1), Err(EINVAL));
        assert_eq!(sys_lseek(&t, fd, 0, 9), Err(EINVAL));
        assert_eq!(sys_dup2(&t, fd, -3), Err(EBADF));
    }

    #[test]
    fn test_paths_and_cwd() {
        let t = table();
        assert_eq!(sys_mkdir(&t, "/sd/logs", 0o755), Ok(0));
        assert_eq!(sys_chdir(&t, "/sd/logs"), Ok(0));
        let mut buf = [0xAAu8; 16];
        assert_eq!(sys_getcwd(&t, &mut buf), Ok(9));
        assert_eq!(&buf[..9], b"/sd/logs\0");
        assert_eq!(sys_getcwd(&t, &mut buf[..8]), Err(ERANGE));

        let fd = sys_open(&t, "a", O_RDWR | O_CREAT, 0o644).unwrap();
        assert_eq!(sys_close(&t, i32::try_from(fd).unwrap()), Ok(0));
        assert_eq!(sys_rename(&t, "a", "b"), Ok(0));
        let mut st = Stat::default();
        assert_eq!(sys_stat(&t, "b", &mut st), Ok(0));
        assert_eq!(sys_lstat(&t, "a", &mut st), Err(ENOENT));
        assert_eq!(sys_unlink(&t, "b"), Ok(0));
        assert_eq!(sys_chdir(&t, ".."), Ok(0));
        assert_eq!(sys_rmdir(&t, "logs"), Ok(0));
    }

    #[test]
    fn test_stdio_descriptors() {
        let mgr = FilesystemManager::new(VfsConfig::new());
        basic_filesystem_setup(&mgr, None).unwrap();
        let plain = FileDescriptorTable::new(&mgr);
        assert_eq!(sys_isatty(&plain, 0), Err(ENOTTY));

        mgr.console()
            .set(Arc::new(RecordingDevice::with_input(DeviceKind::Tty, &[])));
        let t = FileDescriptorTable::new(&mgr);
        assert_eq!(sys_isatty(&t, 0), Ok(1));
        let mut termios = Termios::default();
        assert_eq!(
            sys_ioctl(&t, 1, IOCTL_TCGETATTR, IoctlArg::Termios(&mut termios)),
            Ok(0)
        );
        assert_eq!(termios.c_lflag & ECHO, ECHO);
        assert_eq!(sys_dup(&t, 2), Ok(3));
        assert_eq!(sys_dup2(&t, 3, 5), Ok(5));
        assert_eq!(sys_fcntl(&t, 5, F_GETFD, 0), Ok(0));

        let fd = sys_open(&t, "/dev/zero", O_RDONLY, 0).unwrap();
        assert_eq!(sys_isatty(&t, i32::try_from(fd).unwrap()), Err(ENOTTY));
        let mut buf = [0u8; 512];
        let dir = sys_open(&t, "/dev", O_RDONLY, 0).unwrap();
        assert!(sys_getdents(&t, i32::try_from(dir).unwrap(), &mut buf).unwrap() > 0);
    }
}
