//! TEAM_478: VFS Error Types
//!
//! One error type for every layer above the backend boundary. Backends
//! translate their own codes into it before returning.

use core::fmt;

use linux_raw_sys::errno::{
    EACCES, EBADF, EBUSY, EEXIST, EFAULT, EINVAL, EIO, EISDIR, ELOOP, ENAMETOOLONG, ENFILE,
    ENOENT, ENOMEM, ENOSPC, ENOTDIR, ENOTEMPTY, ENOTTY, EOPNOTSUPP, EOVERFLOW, ERANGE, EROFS,
    EXDEV,
};

/// TEAM_478: VFS Error codes
///
/// These map to standard POSIX errno values for userspace compatibility.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VfsError {
    /// No such file or directory (ENOENT)
    NotFound,
    /// Not a directory (ENOTDIR)
    NotADirectory,
    /// Is a directory (EISDIR)
    IsADirectory,
    /// File exists (EEXIST)
    AlreadyExists,
    /// Device or resource busy (EBUSY)
    Busy,
    /// Directory not empty (ENOTEMPTY)
    DirectoryNotEmpty,
    /// Too many levels of symbolic links (ELOOP)
    TooManySymlinks,
    /// File name too long (ENAMETOOLONG)
    NameTooLong,
    /// Invalid cross-device link (EXDEV)
    CrossDevice,
    /// Permission denied (EACCES)
    AccessDenied,
    /// Read-only file system (EROFS)
    ReadOnlyFs,
    /// Too many open files in the descriptor table (ENFILE)
    TooManyOpenFiles,
    /// Bad file descriptor (EBADF)
    BadFd,
    /// Operation not supported (EOPNOTSUPP)
    NotSupported,
    /// Inappropriate ioctl for device (ENOTTY)
    NotATerminal,
    /// Out of memory (ENOMEM)
    OutOfMemory,
    /// Invalid argument (EINVAL)
    InvalidArgument,
    /// Value too large for defined data type (EOVERFLOW)
    Overflow,
    /// No space left on device (ENOSPC)
    NoSpace,
    /// I/O error (EIO)
    IoError,
    /// Result too large for the caller's buffer (ERANGE)
    Range,
    /// Bad address (EFAULT)
    BadAddress,
}

impl VfsError {
    /// Positive errno value, as the syscall layer hands it back.
    pub fn errno(self) -> u32 {
        match self {
            VfsError::NotFound => ENOENT,
            VfsError::NotADirectory => ENOTDIR,
            VfsError::IsADirectory => EISDIR,
            VfsError::AlreadyExists => EEXIST,
            VfsError::Busy => EBUSY,
            VfsError::DirectoryNotEmpty => ENOTEMPTY,
            VfsError::TooManySymlinks => ELOOP,
            VfsError::NameTooLong => ENAMETOOLONG,
            VfsError::CrossDevice => EXDEV,
            VfsError::AccessDenied => EACCES,
            VfsError::ReadOnlyFs => EROFS,
            VfsError::TooManyOpenFiles => ENFILE,
            VfsError::BadFd => EBADF,
            VfsError::NotSupported => EOPNOTSUPP,
            VfsError::NotATerminal => ENOTTY,
            VfsError::OutOfMemory => ENOMEM,
            VfsError::InvalidArgument => EINVAL,
            VfsError::Overflow => EOVERFLOW,
            VfsError::NoSpace => ENOSPC,
            VfsError::IoError => EIO,
            VfsError::Range => ERANGE,
            VfsError::BadAddress => EFAULT,
        }
    }

    /// Convert to negative errno value for syscall return
    pub fn to_errno(self) -> i64 {
        -i64::from(self.errno())
    }

    /// Get the error name (e.g., "ENOENT")
    pub fn name(&self) -> &'static str {
        match self {
            VfsError::NotFound => "ENOENT",
            VfsError::NotADirectory => "ENOTDIR",
            VfsError::IsADirectory => "EISDIR",
            VfsError::AlreadyExists => "EEXIST",
            VfsError::Busy => "EBUSY",
            VfsError::DirectoryNotEmpty => "ENOTEMPTY",
            VfsError::TooManySymlinks => "ELOOP",
            VfsError::NameTooLong => "ENAMETOOLONG",
            VfsError::CrossDevice => "EXDEV",
            VfsError::AccessDenied => "EACCES",
            VfsError::ReadOnlyFs => "EROFS",
            VfsError::TooManyOpenFiles => "ENFILE",
            VfsError::BadFd => "EBADF",
            VfsError::NotSupported => "EOPNOTSUPP",
            VfsError::NotATerminal => "ENOTTY",
            VfsError::OutOfMemory => "ENOMEM",
            VfsError::InvalidArgument => "EINVAL",
            VfsError::Overflow => "EOVERFLOW",
            VfsError::NoSpace => "ENOSPC",
            VfsError::IoError => "EIO",
            VfsError::Range => "ERANGE",
            VfsError::BadAddress => "EFAULT",
        }
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            VfsError::NotFound => "No such file or directory",
            VfsError::NotADirectory => "Not a directory",
            VfsError::IsADirectory => "Is a directory",
            VfsError::AlreadyExists => "File exists",
            VfsError::Busy => "Device or resource busy",
            VfsError::DirectoryNotEmpty => "Directory not empty",
            VfsError::TooManySymlinks => "Too many levels of symbolic links",
            VfsError::NameTooLong => "File name too long",
            VfsError::CrossDevice => "Invalid cross-device link",
            VfsError::AccessDenied => "Permission denied",
            VfsError::ReadOnlyFs => "Read-only file system",
            VfsError::TooManyOpenFiles => "Too many open files in system",
            VfsError::BadFd => "Bad file descriptor",
            VfsError::NotSupported => "Operation not supported",
            VfsError::NotATerminal => "Inappropriate ioctl for device",
            VfsError::OutOfMemory => "Out of memory",
            VfsError::InvalidArgument => "Invalid argument",
            VfsError::Overflow => "Value too large for defined data type",
            VfsError::NoSpace => "No space left on device",
            VfsError::IoError => "I/O error",
            VfsError::Range => "Numerical result out of range",
            VfsError::BadAddress => "Bad address",
        };
        write!(f, "{} ({})", msg, self.name())
    }
}

/// TEAM_478: Result type for VFS operations
pub type VfsResult<T> = Result<T, VfsError>;

// ============================================================================
// Unit Tests
// ============================================================================
