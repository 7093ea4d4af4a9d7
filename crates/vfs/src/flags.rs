//! TEAM_478: Open flags, seek modes, fcntl/ioctl command codes.
//!
//! Bit values come from the Linux ABI headers (`linux-raw-sys`) so the
//! syscall layer can pass user flags through untouched.

use bitflags::bitflags;
use linux_raw_sys::general;

bitflags! {
    /// TEAM_478: Open file flags
    ///
    /// `O_RDONLY` is zero, so read-only access is the absence of both
    /// `O_WRONLY` and `O_RDWR`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const O_WRONLY = general::O_WRONLY;
        const O_RDWR = general::O_RDWR;
        const O_CREAT = general::O_CREAT;
        const O_EXCL = general::O_EXCL;
        const O_TRUNC = general::O_TRUNC;
        const O_APPEND = general::O_APPEND;
        const O_NONBLOCK = general::O_NONBLOCK;
        const O_DIRECTORY = general::O_DIRECTORY;
        const O_NOFOLLOW = general::O_NOFOLLOW;
        const O_CLOEXEC = general::O_CLOEXEC;
    }
}

impl OpenFlags {
    pub const O_RDONLY: Self = Self::empty();

    /// Keeps bits this crate does not name, like the kernel does.
    pub const fn from_raw(flags: u32) -> Self {
        Self::from_bits_retain(flags)
    }

    fn access_mode(self) -> u32 {
        self.bits() & general::O_ACCMODE
    }

    pub fn is_readable(self) -> bool {
        let mode = self.access_mode();
        mode == general::O_RDONLY || mode == general::O_RDWR
    }

    pub fn is_writable(self) -> bool {
        let mode = self.access_mode();
        mode == general::O_WRONLY || mode == general::O_RDWR
    }

    /// Any flag that could modify the target: write access, create, truncate
    /// or append.
    pub fn wants_modification(self) -> bool {
        self.is_writable()
            || self.intersects(Self::O_CREAT | Self::O_TRUNC | Self::O_APPEND)
    }
}

/// TEAM_478: lseek whence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekWhence {
    Set,
    Cur,
    End,
}

impl SeekWhence {
    pub fn from_raw(whence: u32) -> Option<Self> {
        match whence {
            general::SEEK_SET => Some(SeekWhence::Set),
            general::SEEK_CUR => Some(SeekWhence::Cur),
            general::SEEK_END => Some(SeekWhence::End),
            _ => None,
        }
    }
}

// ============================================================================
// fcntl
// ============================================================================

pub const F_GETFD: u32 = general::F_GETFD;
pub const F_SETFD: u32 = general::F_SETFD;
pub const FD_CLOEXEC: u32 = general::FD_CLOEXEC;

// ============================================================================
// ioctl
// ============================================================================

/// Flush buffered data to the medium (block files) or wait for the transmit
/// queue to drain (terminals).
pub const IOCTL_SYNC: u32 = 100;
pub const IOCTL_TCGETATTR: u32 = 101;
pub const IOCTL_TCSETATTR_NOW: u32 = 102;
pub const IOCTL_TCSETATTR_DRAIN: u32 = 103;
pub const IOCTL_TCSETATTR_FLUSH: u32 = 104;

/// Local-mode bits of [`Termios::c_lflag`] understood by the terminal.
pub const ECHO: u32 = general::ECHO;
pub const ICANON: u32 = general::ICANON;

/// TEAM_478: The subset of termios the terminal line discipline honours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Termios {
    pub c_iflag: u32,
    pub c_oflag: u32,
    pub c_cflag: u32,
    pub c_lflag: u32,
}

/// TEAM_478: Argument of an ioctl call.
///
/// Typed instead of a raw pointer; the syscall layer converts user memory
/// before dispatching.
#[derive(Debug)]
pub enum IoctlArg<'a> {
    None,
    Termios(&'a mut Termios),
    Value(usize),
}
