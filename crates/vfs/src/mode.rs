//! TEAM_478: POSIX file mode bits and the `stat` record.

// ============================================================================
// File Type Constants (high bits of st_mode)
// ============================================================================

/// Bit mask for extracting file type
pub const S_IFMT: u32 = 0o170000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFCHR: u32 = 0o020000;

// ============================================================================
// Fixed permission patterns reported by the backends
// ============================================================================

/// rwxr-xr-x, used for directories and regular files
pub const MODE_0755: u32 = 0o755;
/// rwxr-x---, used for device nodes
pub const MODE_0750: u32 = 0o750;

/// Block size reported in `st_blksize` by the storage-less backends
pub const DEFAULT_BLKSIZE: u32 = 512;

// ============================================================================
// Helper Functions
// ============================================================================

pub fn is_dir(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFDIR
}

pub fn is_reg(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFREG
}

pub fn is_lnk(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFLNK
}

pub fn is_blk(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFBLK
}

pub fn is_chr(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFCHR
}

/// `d_type` of a directory entry: the type nibble of the mode.
pub fn dirent_type(mode: u32) -> u8 {
    ((mode & S_IFMT) >> 12) as u8
}

/// TEAM_478: What `stat`/`lstat`/`fstat` report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    /// Filesystem id of the owning backend
    pub st_dev: u32,
    pub st_ino: u32,
    pub st_mode: u32,
    pub st_nlink: u32,
    pub st_size: u64,
    pub st_blksize: u32,
    pub st_blocks: u64,
}

impl Stat {
    /// A record with one link and everything else zeroed.
    pub fn new(dev: u32, ino: u32, mode: u32) -> Self {
        Self {
            st_dev: dev,
            st_ino: ino,
            st_mode: mode,
            st_nlink: 1,
            ..Self::default()
        }
    }

    pub fn is_dir(&self) -> bool {
        is_dir(self.st_mode)
    }

    pub fn is_symlink(&self) -> bool {
        is_lnk(self.st_mode)
    }
}
