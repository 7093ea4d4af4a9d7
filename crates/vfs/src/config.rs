//! TEAM_478: VFS tunables.
//!
//! Everything here is fixed at boot: the manager copies the config when it is
//! created and every descriptor table sizes itself from it.

use core::time::Duration;

/// TEAM_478: Default number of descriptor slots per table (0..3 are stdio).
pub const MAX_OPEN_FILES: usize = 8;

/// TEAM_478: Longest absolute path accepted, in bytes.
pub const PATH_MAX: usize = 512;

/// TEAM_478: Resolution fails with ELOOP on the link that brings the count
/// of symlinks met to this value.
pub const MAX_SYMLINKS: u32 = 2;

/// TEAM_478: Polls of the open-file counters during a forced unmount.
pub const UNMOUNT_RETRIES: u32 = 3;

/// TEAM_478: Sleep between two unmount polls.
pub const UNMOUNT_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsConfig {
    /// Slots in each descriptor table, including the three stdio slots.
    pub max_open_files: usize,
    pub path_max: usize,
    pub max_symlinks: u32,
    pub unmount_retries: u32,
    pub unmount_retry_delay: Duration,
}

impl VfsConfig {
    pub const fn new() -> Self {
        Self {
            max_open_files: MAX_OPEN_FILES,
            path_max: PATH_MAX,
            max_symlinks: MAX_SYMLINKS,
            unmount_retries: UNMOUNT_RETRIES,
            unmount_retry_delay: UNMOUNT_RETRY_DELAY,
        }
    }

    /// Never fewer than the three stdio slots plus one.
    pub const fn with_max_open_files(mut self, n: usize) -> Self {
        self.max_open_files = if n < 4 { 4 } else { n };
        self
    }

    pub const fn with_path_max(mut self, n: usize) -> Self {
        self.path_max = n;
        self
    }

    pub const fn with_max_symlinks(mut self, n: u32) -> Self {
        self.max_symlinks = n;
        self
    }

    pub const fn with_unmount_retries(mut self, retries: u32, delay: Duration) -> Self {
        self.unmount_retries = retries;
        self.unmount_retry_delay = delay;
        self
    }
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self::new()
    }
}
