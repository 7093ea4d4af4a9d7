//! TEAM_478: Device abstraction
//!
//! Peripherals are exposed through `/dev` as [`Device`] objects. A device is
//! addressed by explicit offset, so one device can back many open files that
//! each keep their own cursor (see `devfs`). The default methods make a
//! device that reads zeros and swallows writes.

pub mod console;
pub mod terminal;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{VfsError, VfsResult};
use crate::flags::IoctlArg;
use crate::mode::{MODE_0750, S_IFBLK, S_IFCHR, Stat};

pub use console::Console;
pub use terminal::TerminalDevice;

/// TEAM_478: Reference-counted device handle
pub type DeviceRef = Arc<dyn Device>;

/// TEAM_478: What kind of peripheral a device is. Fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// Character device, no meaningful offset
    Stream,
    /// Seekable block device
    Block,
    /// Serial line / terminal
    Tty,
}

/// TEAM_478: Identity and kind of a device.
///
/// The inode/device pair is assigned when the device is registered with a
/// device filesystem.
#[derive(Debug)]
pub struct DeviceInfo {
    kind: DeviceKind,
    dev: AtomicU32,
    ino: AtomicU32,
}

impl DeviceInfo {
    pub const fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            dev: AtomicU32::new(0),
            ino: AtomicU32::new(0),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Only block devices honour the offset they are given.
    pub fn is_seekable(&self) -> bool {
        self.kind == DeviceKind::Block
    }

    pub fn is_block(&self) -> bool {
        self.kind == DeviceKind::Block
    }

    pub fn is_tty(&self) -> bool {
        self.kind == DeviceKind::Tty
    }

    pub fn dev(&self) -> u32 {
        self.dev.load(Ordering::Relaxed)
    }

    pub fn ino(&self) -> u32 {
        self.ino.load(Ordering::Relaxed)
    }

    pub(crate) fn set_ids(&self, dev: u32, ino: u32) {
        self.dev.store(dev, Ordering::Relaxed);
        self.ino.store(ino, Ordering::Relaxed);
    }
}

/// TEAM_478: Device contract
pub trait Device: Send + Sync {
    fn info(&self) -> &DeviceInfo;

    /// Reads at `offset`. Default: fills the buffer with zeros.
    fn read_block(&self, buf: &mut [u8], _offset: u64) -> VfsResult<usize> {
        buf.fill(0);
        Ok(buf.len())
    }

    /// Writes at `offset`. Default: discards the data.
    fn write_block(&self, buf: &[u8], _offset: u64) -> VfsResult<usize> {
        Ok(buf.len())
    }

    /// Synchronous, best-effort write usable from interrupt context and
    /// before the scheduler runs. Default: nothing.
    fn emergency_write(&self, _s: &str) {}

    fn ioctl(&self, _cmd: u32, _arg: &mut IoctlArg<'_>) -> VfsResult<i32> {
        Err(VfsError::NotATerminal)
    }

    fn stat(&self) -> Stat {
        let info = self.info();
        let kind = if info.is_block() { S_IFBLK } else { S_IFCHR };
        Stat::new(info.dev(), info.ino(), kind | MODE_0750)
    }
}

/// TEAM_478: A device with all the default behaviour: `/dev/zero`.
#[derive(Debug)]
pub struct StreamDevice {
    info: DeviceInfo,
}

impl StreamDevice {
    pub const fn new(kind: DeviceKind) -> Self {
        Self {
            info: DeviceInfo::new(kind),
        }
    }
}

impl Device for StreamDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

/// TEAM_478: `/dev/null`: end of file on read, writes discarded.
#[derive(Debug)]
pub struct NullDevice {
    info: DeviceInfo,
}

impl NullDevice {
    pub const fn new() -> Self {
        Self {
            info: DeviceInfo::new(DeviceKind::Stream),
        }
    }
}

impl Default for NullDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for NullDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn read_block(&self, _buf: &mut [u8], _offset: u64) -> VfsResult<usize> {
        Ok(0)
    }
}
