//! TEAM_478: Device filesystem (`/dev`)
//!
//! A flat name→device map. `null` and `zero` are always present. Opening a
//! name wraps the device in a [`DevFsFile`] with its own seek point, so
//! several opens of one block device keep independent cursors.

mod file;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

pub use file::{DevFsDirectory, DevFsFile};

use crate::device::{DeviceKind, DeviceRef, NullDevice, StreamDevice};
use crate::error::{VfsError, VfsResult};
use crate::flags::OpenFlags;
use crate::mode::{MODE_0755, S_IFDIR, Stat};
use crate::path::Path;
use crate::sync::Mutex;
use crate::vfs::{FileBase, FileRef, Filesystem, FsBase, FsRef};

/// Inode of the `/dev` directory itself.
pub const DEVFS_ROOT_INODE: u32 = 1;

pub struct DevFs {
    base: FsBase,
    files: Mutex<BTreeMap<String, DeviceRef>>,
    next_inode: AtomicU32,
}

impl DevFs {
    /// A device filesystem holding `null` and `zero`.
    pub fn new() -> Arc<Self> {
        let fs = Arc::new(Self {
            base: FsBase::new(),
            files: Mutex::new(BTreeMap::new()),
            next_inode: AtomicU32::new(DEVFS_ROOT_INODE + 1),
        });
        // Both names are valid and the map is empty, neither can fail
        let _ = fs.add_device("null", Arc::new(NullDevice::new()));
        let _ = fs.add_device("zero", Arc::new(StreamDevice::new(DeviceKind::Stream)));
        fs
    }

    /// Registers `device` as `name` and gives it its inode/device ids.
    pub fn add_device(&self, name: &str, device: DeviceRef) -> VfsResult<()> {
        if !Path::new(name).is_plain_name() {
            return Err(VfsError::InvalidArgument);
        }
        let mut files = self.files.lock();
        if files.contains_key(name) {
            return Err(VfsError::AlreadyExists);
        }
        let ino = self.next_inode.fetch_add(1, Ordering::Relaxed);
        device.info().set_ids(self.base.id(), ino);
        files.insert(name.to_string(), device);
        log::debug!("[DEVFS] registered /dev/{} (ino {})", name, ino);
        Ok(())
    }

    pub fn remove_device(&self, name: &str) -> VfsResult<()> {
        self.files
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or(VfsError::NotFound)
    }

    pub fn device(&self, name: &str) -> Option<DeviceRef> {
        self.files.lock().get(name).cloned()
    }

    fn root_stat(&self) -> Stat {
        Stat::new(self.base.id(), DEVFS_ROOT_INODE, S_IFDIR | MODE_0755)
    }
}

impl Filesystem for DevFs {
    fn base(&self) -> &FsBase {
        &self.base
    }

    fn name(&self) -> &'static str {
        "devfs"
    }

    fn open(self: Arc<Self>, name: &str, flags: OpenFlags, _mode: u32) -> VfsResult<FileRef> {
        if flags.intersects(OpenFlags::O_APPEND | OpenFlags::O_EXCL) {
            return Err(VfsError::AccessDenied);
        }
        if name.is_empty() {
            if flags.wants_modification() {
                return Err(VfsError::AccessDenied);
            }
            let parent: FsRef = self.clone();
            return Ok(Arc::new(DevFsDirectory::new(FileBase::new(parent)?, self)));
        }
        let device = self.device(name).ok_or(VfsError::NotFound)?;
        let parent: FsRef = self;
        Ok(Arc::new(DevFsFile::new(FileBase::new(parent)?, device, flags)))
    }

    fn lstat(&self, name: &str) -> VfsResult<Stat> {
        if name.is_empty() {
            return Ok(self.root_stat());
        }
        self.device(name)
            .map(|d| d.stat())
            .ok_or(VfsError::NotFound)
    }

    fn unlink(&self, name: &str) -> VfsResult<()> {
        self.remove_device(name)
    }

    fn rename(&self, old_name: &str, new_name: &str) -> VfsResult<()> {
        let mut files = self.files.lock();
        if !files.contains_key(old_name) {
            return Err(VfsError::NotFound);
        }
        if !Path::new(new_name).is_plain_name() {
            return Err(VfsError::AccessDenied);
        }
        if old_name == new_name {
            return Ok(());
        }
        if let Some(device) = files.remove(old_name) {
            files.insert(new_name.to_string(), device);
        }
        Ok(())
    }

    fn mkdir(&self, _name: &str, _mode: u32) -> VfsResult<()> {
        Err(VfsError::NotSupported)
    }

    fn rmdir(&self, _name: &str) -> VfsResult<()> {
        Err(VfsError::NotSupported)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
