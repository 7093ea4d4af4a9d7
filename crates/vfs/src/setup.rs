//! TEAM_478: Boot-time namespace construction.
//!
//! `/` is a [`MountpointFs`], `/dev` the device filesystem, and block volumes
//! go wherever the board wants them (`/sd`, `/flash`, ...).

use alloc::sync::Arc;

use crate::blockfs::{BlockFs, BlockVolume};
use crate::devfs::DevFs;
use crate::device::DeviceRef;
use crate::error::{VfsError, VfsResult};
use crate::manager::FilesystemManager;
use crate::mode::MODE_0755;
use crate::mount::ROOT_MOUNT;
use crate::mountpointfs::MountpointFs;
use crate::vfs::FsRef;

/// Where [`basic_filesystem_setup`] mounts the device filesystem.
pub const DEV_MOUNT: &str = "/dev";
/// Name the boot disk gets under `/dev`.
pub const DISK_DEVICE: &str = "sda";

fn report<T>(fs: &str, path: &str, result: VfsResult<T>) -> VfsResult<T> {
    match &result {
        Ok(_) => log::info!("Mounting {} as {} ... Ok", fs, path),
        Err(e) => log::warn!("Mounting {} as {} ... Failed ({})", fs, path, e),
    }
    result
}

/// Creates `path` unless it is already there.
fn ensure_dir(manager: &FilesystemManager, path: &str) -> VfsResult<()> {
    match manager.mkdir(path, MODE_0755) {
        Ok(()) | Err(VfsError::AlreadyExists) => Ok(()),
        Err(e) => Err(e),
    }
}

/// TEAM_478: Mounts `/` and `/dev`, and registers `disk` as `/dev/sda`.
pub fn basic_filesystem_setup(
    manager: &Arc<FilesystemManager>,
    disk: Option<DeviceRef>,
) -> VfsResult<()> {
    let root: FsRef = MountpointFs::new();
    report("mountpointfs", ROOT_MOUNT, manager.mount(ROOT_MOUNT, root))?;

    ensure_dir(manager, DEV_MOUNT)?;
    let devfs = DevFs::new();
    let devfs_ref: FsRef = devfs.clone();
    report("devfs", DEV_MOUNT, manager.mount(DEV_MOUNT, devfs_ref))?;
    manager.set_devfs(devfs.clone());

    if let Some(disk) = disk {
        devfs.add_device(DISK_DEVICE, disk)?;
        log::info!("Registered {}/{}", DEV_MOUNT, DISK_DEVICE);
    }
    Ok(())
}

/// TEAM_478: Mounts a block volume at `path`, creating the directory first.
pub fn mount_block_volume<V: BlockVolume>(
    manager: &FilesystemManager,
    path: &str,
    volume: V,
) -> VfsResult<()> {
    ensure_dir(manager, path)?;
    let result = BlockFs::mount(volume).and_then(|fs| manager.mount(path, fs));
    report("blockfs", path, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VfsConfig;
    use crate::fd_table::FileDescriptorTable;
    use crate::flags::{OpenFlags, SeekWhence};
    use crate::testing::{RamVolume, RecordingDevice};
    use alloc::string::String;
    use alloc::vec::Vec;

    fn mounts(manager: &FilesystemManager) -> Vec<String> {
        manager.mount_points()
    }

    #[test]
    fn test_basic_setup() {
        let mgr = FilesystemManager::new(VfsConfig::new());
        basic_filesystem_setup(&mgr, None).unwrap();
        assert_eq!(mounts(&mgr), ["/", "/dev"]);
        assert!(mgr.devfs().is_some());
        assert!(mgr.stat("/dev/null", true).is_ok());
        assert_eq!(mgr.stat("/dev/sda", true), Err(VfsError::NotFound));

        // The root is taken now
        assert_eq!(basic_filesystem_setup(&mgr, None), Err(VfsError::Busy));
    }

    #[test]
    fn test_disk_registered() {
        let mgr = FilesystemManager::new(VfsConfig::new());
        let disk = Arc::new(RecordingDevice::block(b"bootsector"));
        basic_filesystem_setup(&mgr, Some(disk)).unwrap();
        let table = FileDescriptorTable::new(&mgr);
        let fd = table.open("/dev/sda", OpenFlags::O_RDONLY, 0).unwrap();
        assert_eq!(table.lseek(fd, 4, SeekWhence::Set), Ok(4));
        let mut buf = [0u8; 6];
        assert_eq!(table.read(fd, &mut buf), Ok(6));
        assert_eq!(&buf, b"sector");
    }

    #[test]
    fn test_mount_block_volume() {
        let mgr = FilesystemManager::new(VfsConfig::new());
        basic_filesystem_setup(&mgr, None).unwrap();
        mount_block_volume(&mgr, "/sd", RamVolume::new().with_file("boot.txt", b"hi")).unwrap();
        assert_eq!(mounts(&mgr), ["/", "/dev", "/sd"]);
        assert_eq!(mgr.stat("/sd/boot.txt", true).map(|s| s.st_size), Ok(2));

        // Pre-existing mount point directory is fine
        mgr.mkdir("/flash", 0o755).unwrap();
        mount_block_volume(&mgr, "/flash", RamVolume::new()).unwrap();
        assert_eq!(
            mount_block_volume(&mgr, "/flash", RamVolume::new()),
            Err(VfsError::Busy)
        );
    }

    #[test]
    fn test_unmountable_volume_not_exposed() {
        let mgr = FilesystemManager::new(VfsConfig::new());
        basic_filesystem_setup(&mgr, None).unwrap();
        assert!(mount_block_volume(&mgr, "/sd", RamVolume::new().failing()).is_err());
        assert_eq!(mounts(&mgr), ["/", "/dev"]);
        assert!(mgr.stat("/sd", true).unwrap().is_dir());
    }
}
