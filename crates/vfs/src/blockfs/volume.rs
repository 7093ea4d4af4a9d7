//! TEAM_478: The contract an on-disk filesystem library fulfils.
//!
//! Modelled on FatFs-style APIs: a mounted volume hands out file and
//! directory handles and reports failures with its own result codes. Those
//! codes never leave the `blockfs` module; [`From<VolumeError>`] translates
//! them at the boundary.

use alloc::string::String;

use bitflags::bitflags;

use crate::error::VfsError;

bitflags! {
    /// TEAM_478: Access/creation mode for [`BlockVolume::open`]
    ///
    /// Without a creation flag the file must already exist.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct VolumeAccess: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        /// Create, fail if it exists
        const CREATE_NEW = 0x04;
        /// Create, truncate if it exists
        const CREATE_ALWAYS = 0x08;
        /// Open, create if missing
        const OPEN_ALWAYS = 0x10;
    }
}

/// TEAM_478: Library result codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeError {
    DiskError,
    InternalError,
    NotReady,
    NoFile,
    NoPath,
    InvalidName,
    Denied,
    Exist,
    InvalidObject,
    WriteProtected,
    NoFilesystem,
    Timeout,
    Locked,
    NotEnoughCore,
    TooManyOpenFiles,
    InvalidParameter,
    NotEmpty,
}

// TEAM_478: Error Mappings
impl From<VolumeError> for VfsError {
    fn from(err: VolumeError) -> Self {
        match err {
            VolumeError::NoFile | VolumeError::NoPath => VfsError::NotFound,
            // The library reports a full volume as "denied"
            VolumeError::Denied => VfsError::NoSpace,
            VolumeError::Exist => VfsError::AlreadyExists,
            VolumeError::WriteProtected => VfsError::ReadOnlyFs,
            VolumeError::Locked => VfsError::Busy,
            VolumeError::NotEnoughCore => VfsError::OutOfMemory,
            VolumeError::TooManyOpenFiles => VfsError::TooManyOpenFiles,
            VolumeError::NotEmpty => VfsError::DirectoryNotEmpty,
            VolumeError::DiskError
            | VolumeError::InternalError
            | VolumeError::NotReady
            | VolumeError::InvalidName
            | VolumeError::InvalidObject
            | VolumeError::NoFilesystem
            | VolumeError::Timeout
            | VolumeError::InvalidParameter => VfsError::AccessDenied,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeStat {
    pub ino: u32,
    pub kind: EntryKind,
    pub size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeDirEntry {
    pub name: String,
    pub stat: VolumeStat,
}

pub type VolumeResult<T> = Result<T, VolumeError>;

/// TEAM_478: A mounted on-disk volume.
///
/// Paths are relative to the volume root with no leading `/`; the empty path
/// is the root directory. All calls are serialized by the adapter, so
/// implementations need no locking of their own.
pub trait BlockVolume: Send + 'static {
    type File: Send;
    type Dir: Send;

    /// Called once before the volume is exposed.
    fn mount(&mut self) -> VolumeResult<()> {
        Ok(())
    }

    /// Called when the adapter is dropped.
    fn unmount(&mut self) {}

    fn open(&mut self, path: &str, access: VolumeAccess) -> VolumeResult<Self::File>;
    fn close(&mut self, file: &mut Self::File) -> VolumeResult<()>;
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> VolumeResult<usize>;
    fn write(&mut self, file: &mut Self::File, buf: &[u8]) -> VolumeResult<usize>;
    fn seek(&mut self, file: &mut Self::File, pos: u64) -> VolumeResult<()>;
    fn tell(&self, file: &Self::File) -> u64;
    fn size(&self, file: &Self::File) -> u64;
    fn sync(&mut self, file: &mut Self::File) -> VolumeResult<()>;

    fn stat(&mut self, path: &str) -> VolumeResult<VolumeStat>;

    fn open_dir(&mut self, path: &str) -> VolumeResult<Self::Dir>;
    /// `None` once every entry has been returned.
    fn read_dir(&mut self, dir: &mut Self::Dir) -> VolumeResult<Option<VolumeDirEntry>>;
    fn close_dir(&mut self, _dir: &mut Self::Dir) -> VolumeResult<()> {
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> VolumeResult<()>;
    /// Removes a file or an empty directory.
    fn unlink(&mut self, path: &str) -> VolumeResult<()>;
    fn rename(&mut self, old_path: &str, new_path: &str) -> VolumeResult<()>;

    fn readlink(&mut self, _path: &str) -> VolumeResult<String> {
        Err(VolumeError::InvalidParameter)
    }

    fn supports_symlinks(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_translation() {
        assert_eq!(VfsError::from(VolumeError::NoFile), VfsError::NotFound);
        assert_eq!(VfsError::from(VolumeError::NoPath), VfsError::NotFound);
        assert_eq!(VfsError::from(VolumeError::Denied), VfsError::NoSpace);
        assert_eq!(VfsError::from(VolumeError::Exist), VfsError::AlreadyExists);
        assert_eq!(
            VfsError::from(VolumeError::WriteProtected),
            VfsError::ReadOnlyFs
        );
        assert_eq!(VfsError::from(VolumeError::Locked), VfsError::Busy);
        assert_eq!(
            VfsError::from(VolumeError::NotEnoughCore),
            VfsError::OutOfMemory
        );
        assert_eq!(
            VfsError::from(VolumeError::TooManyOpenFiles),
            VfsError::TooManyOpenFiles
        );
        assert_eq!(VfsError::from(VolumeError::DiskError), VfsError::AccessDenied);
        assert_eq!(VfsError::from(VolumeError::Timeout), VfsError::AccessDenied);
    }
}
