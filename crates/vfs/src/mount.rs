//! TEAM_478: Mount table
//!
//! Maps canonical mount paths to filesystems. Paths are compared component
//! by component, so `/ab` is neither under nor above `/a`. The root is always
//! keyed `/`.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{VfsError, VfsResult};
use crate::path::Path;
use crate::vfs::filesystem::same_fs;
use crate::vfs::FsRef;

/// TEAM_478: Key of the root mount.
pub const ROOT_MOUNT: &str = "/";

/// TEAM_478: The mount table
#[derive(Default)]
pub struct MountTable {
    mounts: BTreeMap<String, FsRef>,
}

impl MountTable {
    pub const fn new() -> Self {
        Self {
            mounts: BTreeMap::new(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FsRef> {
        self.mounts.get(path)
    }

    pub fn root(&self) -> Option<&FsRef> {
        self.get(ROOT_MOUNT)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.mounts.contains_key(path)
    }

    /// Whether `fs` is mounted anywhere.
    pub fn contains_fs(&self, fs: &FsRef) -> bool {
        self.mounts.values().any(|m| same_fs(m, fs))
    }

    /// Adds a mount. A path is mounted at most once.
    pub fn insert(&mut self, path: String, fs: FsRef) -> VfsResult<()> {
        if self.mounts.contains_key(&path) {
            return Err(VfsError::Busy);
        }
        self.mounts.insert(path, fs);
        Ok(())
    }

    /// Every mount at or below `path`, in path order.
    pub fn nested_under(&self, path: &str) -> Vec<(String, FsRef)> {
        let base = Path::new(path);
        self.mounts
            .iter()
            .filter(|(key, _)| Path::new(key.as_str()).starts_with(base))
            .map(|(key, fs)| (key.clone(), fs.clone()))
            .collect()
    }

    /// Removes `path` only if it still refers to `fs`.
    pub fn remove_if_same(&mut self, path: &str, fs: &FsRef) -> bool {
        match self.mounts.get(path) {
            Some(current) if same_fs(current, fs) => {
                self.mounts.remove(path);
                true
            }
            _ => false,
        }
    }

    /// TEAM_478: Longest mount that is a component-wise prefix of `path`.
    ///
    /// Returns the mount key and its filesystem.
    pub fn lookup(&self, path: &str) -> Option<(&str, &FsRef)> {
        let path = Path::new(path);
        self.mounts
            .iter()
            .filter(|(key, _)| path.starts_with(Path::new(key.as_str())))
            .max_by_key(|(key, _)| Path::new(key.as_str()).components().count())
            .map(|(key, fs)| (key.as_str(), fs))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.mounts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Empties the table, handing back what was mounted.
    pub fn take_all(&mut self) -> BTreeMap<String, FsRef> {
        core::mem::take(&mut self.mounts)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
