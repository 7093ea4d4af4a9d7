//! TEAM_478: Filesystem manager
//!
//! Owns the mount table, the devfs handle and the registry of live descriptor
//! tables. One `spin` lock guards all three; helpers that need the table take
//! the already-locked state instead of locking again.
//!
//! Lock order: descriptor-table writer lock, then this lock, then descriptor
//! slots. Backend locks may be taken under this lock, never the reverse.

use alloc::string::{String, ToString};
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;

use crate::config::VfsConfig;
use crate::devfs::DevFs;
use crate::device::Console;
use crate::error::{VfsError, VfsResult};
use crate::fd_table::FileDescriptorTable;
use crate::mode::Stat;
use crate::mount::{MountTable, ROOT_MOUNT};
use crate::path::Path;
use crate::resolve::{ResolvedPath, Resolver};
use crate::sync::{Mutex, Sleep, SpinSleep};
use crate::vfs::filesystem::same_fs;
use crate::vfs::{FileRef, FsRef};

struct ManagerState {
    mounts: MountTable,
    tables: Vec<Weak<FileDescriptorTable>>,
    devfs: Option<Arc<DevFs>>,
}

impl ManagerState {
    /// Live descriptor tables; dead registrations are dropped on the way.
    fn live_tables(&mut self) -> Vec<Arc<FileDescriptorTable>> {
        self.tables.retain(|t| t.strong_count() > 0);
        self.tables.iter().filter_map(Weak::upgrade).collect()
    }
}

/// TEAM_478: The mount table and everything that must agree with it.
pub struct FilesystemManager {
    state: Mutex<ManagerState>,
    console: Console,
    config: VfsConfig,
    sleeper: Arc<dyn Sleep>,
}

impl FilesystemManager {
    pub fn new(config: VfsConfig) -> Arc<Self> {
        Self::with_sleeper(config, Arc::new(SpinSleep::default()))
    }

    /// `sleeper` paces the retries of a forced unmount.
    pub fn with_sleeper(config: VfsConfig, sleeper: Arc<dyn Sleep>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ManagerState {
                mounts: MountTable::new(),
                tables: Vec::new(),
                devfs: None,
            }),
            console: Console::default(),
            config,
            sleeper,
        })
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn set_devfs(&self, devfs: Arc<DevFs>) {
        self.state.lock().devfs = Some(devfs);
    }

    pub fn devfs(&self) -> Option<Arc<DevFs>> {
        self.state.lock().devfs.clone()
    }

    pub fn mount_points(&self) -> Vec<String> {
        self.state.lock().mounts.paths().map(ToString::to_string).collect()
    }

    pub(crate) fn register_table(&self, table: &Arc<FileDescriptorTable>) {
        let mut state = self.state.lock();
        state.tables.retain(|t| t.strong_count() > 0);
        state.tables.push(Arc::downgrade(table));
    }

    fn resolve_locked(
        &self,
        state: &ManagerState,
        path: &mut String,
        follow_last: bool,
    ) -> VfsResult<ResolvedPath> {
        if path.is_empty() || !Path::new(path.as_str()).is_absolute() {
            return Err(VfsError::NotFound);
        }
        Resolver::new(&state.mounts, &self.config).resolve(path, follow_last)
    }

    /// Canonicalizes the absolute `path` in place and finds its filesystem.
    pub fn resolve(&self, path: &mut String, follow_last: bool) -> VfsResult<ResolvedPath> {
        let state = self.state.lock();
        self.resolve_locked(&state, path, follow_last)
    }

    /// TEAM_478: Mount `fs` on the existing directory `path`.
    ///
    /// The first mount must be `/`. Nothing can be mounted on a filesystem
    /// that is being unmounted.
    pub fn mount(&self, path: &str, fs: FsRef) -> VfsResult<()> {
        if path.is_empty() {
            return Err(VfsError::InvalidArgument);
        }
        if path.len() > self.config.path_max {
            return Err(VfsError::NameTooLong);
        }
        let mut state = self.state.lock();

        if state.mounts.is_empty() {
            if path != ROOT_MOUNT {
                return Err(VfsError::InvalidArgument);
            }
            Self::revive(&state, &fs)?;
            log::info!("[VFS] mounted {} at /", fs.name());
            return state.mounts.insert(ROOT_MOUNT.to_string(), fs);
        }

        let mut canonical = path.to_string();
        let target = self.resolve_locked(&state, &mut canonical, false)?;
        if state.mounts.contains(&canonical) || target.fs.base().is_draining() {
            return Err(VfsError::Busy);
        }
        if !target.fs.lstat(target.sub_path(&canonical))?.is_dir() {
            return Err(VfsError::NotADirectory);
        }

        let mut parent = canonical.clone();
        parent.push_str("/..");
        let up = self.resolve_locked(&state, &mut parent, true)?;
        let parent_ino = up.fs.lstat(up.sub_path(&parent))?.st_ino;

        Self::revive(&state, &fs)?;
        fs.base().set_parent_mountpoint_inode(parent_ino);
        log::info!("[VFS] mounted {} at {}", fs.name(), canonical);
        state.mounts.insert(canonical, fs)
    }

    /// A filesystem left draining by an earlier unmount may be mounted again;
    /// one still draining inside the table may not.
    fn revive(state: &ManagerState, fs: &FsRef) -> VfsResult<()> {
        if !fs.base().is_draining() {
            return Ok(());
        }
        if state.mounts.contains_fs(fs) {
            return Err(VfsError::Busy);
        }
        fs.base().set_draining(false);
        Ok(())
    }

    /// TEAM_478: Unmount `path` and everything mounted below it.
    ///
    /// Without `force`, any open file on an affected filesystem makes this
    /// fail with `Busy`. With `force`, descriptors referring to those files
    /// are closed and in-flight operations get `unmount_retries` polls to
    /// finish.
    pub fn unmount(&self, path: &str, force: bool) -> VfsResult<()> {
        let mut state = self.state.lock();
        if !state.mounts.contains(path) {
            return Err(VfsError::InvalidArgument);
        }
        let targets = state.mounts.nested_under(path);
        for (_, fs) in &targets {
            fs.base().set_draining(true);
        }
        let abort = |err: VfsError| {
            for (_, fs) in &targets {
                fs.base().set_draining(false);
            }
            log::warn!("[VFS] unmount {} failed: {}", path, err);
            Err(err)
        };

        match Self::release_descriptors(&mut state, &targets, force) {
            Ok(0) => {}
            Ok(closed) => log::warn!("[VFS] forced unmount of {} closed {} descriptors", path, closed),
            Err(e) => return abort(e),
        }

        let mut attempt = 0;
        while !targets.iter().all(|(_, fs)| fs.base().all_files_closed()) {
            if !force || attempt + 1 >= self.config.unmount_retries {
                return abort(VfsError::Busy);
            }
            attempt += 1;
            log::debug!("[VFS] unmount {}: waiting for open files ({})", path, attempt);
            drop(state);
            self.sleeper.sleep(self.config.unmount_retry_delay);
            state = self.state.lock();
        }

        for (key, fs) in &targets {
            if state.mounts.remove_if_same(key, fs) {
                log::info!("[VFS] unmounted {} from {}", fs.name(), key);
            }
        }
        Ok(())
    }

    /// Finds descriptors that refer to files of `targets`. Without `force`
    /// any hit is `Busy`; with `force` they are closed. Returns how many were
    /// closed.
    fn release_descriptors(
        state: &mut ManagerState,
        targets: &[(String, FsRef)],
        force: bool,
    ) -> VfsResult<usize> {
        let owned_by_target = |file: &FileRef| {
            file.parent()
                .is_some_and(|fs| targets.iter().any(|(_, t)| same_fs(fs, t)))
        };
        let tables = state.live_tables();
        let mut closed = 0;
        for table in &tables {
            for slot in table.slots() {
                if !slot.load().is_some_and(|f| owned_by_target(&f)) {
                    continue;
                }
                if !force {
                    return Err(VfsError::Busy);
                }
                // Dropped here: closing may take backend locks, which nest
                // under ours
                drop(slot.take());
                closed += 1;
            }
        }
        Ok(closed)
    }

    /// TEAM_478: Shutdown: closes every descriptor and forgets every mount.
    pub fn unmount_all(&self) {
        let mut state = self.state.lock();
        let mut closed = Vec::new();
        for table in state.live_tables() {
            for slot in table.slots() {
                closed.extend(slot.take());
            }
        }
        let mounts = state.mounts.take_all();
        state.devfs = None;
        drop(state);
        drop(closed);
        for (path, fs) in &mounts {
            fs.base().set_draining(true);
            log::info!("[VFS] unmounted {} from {}", fs.name(), path);
        }
    }

    /// Stats `path`, following a final symlink if `follow`.
    pub fn stat(&self, path: &str, follow: bool) -> VfsResult<Stat> {
        let mut path = path.to_string();
        let target = self.resolve(&mut path, follow)?;
        target.fs.lstat(target.sub_path(&path))
    }

    /// Mount points (and the root) cannot be unlinked.
    pub fn unlink(&self, path: &str) -> VfsResult<()> {
        let mut path = path.to_string();
        let state = self.state.lock();
        let target = self.resolve_locked(&state, &mut path, false)?;
        if state.mounts.contains(&path) {
            return Err(VfsError::Busy);
        }
        target.fs.unlink(target.sub_path(&path))
    }

    pub fn mkdir(&self, path: &str, mode: u32) -> VfsResult<()> {
        let mut path = path.to_string();
        let state = self.state.lock();
        let target = self.resolve_locked(&state, &mut path, false)?;
        if state.mounts.contains(&path) {
            return Err(VfsError::AlreadyExists);
        }
        target.fs.mkdir(target.sub_path(&path), mode)
    }

    pub fn rmdir(&self, path: &str) -> VfsResult<()> {
        let mut path = path.to_string();
        let state = self.state.lock();
        let target = self.resolve_locked(&state, &mut path, false)?;
        if state.mounts.contains(&path) {
            return Err(VfsError::Busy);
        }
        target.fs.rmdir(target.sub_path(&path))
    }

    /// TEAM_478: Rename within one filesystem.
    ///
    /// Neither side may be a mount point, and a directory cannot be moved
    /// below itself.
    pub fn rename(&self, old_path: &str, new_path: &str) -> VfsResult<()> {
        let mut old_path = old_path.to_string();
        let mut new_path = new_path.to_string();
        let state = self.state.lock();
        let old = self.resolve_locked(&state, &mut old_path, false)?;
        let new = self.resolve_locked(&state, &mut new_path, false)?;
        if !same_fs(&old.fs, &new.fs) {
            return Err(VfsError::CrossDevice);
        }
        if state.mounts.contains(&old_path) || state.mounts.contains(&new_path) {
            return Err(VfsError::Busy);
        }
        let old_sub = old.sub_path(&old_path);
        let new_sub = new.sub_path(&new_path);
        if old_sub != new_sub && Path::new(new_sub).starts_with(Path::new(old_sub)) {
            return Err(VfsError::InvalidArgument);
        }
        old.fs.rename(old_sub, new_sub)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
