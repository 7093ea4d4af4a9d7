//! TEAM_478: Test doubles shared by the unit tests.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::ops::Bound;

use crate::blockfs::{
    BlockVolume, EntryKind, VolumeAccess, VolumeDirEntry, VolumeError, VolumeResult, VolumeStat,
};
use crate::device::{Device, DeviceInfo, DeviceKind};
use crate::error::VfsResult;
use crate::flags::IoctlArg;
use crate::sync::Mutex;

/// A device that records what is written to it.
///
/// Stream and tty devices hand out their input one queued chunk per read;
/// block devices read and write a backing buffer at the given offset.
pub struct RecordingDevice {
    info: DeviceInfo,
    input: Mutex<VecDeque<Vec<u8>>>,
    storage: Mutex<Vec<u8>>,
    output: Mutex<Vec<u8>>,
    emergency: Mutex<String>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::with_input(DeviceKind::Stream, &[])
    }

    pub fn with_input(kind: DeviceKind, chunks: &[&[u8]]) -> Self {
        Self {
            info: DeviceInfo::new(kind),
            input: Mutex::new(chunks.iter().map(|c| c.to_vec()).collect()),
            storage: Mutex::new(Vec::new()),
            output: Mutex::new(Vec::new()),
            emergency: Mutex::new(String::new()),
        }
    }

    pub fn block(data: &[u8]) -> Self {
        let dev = Self::with_input(DeviceKind::Block, &[]);
        *dev.storage.lock() = data.to_vec();
        dev
    }

    pub fn output(&self) -> Vec<u8> {
        self.output.lock().clone()
    }

    pub fn emergency_output(&self) -> String {
        self.emergency.lock().clone()
    }

    pub fn storage(&self) -> Vec<u8> {
        self.storage.lock().clone()
    }
}

impl Device for RecordingDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn read_block(&self, buf: &mut [u8], offset: u64) -> VfsResult<usize> {
        if self.info.is_block() {
            let storage = self.storage.lock();
            let start = (offset as usize).min(storage.len());
            let n = buf.len().min(storage.len() - start);
            buf[..n].copy_from_slice(&storage[start..start + n]);
            return Ok(n);
        }
        let mut input = self.input.lock();
        let Some(chunk) = input.front_mut() else {
            return Ok(0);
        };
        let n = buf.len().min(chunk.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            input.pop_front();
        }
        Ok(n)
    }

    fn write_block(&self, buf: &[u8], offset: u64) -> VfsResult<usize> {
        if self.info.is_block() {
            let mut storage = self.storage.lock();
            let start = offset as usize;
            if storage.len() < start + buf.len() {
                storage.resize(start + buf.len(), 0);
            }
            storage[start..start + buf.len()].copy_from_slice(buf);
        } else {
            self.output.lock().extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn emergency_write(&self, s: &str) {
        self.emergency.lock().push_str(s);
    }

    fn ioctl(&self, _cmd: u32, _arg: &mut IoctlArg<'_>) -> VfsResult<i32> {
        Ok(0)
    }
}

enum Node {
    File(Vec<u8>),
    Dir,
    Symlink(String),
}

struct Entry {
    ino: u32,
    node: Node,
}

pub struct RamFile {
    path: String,
    pos: u64,
    access: VolumeAccess,
}

pub struct RamDir {
    path: String,
    last: Option<String>,
}

/// An in-memory [`BlockVolume`], keyed by full path. The root is `""`.
pub struct RamVolume {
    nodes: BTreeMap<String, Entry>,
    next_ino: u32,
    symlinks: bool,
    fail_mount: bool,
    fail_seek: bool,
    open_handles: usize,
}

fn parent_of(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

fn child_name<'a>(dir: &str, path: &'a str) -> &'a str {
    if dir.is_empty() {
        path
    } else {
        &path[dir.len() + 1..]
    }
}

impl RamVolume {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            String::new(),
            Entry {
                ino: 1,
                node: Node::Dir,
            },
        );
        Self {
            nodes,
            next_ino: 2,
            symlinks: false,
            fail_mount: false,
            fail_seek: false,
            open_handles: 0,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_mount = true;
        self
    }

    /// Every seek fails with a disk error.
    pub fn failing_seek(mut self) -> Self {
        self.fail_seek = true;
        self
    }

    pub fn with_symlinks(mut self) -> Self {
        self.symlinks = true;
        self
    }

    pub fn with_file(mut self, path: &str, data: &[u8]) -> Self {
        self.insert(path, Node::File(data.to_vec()));
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.insert(path, Node::Dir);
        self
    }

    pub fn with_symlink(mut self, path: &str, target: &str) -> Self {
        self.insert(path, Node::Symlink(target.to_string()));
        self
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    fn insert(&mut self, path: &str, node: Node) {
        let ino = self.next_ino;
        self.next_ino += 1;
        self.nodes.insert(path.to_string(), Entry { ino, node });
    }

    fn require_parent_dir(&self, path: &str) -> VolumeResult<()> {
        match self.nodes.get(parent_of(path)) {
            Some(Entry { node: Node::Dir, .. }) => Ok(()),
            _ => Err(VolumeError::NoPath),
        }
    }

    fn data(&self, path: &str) -> Option<&Vec<u8>> {
        match self.nodes.get(path) {
            Some(Entry {
                node: Node::File(data),
                ..
            }) => Some(data),
            _ => None,
        }
    }

    fn data_mut(&mut self, path: &str) -> VolumeResult<&mut Vec<u8>> {
        match self.nodes.get_mut(path) {
            Some(Entry {
                node: Node::File(data),
                ..
            }) => Ok(data),
            _ => Err(VolumeError::InvalidObject),
        }
    }

    fn has_children(&self, path: &str) -> bool {
        self.nodes
            .keys()
            .any(|k| !k.is_empty() && k != path && parent_of(k) == path)
    }
}

impl BlockVolume for RamVolume {
    type File = RamFile;
    type Dir = RamDir;

    fn mount(&mut self) -> VolumeResult<()> {
        if self.fail_mount {
            return Err(VolumeError::NoFilesystem);
        }
        Ok(())
    }

    fn open(&mut self, path: &str, access: VolumeAccess) -> VolumeResult<RamFile> {
        let create = VolumeAccess::CREATE_NEW | VolumeAccess::CREATE_ALWAYS | VolumeAccess::OPEN_ALWAYS;
        match self.nodes.get_mut(path) {
            Some(_) if access.contains(VolumeAccess::CREATE_NEW) => return Err(VolumeError::Exist),
            Some(Entry {
                node: Node::File(data),
                ..
            }) => {
                if access.contains(VolumeAccess::CREATE_ALWAYS) {
                    data.clear();
                }
            }
            Some(_) => return Err(VolumeError::InvalidObject),
            None if access.intersects(create) => {
                self.require_parent_dir(path)?;
                self.insert(path, Node::File(Vec::new()));
            }
            None => return Err(VolumeError::NoFile),
        }
        self.open_handles += 1;
        Ok(RamFile {
            path: path.to_string(),
            pos: 0,
            access,
        })
    }

    fn close(&mut self, _file: &mut RamFile) -> VolumeResult<()> {
        self.open_handles -= 1;
        Ok(())
    }

    fn read(&mut self, file: &mut RamFile, buf: &mut [u8]) -> VolumeResult<usize> {
        let data = self.data(&file.path).ok_or(VolumeError::InvalidObject)?;
        let start = (file.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        file.pos += n as u64;
        Ok(n)
    }

    fn write(&mut self, file: &mut RamFile, buf: &[u8]) -> VolumeResult<usize> {
        if !file.access.contains(VolumeAccess::WRITE) {
            return Err(VolumeError::Denied);
        }
        let data = self.data_mut(&file.path)?;
        let start = file.pos as usize;
        if data.len() < start + buf.len() {
            data.resize(start + buf.len(), 0);
        }
        data[start..start + buf.len()].copy_from_slice(buf);
        file.pos += buf.len() as u64;
        Ok(buf.len())
    }

    fn seek(&mut self, file: &mut RamFile, pos: u64) -> VolumeResult<()> {
        if self.fail_seek {
            return Err(VolumeError::DiskError);
        }
        file.pos = pos;
        Ok(())
    }

    fn tell(&self, file: &RamFile) -> u64 {
        file.pos
    }

    fn size(&self, file: &RamFile) -> u64 {
        self.data(&file.path).map_or(0, |d| d.len() as u64)
    }

    fn sync(&mut self, _file: &mut RamFile) -> VolumeResult<()> {
        Ok(())
    }

    fn stat(&mut self, path: &str) -> VolumeResult<VolumeStat> {
        let entry = self.nodes.get(path).ok_or(VolumeError::NoFile)?;
        let (kind, size) = match &entry.node {
            Node::File(data) => (EntryKind::File, data.len() as u64),
            Node::Dir => (EntryKind::Directory, 0),
            Node::Symlink(target) => (EntryKind::Symlink, target.len() as u64),
        };
        Ok(VolumeStat {
            ino: entry.ino,
            kind,
            size,
        })
    }

    fn open_dir(&mut self, path: &str) -> VolumeResult<RamDir> {
        match self.nodes.get(path) {
            Some(Entry { node: Node::Dir, .. }) => Ok(RamDir {
                path: path.to_string(),
                last: None,
            }),
            _ => Err(VolumeError::NoPath),
        }
    }

    fn read_dir(&mut self, dir: &mut RamDir) -> VolumeResult<Option<VolumeDirEntry>> {
        let start = match &dir.last {
            Some(last) => Bound::Excluded(last.as_str()),
            None => Bound::Excluded(dir.path.as_str()),
        };
        let next = self
            .nodes
            .range::<str, _>((start, Bound::Unbounded))
            .map(|(k, _)| k.as_str())
            .find(|k| !k.is_empty() && parent_of(k) == dir.path);
        let Some(key) = next.map(ToString::to_string) else {
            return Ok(None);
        };
        let stat = self.stat(&key)?;
        let name = child_name(&dir.path, &key).to_string();
        dir.last = Some(key);
        Ok(Some(VolumeDirEntry { name, stat }))
    }

    fn mkdir(&mut self, path: &str) -> VolumeResult<()> {
        if self.nodes.contains_key(path) {
            return Err(VolumeError::Exist);
        }
        self.require_parent_dir(path)?;
        self.insert(path, Node::Dir);
        Ok(())
    }

    fn unlink(&mut self, path: &str) -> VolumeResult<()> {
        if path.is_empty() {
            return Err(VolumeError::Denied);
        }
        if !self.nodes.contains_key(path) {
            return Err(VolumeError::NoFile);
        }
        if self.has_children(path) {
            return Err(VolumeError::NotEmpty);
        }
        self.nodes.remove(path);
        Ok(())
    }

    fn rename(&mut self, old_path: &str, new_path: &str) -> VolumeResult<()> {
        if !self.nodes.contains_key(old_path) {
            return Err(VolumeError::NoFile);
        }
        if self.nodes.contains_key(new_path) {
            return Err(VolumeError::Exist);
        }
        self.require_parent_dir(new_path)?;
        let prefix = alloc::format!("{}/", old_path);
        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|k| k.as_str() == old_path || k.starts_with(&prefix))
            .cloned()
            .collect();
        for key in moved {
            if let Some(entry) = self.nodes.remove(&key) {
                let renamed = alloc::format!("{}{}", new_path, &key[old_path.len()..]);
                self.nodes.insert(renamed, entry);
            }
        }
        Ok(())
    }

    fn readlink(&mut self, path: &str) -> VolumeResult<String> {
        match self.nodes.get(path) {
            Some(Entry {
                node: Node::Symlink(target),
                ..
            }) => Ok(target.clone()),
            Some(_) => Err(VolumeError::InvalidParameter),
            None => Err(VolumeError::NoFile),
        }
    }

    fn supports_symlinks(&self) -> bool {
        self.symlinks
    }
}
