//! TEAM_478: Path resolution
//!
//! Walks an absolute path one component at a time against the mount table,
//! rewriting it in place into canonical form (no `.`, `..`, `//` or trailing
//! `/`) and returning the filesystem that owns it together with the offset
//! where that filesystem's own sub-path starts.
//!
//! Symlinks are looked up only on filesystems that support them. Their
//! targets are spliced into the working copy: absolute targets restart the
//! walk at the root, relative ones replace the link component.

use alloc::string::String;

use crate::config::VfsConfig;
use crate::error::{VfsError, VfsResult};
use crate::mount::{MountTable, ROOT_MOUNT};
use crate::path::{Path, SubPath};
use crate::vfs::FsRef;

/// TEAM_478: Outcome of a resolution.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    pub fs: FsRef,
    /// Start of the sub-path inside the canonical path.
    pub offset: usize,
}

impl ResolvedPath {
    /// The part of the canonical `path` the filesystem sees.
    pub fn sub_path<'a>(&self, path: &'a str) -> &'a str {
        SubPath::window(path, self.offset, path.len()).as_str()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Component {
    /// Between two adjacent slashes
    Empty,
    Current,
    Parent,
    Normal,
}

impl Component {
    fn classify(name: &str) -> Self {
        match name {
            "" => Self::Empty,
            "." => Self::Current,
            ".." => Self::Parent,
            _ => Self::Normal,
        }
    }
}

/// Where the walk currently is.
struct Cursor {
    fs: FsRef,
    symlinks: bool,
    /// Start of the component being looked at.
    index: usize,
    /// Start of the current filesystem's sub-path.
    index_into_fs: usize,
    /// Components entered below the current filesystem root, plus one.
    depth: u32,
}

impl Cursor {
    fn enter(&mut self, fs: FsRef, index_into_fs: usize, depth: u32) {
        self.symlinks = fs.supports_symlinks();
        self.fs = fs;
        self.index_into_fs = index_into_fs;
        self.depth = depth;
    }
}

/// TEAM_478: One resolution against a borrowed mount table.
pub struct Resolver<'a> {
    mounts: &'a MountTable,
    config: &'a VfsConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(mounts: &'a MountTable, config: &'a VfsConfig) -> Self {
        Self { mounts, config }
    }

    /// Canonicalizes the absolute `path` in place and finds its filesystem.
    ///
    /// With `follow_last` a symlink in the final component is followed too.
    /// A missing final component is not an error.
    pub fn resolve(&self, path: &mut String, follow_last: bool) -> VfsResult<ResolvedPath> {
        if !Path::new(path.as_str()).is_absolute() {
            return Err(VfsError::NotFound);
        }
        if path.len() > self.config.path_max {
            return Err(VfsError::NameTooLong);
        }
        let root = self.mounts.root().ok_or(VfsError::NotFound)?.clone();
        let mut cur = Cursor {
            symlinks: root.supports_symlinks(),
            fs: root,
            index: 1,
            index_into_fs: 1,
            depth: 1,
        };
        let mut links = 0;

        while cur.index < path.len() {
            let index = cur.index;
            let slash = path[index..].find('/').map_or(path.len(), |i| i + index);

            match Component::classify(&path[index..slash]) {
                Component::Empty => {
                    path.remove(index);
                }
                Component::Current => {
                    path.replace_range(index..(index + 2).min(path.len()), "");
                }
                Component::Parent => self.parent_dir(path, &mut cur, slash)?,
                Component::Normal => {
                    cur.index = slash + 1;
                    let is_last = cur.index > path.len();
                    let dir_end = slash;

                    if let Some(fs) = self.mounts.get(&path[..dir_end]) {
                        let into = if is_last { dir_end } else { cur.index };
                        log::trace!("[RESOLVE] {} crosses into {}", &path[..dir_end], fs.name());
                        cur.enter(fs.clone(), into, 1);
                        continue;
                    }
                    cur.depth += 1;

                    let follow = !is_last || follow_last;
                    if cur.symlinks && follow {
                        self.check_component(path, &mut cur, index, dir_end, &mut links)?;
                    }
                }
            }
        }

        if path.len() > 1 && path.ends_with('/') {
            path.pop();
        }
        let offset = cur.index_into_fs.min(path.len());
        Ok(ResolvedPath {
            fs: cur.fs,
            offset,
        })
    }

    /// Handles a `..` starting at `cur.index` and ending at `slash`.
    fn parent_dir(&self, path: &mut String, cur: &mut Cursor, slash: usize) -> VfsResult<()> {
        let index = cur.index;
        if index <= 1 {
            return Err(VfsError::NotFound);
        }
        let remove_start = SubPath::new(path).rfind_slash(index - 2).unwrap_or(0);
        path.replace_range(remove_start..slash, "");
        if path.is_empty() {
            path.push('/');
        }
        cur.index = remove_start + 1;
        cur.index_into_fs = cur.index_into_fs.min(path.len());
        cur.depth -= 1;
        if cur.depth == 0 {
            let (fs, into, depth) = self.owner_of(path, cur.index)?;
            cur.enter(fs, into, depth);
        }
        Ok(())
    }

    /// Re-derives the filesystem owning the directory before `index` after
    /// a `..` walked out of a filesystem root.
    fn owner_of(&self, path: &str, index: usize) -> VfsResult<(FsRef, usize, u32)> {
        let dir = SubPath::prefix(path, index - 1).as_str();
        let (key, fs) = self.mounts.lookup(dir).ok_or(VfsError::NotFound)?;
        let (into, inside) = if key == ROOT_MOUNT {
            (1, dir)
        } else {
            (key.len() + 1, SubPath::window(dir, key.len(), dir.len()).as_str())
        };
        let depth = Path::new(inside).components().count() as u32 + 1;
        Ok((fs.clone(), into, depth))
    }

    /// Looks at the component `path[start..dir_end]` on a symlink-capable
    /// filesystem: follows a link, rejects a non-directory in the middle.
    fn check_component(
        &self,
        path: &mut String,
        cur: &mut Cursor,
        start: usize,
        dir_end: usize,
        links: &mut u32,
    ) -> VfsResult<()> {
        let at_end = cur.index >= path.len();
        let is_last = cur.index > path.len();
        let name = SubPath::window(path, cur.index_into_fs, dir_end).as_str();
        let st = match cur.fs.lstat(name) {
            Ok(st) => st,
            Err(VfsError::NotFound) if at_end => return Ok(()),
            Err(e) => return Err(e),
        };

        if st.is_symlink() {
            *links += 1;
            if *links >= self.config.max_symlinks {
                log::debug!("[RESOLVE] too many symlinks at {}", path);
                return Err(VfsError::TooManySymlinks);
            }
            let target = cur.fs.readlink(name)?;
            if target.is_empty() {
                return Err(VfsError::NotFound);
            }
            let rest = if is_last { "" } else { &path[dir_end..] };

            if Path::new(target.as_str()).is_absolute() {
                let spliced = self.splice("", &target, rest)?;
                log::trace!("[RESOLVE] {} -> {}", path, spliced);
                *path = spliced;
                let root = self.mounts.root().ok_or(VfsError::NotFound)?.clone();
                cur.index = 1;
                cur.enter(root, 1, 1);
            } else {
                let keep = start;
                let spliced = self.splice(&path[..keep], &target, rest)?;
                log::trace!("[RESOLVE] {} -> {}", path, spliced);
                *path = spliced;
                cur.index = keep;
                cur.depth -= 1;
            }
            return Ok(());
        }

        if !is_last && !st.is_dir() {
            return Err(VfsError::NotADirectory);
        }
        Ok(())
    }

    fn splice(&self, head: &str, target: &str, rest: &str) -> VfsResult<String> {
        let len = head.len() + target.len() + rest.len();
        if len > self.config.path_max {
            return Err(VfsError::NameTooLong);
        }
        let mut out = String::with_capacity(len);
        out.push_str(head);
        out.push_str(target);
        out.push_str(rest);
        Ok(out)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockfs::BlockFs;
    use crate::mountpointfs::MountpointFs;
    use crate::testing::RamVolume;
    use crate::vfs::filesystem::same_fs;
    use alloc::string::ToString;

    fn scaffold() -> MountTable {
        let mut t = MountTable::new();
        t.insert(ROOT_MOUNT.to_string(), MountpointFs::new()).unwrap();
        t
    }

    fn with_root(volume: RamVolume) -> MountTable {
        let mut t = MountTable::new();
        let root: FsRef = BlockFs::mount(volume.with_symlinks()).unwrap();
        t.insert(ROOT_MOUNT.to_string(), root).unwrap();
        t
    }

    fn run(t: &MountTable, path: &str, follow: bool) -> VfsResult<(String, String, FsRef)> {
        let config = VfsConfig::new();
        let mut p = path.to_string();
        let r = Resolver::new(t, &config).resolve(&mut p, follow)?;
        let sub = r.sub_path(&p).to_string();
        Ok((p, sub, r.fs))
    }

    fn canonical(t: &MountTable, path: &str) -> VfsResult<String> {
        run(t, path, true).map(|(p, _, _)| p)
    }

    #[test]
    fn test_canonical_path_unchanged() {
        let t = scaffold();
        for p in ["/", "/a", "/a/b/c", "/dev/null"] {
            assert_eq!(canonical(&t, p).as_deref(), Ok(p));
        }
        let (_, sub, _) = run(&t, "/a/b", true).unwrap();
        assert_eq!(sub, "a/b");
    }

    #[test]
    fn test_redundant_separators_and_dots() {
        let t = scaffold();
        assert_eq!(canonical(&t, "//a/./b//").as_deref(), Ok("/a/b"));
        assert_eq!(canonical(&t, "/./").as_deref(), Ok("/"));
        assert_eq!(canonical(&t, "/a/.").as_deref(), Ok("/a"));
        assert_eq!(canonical(&t, "///").as_deref(), Ok("/"));
    }

    /// Tests: `..` after the root fails, elsewhere it drops one component
    #[test]
    fn test_dot_dot() {
        let t = scaffold();
        assert_eq!(canonical(&t, "/.."), Err(VfsError::NotFound));
        assert_eq!(canonical(&t, "/../a"), Err(VfsError::NotFound));
        assert_eq!(canonical(&t, "/a/../.."), Err(VfsError::NotFound));
        assert_eq!(canonical(&t, "/a/..").as_deref(), Ok("/"));
        assert_eq!(canonical(&t, "/a/b/../c").as_deref(), Ok("/a/c"));
        assert_eq!(canonical(&t, "/a/b/c/../../d").as_deref(), Ok("/a/d"));
    }

    #[test]
    fn test_relative_and_empty_rejected() {
        let t = scaffold();
        assert_eq!(canonical(&t, "a/b"), Err(VfsError::NotFound));
        assert_eq!(canonical(&t, ""), Err(VfsError::NotFound));
        assert_eq!(
            canonical(&MountTable::new(), "/a"),
            Err(VfsError::NotFound)
        );
    }

    #[test]
    fn test_path_max() {
        let t = scaffold();
        let config = VfsConfig::new().with_path_max(8);
        let mut p = "/abcdefghij".to_string();
        assert_eq!(
            Resolver::new(&t, &config).resolve(&mut p, true).err(),
            Some(VfsError::NameTooLong)
        );
    }

    /// Tests: mount then resolve below it lands in the mounted filesystem
    #[test]
    fn test_mount_round_trip() {
        let mut t = scaffold();
        let mnt: FsRef = MountpointFs::new();
        t.insert("/mnt/x".to_string(), mnt.clone()).unwrap();

        let (p, sub, fs) = run(&t, "/mnt/x/anything", true).unwrap();
        assert_eq!(p, "/mnt/x/anything");
        assert_eq!(sub, "anything");
        assert!(same_fs(&fs, &mnt));

        let (p, sub, fs) = run(&t, "/mnt/x/", true).unwrap();
        assert_eq!(p, "/mnt/x");
        assert_eq!(sub, "");
        assert!(same_fs(&fs, &mnt));

        let (_, sub, fs) = run(&t, "/mnt/xy", true).unwrap();
        assert_eq!(sub, "mnt/xy");
        assert!(!same_fs(&fs, &mnt));
    }

    #[test]
    fn test_dot_dot_leaves_mount() {
        let mut t = scaffold();
        let dev: FsRef = MountpointFs::new();
        let sd: FsRef = MountpointFs::new();
        t.insert("/dev".to_string(), dev.clone()).unwrap();
        t.insert("/sd".to_string(), sd.clone()).unwrap();

        let (p, sub, fs) = run(&t, "/dev/../sd/f", true).unwrap();
        assert_eq!(p, "/sd/f");
        assert_eq!(sub, "f");
        assert!(same_fs(&fs, &sd));

        let (p, sub, fs) = run(&t, "/dev/a/..", true).unwrap();
        assert_eq!(p, "/dev");
        assert_eq!(sub, "");
        assert!(same_fs(&fs, &dev));

        let (p, sub, fs) = run(&t, "/dev/..", true).unwrap();
        assert_eq!(p, "/");
        assert_eq!(sub, "");
        assert!(same_fs(&fs, t.root().unwrap()));
    }

    /// Tests: a link to a path under another mount switches filesystem
    #[test]
    fn test_symlink_into_mount() {
        let mut t = with_root(RamVolume::new().with_symlink("a", "/b/c").with_dir("b"));
        let f: FsRef = MountpointFs::new();
        t.insert("/b".to_string(), f.clone()).unwrap();

        let (p, sub, fs) = run(&t, "/a/d", true).unwrap();
        assert_eq!(p, "/b/c/d");
        assert_eq!(sub, "c/d");
        assert!(same_fs(&fs, &f));
    }

    #[test]
    fn test_relative_symlinks() {
        let t = with_root(
            RamVolume::new()
                .with_dir("d")
                .with_file("d/f", b"")
                .with_symlink("d/l", "f")
                .with_symlink("d/up", "../top")
                .with_file("top", b""),
        );
        assert_eq!(canonical(&t, "/d/l").as_deref(), Ok("/d/f"));
        assert_eq!(canonical(&t, "/d/up").as_deref(), Ok("/top"));
        let (p, sub, _) = run(&t, "/d/l", false).unwrap();
        assert_eq!(p, "/d/l");
        assert_eq!(sub, "d/l");
    }

    /// Tests: the cap counts every link met, so with the default of 2 only a
    /// single link resolves
    #[test]
    fn test_symlink_cap() {
        let t = with_root(
            RamVolume::new()
                .with_symlink("a", "/b")
                .with_symlink("b", "/a")
                .with_symlink("one", "/two")
                .with_symlink("two", "/target"),
        );
        assert_eq!(canonical(&t, "/a"), Err(VfsError::TooManySymlinks));
        assert_eq!(canonical(&t, "/a/x"), Err(VfsError::TooManySymlinks));
        assert_eq!(canonical(&t, "/one"), Err(VfsError::TooManySymlinks));
        assert_eq!(canonical(&t, "/two").as_deref(), Ok("/target"));

        let config = VfsConfig::new().with_max_symlinks(3);
        let mut p = "/one".to_string();
        assert!(Resolver::new(&t, &config).resolve(&mut p, true).is_ok());
        assert_eq!(p, "/target");
    }

    #[test]
    fn test_symlink_target_checks() {
        let t = with_root(RamVolume::new().with_symlink("e", "").with_symlink("long", "/0123456789"));
        assert_eq!(canonical(&t, "/e"), Err(VfsError::NotFound));

        let config = VfsConfig::new().with_path_max(10);
        let mut p = "/long/x".to_string();
        assert_eq!(
            Resolver::new(&t, &config).resolve(&mut p, true).err(),
            Some(VfsError::NameTooLong)
        );
    }

    #[test]
    fn test_missing_and_non_directory_components() {
        let t = with_root(RamVolume::new().with_file("f", b"x").with_dir("d"));
        assert_eq!(canonical(&t, "/f/x"), Err(VfsError::NotADirectory));
        assert_eq!(canonical(&t, "/f/"), Err(VfsError::NotADirectory));
        assert_eq!(canonical(&t, "/nope/x"), Err(VfsError::NotFound));
        assert_eq!(canonical(&t, "/nope").as_deref(), Ok("/nope"));
        assert_eq!(canonical(&t, "/d/new").as_deref(), Ok("/d/new"));
    }
}
