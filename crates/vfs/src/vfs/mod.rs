//! TEAM_478: Backend contracts
//!
//! - [`Filesystem`]: what the resolver hands a sub-path to
//! - [`File`]: what `open` returns and descriptor slots hold
//! - [`dirent`]: the `getdents` record format shared by every directory

pub mod dirent;
pub mod file;
pub mod filesystem;

pub use file::{File, FileBase, FileRef};
pub use filesystem::{Filesystem, FsBase, FsRef};
