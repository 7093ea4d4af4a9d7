//! TEAM_478: LevitateOS VFS core
//!
//! A single POSIX-like namespace over heterogeneous backends. The pieces, from
//! the leaves up:
//!
//! - [`path`]: borrowed path views and component iteration
//! - [`vfs`]: the [`File`](vfs::File) / [`Filesystem`](vfs::Filesystem) contracts
//! - [`device`]: peripherals, the console and the terminal line discipline
//! - [`devfs`], [`mountpointfs`], [`blockfs`]: the three backends
//! - [`resolve`]: turns an absolute path into (filesystem, sub-path)
//! - [`manager`]: the mount table and its busy/unmount rules
//! - [`fd_table`]: per-context descriptor table with a working directory
//! - [`syscall`]: errno-returning surface for the process layer
//! - [`setup`], [`logger`]: boot-time namespace and console logging
//!
//! The crate is `no_std` + `alloc`. Host builds and unit tests get `std`.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod blockfs;
pub mod config;
pub mod devfs;
pub mod device;
pub mod error;
pub mod fd_table;
pub mod flags;
pub mod logger;
pub mod manager;
pub mod mode;
pub mod mount;
pub mod mountpointfs;
pub mod path;
pub mod resolve;
pub mod setup;
pub mod sync;
pub mod syscall;
pub mod vfs;

#[cfg(test)]
pub(crate) mod testing;

pub use config::VfsConfig;
pub use error::{VfsError, VfsResult};
pub use fd_table::FileDescriptorTable;
pub use manager::FilesystemManager;
