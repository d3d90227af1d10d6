//! # sandbox-vfs
//!
//! A confined virtual filesystem: a root-relative view of one directory
//! subtree on the real filesystem. Code that only holds [`VirtualPath`]s can
//! never read, list or mutate anything outside the mounted root, and a mount
//! can deny all mutation.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sandbox_vfs::{MountRegistry, SandboxFs, VfsOps};
//!
//! # fn main() -> Result<(), sandbox_vfs::VfsError> {
//! let registry = Arc::new(MountRegistry::new());
//! let mount = registry.mount("sandbox://workspace", "/srv/workspace", false)?;
//! let vfs = SandboxFs::new(Arc::clone(&registry));
//!
//! vfs.write_all(&mount.path("/notes.txt"), b"hello")?;
//! // Ascending above the virtual root is absorbed: this is <root>/etc/passwd.
//! let _ = vfs.exists(&mount.path("/../../etc/passwd"));
//! # Ok(())
//! # }
//! ```
//!
//! This crate only confines paths. It does not sandbox processes or network
//! access.

pub mod config;
pub mod vfs;

pub use config::{ConfigError, MountConfig, SandboxConfig};
pub use vfs::{
    AccessMode, CopyOptions, DirFilter, FileAttr, FileType, Mount, MountId, MountInfo,
    MountRegistry, OpenFlags, PathMatcher, SandboxFs, SetAttr, StatFs, VfsError, VfsOps,
    VfsResult, VirtualPath,
};
