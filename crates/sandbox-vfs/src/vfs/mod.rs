//! Confined virtual filesystem.
//!
//! Key components:
//!
//! - [`VirtualPath`] - Immutable, mount-scoped path with pure path algebra
//! - [`Mount`] - One root-directory jail; translates virtual to real paths
//! - [`MountRegistry`] - Mounts keyed by opaque identifiers
//! - [`VfsOps`] - The operation surface
//! - [`SandboxFs`] - `VfsOps` over the real filesystem, with policy checks
//! - [`PathMatcher`] - `glob:` / `regex:` patterns over virtual paths
//!
//! ## Design Decisions
//!
//! - **Namespace is total**: every virtual path maps to some real path at or
//!   below the root. `..` above `/` is absorbed and anything that still lands
//!   outside is clamped to the root.
//! - **Two-tier containment**: plain translation is textual; operations that
//!   need the symlink-resolved location go through
//!   [`Mount::to_real_canonical`], which fails with `PathEscape` instead.
//! - **Read-only is checked first**: write-classified operations on a
//!   read-only mount fail before any real I/O.

mod error;
mod matcher;
mod mount;
mod ops;
mod path;
mod provider;
mod registry;
mod types;

pub use error::{VfsError, VfsResult};
pub use matcher::PathMatcher;
pub use mount::{Mount, MountId};
pub use ops::{DirFilter, VfsOps};
pub use path::{VirtualPath, normalize};
pub use provider::SandboxFs;
pub use registry::MountRegistry;
pub use types::{
    AccessMode, CopyOptions, FileAttr, FileType, MountInfo, OpenFlags, SetAttr, StatFs,
};
