//! A single confinement boundary.
//!
//! A [`Mount`] binds a virtual namespace to one canonical real directory and
//! answers two questions: what real path does a [`VirtualPath`] denote, and may
//! it be written.
//!
//! Translation has two tiers:
//!
//! 1. [`Mount::translate`] is purely textual. It joins normalized segments onto
//!    the root, normalizes lexically and clamps anything that ends up outside
//!    the root back to the root. It never fails for a path of this mount.
//! 2. [`Mount::to_real_canonical`] additionally resolves symlinks through the
//!    real filesystem and fails with [`VfsError::PathEscape`] if the resolved
//!    location is outside the root.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::error::{VfsError, VfsResult};
use super::path::VirtualPath;

/// Opaque identity of a mount (UUIDv4).
///
/// Path equality is defined in terms of this, never the real root.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct MountId(uuid::Uuid);

impl MountId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// First 8 hex characters, for logs.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }
}

impl fmt::Debug for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MountId({})", self.short())
    }
}

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One root-directory jail.
///
/// Immutable after construction; share it through `Arc`.
#[derive(Debug)]
pub struct Mount {
    id: MountId,
    real_root: PathBuf,
    read_only: bool,
}

impl Mount {
    /// Create a mount over `root`.
    ///
    /// The root must exist and be a directory. It is canonicalized (symlinks,
    /// `.` and `..` resolved) once, here; e.g. macOS `/tmp` becomes
    /// `/private/tmp`.
    pub fn new(root: impl AsRef<Path>, read_only: bool) -> VfsResult<Arc<Self>> {
        let root = root.as_ref();
        let meta = std::fs::metadata(root)
            .map_err(|e| VfsError::invalid_root(format!("{}: {}", root.display(), e)))?;
        if !meta.is_dir() {
            return Err(VfsError::invalid_root(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        let real_root = dunce::canonicalize(root)
            .map_err(|e| VfsError::invalid_root(format!("{}: {}", root.display(), e)))?;

        Ok(Arc::new(Self {
            id: MountId::new(),
            real_root,
            read_only,
        }))
    }

    /// This mount's identity.
    pub fn id(&self) -> MountId {
        self.id
    }

    /// Canonical real root. For the host application only.
    pub fn real_root(&self) -> &Path {
        &self.real_root
    }

    /// Whether all mutation is denied.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The virtual root `/`.
    pub fn root_path(self: &Arc<Self>) -> VirtualPath {
        VirtualPath::root(Arc::clone(self))
    }

    /// Parse a virtual path under this mount.
    pub fn path(self: &Arc<Self>, path: impl AsRef<OsStr>) -> VirtualPath {
        VirtualPath::new(Arc::clone(self), path)
    }

    /// Build a virtual path from raw components under this mount.
    pub fn path_from_segments<I, S>(self: &Arc<Self>, absolute: bool, components: I) -> VirtualPath
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        VirtualPath::from_segments(Arc::clone(self), absolute, components)
    }

    fn ensure_owned(&self, path: &VirtualPath) -> VfsResult<()> {
        if path.belongs_to(self) {
            Ok(())
        } else {
            Err(VfsError::provider_mismatch(format!(
                "{} belongs to mount {}, not {}",
                path,
                path.mount().id().short(),
                self.id.short()
            )))
        }
    }

    /// Textual translation to a real path at or below the root.
    ///
    /// Does not follow symlinks. Relative paths are taken relative to `/`.
    pub fn translate(&self, path: &VirtualPath) -> VfsResult<PathBuf> {
        self.ensure_owned(path)?;

        let joined = lexical_normalize(&self.real_root.join(path.relative_real()));
        if joined.starts_with(&self.real_root) {
            return Ok(joined);
        }

        // Only reachable for relative paths with leading `..`.
        tracing::warn!(
            mount = %self.id.short(),
            path = %path,
            "translated path left the mount root, clamping to root"
        );
        Ok(self.real_root.clone())
    }

    /// Translate, then resolve symlinks and re-check containment.
    ///
    /// The target must exist. Fails with `PathEscape` when the resolved
    /// location is outside the root.
    pub fn to_real_canonical(&self, path: &VirtualPath) -> VfsResult<PathBuf> {
        let translated = self.translate(path)?;
        let canonical = dunce::canonicalize(&translated)?;
        if !canonical.starts_with(&self.real_root) {
            tracing::warn!(
                mount = %self.id.short(),
                path = %path,
                resolved = %canonical.display(),
                "symlink resolution escaped the mount root"
            );
            return Err(VfsError::path_escape(path.to_string()));
        }
        Ok(canonical)
    }

    /// Re-wrap a real path under the root as an absolute virtual path.
    ///
    /// Returns `None` if `real` is not at or below the root.
    pub fn relative_to_root(self: &Arc<Self>, real: &Path) -> Option<VirtualPath> {
        let rel = real.strip_prefix(&self.real_root).ok()?;
        Some(self.path_from_segments(true, rel.iter()))
    }

    /// Fail with `AccessDenied` if this mount is read-only.
    pub fn check_writable(&self, path: &VirtualPath) -> VfsResult<()> {
        if self.read_only {
            tracing::debug!(mount = %self.id.short(), path = %path, "write denied on read-only mount");
            return Err(VfsError::access_denied(path.to_string()));
        }
        Ok(())
    }
}

/// Resolve `.` and `..` without touching the filesystem.
///
/// `..` at the filesystem root stays at the root.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
