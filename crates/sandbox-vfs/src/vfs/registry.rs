//! Table of active mounts keyed by opaque identifiers.
//!
//! Owned by the host application and passed by reference; there is no global
//! instance. A coarse `RwLock` is enough since mounts come and go rarely.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use super::error::{VfsError, VfsResult};
use super::mount::Mount;
use super::path::VirtualPath;
use super::types::MountInfo;

/// Registry of mounts.
///
/// Identifiers are opaque strings (e.g. `sandbox://workspace`); the only rule
/// is uniqueness.
pub struct MountRegistry {
    mounts: RwLock<BTreeMap<String, Arc<Mount>>>,
}

impl std::fmt::Debug for MountRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountRegistry")
            .field("mounts", &self.mounts.read().len())
            .finish()
    }
}

impl Default for MountRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MountRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            mounts: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register `mount` under `id`.
    ///
    /// Fails with `AlreadyMounted` if `id` is taken; the existing mount is
    /// left in place.
    #[tracing::instrument(skip(self, mount), name = "vfs.register")]
    pub fn register(&self, id: &str, mount: Arc<Mount>) -> VfsResult<()> {
        let mut mounts = self.mounts.write();
        if mounts.contains_key(id) {
            return Err(VfsError::already_mounted(id));
        }
        tracing::debug!(mount = %mount.id().short(), read_only = mount.is_read_only(), "mounted");
        mounts.insert(id.to_string(), mount);
        Ok(())
    }

    /// Create a mount over `root` and register it under `id`.
    pub fn mount(&self, id: &str, root: impl AsRef<Path>, read_only: bool) -> VfsResult<Arc<Mount>> {
        let mount = Mount::new(root, read_only)?;
        self.register(id, Arc::clone(&mount))?;
        Ok(mount)
    }

    /// Look up the mount registered under `id`.
    pub fn lookup(&self, id: &str) -> VfsResult<Arc<Mount>> {
        self.mounts
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| VfsError::mount_not_found(id))
    }

    /// Remove the mount under `id`. Removing an unknown id is a no-op.
    ///
    /// Returns `true` if a mount was removed.
    #[tracing::instrument(skip(self), name = "vfs.unregister")]
    pub fn unregister(&self, id: &str) -> bool {
        self.mounts.write().remove(id).is_some()
    }

    /// Whether this exact mount is registered (under any id).
    pub fn contains(&self, mount: &Mount) -> bool {
        self.id_of(mount).is_some()
    }

    /// The identifier `mount` is registered under.
    pub fn id_of(&self, mount: &Mount) -> Option<String> {
        self.mounts
            .read()
            .iter()
            .find(|(_, m)| m.id() == mount.id())
            .map(|(id, _)| id.clone())
    }

    /// List all current mounts, ordered by id.
    pub fn list_mounts(&self) -> Vec<MountInfo> {
        self.mounts
            .read()
            .iter()
            .map(|(id, m)| MountInfo {
                id: id.clone(),
                root: m.real_root().to_path_buf(),
                read_only: m.is_read_only(),
            })
            .collect()
    }

    /// Location identifier for `path`: its mount's id followed by the
    /// absolute virtual path.
    ///
    /// `None` if the path's mount is not registered here, or if a segment is
    /// not valid UTF-8 (it could not be parsed back).
    pub fn uri_of(&self, path: &VirtualPath) -> Option<String> {
        if path.segments().any(|s| s.to_str().is_none()) {
            return None;
        }
        let id = self.id_of(path.mount())?;
        let abs = path.to_absolute();
        let id = id.trim_end_matches('/');
        Some(format!("{}{}", id, abs))
    }

    /// Parse a location identifier back into a virtual path.
    ///
    /// The longest registered id that prefixes `uri` at a `/` boundary wins;
    /// the remainder is parsed as an absolute path on that mount.
    pub fn path_from_uri(&self, uri: &str) -> VfsResult<VirtualPath> {
        let mounts = self.mounts.read();

        let mut best: Option<(&String, &Arc<Mount>)> = None;
        for (id, mount) in mounts.iter() {
            let base = id.trim_end_matches('/');
            let Some(rest) = uri.strip_prefix(base) else {
                continue;
            };
            if !(rest.is_empty() || rest.starts_with('/')) {
                continue;
            }
            if best.is_none_or(|(b, _)| id.len() > b.len()) {
                best = Some((id, mount));
            }
        }

        let (id, mount) = best.ok_or_else(|| VfsError::mount_not_found(uri))?;
        let rest = &uri[id.trim_end_matches('/').len()..];
        Ok(mount.path(format!("/{}", rest.trim_start_matches('/'))))
    }
}
