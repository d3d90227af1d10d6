//! Mount configuration.
//!
//! A host application can describe its mounts in TOML and apply them to a
//! [`MountRegistry`] in one step:
//!
//! ```toml
//! [[mount]]
//! id = "sandbox://workspace"
//! root = "~/projects/demo"
//!
//! [[mount]]
//! id = "sandbox://reference"
//! root = "$DATA_DIR/reference"
//! read_only = true
//! ```
//!
//! `root` goes through `~` and `$VAR` expansion before the mount is created.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vfs::{Mount, MountRegistry, VfsError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// `~` or `$VAR` expansion failed for a mount root.
    #[error("cannot expand root {root:?}: {message}")]
    Expand { root: String, message: String },

    /// Creating or registering a mount failed.
    #[error(transparent)]
    Vfs(#[from] VfsError),
}

/// One mount entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Registry identifier.
    pub id: String,
    /// Real root directory (before expansion).
    pub root: String,
    /// Deny all mutation.
    #[serde(default)]
    pub read_only: bool,
}

impl MountConfig {
    /// Root directory after `~` / `$VAR` expansion.
    pub fn expanded_root(&self) -> Result<PathBuf, ConfigError> {
        shellexpand::full(&self.root)
            .map(|s| PathBuf::from(s.as_ref()))
            .map_err(|e| ConfigError::Expand {
                root: self.root.clone(),
                message: e.to_string(),
            })
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Mounts, in declaration order.
    #[serde(rename = "mount", default)]
    pub mounts: Vec<MountConfig>,
}

impl SandboxConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Create and register every configured mount.
    ///
    /// All or nothing: on the first failure, mounts registered by this call
    /// are unregistered again and the error is returned.
    pub fn apply(&self, registry: &MountRegistry) -> Result<Vec<Arc<Mount>>, ConfigError> {
        let mut mounted = Vec::with_capacity(self.mounts.len());
        for entry in &self.mounts {
            match Self::apply_one(entry, registry) {
                Ok(mount) => mounted.push((entry.id.as_str(), mount)),
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "mount config failed, rolling back");
                    for (id, _) in &mounted {
                        registry.unregister(id);
                    }
                    return Err(e);
                }
            }
        }
        Ok(mounted.into_iter().map(|(_, m)| m).collect())
    }

    fn apply_one(entry: &MountConfig, registry: &MountRegistry) -> Result<Arc<Mount>, ConfigError> {
        let root = entry.expanded_root()?;
        Ok(registry.mount(&entry.id, root, entry.read_only)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse() {
        let config = SandboxConfig::from_toml_str(
            r#"
            [[mount]]
            id = "sandbox://a"
            root = "/tmp"

            [[mount]]
            id = "sandbox://b"
            root = "/var"
            read_only = true
            "#,
        )
        .unwrap();

        assert_eq!(config.mounts.len(), 2);
        assert!(!config.mounts[0].read_only);
        assert!(config.mounts[1].read_only);
    }

    #[test]
    fn test_parse_empty() {
        let config = SandboxConfig::from_toml_str("").unwrap();
        assert!(config.mounts.is_empty());
    }

    #[test]
    fn test_parse_invalid() {
        let err = SandboxConfig::from_toml_str("[[mount]]\nid = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_apply() {
        let dir = TempDir::new().unwrap();
        let config = SandboxConfig {
            mounts: vec![MountConfig {
                id: "sandbox://ws".into(),
                root: dir.path().to_string_lossy().into_owned(),
                read_only: true,
            }],
        };

        let registry = MountRegistry::new();
        let mounts = config.apply(&registry).unwrap();
        assert_eq!(mounts.len(), 1);
        assert!(registry.lookup("sandbox://ws").unwrap().is_read_only());
    }

    #[test]
    fn test_apply_rolls_back() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let config = SandboxConfig {
            mounts: vec![
                MountConfig {
                    id: "sandbox://ok".into(),
                    root: root.clone(),
                    read_only: false,
                },
                MountConfig {
                    id: "sandbox://bad".into(),
                    root: format!("{}/missing", root),
                    read_only: false,
                },
            ],
        };

        let registry = MountRegistry::new();
        let err = config.apply(&registry).unwrap_err();
        assert!(matches!(err, ConfigError::Vfs(VfsError::InvalidRoot(_))));
        assert!(registry.list_mounts().is_empty());
    }

    #[test]
    fn test_from_file_missing() {
        let dir = TempDir::new().unwrap();
        let err = SandboxConfig::from_file(dir.path().join("none.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_expand_unknown_var() {
        let entry = MountConfig {
            id: "x".into(),
            root: "$SANDBOX_VFS_SURELY_UNSET_VAR/x".into(),
            read_only: false,
        };
        assert!(matches!(entry.expanded_root(), Err(ConfigError::Expand { .. })));
    }
}
