//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sandbox_vfs::{Mount, MountRegistry, SandboxFs};
use tempfile::TempDir;

/// A registry with one mount over a fresh temp directory.
pub struct Sandbox {
    pub dir: TempDir,
    pub registry: Arc<MountRegistry>,
    pub mount: Arc<Mount>,
    pub vfs: SandboxFs,
}

impl Sandbox {
    pub fn new(read_only: bool) -> Self {
        init_tracing();
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(MountRegistry::new());
        let mount = registry
            .mount("sandbox://test", dir.path(), read_only)
            .unwrap();
        let vfs = SandboxFs::new(Arc::clone(&registry));
        Self {
            dir,
            registry,
            mount,
            vfs,
        }
    }

    pub fn writable() -> Self {
        Self::new(false)
    }

    pub fn read_only() -> Self {
        Self::new(true)
    }

    /// Names in the real root, sorted.
    pub fn real_listing(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.mount.real_root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Install a test-writer subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
