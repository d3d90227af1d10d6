//! Real-filesystem provider.
//!
//! [`SandboxFs`] validates every [`VirtualPath`] against the registry it was
//! built with, translates it through the path's [`Mount`], enforces the
//! read-only policy and only then delegates to `std::fs`.
//!
//! Paths returned to callers (listings, canonicalization) are re-wrapped as
//! virtual paths on the same mount; real paths never leave this module.

use std::fs::{self, File, FileTimes};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::{VfsError, VfsResult};
use super::mount::Mount;
use super::ops::{DirFilter, VfsOps};
use super::path::VirtualPath;
use super::registry::MountRegistry;
use super::types::{AccessMode, CopyOptions, FileAttr, OpenFlags, SetAttr, StatFs};

/// Operation surface over the mounts of one [`MountRegistry`].
///
/// A path whose mount is not registered in that registry is rejected with
/// `ProviderMismatch`.
#[derive(Debug, Clone)]
pub struct SandboxFs {
    registry: Arc<MountRegistry>,
}

impl SandboxFs {
    /// Create a provider serving the mounts of `registry`.
    pub fn new(registry: Arc<MountRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this provider serves.
    pub fn registry(&self) -> &Arc<MountRegistry> {
        &self.registry
    }

    fn mount_for<'a>(&self, path: &'a VirtualPath) -> VfsResult<&'a Arc<Mount>> {
        let mount = path.mount();
        if !self.registry.contains(mount) {
            return Err(VfsError::provider_mismatch(format!(
                "{} is on mount {}, which is not registered with this provider",
                path,
                mount.id().short()
            )));
        }
        Ok(mount)
    }

    /// Translate for a read-classified operation.
    fn real(&self, path: &VirtualPath) -> VfsResult<PathBuf> {
        self.mount_for(path)?.translate(path)
    }

    /// Translate for a write-classified operation.
    fn real_for_write(&self, path: &VirtualPath) -> VfsResult<PathBuf> {
        let mount = self.mount_for(path)?;
        let real = mount.translate(path)?;
        mount.check_writable(path)?;
        Ok(real)
    }

    /// Refuse operations that would remove or replace the mount root itself.
    fn ensure_not_root(path: &VirtualPath, real: &Path) -> VfsResult<()> {
        if real == path.mount().real_root() {
            return Err(VfsError::invalid_argument(format!(
                "{} denotes the mount root",
                path
            )));
        }
        Ok(())
    }

    fn ensure_absent(path: &VirtualPath, real: &Path) -> VfsResult<()> {
        if fs::symlink_metadata(real).is_ok() {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, path.to_string()).into());
        }
        Ok(())
    }

    fn remove_any(real: &Path) -> io::Result<()> {
        if fs::symlink_metadata(real)?.is_dir() {
            fs::remove_dir(real)
        } else {
            fs::remove_file(real)
        }
    }
}

impl VfsOps for SandboxFs {
    fn open(&self, path: &VirtualPath, flags: OpenFlags) -> VfsResult<File> {
        let real = if flags.is_write() {
            self.real_for_write(path)?
        } else {
            self.real(path)?
        };
        Ok(flags.to_open_options().open(&real)?)
    }

    fn metadata(&self, path: &VirtualPath) -> VfsResult<FileAttr> {
        let real = self.real(path)?;
        Ok(FileAttr::from(&fs::metadata(&real)?))
    }

    fn symlink_metadata(&self, path: &VirtualPath) -> VfsResult<FileAttr> {
        let real = self.real(path)?;
        Ok(FileAttr::from(&fs::symlink_metadata(&real)?))
    }

    fn read_link(&self, path: &VirtualPath) -> VfsResult<PathBuf> {
        let real = self.real(path)?;
        Ok(fs::read_link(&real)?)
    }

    fn read_dir(&self, dir: &VirtualPath, filter: DirFilter<'_>) -> VfsResult<Vec<VirtualPath>> {
        let mount = self.mount_for(dir)?;
        let real = mount.translate(dir)?;

        let mut entries = Vec::new();
        for entry in fs::read_dir(&real)? {
            let entry = entry?;
            let Some(virtual_path) = mount.relative_to_root(&entry.path()) else {
                continue;
            };
            if filter(&virtual_path) {
                entries.push(virtual_path);
            }
        }
        Ok(entries)
    }

    fn check_access(&self, path: &VirtualPath, modes: &[AccessMode]) -> VfsResult<()> {
        use rustix::fs::{Access, access};

        let mount = self.mount_for(path)?;
        let real = mount.translate(path)?;
        if modes.contains(&AccessMode::Write) {
            mount.check_writable(path)?;
        }

        let mut wanted = Access::EXISTS;
        for mode in modes {
            wanted |= match mode {
                AccessMode::Read => Access::READ_OK,
                AccessMode::Write => Access::WRITE_OK,
                AccessMode::Execute => Access::EXEC_OK,
            };
        }
        access(&real, wanted).map_err(|e| VfsError::Io(e.into()))
    }

    fn canonicalize(&self, path: &VirtualPath) -> VfsResult<VirtualPath> {
        let mount = self.mount_for(path)?;
        let canonical = mount.to_real_canonical(path)?;
        mount
            .relative_to_root(&canonical)
            .ok_or_else(|| VfsError::path_escape(path.to_string()))
    }

    fn is_same_file(&self, a: &VirtualPath, b: &VirtualPath) -> VfsResult<bool> {
        let real_a = self.real(a)?;
        let real_b = self.real(b)?;
        if a == b {
            return Ok(true);
        }
        let meta_a = fs::metadata(&real_a)?;
        let meta_b = fs::metadata(&real_b)?;
        Ok(meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino())
    }

    fn is_hidden(&self, path: &VirtualPath) -> VfsResult<bool> {
        self.mount_for(path)?;
        Ok(path
            .segments()
            .last()
            .is_some_and(|name| name.as_bytes().first() == Some(&b'.')))
    }

    fn statfs(&self, path: &VirtualPath) -> VfsResult<StatFs> {
        let real = self.real(path)?;
        let stat = rustix::fs::statvfs(&real).map_err(|e| VfsError::Io(e.into()))?;

        Ok(StatFs {
            blocks: stat.f_blocks,
            bfree: stat.f_bfree,
            bavail: stat.f_bavail,
            files: stat.f_files,
            ffree: stat.f_ffree,
            bsize: stat.f_bsize as u32,
            namelen: stat.f_namemax as u32,
            frsize: stat.f_frsize as u32,
        })
    }

    fn create(&self, path: &VirtualPath, mode: u32) -> VfsResult<FileAttr> {
        let real = self.real_for_write(path)?;
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(mode)
            .open(&real)?;
        Ok(FileAttr::from(&file.metadata()?))
    }

    fn create_dir(&self, path: &VirtualPath) -> VfsResult<()> {
        let real = self.real_for_write(path)?;
        Ok(fs::create_dir(&real)?)
    }

    fn create_dir_all(&self, path: &VirtualPath) -> VfsResult<()> {
        let real = self.real_for_write(path)?;
        Ok(fs::create_dir_all(&real)?)
    }

    #[tracing::instrument(skip_all, fields(path = %path), name = "vfs.delete")]
    fn delete(&self, path: &VirtualPath) -> VfsResult<()> {
        let real = self.real_for_write(path)?;
        Self::ensure_not_root(path, &real)?;
        Ok(Self::remove_any(&real)?)
    }

    #[tracing::instrument(skip_all, fields(from = %from, to = %to), name = "vfs.rename")]
    fn rename(&self, from: &VirtualPath, to: &VirtualPath, opts: CopyOptions) -> VfsResult<()> {
        // Moving is destructive to the source, so both ends need write access.
        let from_real = self.real_for_write(from)?;
        let to_real = self.real_for_write(to)?;
        Self::ensure_not_root(from, &from_real)?;
        Self::ensure_not_root(to, &to_real)?;
        if from_real == to_real {
            // Same file: nothing to move, but the source must exist.
            fs::symlink_metadata(&from_real)?;
            return Ok(());
        }
        if !opts.replace_existing {
            Self::ensure_absent(to, &to_real)?;
        }

        match fs::rename(&from_real, &to_real) {
            Ok(()) => Ok(()),
            Err(e) if rustix::io::Errno::from_io_error(&e) == Some(rustix::io::Errno::XDEV) => {
                // Different devices: only regular files can be carried over.
                if !fs::symlink_metadata(&from_real)?.is_file() {
                    return Err(e.into());
                }
                tracing::debug!("cross-device move, falling back to copy + delete");
                fs::copy(&from_real, &to_real)?;
                fs::remove_file(&from_real)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip_all, fields(from = %from, to = %to), name = "vfs.copy")]
    fn copy(&self, from: &VirtualPath, to: &VirtualPath, opts: CopyOptions) -> VfsResult<()> {
        let from_real = self.real(from)?;
        let to_real = self.real_for_write(to)?;
        Self::ensure_not_root(to, &to_real)?;

        let source = fs::metadata(&from_real)?;
        if fs::symlink_metadata(&to_real).is_ok() {
            if !opts.replace_existing {
                return Err(io::Error::new(io::ErrorKind::AlreadyExists, to.to_string()).into());
            }
            if from_real == to_real {
                return Ok(());
            }
            Self::remove_any(&to_real)?;
        }

        if source.is_dir() {
            fs::create_dir(&to_real)?;
        } else {
            fs::copy(&from_real, &to_real)?;
        }
        Ok(())
    }

    fn set_attr(&self, path: &VirtualPath, attr: SetAttr) -> VfsResult<FileAttr> {
        let real = self.real_for_write(path)?;
        if attr.is_empty() {
            return Ok(FileAttr::from(&fs::metadata(&real)?));
        }

        if let Some(size) = attr.size {
            let file = fs::OpenOptions::new().write(true).open(&real)?;
            file.set_len(size)?;
        }

        if let Some(perm) = attr.perm {
            fs::set_permissions(&real, fs::Permissions::from_mode(perm))?;
        }

        if attr.mtime.is_some() || attr.atime.is_some() {
            let mut times = FileTimes::new();
            if let Some(mtime) = attr.mtime {
                times = times.set_modified(mtime);
            }
            if let Some(atime) = attr.atime {
                times = times.set_accessed(atime);
            }
            File::open(&real)?.set_times(times)?;
        }

        if attr.uid.is_some() || attr.gid.is_some() {
            std::os::unix::fs::chown(&real, attr.uid, attr.gid)?;
        }

        Ok(FileAttr::from(&fs::metadata(&real)?))
    }
}
