//! VFS operations trait.
//!
//! Every operation takes [`VirtualPath`]s and is classified as read or write.
//! Write-classified operations on a read-only mount fail with
//! [`VfsError::AccessDenied`](super::VfsError::AccessDenied) before any real
//! I/O happens.
//!
//! Calls are synchronous and may block on the underlying filesystem.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use super::error::VfsResult;
use super::path::VirtualPath;
use super::types::{AccessMode, CopyOptions, FileAttr, OpenFlags, SetAttr, StatFs};

/// Inclusion predicate for directory listings. Only sees virtual paths.
pub type DirFilter<'a> = &'a dyn Fn(&VirtualPath) -> bool;

/// Core VFS operations trait.
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Open a file. Classified as a write when `flags` can mutate.
    fn open(&self, path: &VirtualPath, flags: OpenFlags) -> VfsResult<File>;

    /// File attributes, following symlinks.
    fn metadata(&self, path: &VirtualPath) -> VfsResult<FileAttr>;

    /// File attributes of the path itself, not following a final symlink.
    fn symlink_metadata(&self, path: &VirtualPath) -> VfsResult<FileAttr>;

    /// Symlink target text, as stored. Not resolved or confined.
    fn read_link(&self, path: &VirtualPath) -> VfsResult<PathBuf>;

    /// List `dir`, keeping entries for which `filter` returns true.
    ///
    /// Entries are absolute virtual paths in the order the real filesystem
    /// returned them.
    fn read_dir(&self, dir: &VirtualPath, filter: DirFilter<'_>) -> VfsResult<Vec<VirtualPath>>;

    /// Check that `path` exists and permits every mode in `modes`.
    ///
    /// `AccessMode::Write` on a read-only mount is denied without consulting
    /// the real filesystem.
    fn check_access(&self, path: &VirtualPath, modes: &[AccessMode]) -> VfsResult<()>;

    /// Resolve symlinks and return the definitive location as a virtual path.
    ///
    /// Fails with `PathEscape` when the resolved location is outside the root.
    fn canonicalize(&self, path: &VirtualPath) -> VfsResult<VirtualPath>;

    /// Whether both paths denote the same underlying file.
    fn is_same_file(&self, a: &VirtualPath, b: &VirtualPath) -> VfsResult<bool>;

    /// Whether the file name starts with `.`.
    fn is_hidden(&self, path: &VirtualPath) -> VfsResult<bool>;

    /// Statistics for the store holding `path`.
    fn statfs(&self, path: &VirtualPath) -> VfsResult<StatFs>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Create a new regular file with `mode`. Fails if it already exists.
    fn create(&self, path: &VirtualPath, mode: u32) -> VfsResult<FileAttr>;

    /// Create a single directory. The parent must exist.
    fn create_dir(&self, path: &VirtualPath) -> VfsResult<()>;

    /// Create a directory and any missing parents.
    fn create_dir_all(&self, path: &VirtualPath) -> VfsResult<()>;

    /// Remove a file, symlink or empty directory.
    fn delete(&self, path: &VirtualPath) -> VfsResult<()>;

    /// Move `from` to `to`. Both endpoints must be writable.
    fn rename(&self, from: &VirtualPath, to: &VirtualPath, opts: CopyOptions) -> VfsResult<()>;

    /// Copy `from` to `to`. Only the target must be writable.
    ///
    /// Copying a directory creates an empty directory.
    fn copy(&self, from: &VirtualPath, to: &VirtualPath, opts: CopyOptions) -> VfsResult<()>;

    /// Set file attributes, returning the updated attributes.
    fn set_attr(&self, path: &VirtualPath, attr: SetAttr) -> VfsResult<FileAttr>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    fn exists(&self, path: &VirtualPath) -> bool {
        self.metadata(path).is_ok()
    }

    /// List every entry of `dir`.
    fn list(&self, dir: &VirtualPath) -> VfsResult<Vec<VirtualPath>> {
        self.read_dir(dir, &|_| true)
    }

    /// Read up to `size` bytes starting at `offset`.
    ///
    /// Returns fewer bytes if EOF is reached; `usize::MAX` reads to EOF.
    fn read(&self, path: &VirtualPath, offset: u64, size: usize) -> VfsResult<Vec<u8>> {
        let mut file = self.open(path, OpenFlags::read())?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = Vec::new();
        file.take(u64::try_from(size).unwrap_or(u64::MAX))
            .read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Read entire file contents.
    fn read_all(&self, path: &VirtualPath) -> VfsResult<Vec<u8>> {
        let mut file = self.open(path, OpenFlags::read())?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Write `data` at `offset` into an existing file.
    ///
    /// Returns the number of bytes written.
    fn write(&self, path: &VirtualPath, offset: u64, data: &[u8]) -> VfsResult<usize> {
        let mut file = self.open(path, OpenFlags::write())?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(data.len())
    }

    /// Replace the whole file, creating it if needed.
    fn write_all(&self, path: &VirtualPath, data: &[u8]) -> VfsResult<()> {
        let mut file = self.open(path, OpenFlags::create_truncate())?;
        file.write_all(data)?;
        Ok(())
    }
}
