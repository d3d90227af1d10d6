//! Core VFS value types.
//!
//! These carry no real-path information except [`MountInfo::root`], which is
//! meant for the host application, never for sandboxed callers.

use std::fs::Metadata;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::PathBuf;
use std::time::SystemTime;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Anything else (fifo, socket, device).
    Other,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

impl From<std::fs::FileType> for FileType {
    fn from(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            FileType::Directory
        } else if ft.is_symlink() {
            FileType::Symlink
        } else if ft.is_file() {
            FileType::File
        } else {
            FileType::Other
        }
    }
}

/// File attributes (metadata).
#[derive(Debug, Clone)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o644).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last access time (optional).
    pub atime: Option<SystemTime>,
    /// Creation time (optional).
    pub ctime: Option<SystemTime>,
    /// Number of hard links.
    pub nlink: u64,
    /// Owning user ID.
    pub uid: u32,
    /// Owning group ID.
    pub gid: u32,
}

impl FileAttr {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind.is_symlink()
    }
}

impl From<&Metadata> for FileAttr {
    fn from(meta: &Metadata) -> Self {
        FileAttr {
            size: meta.len(),
            kind: meta.file_type().into(),
            perm: meta.permissions().mode() & 0o7777,
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            atime: meta.accessed().ok(),
            ctime: meta.created().ok(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
        }
    }
}

/// Attributes to set (for the set-attribute operation).
#[derive(Debug, Clone, Default)]
pub struct SetAttr {
    /// New size (truncate/extend).
    pub size: Option<u64>,
    /// New modification time.
    pub mtime: Option<SystemTime>,
    /// New access time.
    pub atime: Option<SystemTime>,
    /// New permissions.
    pub perm: Option<u32>,
    /// New user ID.
    pub uid: Option<u32>,
    /// New group ID.
    pub gid: Option<u32>,
}

impl SetAttr {
    /// Create a new empty SetAttr.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Set the access time.
    pub fn with_atime(mut self, atime: SystemTime) -> Self {
        self.atime = Some(atime);
        self
    }

    /// Set permissions.
    pub fn with_perm(mut self, perm: u32) -> Self {
        self.perm = Some(perm);
        self
    }

    /// Set owner and group.
    pub fn with_owner(mut self, uid: Option<u32>, gid: Option<u32>) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// True when nothing would change.
    pub fn is_empty(&self) -> bool {
        self.size.is_none()
            && self.mtime.is_none()
            && self.atime.is_none()
            && self.perm.is_none()
            && self.uid.is_none()
            && self.gid.is_none()
    }
}

/// Filesystem statistics for the store backing a path.
#[derive(Debug, Clone, Default)]
pub struct StatFs {
    /// Total blocks.
    pub blocks: u64,
    /// Free blocks.
    pub bfree: u64,
    /// Available blocks (to non-root).
    pub bavail: u64,
    /// Total inodes.
    pub files: u64,
    /// Free inodes.
    pub ffree: u64,
    /// Block size.
    pub bsize: u32,
    /// Maximum name length.
    pub namelen: u32,
    /// Fragment size.
    pub frsize: u32,
}

/// Open file flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Read access requested.
    pub read: bool,
    /// Write access requested.
    pub write: bool,
    /// Append mode.
    pub append: bool,
    /// Create if not exists.
    pub create: bool,
    /// Truncate on open.
    pub truncate: bool,
    /// Exclusive create (fail if exists).
    pub exclusive: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            create: false,
            truncate: false,
            exclusive: false,
        }
    }
}

impl OpenFlags {
    /// Read-only access.
    pub fn read() -> Self {
        Self::default()
    }

    /// Write access (also enables read).
    pub fn write() -> Self {
        Self {
            read: true,
            write: true,
            ..Default::default()
        }
    }

    /// Append to an existing file, creating it if missing.
    pub fn append() -> Self {
        Self {
            read: false,
            append: true,
            create: true,
            ..Default::default()
        }
    }

    /// Create exclusively (fail if exists).
    pub fn create_exclusive() -> Self {
        Self {
            read: true,
            write: true,
            create: true,
            exclusive: true,
            ..Default::default()
        }
    }

    /// Create and truncate.
    pub fn create_truncate() -> Self {
        Self {
            read: false,
            write: true,
            create: true,
            truncate: true,
            ..Default::default()
        }
    }

    /// Whether opening with these flags can mutate the filesystem.
    pub fn is_write(&self) -> bool {
        self.write || self.append || self.create || self.truncate || self.exclusive
    }

    /// Translate into `std::fs::OpenOptions`.
    pub fn to_open_options(&self) -> std::fs::OpenOptions {
        let mut opts = std::fs::OpenOptions::new();
        opts.read(self.read)
            .write(self.write)
            .append(self.append)
            .truncate(self.truncate);
        if self.exclusive {
            opts.create_new(true);
        } else {
            opts.create(self.create);
        }
        opts
    }
}

/// Options for copy and move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Overwrite the target if it already exists.
    pub replace_existing: bool,
}

impl CopyOptions {
    /// Options that overwrite an existing target.
    pub fn replace() -> Self {
        Self {
            replace_existing: true,
        }
    }
}

/// Access mode for the check-access operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Readable.
    Read,
    /// Writable. Always denied on a read-only mount.
    Write,
    /// Executable / searchable.
    Execute,
}

/// Information about a registered mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Registry identifier.
    pub id: String,
    /// Canonical real root.
    pub root: PathBuf,
    /// Whether this mount is read-only.
    pub read_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type() {
        assert!(FileType::File.is_file());
        assert!(!FileType::File.is_dir());
        assert!(FileType::Directory.is_dir());
        assert!(FileType::Symlink.is_symlink());
        assert!(!FileType::Other.is_file());
    }

    #[test]
    fn test_setattr_builder() {
        let attr = SetAttr::new().with_size(2048).with_perm(0o600);
        assert_eq!(attr.size, Some(2048));
        assert_eq!(attr.perm, Some(0o600));
        assert!(attr.mtime.is_none());
        assert!(!attr.is_empty());
        assert!(SetAttr::new().is_empty());
    }

    #[test]
    fn test_open_flags_classification() {
        assert!(!OpenFlags::read().is_write());
        assert!(OpenFlags::write().is_write());
        assert!(OpenFlags::append().is_write());
        assert!(OpenFlags::create_truncate().is_write());

        let create = OpenFlags::create_exclusive();
        assert!(create.create);
        assert!(create.exclusive);
        assert!(create.is_write());
    }

    #[test]
    fn test_attr_from_metadata() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"12345").unwrap();

        let attr = FileAttr::from(&std::fs::metadata(&file).unwrap());
        assert!(attr.is_file());
        assert_eq!(attr.size, 5);

        let attr = FileAttr::from(&std::fs::metadata(dir.path()).unwrap());
        assert!(attr.is_dir());
    }
}
