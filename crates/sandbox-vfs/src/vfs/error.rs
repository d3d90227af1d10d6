//! VFS error types.

use std::io;
use thiserror::Error;

/// Sandbox VFS error type.
///
/// Every failure is surfaced to the caller; nothing is retried or swallowed
/// inside the crate.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Mount root does not exist, is not a directory, or cannot be canonicalized.
    #[error("invalid mount root: {0}")]
    InvalidRoot(String),

    /// A mount is already registered under this identifier.
    #[error("already mounted: {0}")]
    AlreadyMounted(String),

    /// No mount is registered under this identifier.
    #[error("mount not found: {0}")]
    MountNotFound(String),

    /// A path from one mount was handed to another mount or provider.
    #[error("path belongs to a different mount: {0}")]
    ProviderMismatch(String),

    /// Write-classified operation against a read-only mount.
    #[error("access denied (read-only mount): {0}")]
    AccessDenied(String),

    /// Symlink-resolved path lands outside the mount root.
    #[error("path escapes mount root: {0}")]
    PathEscape(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Underlying filesystem error, passed through untouched.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create an InvalidRoot error.
    pub fn invalid_root(msg: impl Into<String>) -> Self {
        Self::InvalidRoot(msg.into())
    }

    /// Create an AlreadyMounted error.
    pub fn already_mounted(id: impl Into<String>) -> Self {
        Self::AlreadyMounted(id.into())
    }

    /// Create a MountNotFound error.
    pub fn mount_not_found(id: impl Into<String>) -> Self {
        Self::MountNotFound(id.into())
    }

    /// Create a ProviderMismatch error.
    pub fn provider_mismatch(path: impl Into<String>) -> Self {
        Self::ProviderMismatch(path.into())
    }

    /// Create an AccessDenied error.
    pub fn access_denied(path: impl Into<String>) -> Self {
        Self::AccessDenied(path.into())
    }

    /// Create a PathEscape error.
    pub fn path_escape(path: impl Into<String>) -> Self {
        Self::PathEscape(path.into())
    }

    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// The underlying I/O error kind, if this is a passthrough error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            VfsError::Io(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::InvalidRoot(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::AlreadyMounted(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::MountNotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::ProviderMismatch(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::AccessDenied(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            VfsError::PathEscape(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            VfsError::InvalidArgument(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Io(e) => e,
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
