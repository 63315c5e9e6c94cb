//! VFS error types.

use std::io;
use thiserror::Error;

use super::resolve::Backend;

/// VFS error type.
///
/// Errors that originate from a syscall on one of the backends keep the
/// underlying [`io::Error`] so the original errno reaches the caller.
#[derive(Debug, Error)]
pub enum VfsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Virtual path would leave the backend root.
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Physical path exceeds the configured maximum length.
    #[error("path too long: {0}")]
    NameTooLong(String),

    /// Requested mode or feature is not supported.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// A syscall failed on one backend.
    #[error("backend {backend}: {source}")]
    Backend {
        backend: Backend,
        #[source]
        source: io::Error,
    },
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a NameTooLong error.
    pub fn name_too_long(path: impl Into<String>) -> Self {
        Self::NameTooLong(path.into())
    }

    /// Create a NotSupported error.
    pub fn not_supported(what: impl Into<String>) -> Self {
        Self::NotSupported(what.into())
    }

    /// Wrap a syscall failure with the backend it happened on.
    pub fn backend(backend: Backend, source: io::Error) -> Self {
        Self::Backend { backend, source }
    }

    /// The backend that produced this error, if it came from one.
    pub fn failed_backend(&self) -> Option<Backend> {
        match self {
            VfsError::Backend { backend, .. } => Some(*backend),
            _ => None,
        }
    }

    /// POSIX errno to hand back to the FUSE kernel module.
    pub fn errno(&self) -> i32 {
        use rustix::io::Errno;

        let errno = match self {
            VfsError::NotFound(_) => Errno::NOENT,
            VfsError::NotADirectory(_) => Errno::NOTDIR,
            VfsError::PathEscapesRoot(_) => Errno::ACCESS,
            VfsError::InvalidPath(_) => Errno::INVAL,
            VfsError::NameTooLong(_) => Errno::NAMETOOLONG,
            VfsError::NotSupported(_) => Errno::OPNOTSUPP,
            VfsError::Backend { source, .. } => return io_errno(source),
        };
        errno.raw_os_error()
    }
}

/// Errno carried by an `io::Error`, falling back to a kind-based guess.
fn io_errno(e: &io::Error) -> i32 {
    use rustix::io::Errno;

    if let Some(raw) = e.raw_os_error() {
        return raw;
    }
    let errno = match e.kind() {
        io::ErrorKind::NotFound => Errno::NOENT,
        io::ErrorKind::PermissionDenied => Errno::ACCESS,
        io::ErrorKind::AlreadyExists => Errno::EXIST,
        io::ErrorKind::InvalidInput => Errno::INVAL,
        io::ErrorKind::Unsupported => Errno::OPNOTSUPP,
        _ => Errno::IO,
    };
    errno.raw_os_error()
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_preserves_os_error() {
        let err = VfsError::backend(Backend::B, io::Error::from_raw_os_error(libc_enospc()));
        assert_eq!(err.errno(), libc_enospc());
        assert_eq!(err.failed_backend(), Some(Backend::B));
    }

    #[test]
    fn test_errno_for_path_errors() {
        assert_eq!(
            VfsError::name_too_long("/x").errno(),
            rustix::io::Errno::NAMETOOLONG.raw_os_error()
        );
        assert_eq!(
            VfsError::not_supported("fallocate mode 1").errno(),
            rustix::io::Errno::OPNOTSUPP.raw_os_error()
        );
        assert_eq!(
            VfsError::path_escapes_root("../etc").errno(),
            rustix::io::Errno::ACCESS.raw_os_error()
        );
    }

    #[test]
    fn test_errno_from_error_kind() {
        let err = VfsError::backend(Backend::A, io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.errno(), rustix::io::Errno::NOENT.raw_os_error());
    }

    fn libc_enospc() -> i32 {
        rustix::io::Errno::NOSPC.raw_os_error()
    }
}
