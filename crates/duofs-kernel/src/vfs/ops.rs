//! Capability traits.
//!
//! The two backends play two different roles on the same logical path. For
//! namespace and metadata they are mirrors; for file content they are the two
//! halves of one striped file. Each role gets its own trait so callers say
//! which one they mean.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::VfsResult;
use super::types::{DirEntry, FileAttr, SetTime, StatFs, StripedRead, StripedWrite, XattrReply};

/// Namespace and metadata operations, mirrored across both backends.
///
/// Paths are virtual paths under the mount point.
#[async_trait]
pub trait MirroredMetadata: Send + Sync {
    // ========================================================================
    // Queries
    // ========================================================================

    /// Attributes of backend A's copy, with the striped size for regular files.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Check access against the selected backend.
    async fn access(&self, path: &Path, mask: i32) -> VfsResult<()>;

    /// Read a symlink target from the selected backend.
    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf>;

    /// List a directory on the selected backend, `.` and `..` included.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Filesystem statistics from the selected backend.
    async fn statfs(&self, path: &Path) -> VfsResult<StatFs>;

    async fn getxattr(&self, path: &Path, name: &OsStr, size: u32) -> VfsResult<XattrReply>;

    async fn listxattr(&self, path: &Path, size: u32) -> VfsResult<XattrReply>;

    // ========================================================================
    // Replicated changes
    // ========================================================================

    /// Create a regular file, FIFO or device node on both backends.
    async fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> VfsResult<()>;

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<()>;

    /// Create a symlink at `link` on both backends.
    ///
    /// `target` is resolved once, on the selected backend, and that physical
    /// path is what both links point at.
    async fn symlink(&self, target: &Path, link: &Path) -> VfsResult<()>;

    async fn unlink(&self, path: &Path) -> VfsResult<()>;

    async fn rmdir(&self, path: &Path) -> VfsResult<()>;

    /// Rename on both backends, each moving its own copy.
    ///
    /// Unlike [`link`](Self::link), the source is not taken from the selected
    /// backend: after the first tree moved it, that path no longer exists.
    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()>;

    /// Hard link on both backends, source taken from the selected backend.
    async fn link(&self, from: &Path, to: &Path) -> VfsResult<()>;

    async fn chmod(&self, path: &Path, mode: u32) -> VfsResult<()>;

    async fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> VfsResult<()>;

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()>;

    /// Update timestamps without following symlinks. `None` leaves a time alone.
    async fn utimens(
        &self,
        path: &Path,
        atime: Option<SetTime>,
        mtime: Option<SetTime>,
    ) -> VfsResult<()>;

    async fn setxattr(&self, path: &Path, name: &OsStr, value: &[u8], flags: i32)
    -> VfsResult<()>;

    async fn removexattr(&self, path: &Path, name: &OsStr) -> VfsResult<()>;
}

/// File content operations, striped across both backends.
#[async_trait]
pub trait StripedData: Send + Sync {
    /// Open on both backends with `flags` and close again.
    async fn open(&self, path: &Path, flags: i32) -> VfsResult<()>;

    /// Read up to `size` bytes of the logical file from physical offset
    /// `offset`. The reported logical size is always the sum of both halves.
    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<StripedRead>;

    /// Write `data` at physical offset `offset`.
    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<StripedWrite>;

    /// Nothing to release; no handle state is kept.
    async fn release(&self, _path: &Path) -> VfsResult<()> {
        Ok(())
    }

    /// Nothing to flush; every chunk is closed after it is transferred.
    async fn fsync(&self, _path: &Path, _datasync: bool) -> VfsResult<()> {
        Ok(())
    }

    /// Reserve space on both backends. Only mode 0 is accepted.
    async fn fallocate(&self, path: &Path, mode: i32, offset: u64, length: u64) -> VfsResult<()>;

    /// Exclusive create on both backends, then open with `flags`.
    async fn create(&self, path: &Path, mode: u32, flags: i32) -> VfsResult<FileAttr>;
}
