//! The dual-backend filesystem.
//!
//! [`DualFs`] implements [`MirroredMetadata`] and [`StripedData`] over two
//! local directory trees. Every call resolves its virtual path through one
//! [`PathResolver`] and then goes to exactly one component: the selector for
//! read-only queries, the replicator for namespace changes, or the striping
//! engine for file content.
//!
//! Backend I/O is blocking and runs on the calling thread. There is no
//! per-path locking, so concurrent writers to one path race on the backend
//! files and on the size cache.

use async_trait::async_trait;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustix::fs::OFlags;
use tokio::fs;
use tracing::debug;

use crate::config::MountConfig;
use crate::vfs::dispatch::Operation;
use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::ops::{MirroredMetadata, StripedData};
use crate::vfs::physical;
use crate::vfs::replicate::Replicator;
use crate::vfs::resolve::{Backend, PathResolver};
use crate::vfs::selector::BackendSelector;
use crate::vfs::size_cache::SizeCache;
use crate::vfs::stripe::StripingEngine;
use crate::vfs::types::{
    DirEntry, FileAttr, FileType, SetAttr, SetTime, StatFs, StripedRead, StripedWrite, XattrReply,
};

/// One logical filesystem over backends A and B.
#[derive(Debug)]
pub struct DualFs {
    config: Arc<MountConfig>,
    resolver: PathResolver,
    selector: BackendSelector,
    replicator: Replicator,
    sizes: SizeCache,
    engine: StripingEngine,
}

impl DualFs {
    /// Build the filesystem from a validated configuration.
    pub fn new(config: Arc<MountConfig>) -> Self {
        Self {
            resolver: config.resolver(),
            selector: BackendSelector::new(config.selection),
            replicator: Replicator,
            sizes: SizeCache::new(config.size_cache),
            engine: StripingEngine::new(config.stripe_unit),
            config,
        }
    }

    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    /// Apply a setattr request as chmod, chown, truncate and utimens, in that
    /// order, then return the new attributes.
    ///
    /// The first failing step ends the request; it is logged under its own
    /// operation name.
    pub async fn setattr(&self, path: &Path, attr: SetAttr) -> VfsResult<FileAttr> {
        let failed = |op: Operation| {
            move |e: &VfsError| {
                debug!(%op, path = %path.display(), error = %e, "setattr step failed")
            }
        };
        if let Some(mode) = attr.perm {
            self.chmod(path, mode).await.inspect_err(failed(Operation::Chmod))?;
        }
        if attr.uid.is_some() || attr.gid.is_some() {
            self.chown(path, attr.uid, attr.gid)
                .await
                .inspect_err(failed(Operation::Chown))?;
        }
        if let Some(size) = attr.size {
            self.truncate(path, size)
                .await
                .inspect_err(failed(Operation::Truncate))?;
        }
        if attr.atime.is_some() || attr.mtime.is_some() {
            self.utimens(path, attr.atime, attr.mtime)
                .await
                .inspect_err(failed(Operation::Utimens))?;
        }
        self.getattr(path).await
    }

    /// Inode of backend A's copy of `path`, if it is a regular file.
    fn file_ino(&self, path: &Path) -> Option<u64> {
        let physical = self.resolver.resolve_one(Backend::A, path).ok()?;
        physical::lstat(&physical)
            .ok()
            .filter(|attr| attr.is_file())
            .map(|attr| attr.ino)
    }

    /// Resolve `path` on both backends and run `op_fn` on each, A first.
    fn replicate<F>(&self, op: Operation, path: &Path, op_fn: F) -> VfsResult<()>
    where
        F: FnMut(Backend, &Path) -> io::Result<()>,
    {
        let pair = self.resolver.resolve(path)?;
        self.replicator.apply(op, &pair, op_fn)
    }

    /// Two-path operation: source on the selected backend, destination on both.
    fn replicate_from_selected<F>(
        &self,
        op: Operation,
        source: &Path,
        dest: &Path,
        op_fn: F,
    ) -> VfsResult<()>
    where
        F: FnMut(Backend, &Path, &Path) -> io::Result<()>,
    {
        let dest = self.resolver.resolve(dest)?;
        self.replicator
            .apply_from_selected(op, &self.resolver, &self.selector, source, &dest, op_fn)
    }

    /// Pick a backend and resolve `path` on it.
    fn selected(&self, op: Operation, path: &Path) -> VfsResult<(Backend, PathBuf)> {
        let backend = self.selector.pick();
        let physical = self.resolver.resolve_one(backend, path)?;
        debug!(%op, %backend, path = %physical.display(), "selected");
        Ok((backend, physical))
    }
}

#[async_trait]
impl MirroredMetadata for DualFs {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let pair = self.resolver.resolve(path)?;
        let mut attr =
            physical::lstat(&pair.a).map_err(|e| VfsError::backend(Backend::A, e))?;
        if attr.is_file() {
            // B's half may be missing; it then contributes nothing.
            let half = physical::lstat(&pair.b).map(|b| b.size).unwrap_or(0);
            attr.size += half;
        }
        attr.size = self.sizes.reconcile(attr.ino, attr.size);
        debug!(op = %Operation::Getattr, path = %path.display(), size = attr.size, "getattr");
        Ok(attr)
    }

    async fn access(&self, path: &Path, mask: i32) -> VfsResult<()> {
        let (backend, physical) = self.selected(Operation::Access, path)?;
        physical::access(&physical, mask).map_err(|e| VfsError::backend(backend, e))
    }

    async fn readlink(&self, path: &Path) -> VfsResult<PathBuf> {
        let (backend, physical) = self.selected(Operation::Readlink, path)?;
        fs::read_link(&physical)
            .await
            .map_err(|e| VfsError::backend(backend, e))
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let (backend, physical) = self.selected(Operation::Readdir, path)?;
        let err = |e| VfsError::backend(backend, e);

        let mut entries = Vec::new();
        let own = physical::lstat(&physical).map_err(err)?;
        if !own.is_dir() {
            return Err(VfsError::NotADirectory(path.display().to_string()));
        }
        entries.push(DirEntry::new(".", own.ino, FileType::Directory));
        let parent_ino = physical::lstat(&physical.join(".."))
            .map(|a| a.ino)
            .unwrap_or(own.ino);
        entries.push(DirEntry::new("..", parent_ino, FileType::Directory));

        let mut dir = fs::read_dir(&physical).await.map_err(err)?;
        while let Some(entry) = dir.next_entry().await.map_err(err)? {
            let kind = FileType::from_std(entry.file_type().await.map_err(err)?);
            entries.push(DirEntry::new(entry.file_name(), entry.ino(), kind));
        }
        Ok(entries)
    }

    async fn statfs(&self, path: &Path) -> VfsResult<StatFs> {
        let (backend, physical) = self.selected(Operation::Statfs, path)?;
        physical::statfs(&physical).map_err(|e| VfsError::backend(backend, e))
    }

    async fn getxattr(&self, path: &Path, name: &OsStr, size: u32) -> VfsResult<XattrReply> {
        let (backend, physical) = self.selected(Operation::Getxattr, path)?;
        physical::getxattr(&physical, name, size).map_err(|e| VfsError::backend(backend, e))
    }

    async fn listxattr(&self, path: &Path, size: u32) -> VfsResult<XattrReply> {
        let (backend, physical) = self.selected(Operation::Listxattr, path)?;
        physical::listxattr(&physical, size).map_err(|e| VfsError::backend(backend, e))
    }

    async fn mknod(&self, path: &Path, mode: u32, rdev: u64) -> VfsResult<()> {
        self.replicate(Operation::Mknod, path, |_, p| physical::mknod(p, mode, rdev))
    }

    async fn mkdir(&self, path: &Path, mode: u32) -> VfsResult<()> {
        self.replicate(Operation::Mkdir, path, |_, p| physical::mkdir(p, mode))
    }

    async fn symlink(&self, target: &Path, link: &Path) -> VfsResult<()> {
        self.replicate_from_selected(Operation::Symlink, target, link, |_, from, to| {
            physical::symlink(from, to)
        })
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        let ino = self.file_ino(path);
        self.replicate(Operation::Unlink, path, |_, p| physical::unlink(p))?;
        // The inode number may be reused by the next file created.
        if let Some(ino) = ino {
            self.sizes.forget(ino);
        }
        Ok(())
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        self.replicate(Operation::Rmdir, path, |_, p| physical::rmdir(p))
    }

    async fn rename(&self, from: &Path, to: &Path) -> VfsResult<()> {
        // Each tree moves its own copy; a shared source would be gone after
        // the first backend renamed it.
        let sources = self.resolver.resolve(from)?;
        let replaced = self.file_ino(to);
        self.replicate(Operation::Rename, to, |backend, dst| {
            physical::rename(sources.get(backend), dst)
        })?;
        if let Some(ino) = replaced {
            self.sizes.forget(ino);
        }
        Ok(())
    }

    async fn link(&self, from: &Path, to: &Path) -> VfsResult<()> {
        self.replicate_from_selected(Operation::Link, from, to, |_, src, dst| {
            physical::link(src, dst)
        })
    }

    async fn chmod(&self, path: &Path, mode: u32) -> VfsResult<()> {
        self.replicate(Operation::Chmod, path, |_, p| physical::chmod(p, mode))
    }

    async fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> VfsResult<()> {
        self.replicate(Operation::Chown, path, |_, p| physical::chown(p, uid, gid))
    }

    async fn truncate(&self, path: &Path, size: u64) -> VfsResult<()> {
        let mut truncated_ino = None;
        self.replicate(Operation::Truncate, path, |backend, p| {
            physical::truncate(p, size)?;
            if backend == Backend::A {
                truncated_ino = physical::lstat(p).ok().map(|a| a.ino);
            }
            Ok(())
        })?;
        // A size recorded by an earlier write no longer describes the file.
        if let Some(ino) = truncated_ino {
            self.sizes.forget(ino);
        }
        Ok(())
    }

    async fn utimens(
        &self,
        path: &Path,
        atime: Option<SetTime>,
        mtime: Option<SetTime>,
    ) -> VfsResult<()> {
        self.replicate(Operation::Utimens, path, |_, p| physical::utimens(p, atime, mtime))
    }

    async fn setxattr(
        &self,
        path: &Path,
        name: &OsStr,
        value: &[u8],
        flags: i32,
    ) -> VfsResult<()> {
        self.replicate(Operation::Setxattr, path, |_, p| {
            physical::setxattr(p, name, value, flags)
        })
    }

    async fn removexattr(&self, path: &Path, name: &OsStr) -> VfsResult<()> {
        self.replicate(Operation::Removexattr, path, |_, p| physical::removexattr(p, name))
    }
}

#[async_trait]
impl StripedData for DualFs {
    async fn open(&self, path: &Path, flags: i32) -> VfsResult<()> {
        debug!(op = %Operation::Open, path = %path.display(), flags, "open");
        let pair = self.resolver.resolve(path)?;
        self.engine.open(&pair, flags)
    }

    async fn read(&self, path: &Path, offset: u64, size: u32) -> VfsResult<StripedRead> {
        let pair = self.resolver.resolve(path)?;
        self.engine.read(&pair, offset, size as usize)
    }

    async fn write(&self, path: &Path, offset: u64, data: &[u8]) -> VfsResult<StripedWrite> {
        let pair = self.resolver.resolve(path)?;
        let written = self.engine.write(&pair, offset, data)?;
        let ino = physical::lstat(&pair.a)
            .map_err(|e| VfsError::backend(Backend::A, e))?
            .ino;
        self.sizes.record(ino, offset + u64::from(written.requested));
        Ok(written)
    }

    async fn fallocate(&self, path: &Path, mode: i32, offset: u64, length: u64) -> VfsResult<()> {
        if mode != 0 {
            return Err(VfsError::not_supported(format!("fallocate mode {mode:#x}")));
        }
        self.replicate(Operation::Fallocate, path, |_, p| {
            physical::fallocate(p, offset, length)
        })
    }

    async fn create(&self, path: &Path, mode: u32, flags: i32) -> VfsResult<FileAttr> {
        let file_mode = (mode & 0o7777) | 0o100000;
        self.replicate(Operation::Create, path, |_, p| physical::mknod(p, file_mode, 0))?;

        let reopen = OFlags::from_bits_retain(flags as u32)
            - (OFlags::CREATE | OFlags::EXCL | OFlags::TRUNC);
        let pair = self.resolver.resolve(path)?;
        self.engine.open(&pair, reopen.bits() as i32)?;
        self.getattr(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::selector::SelectionPolicy;
    use crate::vfs::size_cache::SizeCachePolicy;
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    struct Setup {
        a: TempDir,
        b: TempDir,
        fs: DualFs,
    }

    fn setup() -> Setup {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let config = MountConfig::new("/mnt", a.path(), b.path()).with_stripe_unit(5);
        let fs = DualFs::new(Arc::new(config));
        Setup { a, b, fs }
    }

    #[tokio::test]
    async fn test_getattr_sums_halves() {
        let s = setup();
        std::fs::write(s.a.path().join("f"), b"hello!!").unwrap();
        std::fs::write(s.b.path().join("f"), b"world").unwrap();

        let attr = s.fs.getattr(Path::new("/f")).await.unwrap();
        assert_eq!(attr.size, 12);
    }

    #[tokio::test]
    async fn test_getattr_missing_b_half() {
        let s = setup();
        std::fs::write(s.a.path().join("f"), b"abc").unwrap();

        let attr = s.fs.getattr(Path::new("/f")).await.unwrap();
        assert_eq!(attr.size, 3);
    }

    #[tokio::test]
    async fn test_getattr_requires_backend_a() {
        let s = setup();
        std::fs::write(s.b.path().join("f"), b"abc").unwrap();

        let err = s.fs.getattr(Path::new("/f")).await.unwrap_err();
        assert_eq!(err.failed_backend(), Some(Backend::A));
    }

    #[tokio::test]
    async fn test_directory_size_not_summed() {
        let s = setup();
        s.fs.mkdir(Path::new("/d"), 0o755).await.unwrap();
        let own = std::fs::symlink_metadata(s.a.path().join("d")).unwrap();

        let attr = s.fs.getattr(Path::new("/d")).await.unwrap();
        assert!(attr.is_dir());
        assert_eq!(attr.size, std::os::unix::fs::MetadataExt::size(&own));
    }

    #[tokio::test]
    async fn test_create_write_read() {
        let s = setup();
        s.fs
            .create(Path::new("/f"), 0o644, OFlags::WRONLY.bits() as i32)
            .await
            .unwrap();

        let written = s.fs.write(Path::new("/f"), 0, b"helloworld!!").await.unwrap();
        assert_eq!(written.requested, 12);

        let read = s.fs.read(Path::new("/f"), 0, u32::MAX).await.unwrap();
        assert_eq!(read.data, b"helloworld!!");
        assert_eq!(read.logical_size, 12);
    }

    #[tokio::test]
    async fn test_truncate_drops_cached_size() {
        let s = setup();
        s.fs.mknod(Path::new("/f"), 0o100644, 0).await.unwrap();
        s.fs.write(Path::new("/f"), 0, b"helloworld!!").await.unwrap();

        s.fs.truncate(Path::new("/f"), 0).await.unwrap();
        let attr = s.fs.getattr(Path::new("/f")).await.unwrap();
        assert_eq!(attr.size, 0);
    }

    #[tokio::test]
    async fn test_truncate_applies_raw_length_to_both_halves() {
        let s = setup();
        s.fs.mknod(Path::new("/f"), 0o100644, 0).await.unwrap();
        s.fs.write(Path::new("/f"), 0, b"helloworld!!").await.unwrap();

        s.fs.truncate(Path::new("/f"), 3).await.unwrap();
        for root in [s.a.path(), s.b.path()] {
            assert_eq!(std::fs::metadata(root.join("f")).unwrap().len(), 3);
        }
        assert_eq!(s.fs.getattr(Path::new("/f")).await.unwrap().size, 6);
    }

    fn per_inode_setup() -> Setup {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let config = MountConfig::new("/mnt", a.path(), b.path())
            .with_stripe_unit(5)
            .with_size_cache(SizeCachePolicy::PerInode);
        let fs = DualFs::new(Arc::new(config));
        Setup { a, b, fs }
    }

    #[tokio::test]
    async fn test_unlink_forgets_cached_size() {
        let s = per_inode_setup();
        s.fs.mknod(Path::new("/f"), 0o100644, 0).await.unwrap();
        s.fs.write(Path::new("/f"), 0, b"helloworld!!").await.unwrap();
        let ino = std::fs::symlink_metadata(s.a.path().join("f")).unwrap().ino();
        assert_eq!(s.fs.sizes.reconcile(ino, 0), 12);

        s.fs.unlink(Path::new("/f")).await.unwrap();
        // A new file reusing the inode number must report its own size.
        assert_eq!(s.fs.sizes.reconcile(ino, 0), 0);

        s.fs.mknod(Path::new("/g"), 0o100644, 0).await.unwrap();
        assert_eq!(s.fs.getattr(Path::new("/g")).await.unwrap().size, 0);
    }

    #[tokio::test]
    async fn test_rename_forgets_replaced_size() {
        let s = per_inode_setup();
        s.fs.mknod(Path::new("/old"), 0o100644, 0).await.unwrap();
        s.fs.write(Path::new("/old"), 0, b"helloworld!!").await.unwrap();
        s.fs.mknod(Path::new("/new"), 0o100644, 0).await.unwrap();
        let ino = std::fs::symlink_metadata(s.a.path().join("old")).unwrap().ino();

        s.fs.rename(Path::new("/new"), Path::new("/old")).await.unwrap();
        assert_eq!(s.fs.sizes.reconcile(ino, 0), 0);
        assert_eq!(s.fs.getattr(Path::new("/old")).await.unwrap().size, 0);
    }

    #[tokio::test]
    async fn test_mknod_fifo_on_both_backends() {
        use std::os::unix::fs::FileTypeExt;

        let s = setup();
        s.fs.mknod(Path::new("/pipe"), 0o010644, 0).await.unwrap();
        for root in [s.a.path(), s.b.path()] {
            let meta = std::fs::symlink_metadata(root.join("pipe")).unwrap();
            assert!(meta.file_type().is_fifo());
        }
        let attr = s.fs.getattr(Path::new("/pipe")).await.unwrap();
        assert_eq!(attr.kind, FileType::NamedPipe);
    }

    #[tokio::test]
    async fn test_setattr_fans_out() {
        let s = setup();
        s.fs.mknod(Path::new("/f"), 0o100644, 0).await.unwrap();

        let attr = s
            .fs
            .setattr(Path::new("/f"), SetAttr::new().with_perm(0o600))
            .await
            .unwrap();
        assert_eq!(attr.perm, 0o600);
        for root in [s.a.path(), s.b.path()] {
            let meta = std::fs::metadata(root.join("f")).unwrap();
            let mode = std::os::unix::fs::PermissionsExt::mode(&meta.permissions());
            assert_eq!(mode & 0o7777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_setattr_stops_at_first_failing_step() {
        let s = setup();
        let err = s
            .fs
            .setattr(Path::new("/missing"), SetAttr::new().with_perm(0o600).with_size(0))
            .await
            .unwrap_err();
        assert_eq!(err.errno(), 2);
        assert!(!s.a.path().join("missing").exists());
        assert!(!s.b.path().join("missing").exists());
    }

    #[tokio::test]
    async fn test_readdir_includes_dot_entries() {
        let s = setup();
        s.fs.mkdir(Path::new("/d"), 0o755).await.unwrap();
        s.fs.mknod(Path::new("/d/f"), 0o100644, 0).await.unwrap();

        let entries = s.fs.readdir(Path::new("/d")).await.unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.name.to_string_lossy().into_owned())
            .collect();
        assert_eq!(&names[..2], &[".", ".."]);
        assert!(names.contains(&"f".to_string()));
    }

    #[tokio::test]
    async fn test_symlink_points_at_selected_backend() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let config = MountConfig::new("/mnt", a.path(), b.path())
            .with_selection(SelectionPolicy::A);
        let fs = DualFs::new(Arc::new(config));

        fs.mknod(Path::new("/target"), 0o100644, 0).await.unwrap();
        fs.symlink(Path::new("/target"), Path::new("/link")).await.unwrap();

        let expected = a.path().join("target");
        assert_eq!(std::fs::read_link(a.path().join("link")).unwrap(), expected);
        assert_eq!(std::fs::read_link(b.path().join("link")).unwrap(), expected);
        assert_eq!(fs.readlink(Path::new("/link")).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_fallocate_rejects_modes() {
        let s = setup();
        s.fs.mknod(Path::new("/f"), 0o100644, 0).await.unwrap();

        let err = s.fs.fallocate(Path::new("/f"), 1, 0, 10).await.unwrap_err();
        assert!(matches!(err, VfsError::NotSupported(_)));
        assert_eq!(std::fs::metadata(s.a.path().join("f")).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_access_existence() {
        const F_OK: i32 = 0;
        let s = setup();
        s.fs.mkdir(Path::new("/d"), 0o755).await.unwrap();

        s.fs.access(Path::new("/d"), F_OK).await.unwrap();
        let err = s.fs.access(Path::new("/nope"), F_OK).await.unwrap_err();
        assert_eq!(err.errno(), 2);
    }

    #[tokio::test]
    async fn test_no_op_release_and_fsync() {
        let s = setup();
        assert!(s.fs.release(Path::new("/whatever")).await.is_ok());
        assert!(s.fs.fsync(Path::new("/whatever"), true).await.is_ok());
    }
}
