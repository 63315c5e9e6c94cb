//! `fuser::Filesystem` adapter over [`DualFs`].
//!
//! Each callback turns the kernel's inode numbers into virtual paths through
//! the [`InodeTable`], drives the matching kernel operation to completion with
//! [`Handle::block_on`] on the FUSE thread, and converts the result into a
//! reply. Errors are answered with the errno the kernel layer reports.

use std::ffi::OsStr;
use std::os::raw::c_int;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use duofs_kernel::{
    DualFs, FileAttr, FileType, MirroredMetadata, Operation, SetAttr, SetTime, StripedData,
    VfsError, VfsResult, XattrReply,
};
use fuser::{
    KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use tokio::runtime::Handle;
use tracing::{debug, info, trace};

use crate::inode::{InodeTable, ROOT_INO};

/// How long the kernel may cache attributes and entries.
const TTL: Duration = Duration::from_secs(1);

// ============================================================================
// Error context
// ============================================================================

/// A failed callback: which operation, on which inode, and why.
pub struct FuseErrorContext<'a> {
    pub error: &'a VfsError,
    pub operation: Operation,
    pub ino: u64,
}

impl FuseErrorContext<'_> {
    /// Log the failure and return the errno to reply with.
    pub fn log_and_errno(&self) -> c_int {
        let errno = self.error.errno();
        if errno == libc::ENOENT {
            trace!(op = %self.operation, ino = self.ino, errno, "FUSE op returned ENOENT");
        } else {
            debug!(
                op = %self.operation,
                ino = self.ino,
                errno,
                error = %self.error,
                "FUSE op failed"
            );
        }
        errno
    }
}

// ============================================================================
// Type conversions
// ============================================================================

pub(crate) fn to_fuser_file_type(kind: FileType) -> fuser::FileType {
    match kind {
        FileType::File => fuser::FileType::RegularFile,
        FileType::Directory => fuser::FileType::Directory,
        FileType::Symlink => fuser::FileType::Symlink,
        FileType::NamedPipe => fuser::FileType::NamedPipe,
        FileType::CharDevice => fuser::FileType::CharDevice,
        FileType::BlockDevice => fuser::FileType::BlockDevice,
        FileType::Socket => fuser::FileType::Socket,
    }
}

/// Pack a host device number into the 32-bit form FUSE carries.
///
/// Same layout as the kernel's `new_encode_dev`: 12-bit major, 20-bit minor.
pub(crate) fn encode_rdev(rdev: u64) -> u32 {
    let major = libc::major(rdev);
    let minor = libc::minor(rdev);
    (minor & 0xff) | ((major & 0xfff) << 8) | ((minor & !0xff) << 12)
}

/// Backend attributes under the driver's inode number `ino`.
pub(crate) fn to_file_attr(ino: u64, attr: &FileAttr) -> fuser::FileAttr {
    fuser::FileAttr {
        ino,
        size: attr.size,
        blocks: attr.blocks,
        atime: attr.atime,
        mtime: attr.mtime,
        ctime: attr.ctime,
        crtime: attr.ctime,
        kind: to_fuser_file_type(attr.kind),
        perm: (attr.perm & 0o7777) as u16,
        nlink: attr.nlink,
        uid: attr.uid,
        gid: attr.gid,
        rdev: encode_rdev(attr.rdev),
        blksize: attr.blksize,
        flags: 0,
    }
}

fn to_set_time(time: TimeOrNow) -> SetTime {
    match time {
        TimeOrNow::Now => SetTime::Now,
        TimeOrNow::SpecificTime(t) => SetTime::At(t),
    }
}

/// Collect the optional setattr fields into a [`SetAttr`].
pub(crate) fn to_set_attr(
    mode: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    size: Option<u64>,
    atime: Option<TimeOrNow>,
    mtime: Option<TimeOrNow>,
) -> SetAttr {
    let mut attr = SetAttr::new().with_owner(uid, gid);
    if let Some(mode) = mode {
        attr = attr.with_perm(mode & 0o7777);
    }
    if let Some(size) = size {
        attr = attr.with_size(size);
    }
    if let Some(atime) = atime {
        attr = attr.with_atime(to_set_time(atime));
    }
    if let Some(mtime) = mtime {
        attr = attr.with_mtime(to_set_time(mtime));
    }
    attr
}

// ============================================================================
// Filesystem
// ============================================================================

/// FUSE front end of a mounted duofs.
pub struct DuoFuse {
    fs: Arc<DualFs>,
    inodes: InodeTable,
    runtime: Handle,
}

impl DuoFuse {
    pub fn new(fs: Arc<DualFs>, runtime: Handle) -> Self {
        Self {
            fs,
            inodes: InodeTable::new(),
            runtime,
        }
    }

    fn path_of(&self, ino: u64) -> VfsResult<PathBuf> {
        self.inodes
            .path(ino)
            .ok_or_else(|| VfsError::not_found(format!("inode {ino}")))
    }

    fn child_of(&self, parent: u64, name: &OsStr) -> VfsResult<PathBuf> {
        self.inodes
            .child_path(parent, name)
            .ok_or_else(|| VfsError::not_found(format!("inode {parent}")))
    }

    /// Attributes of `path` for a new kernel reference.
    async fn entry(&self, path: &Path) -> VfsResult<fuser::FileAttr> {
        let attr = self.fs.getattr(path).await?;
        let ino = self.inodes.lookup(path);
        Ok(to_file_attr(ino, &attr))
    }

    fn run<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
        self.runtime.block_on(fut)
    }

    fn errno(op: Operation, ino: u64, error: &VfsError) -> c_int {
        FuseErrorContext {
            error,
            operation: op,
            ino,
        }
        .log_and_errno()
    }

    fn reply_entry(op: Operation, ino: u64, result: VfsResult<fuser::FileAttr>, reply: ReplyEntry) {
        match result {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => reply.error(Self::errno(op, ino, &e)),
        }
    }

    fn reply_empty(op: Operation, ino: u64, result: VfsResult<()>, reply: ReplyEmpty) {
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(Self::errno(op, ino, &e)),
        }
    }

    fn reply_xattr(op: Operation, ino: u64, result: VfsResult<XattrReply>, reply: ReplyXattr) {
        match result {
            Ok(XattrReply::Size(size)) => reply.size(size),
            Ok(XattrReply::Data(data)) => reply.data(&data),
            Err(e) => reply.error(Self::errno(op, ino, &e)),
        }
    }
}

impl fuser::Filesystem for DuoFuse {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int> {
        let config = self.fs.config();
        info!(
            mount_point = %config.mount_point.display(),
            backend_a = %config.backend_a.display(),
            backend_b = %config.backend_b.display(),
            stripe_unit = config.stripe_unit,
            selection = %config.selection,
            "duofs mounted"
        );
        Ok(())
    }

    fn destroy(&mut self) {
        info!(
            mount_point = %self.fs.config().mount_point.display(),
            "duofs unmounted"
        );
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!(parent, ?name, "lookup");
        let result = self.run(async {
            let path = self.child_of(parent, name)?;
            self.entry(&path).await
        });
        Self::reply_entry(Operation::Getattr, parent, result, reply);
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        trace!(ino, nlookup, "forget");
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        debug!(ino, "getattr");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.getattr(&path).await
        });
        match result {
            Ok(attr) => reply.attr(&TTL, &to_file_attr(ino, &attr)),
            Err(e) => reply.error(Self::errno(Operation::Getattr, ino, &e)),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        debug!(ino, ?mode, ?uid, ?gid, ?size, "setattr");
        let changes = to_set_attr(mode, uid, gid, size, atime, mtime);
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.setattr(&path, changes).await
        });
        match result {
            Ok(attr) => reply.attr(&TTL, &to_file_attr(ino, &attr)),
            Err(e) => reply.error(Self::errno(Operation::Setattr, ino, &e)),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        debug!(ino, "readlink");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.readlink(&path).await
        });
        match result {
            Ok(target) => reply.data(target.as_os_str().as_bytes()),
            Err(e) => reply.error(Self::errno(Operation::Readlink, ino, &e)),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        debug!(parent, ?name, mode = format_args!("{mode:o}"), rdev, "mknod");
        let result = self.run(async {
            let path = self.child_of(parent, name)?;
            self.fs.mknod(&path, mode, u64::from(rdev)).await?;
            self.entry(&path).await
        });
        Self::reply_entry(Operation::Mknod, parent, result, reply);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        debug!(parent, ?name, mode = format_args!("{mode:o}"), "mkdir");
        let result = self.run(async {
            let path = self.child_of(parent, name)?;
            self.fs.mkdir(&path, mode).await?;
            self.entry(&path).await
        });
        Self::reply_entry(Operation::Mkdir, parent, result, reply);
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!(parent, ?name, "unlink");
        let result = self.run(async {
            let path = self.child_of(parent, name)?;
            self.fs.unlink(&path).await?;
            self.inodes.remove(&path);
            Ok::<_, VfsError>(())
        });
        Self::reply_empty(Operation::Unlink, parent, result, reply);
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!(parent, ?name, "rmdir");
        let result = self.run(async {
            let path = self.child_of(parent, name)?;
            self.fs.rmdir(&path).await?;
            self.inodes.remove(&path);
            Ok::<_, VfsError>(())
        });
        Self::reply_empty(Operation::Rmdir, parent, result, reply);
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        debug!(parent, ?link_name, target = %target.display(), "symlink");
        let result = self.run(async {
            let link = self.child_of(parent, link_name)?;
            self.fs.symlink(target, &link).await?;
            self.entry(&link).await
        });
        Self::reply_entry(Operation::Symlink, parent, result, reply);
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        debug!(parent, ?name, newparent, ?newname, flags, "rename");
        if flags != 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let result = self.run(async {
            let from = self.child_of(parent, name)?;
            let to = self.child_of(newparent, newname)?;
            self.fs.rename(&from, &to).await?;
            self.inodes.rename(&from, &to);
            Ok::<_, VfsError>(())
        });
        Self::reply_empty(Operation::Rename, parent, result, reply);
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        debug!(ino, newparent, ?newname, "link");
        let result = self.run(async {
            let from = self.path_of(ino)?;
            let to = self.child_of(newparent, newname)?;
            self.fs.link(&from, &to).await?;
            self.entry(&to).await
        });
        Self::reply_entry(Operation::Link, ino, result, reply);
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!(ino, flags = format_args!("{flags:#o}"), "open");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.open(&path, flags).await
        });
        match result {
            Ok(()) => reply.opened(0, 0),
            Err(e) => reply.error(Self::errno(Operation::Open, ino, &e)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        debug!(ino, offset, size, "read");
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.read(&path, offset, size).await
        });
        match result {
            Ok(read) => {
                trace!(ino, logical_size = read.logical_size, got = read.data.len(), "read done");
                reply.data(&read.data);
            }
            Err(e) => reply.error(Self::errno(Operation::Read, ino, &e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        debug!(ino, offset, len = data.len(), "write");
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.write(&path, offset, data).await
        });
        match result {
            Ok(written) => reply.written(written.requested),
            Err(e) => reply.error(Self::errno(Operation::Write, ino, &e)),
        }
    }

    fn flush(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _lock_owner: u64,
        reply: ReplyEmpty,
    ) {
        trace!(ino, "flush");
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        debug!(ino, "release");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.release(&path).await
        });
        Self::reply_empty(Operation::Release, ino, result, reply);
    }

    fn fsync(&mut self, _req: &Request<'_>, ino: u64, _fh: u64, datasync: bool, reply: ReplyEmpty) {
        debug!(ino, datasync, "fsync");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.fsync(&path, datasync).await
        });
        Self::reply_empty(Operation::Fsync, ino, result, reply);
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!(ino, offset, "readdir");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            let entries = self.fs.readdir(&path).await?;
            Ok::<_, VfsError>((path, entries))
        });
        let (path, entries) = match result {
            Ok(listing) => listing,
            Err(e) => {
                reply.error(Self::errno(Operation::Readdir, ino, &e));
                return;
            }
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, entry) in entries.iter().enumerate().skip(skip) {
            let entry_ino = match entry.name.as_bytes() {
                b"." => ino,
                b".." => path
                    .parent()
                    .and_then(|p| self.inodes.peek(p))
                    .unwrap_or(ROOT_INO),
                // Listing takes no kernel reference, so unseen entries keep
                // their backend number instead of growing the table.
                _ => self
                    .inodes
                    .peek(&path.join(&entry.name))
                    .unwrap_or(entry.ino),
            };
            let next = (i + 1) as i64;
            if reply.add(entry_ino, next, to_fuser_file_type(entry.kind), &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        debug!(ino, "statfs");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.statfs(&path).await
        });
        match result {
            Ok(st) => reply.statfs(
                st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namelen,
                st.frsize,
            ),
            Err(e) => reply.error(Self::errno(Operation::Statfs, ino, &e)),
        }
    }

    fn setxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        debug!(ino, ?name, len = value.len(), flags, "setxattr");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.setxattr(&path, name, value, flags).await
        });
        Self::reply_empty(Operation::Setxattr, ino, result, reply);
    }

    fn getxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        size: u32,
        reply: ReplyXattr,
    ) {
        debug!(ino, ?name, size, "getxattr");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.getxattr(&path, name, size).await
        });
        Self::reply_xattr(Operation::Getxattr, ino, result, reply);
    }

    fn listxattr(&mut self, _req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        debug!(ino, size, "listxattr");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.listxattr(&path, size).await
        });
        Self::reply_xattr(Operation::Listxattr, ino, result, reply);
    }

    fn removexattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        debug!(ino, ?name, "removexattr");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.removexattr(&path, name).await
        });
        Self::reply_empty(Operation::Removexattr, ino, result, reply);
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        debug!(ino, mask, "access");
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.access(&path, mask).await
        });
        Self::reply_empty(Operation::Access, ino, result, reply);
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        debug!(parent, ?name, mode = format_args!("{mode:o}"), flags, "create");
        let result = self.run(async {
            let path = self.child_of(parent, name)?;
            let attr = self.fs.create(&path, mode, flags).await?;
            let ino = self.inodes.lookup(&path);
            Ok::<_, VfsError>(to_file_attr(ino, &attr))
        });
        match result {
            Ok(attr) => reply.created(&TTL, &attr, 0, 0, 0),
            Err(e) => reply.error(Self::errno(Operation::Create, parent, &e)),
        }
    }

    fn fallocate(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        length: i64,
        mode: i32,
        reply: ReplyEmpty,
    ) {
        debug!(ino, offset, length, mode, "fallocate");
        let (Ok(offset), Ok(length)) = (u64::try_from(offset), u64::try_from(length)) else {
            reply.error(libc::EINVAL);
            return;
        };
        let result = self.run(async {
            let path = self.path_of(ino)?;
            self.fs.fallocate(&path, mode, offset, length).await
        });
        Self::reply_empty(Operation::Fallocate, ino, result, reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    fn sample_attr(kind: FileType) -> FileAttr {
        FileAttr {
            ino: 4242,
            size: 12,
            blocks: 8,
            kind,
            perm: 0o100644,
            nlink: 1,
            uid: 1000,
            gid: 1000,
            rdev: 0,
            blksize: 4096,
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH + Duration::from_secs(10),
            ctime: UNIX_EPOCH + Duration::from_secs(20),
        }
    }

    #[test]
    fn test_file_attr_uses_driver_inode() {
        let attr = to_file_attr(7, &sample_attr(FileType::File));
        assert_eq!(attr.ino, 7);
        assert_eq!(attr.size, 12);
        assert_eq!(attr.perm, 0o644);
        assert_eq!(attr.kind, fuser::FileType::RegularFile);
        assert_eq!(attr.crtime, attr.ctime);
        assert_eq!(attr.mtime, UNIX_EPOCH + Duration::from_secs(10));
    }

    #[test]
    fn test_device_number_encoding() {
        assert_eq!(encode_rdev(0), 0);
        assert_eq!(encode_rdev(libc::makedev(8, 1)), 0x801);
        // Minors above 255 spill into the high bits instead of being cut off.
        assert_eq!(encode_rdev(libc::makedev(259, 0x12345)), 0x1231_0345);

        let mut attr = sample_attr(FileType::BlockDevice);
        attr.rdev = libc::makedev(1, 3);
        assert_eq!(to_file_attr(9, &attr).rdev, 0x103);
    }

    #[test]
    fn test_file_type_conversion() {
        assert_eq!(to_fuser_file_type(FileType::Directory), fuser::FileType::Directory);
        assert_eq!(to_fuser_file_type(FileType::Symlink), fuser::FileType::Symlink);
        assert_eq!(to_fuser_file_type(FileType::NamedPipe), fuser::FileType::NamedPipe);
        assert_eq!(to_fuser_file_type(FileType::Socket), fuser::FileType::Socket);
    }

    #[test]
    fn test_set_attr_collects_fields() {
        let when = UNIX_EPOCH + Duration::from_secs(99);
        let attr = to_set_attr(
            Some(0o100600),
            None,
            Some(5),
            Some(3),
            Some(TimeOrNow::Now),
            Some(TimeOrNow::SpecificTime(when)),
        );
        assert_eq!(attr.perm, Some(0o600));
        assert_eq!(attr.uid, None);
        assert_eq!(attr.gid, Some(5));
        assert_eq!(attr.size, Some(3));
        assert_eq!(attr.atime, Some(SetTime::Now));
        assert_eq!(attr.mtime, Some(SetTime::At(when)));
    }

    #[test]
    fn test_empty_set_attr() {
        assert!(to_set_attr(None, None, None, None, None, None).is_empty());
    }

    #[test]
    fn test_error_context_returns_errno() {
        let err = VfsError::not_found("/missing");
        let ctx = FuseErrorContext {
            error: &err,
            operation: Operation::Getattr,
            ino: 3,
        };
        assert_eq!(ctx.log_and_errno(), libc::ENOENT);

        let err = VfsError::not_supported("fallocate mode 1");
        let ctx = FuseErrorContext {
            error: &err,
            operation: Operation::Fallocate,
            ino: 3,
        };
        assert_eq!(ctx.log_and_errno(), libc::EOPNOTSUPP);
    }
}
