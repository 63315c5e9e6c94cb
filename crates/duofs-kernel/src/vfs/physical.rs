//! Blocking syscalls against one physical path.
//!
//! These are the leaf calls the replicator and the single-backend queries run
//! on each backend. None of them follow a trailing symlink unless the
//! underlying POSIX call does (chmod, truncate, access, statvfs).

use std::ffi::OsStr;
use std::fs::{DirBuilder, OpenOptions, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rustix::fs::{
    Access, AtFlags, CWD, FallocateFlags, FileType as RawFileType, Mode, Timespec, Timestamps,
    XattrFlags,
};

use crate::vfs::types::{FileAttr, SetTime, StatFs, XattrReply};

pub fn lstat(path: &Path) -> io::Result<FileAttr> {
    Ok(FileAttr::from_metadata(&std::fs::symlink_metadata(path)?))
}

/// Create a regular file, FIFO or device node.
///
/// Regular files go through an exclusive create so the mode is applied the
/// same way `open(O_CREAT|O_EXCL)` would.
pub fn mknod(path: &Path, mode: u32, rdev: u64) -> io::Result<()> {
    let kind = if mode & 0o170000 == 0 {
        RawFileType::RegularFile
    } else {
        RawFileType::from_raw_mode(mode)
    };
    match kind {
        RawFileType::RegularFile => {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(mode & 0o7777)
                .open(path)?;
            Ok(())
        }
        RawFileType::Fifo => {
            rustix::fs::mknodat(CWD, path, RawFileType::Fifo, Mode::from_raw_mode(mode), 0)?;
            Ok(())
        }
        kind => {
            rustix::fs::mknodat(CWD, path, kind, Mode::from_raw_mode(mode), rdev as _)?;
            Ok(())
        }
    }
}

pub fn mkdir(path: &Path, mode: u32) -> io::Result<()> {
    DirBuilder::new().mode(mode & 0o7777).create(path)
}

pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

pub fn unlink(path: &Path) -> io::Result<()> {
    std::fs::remove_file(path)
}

pub fn rmdir(path: &Path) -> io::Result<()> {
    std::fs::remove_dir(path)
}

pub fn rename(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::rename(from, to)
}

pub fn link(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::hard_link(from, to)
}

pub fn chmod(path: &Path, mode: u32) -> io::Result<()> {
    std::fs::set_permissions(path, Permissions::from_mode(mode & 0o7777))
}

/// Change owner without following a trailing symlink.
pub fn chown(path: &Path, uid: Option<u32>, gid: Option<u32>) -> io::Result<()> {
    std::os::unix::fs::lchown(path, uid, gid)
}

pub fn truncate(path: &Path, size: u64) -> io::Result<()> {
    OpenOptions::new().write(true).open(path)?.set_len(size)
}

/// Set access and modification times without following symlinks.
///
/// A `None` keeps the current value of that timestamp.
pub fn utimens(path: &Path, atime: Option<SetTime>, mtime: Option<SetTime>) -> io::Result<()> {
    let current = if atime.is_none() || mtime.is_none() {
        Some(lstat(path)?)
    } else {
        None
    };
    let pick = |requested: Option<SetTime>, existing: fn(&FileAttr) -> SystemTime| match requested {
        Some(t) => Ok(t.resolve()),
        None => current
            .as_ref()
            .map(existing)
            .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput)),
    };
    let times = Timestamps {
        last_access: timespec(pick(atime, |a| a.atime)?),
        last_modification: timespec(pick(mtime, |a| a.mtime)?),
    };
    rustix::fs::utimensat(CWD, path, &times, AtFlags::SYMLINK_NOFOLLOW)?;
    Ok(())
}

fn timespec(t: SystemTime) -> Timespec {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => Timespec {
            tv_sec: d.as_secs() as _,
            tv_nsec: d.subsec_nanos() as _,
        },
        Err(before) => {
            let d = before.duration();
            let mut secs = -(d.as_secs() as i64);
            let mut nsecs = 0i64;
            if d.subsec_nanos() > 0 {
                secs -= 1;
                nsecs = 1_000_000_000 - d.subsec_nanos() as i64;
            }
            Timespec {
                tv_sec: secs as _,
                tv_nsec: nsecs as _,
            }
        }
    }
}

pub fn statfs(path: &Path) -> io::Result<StatFs> {
    let st = rustix::fs::statvfs(path)?;
    Ok(StatFs {
        blocks: st.f_blocks,
        bfree: st.f_bfree,
        bavail: st.f_bavail,
        files: st.f_files,
        ffree: st.f_ffree,
        bsize: st.f_bsize as u32,
        namelen: st.f_namemax as u32,
        frsize: st.f_frsize as u32,
    })
}

pub fn access(path: &Path, mask: i32) -> io::Result<()> {
    rustix::fs::access(path, Access::from_bits_truncate(mask as _))?;
    Ok(())
}

/// Reserve `length` bytes at `offset` (plain mode only).
pub fn fallocate(path: &Path, offset: u64, length: u64) -> io::Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    rustix::fs::fallocate(&file, FallocateFlags::empty(), offset, length)?;
    Ok(())
}

pub fn getxattr(path: &Path, name: &OsStr, size: u32) -> io::Result<XattrReply> {
    if size == 0 {
        let len = rustix::fs::lgetxattr(path, name, &mut [])?;
        return Ok(XattrReply::Size(len as u32));
    }
    let mut buf = vec![0u8; size as usize];
    let len = rustix::fs::lgetxattr(path, name, &mut buf)?;
    buf.truncate(len);
    Ok(XattrReply::Data(buf))
}

pub fn setxattr(path: &Path, name: &OsStr, value: &[u8], flags: i32) -> io::Result<()> {
    rustix::fs::lsetxattr(path, name, value, XattrFlags::from_bits_truncate(flags as _))?;
    Ok(())
}

pub fn listxattr(path: &Path, size: u32) -> io::Result<XattrReply> {
    if size == 0 {
        let len = rustix::fs::llistxattr(path, &mut [])?;
        return Ok(XattrReply::Size(len as u32));
    }
    let mut buf = vec![0; size as usize];
    let len = rustix::fs::llistxattr(path, &mut buf)?;
    Ok(XattrReply::Data(buf[..len].to_vec()))
}

pub fn removexattr(path: &Path, name: &OsStr) -> io::Result<()> {
    rustix::fs::lremovexattr(path, name)?;
    Ok(())
}

/// Clear the process umask so requested modes reach the backends unchanged.
pub fn clear_umask() -> u32 {
    rustix::process::umask(Mode::empty()).bits() as u32
}
