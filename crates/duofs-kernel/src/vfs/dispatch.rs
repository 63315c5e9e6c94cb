//! Operation names.
//!
//! Every FUSE callback maps to one of these; they tag log lines and error
//! replies so a failure can be traced to the call that produced it.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Every virtual-filesystem operation the driver exposes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
    Getattr,
    Access,
    Readlink,
    Readdir,
    Mknod,
    Mkdir,
    Symlink,
    Unlink,
    Rmdir,
    Rename,
    Link,
    Chmod,
    Chown,
    Truncate,
    Utimens,
    Open,
    Read,
    Write,
    Statfs,
    Release,
    Fsync,
    Fallocate,
    Getxattr,
    Setxattr,
    Listxattr,
    Removexattr,
    Create,
    /// chmod, chown, truncate and utimens as one request.
    Setattr,
}
