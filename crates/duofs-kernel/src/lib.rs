//! # duofs-kernel
//!
//! Core of duofs: one logical filesystem stored on two directory trees.
//!
//! Structural changes (mkdir, rename, chmod, xattrs, ...) are replicated to
//! both trees. File content is striped: fixed-size chunks alternate between
//! backend A and backend B, so each tree holds half of every file.
//! Read-only queries are answered by one backend picked per call.

pub mod config;
pub mod constants;
pub mod vfs;

pub use config::{ConfigError, MountConfig, MountOptions};
pub use vfs::{
    Backend, DirEntry, DualFs, FileAttr, FileType, MirroredMetadata, Operation, SelectionPolicy,
    SetAttr, SetTime, SizeCachePolicy, StatFs, StripedData, StripedRead, StripedWrite, VfsError,
    VfsResult, XattrReply,
};
