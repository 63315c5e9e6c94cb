//! Dual-backend virtual filesystem.
//!
//! Key components, leaves first:
//!
//! - [`PathResolver`] - virtual path to one physical path per backend
//! - [`BackendSelector`] - picks the backend for read-only queries
//! - [`Replicator`] - applies structural changes to A then B
//! - [`SizeCache`] - corrects sizes reported right after a write
//! - [`StripingEngine`] - chunked reads and writes alternating A and B
//! - [`DualFs`] - implements [`MirroredMetadata`] and [`StripedData`]
//!
//! ## Design Decisions
//!
//! - **Two roles for two backends**: for the namespace the backends are
//!   mirrors; for file content they are halves. The traits keep the two apart.
//! - **No rollback**: a replicated change that fails on B after succeeding on
//!   A leaves the trees divergent and reports B's error.
//! - **Path-based**: FUSE inode numbers are mapped to paths by the caller.

mod dispatch;
mod dual;
mod error;
mod ops;
pub mod physical;
mod replicate;
mod resolve;
mod selector;
mod size_cache;
mod stripe;
mod types;

pub use dispatch::Operation;
pub use dual::DualFs;
pub use error::{VfsError, VfsResult};
pub use ops::{MirroredMetadata, StripedData};
pub use replicate::Replicator;
pub use resolve::{Backend, PathResolver, ResolvedPair};
pub use selector::{BackendSelector, SelectionPolicy};
pub use size_cache::{SizeCache, SizeCachePolicy};
pub use stripe::{ChunkIo, LocalChunkIo, StripingEngine};
pub use types::{
    DirEntry, FileAttr, FileType, SetAttr, SetTime, StatFs, StripedRead, StripedWrite, XattrReply,
};
