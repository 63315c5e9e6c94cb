//! Size reconciliation cache.
//!
//! Writes record the logical size they produced; the next attribute query for
//! the same inode reports that size instead of what the backends' directory
//! entries say. The default policy keeps one slot for the whole process, so
//! any attribute query on another inode drops the record. The window in which
//! a correction can happen is therefore narrow.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::trace;

/// Which cache layout to use.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SizeCachePolicy {
    /// One record for the whole process.
    #[default]
    SingleSlot,
    /// One record per inode.
    PerInode,
}

#[derive(Debug, Default)]
struct Slot {
    ino: u64,
    size: Option<u64>,
}

#[derive(Debug)]
enum Inner {
    Single(Slot),
    PerInode(HashMap<u64, u64>),
}

/// Process-wide size records, guarded by a mutex.
#[derive(Debug)]
pub struct SizeCache {
    inner: Mutex<Inner>,
}

impl SizeCache {
    pub fn new(policy: SizeCachePolicy) -> Self {
        let inner = match policy {
            SizeCachePolicy::SingleSlot => Inner::Single(Slot::default()),
            SizeCachePolicy::PerInode => Inner::PerInode(HashMap::new()),
        };
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Remember the logical size just written to `ino`.
    pub fn record(&self, ino: u64, size: u64) {
        trace!(ino, size, "size cache record");
        match &mut *self.inner.lock() {
            Inner::Single(slot) => {
                slot.ino = ino;
                slot.size = Some(size);
            }
            Inner::PerInode(map) => {
                map.insert(ino, size);
            }
        }
    }

    /// Correct a freshly fetched size for `ino`.
    ///
    /// Returns the size to report. With the single-slot policy the slot
    /// always adopts `ino` afterwards; a record made for another inode is
    /// discarded rather than applied.
    pub fn reconcile(&self, ino: u64, reported: u64) -> u64 {
        match &mut *self.inner.lock() {
            Inner::Single(slot) => {
                let size = match slot.size {
                    Some(cached) if slot.ino == ino => cached,
                    _ => {
                        slot.size = None;
                        reported
                    }
                };
                slot.ino = ino;
                if size != reported {
                    trace!(ino, reported, size, "size corrected");
                }
                size
            }
            Inner::PerInode(map) => map.get(&ino).copied().unwrap_or(reported),
        }
    }

    /// Drop any record for `ino`.
    pub fn forget(&self, ino: u64) {
        match &mut *self.inner.lock() {
            Inner::Single(slot) => {
                if slot.ino == ino {
                    slot.size = None;
                }
            }
            Inner::PerInode(map) => {
                map.remove(&ino);
            }
        }
    }
}

impl Default for SizeCache {
    fn default() -> Self {
        Self::new(SizeCachePolicy::default())
    }
}
