//! Inode number to virtual path mapping.
//!
//! The kernel addresses everything by inode number while [`DualFs`] works on
//! virtual paths, so the driver hands out its own inode numbers and keeps
//! the path each one stands for. Inode 1 is the root, `/`.
//!
//! Entries carry the kernel's lookup count; `forget` drops an entry once the
//! count reaches zero. Hard links get one inode number per path.
//!
//! [`DualFs`]: duofs_kernel::DualFs

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Inode number of the mount root.
pub const ROOT_INO: u64 = fuser::FUSE_ROOT_ID;

#[derive(Debug)]
struct Node {
    path: PathBuf,
    lookups: u64,
}

#[derive(Debug)]
struct Inner {
    nodes: HashMap<u64, Node>,
    by_path: HashMap<PathBuf, u64>,
    next_ino: u64,
}

impl Inner {
    fn get_or_create(&mut self, path: &Path) -> u64 {
        if let Some(&ino) = self.by_path.get(path) {
            return ino;
        }
        let ino = self.next_ino;
        self.next_ino += 1;
        self.nodes.insert(
            ino,
            Node {
                path: path.to_path_buf(),
                lookups: 0,
            },
        );
        self.by_path.insert(path.to_path_buf(), ino);
        ino
    }

    fn drop_subtree(&mut self, root: &Path) {
        let doomed: Vec<u64> = self
            .nodes
            .iter()
            .filter(|&(&ino, node)| ino != ROOT_INO && node.path.starts_with(root))
            .map(|(&ino, _)| ino)
            .collect();
        for ino in doomed {
            if let Some(node) = self.nodes.remove(&ino) {
                self.by_path.remove(&node.path);
            }
        }
    }
}

/// Thread-safe inode table shared by all FUSE callbacks.
#[derive(Debug)]
pub struct InodeTable {
    inner: Mutex<Inner>,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    /// A table holding only the root.
    pub fn new() -> Self {
        let root = PathBuf::from("/");
        let mut nodes = HashMap::new();
        nodes.insert(
            ROOT_INO,
            Node {
                path: root.clone(),
                lookups: 1,
            },
        );
        let mut by_path = HashMap::new();
        by_path.insert(root, ROOT_INO);
        Self {
            inner: Mutex::new(Inner {
                nodes,
                by_path,
                next_ino: ROOT_INO + 1,
            }),
        }
    }

    /// Virtual path of `ino`, if it is known.
    pub fn path(&self, ino: u64) -> Option<PathBuf> {
        self.inner.lock().nodes.get(&ino).map(|n| n.path.clone())
    }

    /// Virtual path of `name` inside directory `parent`.
    pub fn child_path(&self, parent: u64, name: &OsStr) -> Option<PathBuf> {
        self.path(parent).map(|p| p.join(name))
    }

    /// Inode number already assigned to `path`, if any. Never allocates.
    pub fn peek(&self, path: &Path) -> Option<u64> {
        self.inner.lock().by_path.get(path).copied()
    }

    /// Inode number for `path`, counting one kernel lookup.
    pub fn lookup(&self, path: &Path) -> u64 {
        let mut inner = self.inner.lock();
        let ino = inner.get_or_create(path);
        if let Some(node) = inner.nodes.get_mut(&ino) {
            node.lookups += 1;
        }
        ino
    }

    /// Drop `nlookup` kernel references; the entry goes away at zero.
    pub fn forget(&self, ino: u64, nlookup: u64) {
        if ino == ROOT_INO {
            return;
        }
        let mut inner = self.inner.lock();
        let gone = match inner.nodes.get_mut(&ino) {
            Some(node) => {
                node.lookups = node.lookups.saturating_sub(nlookup);
                node.lookups == 0
            }
            None => false,
        };
        if gone {
            if let Some(node) = inner.nodes.remove(&ino) {
                inner.by_path.remove(&node.path);
            }
        }
    }

    /// Forget a path that no longer exists, along with anything below it.
    pub fn remove(&self, path: &Path) {
        self.inner.lock().drop_subtree(path);
    }

    /// Move `from` and everything below it to `to`.
    ///
    /// Entries previously at `to` were replaced on the backends and are
    /// dropped.
    pub fn rename(&self, from: &Path, to: &Path) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.drop_subtree(to);

        let moved: Vec<(u64, PathBuf)> = inner
            .nodes
            .iter()
            .filter(|(_, node)| node.path.starts_with(from))
            .filter_map(|(&ino, node)| {
                let rest = node.path.strip_prefix(from).ok()?;
                let new_path = if rest.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(rest)
                };
                Some((ino, new_path))
            })
            .collect();

        for (ino, new_path) in moved {
            if let Some(node) = inner.nodes.get_mut(&ino) {
                let old = std::mem::replace(&mut node.path, new_path.clone());
                inner.by_path.remove(&old);
                inner.by_path.insert(new_path, ino);
            }
        }
    }

    /// Number of known inodes, root included.
    pub fn len(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
