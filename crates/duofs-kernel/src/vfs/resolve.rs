//! Path resolution: virtual path to one physical path per backend.
//!
//! Each backend root mirrors the virtual namespace one-to-one, so a virtual
//! path `/d/f` maps to `<root_a>/d/f` and `<root_b>/d/f`. Resolution is purely
//! lexical: `.` components are dropped, `..` pops the previous component and
//! a `..` that would climb above the root is rejected. Symlinks inside the
//! backends are never followed here.

use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::vfs::error::{VfsError, VfsResult};

/// One of the two physical directory trees.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    A,
    B,
}

impl Backend {
    /// Fixed order replicated operations and stripe rounds visit backends in.
    pub const ORDER: [Backend; 2] = [Backend::A, Backend::B];
}

/// The two physical paths derived from one virtual path.
///
/// Owned by the call that resolved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    pub a: PathBuf,
    pub b: PathBuf,
}

impl ResolvedPair {
    /// Physical path on the given backend.
    pub fn get(&self, backend: Backend) -> &Path {
        match backend {
            Backend::A => &self.a,
            Backend::B => &self.b,
        }
    }

    /// Both paths, backend A first.
    pub fn iter(&self) -> impl Iterator<Item = (Backend, &Path)> {
        Backend::ORDER.into_iter().map(move |b| (b, self.get(b)))
    }
}

/// Maps virtual paths under the mount point onto the backend roots.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root_a: PathBuf,
    root_b: PathBuf,
    max_path_len: usize,
}

impl PathResolver {
    /// Create a resolver for the two roots.
    ///
    /// `max_path_len` bounds the byte length of every physical path produced,
    /// counting the trailing NUL the kernel needs (so PATH_MAX works as-is).
    pub fn new(
        root_a: impl Into<PathBuf>,
        root_b: impl Into<PathBuf>,
        max_path_len: usize,
    ) -> Self {
        Self {
            root_a: root_a.into(),
            root_b: root_b.into(),
            max_path_len,
        }
    }

    /// Root directory of a backend.
    pub fn root(&self, backend: Backend) -> &Path {
        match backend {
            Backend::A => &self.root_a,
            Backend::B => &self.root_b,
        }
    }

    /// Resolve a virtual path on both backends.
    pub fn resolve(&self, path: &Path) -> VfsResult<ResolvedPair> {
        let relative = normalize(path)?;
        Ok(ResolvedPair {
            a: self.join(Backend::A, &relative)?,
            b: self.join(Backend::B, &relative)?,
        })
    }

    /// Resolve a virtual path on one backend only.
    pub fn resolve_one(&self, backend: Backend, path: &Path) -> VfsResult<PathBuf> {
        let relative = normalize(path)?;
        self.join(backend, &relative)
    }

    fn join(&self, backend: Backend, relative: &Path) -> VfsResult<PathBuf> {
        let full = if relative.as_os_str().is_empty() {
            self.root(backend).to_path_buf()
        } else {
            self.root(backend).join(relative)
        };
        if full.as_os_str().as_bytes().len() >= self.max_path_len {
            return Err(VfsError::name_too_long(full.display().to_string()));
        }
        Ok(full)
    }
}

/// Lexically normalise a virtual path into a root-relative path.
fn normalize(path: &Path) -> VfsResult<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::CurDir => {}
            Component::Normal(name) => parts.push(name),
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(VfsError::path_escapes_root(path.display().to_string()));
                }
            }
            Component::Prefix(_) => {
                return Err(VfsError::invalid_path(path.display().to_string()));
            }
        }
    }
    Ok(parts.iter().collect())
}
