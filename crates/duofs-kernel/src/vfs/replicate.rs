//! Replicated-operation executor.
//!
//! Structural operations run on backend A, then backend B. The first failure
//! is returned as-is and the remaining backend is not attempted. Nothing is
//! rolled back, so a failure on B after A succeeded leaves the trees
//! divergent; that case is logged at `warn`.

use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::vfs::dispatch::Operation;
use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::resolve::{Backend, PathResolver, ResolvedPair};
use crate::vfs::selector::BackendSelector;

/// Applies one structural operation to both backends in fixed order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Replicator;

impl Replicator {
    /// Run `op_fn` against `pair.a` then `pair.b`.
    pub fn apply<F>(&self, op: Operation, pair: &ResolvedPair, mut op_fn: F) -> VfsResult<()>
    where
        F: FnMut(Backend, &Path) -> io::Result<()>,
    {
        for (backend, path) in pair.iter() {
            debug!(%op, %backend, path = %path.display(), "replicate");
            if let Err(source) = op_fn(backend, path) {
                if backend != Backend::A {
                    warn!(
                        %op,
                        %backend,
                        path = %path.display(),
                        error = %source,
                        "backend A applied the change, backends now diverge"
                    );
                }
                return Err(VfsError::backend(backend, source));
            }
        }
        Ok(())
    }

    /// Run a two-sided operation whose source is taken from one selected
    /// backend while the destination is replicated.
    ///
    /// The source path is resolved once, on the backend the selector picks,
    /// and the same physical source is handed to both destination calls.
    pub fn apply_from_selected<F>(
        &self,
        op: Operation,
        resolver: &PathResolver,
        selector: &BackendSelector,
        source: &Path,
        dest: &ResolvedPair,
        mut op_fn: F,
    ) -> VfsResult<()>
    where
        F: FnMut(Backend, &Path, &Path) -> io::Result<()>,
    {
        let picked = selector.pick();
        let physical_source = resolver.resolve_one(picked, source)?;
        debug!(
            %op,
            source_backend = %picked,
            source = %physical_source.display(),
            "source selected"
        );
        self.apply(op, dest, |backend, dest_path| {
            op_fn(backend, &physical_source, dest_path)
        })
    }
}
