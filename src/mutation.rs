//! Deleting recordings
//!
//! An unlink goes to the backend first; only once the backend has accepted it
//! is the cache invalidated, so the next listing no longer shows the file. A
//! failed backend delete leaves the cache alone because the recording still
//! exists.

use crate::cache::TreeCache;
use crate::error::FsError;
use crate::tree::resolver::normalize;
use crate::tree::{Node, Tree};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info};

/// Applies deletions to the backend and keeps the cache in step.
pub struct MutationCoordinator {
    cache: Arc<TreeCache>,
    allow_delete: bool,
}

impl MutationCoordinator {
    pub fn new(cache: Arc<TreeCache>, allow_delete: bool) -> Self {
        Self {
            cache,
            allow_delete,
        }
    }

    pub fn allow_delete(&self) -> bool {
        self.allow_delete
    }

    /// Delete the recording at `path` in `tree`.
    ///
    /// Directories cannot be removed and report [`FsError::NotSupported`].
    pub fn unlink(&self, tree: &Tree, path: &str) -> Result<(), FsError> {
        if !self.allow_delete {
            return Err(FsError::PermissionDenied {
                path: normalize(path),
                operation: "unlink",
            });
        }

        let file = match tree.resolve(path)? {
            Node::File(file) => file,
            Node::Directory(_) => {
                return Err(FsError::NotSupported {
                    path: normalize(path),
                    operation: "unlink",
                })
            }
        };

        let record = file.record();
        let backend = self.cache.backend();
        let deleted = catch_unwind(AssertUnwindSafe(|| backend.delete(record)));
        match deleted {
            Ok(Ok(())) => {
                info!(path, record = %record.id, "Deleted recording");
                self.cache.invalidate();
                Ok(())
            }
            Ok(Err(e)) => {
                error!(path, record = %record.id, error = %e, "Backend refused delete");
                Err(FsError::io(&normalize(path), e))
            }
            Err(_) => {
                error!(path, record = %record.id, "Backend panicked during delete");
                Err(FsError::io(&normalize(path), "backend panicked during delete"))
            }
        }
    }
}
