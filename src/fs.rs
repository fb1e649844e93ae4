//! Recording filesystem
//!
//! [`RecordingFs`] is the surface the filesystem boundary calls into: one
//! method per operation, each taking a path or handle and returning a value or
//! an [`FsError`] the boundary turns into an errno. Every call fetches the
//! current tree from the cache, so calls are independent of one another and
//! may arrive from any number of threads.

use crate::attr::{self, Attributes};
use crate::backend::ByteStream;
use crate::cache::TreeCache;
use crate::error::FsError;
use crate::mutation::MutationCoordinator;
use crate::record::Record;
use crate::tree::resolver::normalize;
use crate::tree::{Node, Tree};
use crate::types::{HandleId, SEPARATOR};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Options for [`RecordingFs`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOptions {
    /// Permit unlinking recordings
    pub allow_delete: bool,
    /// Serve the last known good tree when a rebuild fails
    pub serve_stale_on_error: bool,
}

/// Summary figures for the whole namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsStats {
    pub files: u64,
    pub bytes: u64,
}

/// An open recording
struct OpenFile {
    path: String,
    record: Arc<Record>,
    stream: Mutex<Box<dyn ByteStream>>,
}

/// Filesystem view over a media backend
pub struct RecordingFs {
    cache: Arc<TreeCache>,
    mutations: MutationCoordinator,
    options: FsOptions,
    handles: RwLock<HashMap<HandleId, Arc<OpenFile>>>,
    next_handle: AtomicU64,
}

impl RecordingFs {
    pub fn new(cache: Arc<TreeCache>, options: FsOptions) -> Self {
        Self {
            mutations: MutationCoordinator::new(Arc::clone(&cache), options.allow_delete),
            cache,
            options,
            handles: RwLock::new(HashMap::new()),
            // handle 0 is never allocated
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn options(&self) -> FsOptions {
        self.options
    }

    pub fn cache(&self) -> &Arc<TreeCache> {
        &self.cache
    }

    /// Current tree, falling back to the last known good one when allowed.
    pub fn current_tree(&self) -> Result<Arc<Tree>, FsError> {
        match self.cache.get_current() {
            Ok(tree) => Ok(tree),
            Err(err @ FsError::Fetch(_)) if self.options.serve_stale_on_error => {
                match self.cache.last_known_good() {
                    Some(tree) => {
                        tracing::warn!(error = %err, "Serving stale recording tree");
                        Ok(tree)
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    pub fn get_attributes(&self, path: &str) -> Result<Attributes, FsError> {
        contain(path, || {
            let tree = self.current_tree()?;
            let node = tree.resolve(path)?;
            Ok(attr::project(node, self.options.allow_delete))
        })
    }

    /// Attributes of `name` inside directory `parent`, with the child's path.
    pub fn lookup(&self, parent: &str, name: &str) -> Result<(String, Attributes), FsError> {
        let path = join(parent, name);
        let attrs = self.get_attributes(&path)?;
        Ok((path, attrs))
    }

    pub fn list_directory(&self, path: &str) -> Result<Vec<String>, FsError> {
        contain(path, || {
            let tree = self.current_tree()?;
            match tree.resolve(path)? {
                Node::Directory(dir) => Ok(dir.names().map(str::to_string).collect()),
                Node::File(_) => Err(FsError::NotADirectory {
                    path: normalize(path),
                }),
            }
        })
    }

    /// Names and attributes of a directory's entries, in directory order.
    pub fn list_directory_plus(&self, path: &str) -> Result<Vec<(String, Attributes)>, FsError> {
        contain(path, || {
            let tree = self.current_tree()?;
            match tree.resolve(path)? {
                Node::Directory(dir) => Ok(dir
                    .children()
                    .map(|child| {
                        let attrs = attr::project(child, self.options.allow_delete);
                        (child.name().to_string(), attrs)
                    })
                    .collect()),
                Node::File(_) => Err(FsError::NotADirectory {
                    path: normalize(path),
                }),
            }
        })
    }

    pub fn open_for_read(&self, path: &str) -> Result<HandleId, FsError> {
        contain(path, || {
            let tree = self.current_tree()?;
            let record = match tree.resolve(path)? {
                Node::File(file) => Arc::clone(file.record()),
                Node::Directory(_) => {
                    return Err(FsError::NotAFile {
                        path: normalize(path),
                    })
                }
            };

            let stream = self
                .cache
                .backend()
                .open(&record)
                .map_err(|e| FsError::io(&normalize(path), e))?;

            let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
            let open = OpenFile {
                path: normalize(path),
                record,
                stream: Mutex::new(stream),
            };
            self.handles.write().insert(handle, Arc::new(open));
            tracing::trace!(path, handle, "Opened recording");
            Ok(handle)
        })
    }

    /// Read up to `length` bytes at `offset`. Fewer bytes come back only at
    /// the end of the stream.
    pub fn read_at(&self, handle: HandleId, offset: u64, length: usize) -> Result<Vec<u8>, FsError> {
        let open = self.open_file(handle)?;
        contain(&open.path, || {
            let mut stream = open.stream.lock();
            stream
                .seek(SeekFrom::Start(offset))
                .map_err(|e| FsError::io(&open.path, e))?;

            let mut buf = vec![0; length];
            let mut consumed = 0;
            while consumed < length {
                let count = stream
                    .read(&mut buf[consumed..])
                    .map_err(|e| FsError::io(&open.path, e))?;
                if count == 0 {
                    break;
                }
                consumed += count;
            }
            buf.truncate(consumed);
            tracing::trace!(handle, offset, consumed, length, record = %open.record.id, "Read");
            Ok(buf)
        })
    }

    /// Release a handle and the stream behind it.
    pub fn close_handle(&self, handle: HandleId) -> Result<(), FsError> {
        match self.handles.write().remove(&handle) {
            Some(_) => Ok(()),
            None => Err(FsError::InvalidHandle { handle }),
        }
    }

    /// Number of open handles
    pub fn open_handles(&self) -> usize {
        self.handles.read().len()
    }

    pub fn unlink(&self, path: &str) -> Result<(), FsError> {
        contain(path, || {
            if !self.mutations.allow_delete() {
                // no tree needed to refuse
                return Err(FsError::PermissionDenied {
                    path: normalize(path),
                    operation: "unlink",
                });
            }
            let tree = self.current_tree()?;
            self.mutations.unlink(&tree, path)
        })
    }

    pub fn statfs(&self) -> Result<FsStats, FsError> {
        contain("/", || {
            let tree = self.current_tree()?;
            Ok(FsStats {
                files: tree.file_count() as u64,
                bytes: tree.total_bytes(),
            })
        })
    }

    fn open_file(&self, handle: HandleId) -> Result<Arc<OpenFile>, FsError> {
        self.handles
            .read()
            .get(&handle)
            .cloned()
            .ok_or(FsError::InvalidHandle { handle })
    }
}

/// Join a directory path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    let parent = normalize(parent);
    if parent.len() == SEPARATOR.len_utf8() {
        format!("{SEPARATOR}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Run one boundary call, turning a panic into an I/O error for that call.
fn contain<T>(path: &str, op: impl FnOnce() -> Result<T, FsError>) -> Result<T, FsError> {
    catch_unwind(AssertUnwindSafe(op)).unwrap_or_else(|_| {
        tracing::error!(path, "Internal failure while serving call");
        Err(FsError::io(path, "internal failure"))
    })
}
