use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mythfs::backend::{Backend, ByteStream, MemoryBackend};
use mythfs::cache::TreeCache;
use mythfs::error::BackendError;
use mythfs::tree::TreeBuilder;
use mythfs::{FsError, FsOptions, Record, RecordingFs};

use crate::support::recording;

/// Wraps a memory backend and panics on demand.
struct FaultyBackend {
    inner: MemoryBackend,
    panic_fetch: AtomicBool,
    panic_open: AtomicBool,
    panic_delete: AtomicBool,
}

impl FaultyBackend {
    fn new(records: Vec<Record>) -> Self {
        Self {
            inner: MemoryBackend::with_records(records),
            panic_fetch: AtomicBool::new(false),
            panic_open: AtomicBool::new(false),
            panic_delete: AtomicBool::new(false),
        }
    }
}

impl Backend for FaultyBackend {
    fn fetch_all(&self) -> Result<Vec<Record>, BackendError> {
        if self.panic_fetch.load(Ordering::SeqCst) {
            panic!("fetch exploded");
        }
        self.inner.fetch_all()
    }

    fn open(&self, record: &Record) -> Result<Box<dyn ByteStream>, BackendError> {
        if self.panic_open.load(Ordering::SeqCst) {
            panic!("open exploded");
        }
        self.inner.open(record)
    }

    fn delete(&self, record: &Record) -> Result<(), BackendError> {
        if self.panic_delete.load(Ordering::SeqCst) {
            panic!("delete exploded");
        }
        self.inner.delete(record)
    }
}

fn setup() -> (Arc<FaultyBackend>, RecordingFs) {
    let backend = Arc::new(FaultyBackend::new(vec![
        recording("1", "News", "Monday", 0),
        recording("2", "News", "Tuesday", 24),
    ]));
    let cache = TreeCache::new(
        backend.clone(),
        TreeBuilder::default().deletable(true),
        std::time::Duration::from_secs(30),
    );
    let fs = RecordingFs::new(
        Arc::new(cache),
        FsOptions {
            allow_delete: true,
            ..Default::default()
        },
    );
    (backend, fs)
}

#[test]
fn panicking_fetch_is_a_fetch_error() {
    let (backend, fs) = setup();
    backend.panic_fetch.store(true, Ordering::SeqCst);
    assert!(matches!(fs.list_directory("/"), Err(FsError::Fetch(_))));

    backend.panic_fetch.store(false, Ordering::SeqCst);
    assert_eq!(fs.list_directory("/").unwrap(), vec!["News"]);
}

#[test]
fn panicking_open_fails_only_that_call() {
    let (backend, fs) = setup();
    backend.panic_open.store(true, Ordering::SeqCst);
    let err = fs.open_for_read("/News/News - Monday").unwrap_err();
    assert_eq!(err.errno(), libc::EIO);
    assert_eq!(fs.open_handles(), 0);

    backend.panic_open.store(false, Ordering::SeqCst);
    let handle = fs.open_for_read("/News/News - Monday").unwrap();
    assert_eq!(fs.read_at(handle, 0, 4).unwrap().len(), 4);
    fs.close_handle(handle).unwrap();
}

#[test]
fn panicking_delete_keeps_tree() {
    let (backend, fs) = setup();
    backend.panic_delete.store(true, Ordering::SeqCst);
    let err = fs.unlink("/News/News - Monday").unwrap_err();
    assert!(matches!(err, FsError::Io { .. }));
    assert_eq!(fs.list_directory("/News").unwrap().len(), 2);
    assert_eq!(fs.cache().stats().invalidations, 0);

    backend.panic_delete.store(false, Ordering::SeqCst);
    fs.unlink("/News/News - Monday").unwrap();
    assert_eq!(
        fs.list_directory("/News").unwrap(),
        vec!["News - Tuesday"]
    );
}
