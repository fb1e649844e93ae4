//! In-memory backend
//!
//! Holds recordings and their content in process memory. Counts calls and can
//! be told to fail, which makes it the backend of choice for tests and demos.

use crate::backend::{Backend, ByteStream};
use crate::error::BackendError;
use crate::record::Record;
use parking_lot::{Condvar, Mutex, RwLock};
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

struct Entry {
    record: Record,
    content: Arc<[u8]>,
}

/// Backend keeping everything in memory.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<Vec<Entry>>,
    fetch_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    open_streams: Arc<AtomicUsize>,
    fail_fetch: AtomicBool,
    fail_delete: AtomicBool,
    gate: Mutex<FetchGate>,
    gate_changed: Condvar,
}

#[derive(Default)]
struct FetchGate {
    held: bool,
    /// Fetches currently parked at the gate
    waiting: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a backend from records whose content is `size` zero bytes.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let backend = Self::new();
        for record in records {
            let content = vec![0u8; record.size as usize];
            backend.insert(record, content);
        }
        backend
    }

    /// Add a recording. Its declared size is left as given.
    pub fn insert(&self, record: Record, content: impl Into<Vec<u8>>) {
        let content: Vec<u8> = content.into();
        self.entries.write().push(Entry {
            record,
            content: Arc::from(content),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().iter().any(|e| e.record.id == id)
    }

    /// Number of `fetch_all` calls so far, failed ones included
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls so far, failed ones included
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Streams handed out by `open` and not yet dropped
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Park every subsequent `fetch_all` after it has taken its snapshot,
    /// until [`release_fetches`](Self::release_fetches).
    pub fn hold_fetches(&self) {
        self.gate.lock().held = true;
    }

    pub fn release_fetches(&self) {
        self.gate.lock().held = false;
        self.gate_changed.notify_all();
    }

    /// Block until `count` fetches are parked at the gate.
    pub fn wait_for_held_fetches(&self, count: usize) {
        let mut gate = self.gate.lock();
        while gate.waiting < count {
            self.gate_changed.wait(&mut gate);
        }
    }

    fn pass_gate(&self) {
        let mut gate = self.gate.lock();
        if !gate.held {
            return;
        }
        gate.waiting += 1;
        self.gate_changed.notify_all();
        while gate.held {
            self.gate_changed.wait(&mut gate);
        }
        gate.waiting -= 1;
    }
}

impl Backend for MemoryBackend {
    fn fetch_all(&self) -> Result<Vec<Record>, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let snapshot: Vec<Record> = self
            .entries
            .read()
            .iter()
            .map(|e| e.record.clone())
            .collect();
        self.pass_gate();
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "memory backend set to fail fetches".to_string(),
            ));
        }
        Ok(snapshot)
    }

    fn open(&self, record: &Record) -> Result<Box<dyn ByteStream>, BackendError> {
        let entries = self.entries.read();
        let entry = entries
            .iter()
            .find(|e| e.record.id == record.id)
            .ok_or_else(|| BackendError::UnknownRecord(record.id.clone()))?;
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedStream {
            inner: Cursor::new(Arc::clone(&entry.content)),
            open_streams: Arc::clone(&self.open_streams),
        }))
    }

    fn delete(&self, record: &Record) -> Result<(), BackendError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "memory backend set to fail deletes".to_string(),
            ));
        }
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.record.id != record.id);
        if entries.len() == before {
            return Err(BackendError::UnknownRecord(record.id.clone()));
        }
        Ok(())
    }
}

/// Stream that keeps the backend's open-stream count honest.
struct TrackedStream {
    inner: Cursor<Arc<[u8]>>,
    open_streams: Arc<AtomicUsize>,
}

impl Read for TrackedStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for TrackedStream {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.open_streams.fetch_sub(1, Ordering::SeqCst);
    }
}
