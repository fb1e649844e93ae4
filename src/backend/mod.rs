//! Media Backend
//!
//! The namespace talks to the media server only through [`Backend`]: fetch the
//! full set of recordings, open one for reading, delete one. Connection health,
//! authentication and timeouts are the implementation's business.

pub mod manifest;
pub mod memory;

use crate::error::BackendError;
use crate::record::Record;
use std::io::{Read, Seek};

pub use manifest::ManifestBackend;
pub use memory::MemoryBackend;

/// Readable, seekable byte stream for one recording.
pub trait ByteStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> ByteStream for T {}

/// Source of truth for recordings.
pub trait Backend: Send + Sync {
    /// Fetch every recording currently held by the backend, in backend order.
    fn fetch_all(&self) -> Result<Vec<Record>, BackendError>;

    /// Open a byte stream over the recording's content.
    fn open(&self, record: &Record) -> Result<Box<dyn ByteStream>, BackendError>;

    /// Delete the recording from the backend.
    fn delete(&self, record: &Record) -> Result<(), BackendError>;
}
