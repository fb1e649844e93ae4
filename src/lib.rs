//! mythfs: Recordings as a Filesystem
//!
//! Projects the flat list of recordings held by a media backend into a
//! browsable directory tree. Names come from a configurable template, are
//! sanitized per component and made unique per directory. The tree is cached
//! for a short TTL and rebuilt wholesale from the backend.

pub mod attr;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod fs;
#[cfg(feature = "fuse")]
pub mod fuse;
pub mod logging;
pub mod mutation;
pub mod record;
pub mod tooling;
pub mod tree;
pub mod types;

pub use error::{ApiError, BackendError, FsError};
pub use fs::{FsOptions, RecordingFs};
pub use record::Record;
