//! Manifest backend
//!
//! Serves recordings from a local directory described by a `recordings.json`
//! manifest. Each manifest entry is a record plus the media file holding its
//! bytes, relative to the directory.

use crate::backend::{Backend, ByteStream};
use crate::error::BackendError;
use crate::record::Record;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Manifest file name inside the recordings directory
pub const MANIFEST_FILE: &str = "recordings.json";

/// One manifest entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub record: Record,
    /// Media file, relative to the recordings directory
    pub file: PathBuf,
}

/// Backend reading a recordings directory.
pub struct ManifestBackend {
    root: PathBuf,
    /// Serializes manifest rewrites
    write_lock: Mutex<()>,
}

impl ManifestBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Read and parse the manifest.
    pub fn load_entries(&self) -> Result<Vec<ManifestEntry>, BackendError> {
        let path = self.manifest_path();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            BackendError::Unavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            BackendError::Manifest(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Replace the manifest contents.
    pub fn store_entries(&self, entries: &[ManifestEntry]) -> Result<(), BackendError> {
        let path = self.manifest_path();
        let tmp = self.root.join(format!("{}.tmp", MANIFEST_FILE));
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| BackendError::Manifest(format!("Failed to serialize manifest: {}", e)))?;
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn media_path(&self, record: &Record) -> Result<PathBuf, BackendError> {
        let entry = self
            .load_entries()?
            .into_iter()
            .find(|e| e.record.id == record.id)
            .ok_or_else(|| BackendError::UnknownRecord(record.id.clone()))?;
        self.media_file(&entry)
    }

    /// Media file of `entry`, which must stay inside the recordings directory.
    fn media_file(&self, entry: &ManifestEntry) -> Result<PathBuf, BackendError> {
        let inside = !entry.file.as_os_str().is_empty()
            && entry
                .file
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !inside {
            return Err(BackendError::Manifest(format!(
                "Recording {} names media file {} outside the recordings directory",
                entry.record.id,
                entry.file.display()
            )));
        }
        Ok(self.root.join(&entry.file))
    }
}

impl Backend for ManifestBackend {
    fn fetch_all(&self) -> Result<Vec<Record>, BackendError> {
        Ok(self.load_entries()?.into_iter().map(|e| e.record).collect())
    }

    fn open(&self, record: &Record) -> Result<Box<dyn ByteStream>, BackendError> {
        let path = self.media_path(record)?;
        let file = std::fs::File::open(&path)?;
        Ok(Box::new(file))
    }

    fn delete(&self, record: &Record) -> Result<(), BackendError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.load_entries()?;
        let Some(index) = entries.iter().position(|e| e.record.id == record.id) else {
            return Err(BackendError::UnknownRecord(record.id.clone()));
        };
        let media = self.media_file(&entries[index])?;
        entries.remove(index);

        // the manifest is authoritative: once rewritten the recording is gone
        self.store_entries(&entries)?;
        match std::fs::remove_file(&media) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Media file already missing: {}", media.display());
            }
            Err(e) => {
                tracing::error!("Failed to remove media file {}: {}", media.display(), e);
            }
        }
        Ok(())
    }
}
