//! Recording records
//!
//! A `Record` is the backend's flat description of one recording. The namespace
//! only ever reads it.

use crate::types::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// One recording held by the media backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Backend identity
    pub id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Size of the recording in bytes
    pub size: u64,
    /// When the recording started
    pub start: DateTime<Utc>,
    /// When the recording ended
    pub end: DateTime<Utc>,
}

impl Record {
    /// Create a record with the descriptive fields left empty.
    pub fn new(id: impl Into<RecordId>, size: u64, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: None,
            subtitle: None,
            channel: None,
            description: None,
            size,
            start,
            end,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn start_time(&self) -> SystemTime {
        self.start.into()
    }

    pub fn end_time(&self) -> SystemTime {
        self.end.into()
    }
}
