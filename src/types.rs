//! Core types shared across the recording filesystem.

/// RecordId: Backend identity of a recording
pub type RecordId = String;

/// HandleId: Opaque number handed out for an open file
pub type HandleId = u64;

/// Path separator used by the projected namespace
pub const SEPARATOR: char = '/';
