//! Source composition for configuration.

pub mod policy;
pub mod service;
