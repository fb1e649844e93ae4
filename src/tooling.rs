//! Tooling & Integration Layer
//!
//! Command-line access to the recording namespace.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
