//! Integration tests for the mythfs recording namespace

mod backend_faults;
mod cli_commands;
mod manifest_backend;
mod namespace_lifecycle;
mod namespace_properties;
mod support;
