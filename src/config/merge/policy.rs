//! Built-in defaults that every configuration build starts from.

use crate::cache::DEFAULT_TTL;
use crate::tree::sanitize::{DEFAULT_FORBIDDEN, DEFAULT_REPLACEMENT};
use crate::tree::template::DEFAULT_TEMPLATE;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Start a builder seeded with the default namespace and cache settings.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("namespace.template", DEFAULT_TEMPLATE)?
        .set_default("namespace.forbidden_chars", DEFAULT_FORBIDDEN)?
        .set_default("namespace.replacement", DEFAULT_REPLACEMENT.to_string())?
        .set_default("cache.ttl_secs", DEFAULT_TTL.as_secs() as i64)?
        .set_default("cache.serve_stale_on_error", false)?
        .set_default("mutation.allow_delete", false)
}
