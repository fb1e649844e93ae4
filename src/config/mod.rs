//! Configuration
//!
//! `MythfsConfig` carries every value the namespace needs: naming, cache
//! policy, delete policy, backend location, mount ownership and logging.
//! Sources are layered by [`ConfigLoader`]; see [`merge::service`] for the
//! precedence order.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::cache::DEFAULT_TTL;
use crate::error::ApiError;
use crate::fs::FsOptions;
use crate::logging::LoggingConfig;
use crate::tree::sanitize::{DEFAULT_FORBIDDEN, DEFAULT_REPLACEMENT};
use crate::tree::template::DEFAULT_TEMPLATE;
use crate::tree::{PathTemplate, Sanitizer, TreeBuilder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MythfsConfig {
    #[serde(default)]
    pub namespace: NamespaceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub mutation: MutationConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub mount: MountConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_forbidden_chars() -> String {
    DEFAULT_FORBIDDEN.to_string()
}

fn default_replacement() -> String {
    DEFAULT_REPLACEMENT.to_string()
}

/// How recordings are named
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Path template, e.g. `{title}/{title} - {subtitle}`
    #[serde(default = "default_template")]
    pub template: String,

    /// Characters replaced in every path component
    #[serde(default = "default_forbidden_chars")]
    pub forbidden_chars: String,

    /// Single replacement character
    #[serde(default = "default_replacement")]
    pub replacement: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            forbidden_chars: default_forbidden_chars(),
            replacement: default_replacement(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

/// Tree cache policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds a built tree is served before the backend is asked again
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Keep serving the previous tree when a rebuild fails
    #[serde(default)]
    pub serve_stale_on_error: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            serve_stale_on_error: false,
        }
    }
}

/// Delete policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationConfig {
    #[serde(default)]
    pub allow_delete: bool,
}

/// Where recordings come from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Directory holding `recordings.json` and the media files
    #[serde(default)]
    pub manifest_dir: Option<PathBuf>,
}

fn default_fs_name() -> String {
    "mythfs".to_string()
}

/// Mount ownership and options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// Owner reported for every node; defaults to the mounting user
    #[serde(default)]
    pub uid: Option<u32>,

    #[serde(default)]
    pub gid: Option<u32>,

    /// Let users other than the owner see the mount
    #[serde(default)]
    pub allow_other: bool,

    #[serde(default = "default_fs_name")]
    pub fs_name: String,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            uid: None,
            gid: None,
            allow_other: false,
            fs_name: default_fs_name(),
        }
    }
}

impl MythfsConfig {
    /// Check values that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), ApiError> {
        self.template()?;
        let replacement = self.replacement()?;
        if matches!(replacement, '/' | '\0' | '.')
            || self.namespace.forbidden_chars.contains(replacement)
        {
            return Err(ApiError::ConfigError(format!(
                "Replacement '{}' cannot appear in a file name",
                replacement
            )));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ApiError::ConfigError(
                "cache.ttl_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn template(&self) -> Result<PathTemplate, ApiError> {
        PathTemplate::parse(&self.namespace.template).map_err(|e| {
            ApiError::ConfigError(format!(
                "Invalid template '{}': {}",
                self.namespace.template, e
            ))
        })
    }

    fn replacement(&self) -> Result<char, ApiError> {
        let mut chars = self.namespace.replacement.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ApiError::ConfigError(format!(
                "Replacement must be a single character, got '{}'",
                self.namespace.replacement
            ))),
        }
    }

    pub fn sanitizer(&self) -> Result<Sanitizer, ApiError> {
        Ok(Sanitizer::new(
            self.namespace.forbidden_chars.chars(),
            self.replacement()?,
        ))
    }

    pub fn tree_builder(&self) -> Result<TreeBuilder, ApiError> {
        self.validate()?;
        Ok(TreeBuilder::new(self.template()?, self.sanitizer()?)
            .deletable(self.mutation.allow_delete))
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn fs_options(&self) -> FsOptions {
        FsOptions {
            allow_delete: self.mutation.allow_delete,
            serve_stale_on_error: self.cache.serve_stale_on_error,
        }
    }
}
