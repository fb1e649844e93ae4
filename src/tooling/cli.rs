//! CLI Tooling
//!
//! Command-line interface over the recording namespace. Every command except
//! `mount` runs one operation against a freshly loaded configuration and
//! returns its output as text.

use crate::attr::{Attributes, NodeKind};
use crate::backend::{Backend, ManifestBackend};
use crate::cache::TreeCache;
use crate::config::{ConfigLoader, MythfsConfig};
use crate::error::ApiError;
use crate::fs::RecordingFs;
use crate::tree::resolver::normalize;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

// bytes requested per read when streaming a recording
const READ_CHUNK: usize = 64 * 1024;

/// mythfs - browse and manage recordings as a filesystem
#[derive(Parser)]
#[command(name = "mythfs")]
#[command(about = "Expose media server recordings as a read-mostly filesystem")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding recordings.json (overrides backend.manifest_dir)
    #[arg(long)]
    pub manifest_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mount the recordings and serve until unmounted
    Mount {
        mountpoint: PathBuf,
        /// Permit deleting recordings through the mount
        #[arg(long)]
        allow_delete: bool,
    },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Show kind, size and modification time
        #[arg(long)]
        long: bool,
    },
    /// Print the whole namespace
    Tree,
    /// Show the attributes of one path
    Stat {
        path: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Write a recording's contents to stdout
    Cat { path: String },
    /// Delete a recording
    Rm {
        path: String,
        /// Permit the delete even if the config does not
        #[arg(long)]
        allow_delete: bool,
    },
}

/// CLI context holding the loaded configuration and backend
pub struct CliContext {
    config: MythfsConfig,
    backend: Arc<dyn Backend>,
}

impl CliContext {
    /// Load configuration and open the manifest backend.
    pub fn new(config_path: Option<PathBuf>, manifest_dir: Option<PathBuf>) -> Result<Self, ApiError> {
        Self::from_config(load_config(config_path.as_deref())?, manifest_dir)
    }

    /// Open the manifest backend named by `manifest_dir` or the config.
    pub fn from_config(config: MythfsConfig, manifest_dir: Option<PathBuf>) -> Result<Self, ApiError> {
        let root = manifest_dir
            .or_else(|| config.backend.manifest_dir.clone())
            .ok_or_else(|| {
                ApiError::ConfigError(
                    "No recordings configured: set backend.manifest_dir or pass --manifest-dir"
                        .to_string(),
                )
            })?;
        info!(manifest_dir = %root.display(), "Using manifest backend");
        Ok(Self::with_backend(config, Arc::new(ManifestBackend::new(root))))
    }

    /// Context over an already constructed backend.
    pub fn with_backend(config: MythfsConfig, backend: Arc<dyn Backend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &MythfsConfig {
        &self.config
    }

    /// Filesystem over the backend, optionally forcing delete on.
    pub fn filesystem(&self, allow_delete: bool) -> Result<Arc<RecordingFs>, ApiError> {
        let mut config = self.config.clone();
        config.mutation.allow_delete |= allow_delete;
        let cache = TreeCache::new(
            Arc::clone(&self.backend),
            config.tree_builder()?,
            config.ttl(),
        );
        Ok(Arc::new(RecordingFs::new(Arc::new(cache), config.fs_options())))
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Mount {
                mountpoint,
                allow_delete,
            } => self.handle_mount(mountpoint, *allow_delete),
            Commands::Ls { path, long } => self.handle_ls(path, *long),
            Commands::Tree => self.handle_tree(),
            Commands::Stat { path, format } => self.handle_stat(path, format),
            Commands::Cat { path } => {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                self.cat(path, &mut out)?;
                out.flush()?;
                Ok(String::new())
            }
            Commands::Rm { path, allow_delete } => {
                let fs = self.filesystem(*allow_delete)?;
                fs.unlink(path)?;
                Ok(format!("Removed {}", normalize(path)))
            }
        }
    }

    /// Stream a recording into `out` through open, read and close.
    pub fn cat(&self, path: &str, out: &mut dyn Write) -> Result<u64, ApiError> {
        let fs = self.filesystem(false)?;
        let handle = fs.open_for_read(path)?;
        let result = copy_handle(&fs, handle, out);
        fs.close_handle(handle)?;
        result
    }

    #[cfg(feature = "fuse")]
    fn handle_mount(&self, mountpoint: &Path, allow_delete: bool) -> Result<String, ApiError> {
        let fs = self.filesystem(allow_delete)?;
        let mut config = self.config.clone();
        config.mutation.allow_delete |= allow_delete;
        let session = crate::fuse::Session::new(fs, crate::fuse::MountConfig::from_config(&config));
        session.mount(mountpoint)?;
        Ok(format!("Unmounted {}", mountpoint.display()))
    }

    #[cfg(not(feature = "fuse"))]
    fn handle_mount(&self, _mountpoint: &Path, _allow_delete: bool) -> Result<String, ApiError> {
        Err(ApiError::ConfigError(
            "mythfs was built without the 'fuse' feature; rebuild with --features fuse to mount"
                .to_string(),
        ))
    }

    fn handle_ls(&self, path: &str, long: bool) -> Result<String, ApiError> {
        let fs = self.filesystem(false)?;
        if !long {
            return Ok(fs.list_directory(path)?.join("\n"));
        }
        let entries = fs.list_directory_plus(path)?;
        let mut table = Table::new();
        table.load_preset(comfy_table::presets::UTF8_FULL);
        table.set_header(vec!["Mode", "Size", "Modified", "Name"]);
        for (name, attrs) in &entries {
            table.add_row(vec![
                mode_string(attrs),
                attrs.size.to_string(),
                format_time(attrs.mtime),
                name.clone(),
            ]);
        }
        Ok(table.to_string())
    }

    fn handle_tree(&self) -> Result<String, ApiError> {
        let fs = self.filesystem(false)?;
        let tree = fs.current_tree()?;
        let mut output = String::from("/\n");
        for (path, node) in tree.walk() {
            let depth = path.matches('/').count();
            output.push_str(&"  ".repeat(depth));
            output.push_str(node.name());
            if node.is_dir() {
                output.push('/');
            }
            output.push('\n');
        }
        output.push_str(&format!(
            "\n{} recordings, {} bytes",
            tree.file_count(),
            tree.total_bytes()
        ));
        Ok(output)
    }

    fn handle_stat(&self, path: &str, format: &str) -> Result<String, ApiError> {
        let fs = self.filesystem(false)?;
        let attrs = fs.get_attributes(path)?;
        let path = normalize(path);
        match format {
            "json" => {
                let value = serde_json::json!({
                    "path": path,
                    "kind": kind_name(attrs.kind),
                    "size": attrs.size,
                    "mode": format!("{:o}", attrs.mode()),
                    "nlink": attrs.nlink,
                    "atime": format_time(attrs.atime),
                    "mtime": format_time(attrs.mtime),
                    "ctime": format_time(attrs.ctime),
                    "crtime": format_time(attrs.crtime),
                });
                serde_json::to_string_pretty(&value)
                    .map_err(|e| ApiError::ConfigError(format!("Failed to encode stat: {}", e)))
            }
            "text" => Ok(format!(
                "  File: {}\n  Kind: {}\n  Size: {}\n  Mode: {} ({:o})\n Links: {}\nAccess: {}\nModify: {}\nChange: {}\n Birth: {}",
                path,
                kind_name(attrs.kind),
                attrs.size,
                mode_string(&attrs),
                attrs.mode(),
                attrs.nlink,
                format_time(attrs.atime),
                format_time(attrs.mtime),
                format_time(attrs.ctime),
                format_time(attrs.crtime),
            )),
            other => Err(ApiError::ConfigError(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }
}

/// Load configuration, layering `path` over the global file when given.
pub fn load_config(path: Option<&Path>) -> Result<MythfsConfig, ApiError> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Apply `--log-*` flags over the configured logging section.
pub fn apply_log_overrides(cli: &Cli, config: &mut MythfsConfig) {
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        config.logging.output = output.clone();
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }
}

fn copy_handle(fs: &RecordingFs, handle: u64, out: &mut dyn Write) -> Result<u64, ApiError> {
    let mut offset = 0u64;
    loop {
        let chunk = fs.read_at(handle, offset, READ_CHUNK)?;
        if chunk.is_empty() {
            return Ok(offset);
        }
        out.write_all(&chunk)?;
        offset += chunk.len() as u64;
    }
}

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Directory => "directory",
        NodeKind::File => "file",
    }
}

/// `ls -l` style mode string, e.g. `dr-x------`
fn mode_string(attrs: &Attributes) -> String {
    let mut out = String::with_capacity(10);
    out.push(if attrs.is_dir() { 'd' } else { '-' });
    for shift in [6u16, 3, 0] {
        let bits = (attrs.perm >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

fn format_time(time: SystemTime) -> String {
    let time: DateTime<Local> = time.into();
    time.format("%Y-%m-%d %H:%M").to_string()
}
