//! Layered configuration for amigo.
//!
//! Sources, lowest precedence first:
//! - Built-in defaults
//! - TOML file (`.amigo/settings.toml`, searched upward from the current
//!   directory, or the path given with `--config`)
//! - Environment variables prefixed with `AMIGO_`
//! - CLI flags (applied by the caller via [`Settings::apply_overrides`])
//!
//! # Environment Variables
//!
//! Nested keys are separated by a double underscore:
//! - `AMIGO_SERVER__PORT=8080` sets `server.port`
//! - `AMIGO_WATCH__SYNC_REGISTRY=false` sets `watch.sync_registry`
//! - `AMIGO_LOGGING__DEFAULT=debug` sets `logging.default`

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::UrlBuilder;

pub const CONFIG_DIR: &str = ".amigo";
pub const CONFIG_FILE: &str = "settings.toml";
pub const ENV_PREFIX: &str = "AMIGO_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid directory spec '{spec}': {reason}")]
    InvalidDirectory { spec: String, reason: String },

    #[error("Failed to write configuration: {0}")]
    Write(String),
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// HTTP listener and URL synthesis settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Watched directories and extension filter
    #[serde(default)]
    pub watch: WatchConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Host name written into synthesized file URLs
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on; also written into file URLs
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interface address to bind
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Label -> root directory
    #[serde(default)]
    pub directories: BTreeMap<String, PathBuf>,

    /// Accepted file extensions, without the leading dot
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Subscribe to filesystem change notifications
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Apply create/remove/rename notifications to the registry.
    /// When false, notifications are only logged.
    #[serde(default = "default_true")]
    pub sync_registry: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `amigo::watcher = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    9191
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bind: default_bind(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directories: BTreeMap::new(),
            extensions: Vec::new(),
            enabled: true,
            sync_registry: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

/// Values supplied on the command line, already parsed.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub directories: Option<BTreeMap<String, PathBuf>>,
    pub extensions: Option<Vec<String>>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Settings {
    /// Load configuration from defaults, the workspace file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration using a specific TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Search the current directory and its ancestors for `.amigo/settings.toml`.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Apply CLI flags on top of the loaded layers.
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(directories) = overrides.directories {
            self.watch.directories = directories;
        }
        if let Some(extensions) = overrides.extensions {
            self.watch.extensions = extensions;
        }
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    /// Immutable watch configuration for the registrar.
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig::new(
            self.watch.directories.clone(),
            self.watch.extensions.iter().map(|e| normalize_extension(e)),
        )
    }

    pub fn url_builder(&self) -> UrlBuilder {
        UrlBuilder::new(&self.server.host, self.server.port)
    }

    /// `bind:port` for the TCP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Write(e.to_string()))
    }
}

/// Label -> root mapping plus accepted extensions. Never changes after startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherConfig {
    directories: BTreeMap<String, PathBuf>,
    extensions: BTreeSet<String>,
}

impl WatcherConfig {
    pub fn new(
        directories: BTreeMap<String, PathBuf>,
        extensions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            directories,
            extensions: extensions.into_iter().filter(|e| !e.is_empty()).collect(),
        }
    }

    pub fn directories(&self) -> &BTreeMap<String, PathBuf> {
        &self.directories
    }

    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    /// True if `file_name` ends with `.<ext>` for a configured extension.
    /// Case-sensitive.
    pub fn matches_extension(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| {
            file_name.len() > ext.len()
                && file_name.ends_with(ext.as_str())
                && file_name.as_bytes()[file_name.len() - ext.len() - 1] == b'.'
        })
    }
}

/// Parse `label:dir dir2 ...` into a label -> directory map.
///
/// A bare directory is labelled with its base name. Empty items are skipped.
pub fn parse_directories(value: &str) -> Result<BTreeMap<String, PathBuf>, ConfigError> {
    let mut directories = BTreeMap::new();

    for spec in value.split_whitespace() {
        let (label, dir) = match spec.split_once(':') {
            Some((label, dir)) => (label.to_string(), dir),
            None => {
                let label = Path::new(spec)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .ok_or_else(|| ConfigError::InvalidDirectory {
                        spec: spec.to_string(),
                        reason: "cannot derive a label from this path".to_string(),
                    })?;
                (label, spec)
            }
        };

        if label.is_empty() || dir.is_empty() {
            return Err(ConfigError::InvalidDirectory {
                spec: spec.to_string(),
                reason: "expected <label>:<directory> or <directory>".to_string(),
            });
        }

        directories.insert(label, PathBuf::from(dir));
    }

    Ok(directories)
}

/// Parse a comma-separated extension list (`png, .js,css`).
pub fn parse_extensions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(normalize_extension)
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim();
    ext.strip_prefix('.').unwrap_or(ext).to_string()
}
