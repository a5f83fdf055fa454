//! Layered configuration: a TOML file, overridden by environment
//! variables under a fixed prefix, overridden in turn by whatever the CLI
//! flags in `proxy-server` set explicitly. `proxy-server` owns the flag
//! definitions (via `clap`); this crate only owns the shape of the merged
//! result and the file+env layering.

use std::collections::HashMap;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Environment variables that override configuration fields are prefixed
/// with this and `_`-nested, e.g. `PROXY_STORAGE__MAX_SIZE`.
pub const ENV_PREFIX: &str = "PROXY_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseDriver {
    EmbeddedSql,
    PostgresSql,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// `file` or an `object_store`-supported scheme (`s3`, `gs`, `azure`, ...).
    pub url: String,
    /// Local root when `url` is a bare filesystem path.
    pub path: Option<String>,
    /// Advisory only; the core does not enforce it.
    pub max_size: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "file://./data/blobs".to_string(),
            path: Some("./data/blobs".to_string()),
            max_size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    pub path: Option<String>,
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::EmbeddedSql,
            path: Some("./data/index.sqlite".to_string()),
            url: None,
        }
    }
}

/// The fully merged, validated configuration the server runs with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub base_url: String,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub log: LogConfig,
    /// Per-ecosystem upstream URL overrides, keyed by the ecosystem name
    /// (`npm`, `cargo`, ...).
    pub upstream: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            base_url: "http://localhost:8080".to_string(),
            storage: StorageConfig::default(),
            database: DatabaseConfig::default(),
            log: LogConfig::default(),
            upstream: HashMap::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}

impl Config {
    /// Loads defaults, then a TOML file at `path` if it exists, then
    /// environment variables prefixed with [`ENV_PREFIX`] — each layer
    /// shadows the one before it.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Ok(figment.extract()?)
    }
}
