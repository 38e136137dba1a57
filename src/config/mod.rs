//! Configuration management for podcache.
//!
//! Configuration is read from `~/.config/podcache/config.toml` at startup
//! (or the path given with `--config`). If the file doesn't exist, a default
//! configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

/// Static sync settings. URLs here can be overridden at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// greader-style JSON episode list
    pub episodes_url: Option<String>,
    /// OPML source listing; the sources pipeline is skipped when unset
    pub opml_url: Option<String>,
    pub sync_interval_ms: u64,
    /// Delay before the first run after startup
    pub initial_delay_ms: u64,
    /// Page size hint sent upstream
    pub fetch_count: usize,
    /// Cap on episodes reconciled per run
    pub max_episodes: usize,
    pub fetch_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            episodes_url: None,
            opml_url: None,
            sync_interval_ms: 60 * 60 * 1000,
            initial_delay_ms: 5_000,
            fetch_count: 200,
            max_episodes: 500,
            fetch_timeout_ms: 30_000,
        }
    }
}

impl SyncConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms.max(1))
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Path prefix the API routes are nested under
    pub mount: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            mount: "/podcasts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file (default: `<data dir>/podcache/podcache.db`)
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// A missing default config file is created with comments. A missing
    /// explicit path is an error. Missing fields use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/podcache/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("podcache").join("config.toml"))
    }

    /// Database file from config, falling back to the platform data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.storage.database_path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        let podcache_dir = data_dir.join("podcache");
        fs::create_dir_all(&podcache_dir).map_err(|e| ConfigError::Io {
            path: podcache_dir.clone(),
            source: e,
        })?;
        Ok(podcache_dir.join("podcache.db"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> &'static str {
        r##"# podcache configuration
#
# URLs set here are the static defaults. `podcache settings` stores
# overrides in the database that take precedence without a restart.

[sync]
# greader-style JSON episode list
# episodes_url = "https://aggregator.example/api/greader.php/reader/api/0/stream/contents/user/-/label/Podcasts"

# OPML listing of podcast sources (sources sync is skipped when unset)
# opml_url = "https://aggregator.example/subscriptions.opml"

# Interval between scheduled runs (milliseconds)
sync_interval_ms = 3600000

# Delay before the first run after startup (milliseconds)
initial_delay_ms = 5000

# Page size hint sent to the aggregator
fetch_count = 200

# Maximum episodes reconciled per run
max_episodes = 500

# Per-request timeout (milliseconds)
fetch_timeout_ms = 30000

[server]
bind = "127.0.0.1:3000"
mount = "/podcasts"

[storage]
# database_path = "/var/lib/podcache/podcache.db"
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
