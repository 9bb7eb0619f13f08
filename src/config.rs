//! `config.toml` handling.
//!
//! ```toml
//! [client]
//! servers = ["pool.ntp.org", "time.google.com"]
//! timeout_ms = 5000
//! interval_secs = 1800
//! ```
//!
//! Every key is optional. The file lives in `$NTPCLOCK_CONFIG_DIR` when set,
//! otherwise in the platform config directory under `ntpclock/`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use toml::Table;

use crate::services::client::DEFAULT_SERVERS;
use crate::services::query::DEFAULT_TIMEOUT;

/// Re-sync cadence of a long-running application.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub servers: Vec<String>,
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            servers: DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let root: Table = content.parse::<Table>()?;
        parse_table(&root)
    }
}

fn positive_integer(table: &Table, key: &str) -> Result<Option<u64>, ConfigError> {
    match table.get(key) {
        None => Ok(None),
        Some(value) => match value.as_integer() {
            Some(n) if n > 0 => Ok(Some(n as u64)),
            _ => Err(ConfigError::Invalid(format!(
                "client.{key} must be a positive integer"
            ))),
        },
    }
}

fn parse_table(root: &Table) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();
    let Some(client) = root.get("client") else {
        return Ok(config);
    };
    let client = client
        .as_table()
        .ok_or_else(|| ConfigError::Invalid("[client] must be a table".into()))?;

    if let Some(servers) = client.get("servers") {
        let list = servers
            .as_array()
            .ok_or_else(|| ConfigError::Invalid("client.servers must be an array".into()))?;
        let mut parsed = Vec::with_capacity(list.len());
        for entry in list {
            match entry.as_str().map(str::trim) {
                Some(s) if !s.is_empty() => parsed.push(s.to_string()),
                _ => {
                    return Err(ConfigError::Invalid(
                        "client.servers entries must be non-empty strings".into(),
                    ));
                }
            }
        }
        config.servers = parsed;
    }
    if let Some(ms) = positive_integer(client, "timeout_ms")? {
        config.timeout = Duration::from_millis(ms);
    }
    if let Some(secs) = positive_integer(client, "interval_secs")? {
        config.interval = Duration::from_secs(secs);
    }
    Ok(config)
}

pub fn default_path() -> PathBuf {
    resolve_config_dir().join("config.toml")
}

fn resolve_config_dir() -> PathBuf {
    if let Some(val) = env::var_os("NTPCLOCK_CONFIG_DIR") {
        let path = PathBuf::from(val);
        if path.is_absolute() {
            return path;
        }
        return env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| PathBuf::from("."));
    }
    if let Some(base) = dirs::config_dir() {
        return base.join("ntpclock");
    }
    PathBuf::from(".ntpclock")
}
