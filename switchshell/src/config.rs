//! Batch settings read from a TOML file.
//!
//! ```toml
//! enable = false
//! loglevel = "error"
//! commands = ["show interfaces ethernet status", "show configuration"]
//! hosts = ["sw-core-1.example.net", "sw-core-2.example.net"]
//! ```
//!
//! Every key is optional; values given on the command line win.

use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Contents of a config file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub hosts: Option<Vec<String>>,
    pub commands: Option<Vec<String>>,
    pub enable: Option<bool>,
    pub loglevel: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    /// Per-command timeout in seconds.
    pub timeout: Option<u64>,
    /// End-of-command prompt markers, replacing the defaults.
    pub prompts: Option<Vec<String>>,
    pub compress: Option<bool>,
}

impl FileConfig {
    /// Read and parse `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content)?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML text. Host and command entries are trimmed and blank
    /// entries dropped.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: FileConfig = toml::from_str(content).map_err(ConfigError::from)?;
        config.hosts = config.hosts.map(non_blank);
        config.commands = config.commands.map(non_blank);
        Ok(config)
    }
}

/// Trim every entry and drop the empty ones.
pub fn non_blank<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| entry.as_ref().trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}
