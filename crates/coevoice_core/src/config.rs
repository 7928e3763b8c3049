//! Bot configuration.

use crate::{DirectoryCacheConfig, JsonFileStore, LinkRegistry};
use coevoice_error::{CoevoiceResult, ConfigError, ConfigErrorKind};
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Settings read from `coevoice.toml`.
///
/// Every field has a default, so an empty or missing file is valid.
///
/// ```toml
/// links_file = "config.json"
/// command_prefix = "!"
/// move_deafened_to_afk = true
///
/// [cache]
/// ttl_seconds = 300
/// max_entries = 10000
/// enabled = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct CoevoiceConfig {
    /// JSON document holding the link table
    #[serde(default = "default_links_file")]
    #[setters(into)]
    links_file: PathBuf,

    /// Prefix that marks a chat message as a command
    #[serde(default = "default_command_prefix")]
    #[setters(into)]
    command_prefix: String,

    /// Move deafened members to the guild's AFK channel
    #[serde(default = "default_move_deafened_to_afk")]
    move_deafened_to_afk: bool,

    /// Directory cache tier
    #[serde(default)]
    cache: DirectoryCacheConfig,
}

fn default_links_file() -> PathBuf {
    PathBuf::from("config.json")
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_move_deafened_to_afk() -> bool {
    true
}

impl Default for CoevoiceConfig {
    fn default() -> Self {
        Self {
            links_file: default_links_file(),
            command_prefix: default_command_prefix(),
            move_deafened_to_afk: default_move_deafened_to_afk(),
            cache: DirectoryCacheConfig::default(),
        }
    }
}

impl CoevoiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> CoevoiceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(ConfigErrorKind::FileRead {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ConfigError::new(ConfigErrorKind::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> CoevoiceResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Load the link table from `links_file`, creating the file when missing.
    pub async fn open_links(&self) -> CoevoiceResult<LinkRegistry> {
        let store = Arc::new(JsonFileStore::new(&self.links_file));
        Ok(LinkRegistry::load(store).await?)
    }
}
