//! Configuration management for Minicast
//!
//! Settings are stored as a single TOML record and are both read and
//! written by the integration: the identity resolver persists the GCID it
//! obtains from the API so later startups skip the network entirely.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub publishing: PublishingConfig,
    pub webcurtain: WebcurtainConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Shared secret authenticating this installation to the minifeed API.
    pub feedkey: String,
    /// Remote-assigned publisher identity, persisted once resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    pub shareable: bool,
    pub commentable: bool,
    /// Default state of the per-item publish checkbox for items that have
    /// never been saved with an explicit choice.
    pub default_publish: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebcurtainConfig {
    pub enabled: bool,
    pub compat: bool,
}

impl Settings {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let settings: Settings = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(settings)
    }

    /// Write configuration to a specific path, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(ConfigError::WriteError)?;
            }
        }
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Create a default configuration, as written on installation
    pub fn default_config() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://minifeed.social/api".to_string(),
                feedkey: String::new(),
                gcid: None,
            },
            store: StoreConfig {
                path: "~/.local/share/minicast/state.db".to_string(),
            },
            publishing: PublishingConfig {
                shareable: true,
                commentable: true,
                default_publish: false,
            },
            webcurtain: WebcurtainConfig {
                enabled: false,
                compat: false,
            },
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("MINICAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("minicast").join("config.toml"))
}

/// Resolve the data directory path following XDG Base Directory spec
pub fn resolve_data_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| ConfigError::MissingField("data directory".to_string()))?;

    Ok(data_dir.join("minicast"))
}
