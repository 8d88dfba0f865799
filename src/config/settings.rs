//! Application settings

use crate::core::catalog::{ChannelLabels, CUSTOM_CHANNEL_SLOTS};
use crate::core::coordinate::ChannelAliases;
use crate::core::family::ConsoleFamily;
use crate::core::session::SessionConfig;
use crate::core::transport::{TcpConfig, SCP_PORT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No platform config directory
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// File could not be read or written
    #[error("Config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Console connection
    pub console: ConsoleSettings,
    /// Channel alias slots
    pub channels: [ChannelSlot; CUSTOM_CHANNEL_SLOTS],
    /// Session behavior
    pub session: SessionSettings,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            console: ConsoleSettings::default(),
            channels: std::array::from_fn(|i| ChannelSlot {
                name: format!("My Channel {}", i + 1),
                channel: 1,
            }),
            session: SessionSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load config from the platform config directory
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&Self::default_path()?)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `config.toml` in the platform config directory
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        super::config_dir()
            .map(|dir| dir.join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Channels behind the alias slots
    pub fn aliases(&self) -> ChannelAliases {
        ChannelAliases::new(self.channels.each_ref().map(|slot| {
            (slot.channel > 0).then_some(slot.channel)
        }))
    }

    /// Labels of the alias slots
    pub fn labels(&self) -> ChannelLabels {
        ChannelLabels::new(self.channels.each_ref().map(|slot| slot.name.clone()))
    }

    /// Catalog directory, falling back to the platform data directory
    pub fn catalog_dir(&self) -> Option<PathBuf> {
        self.console.catalog_dir.clone().or_else(super::catalog_dir)
    }

    /// Session settings for the configured console
    pub fn session_config(&self) -> SessionConfig {
        let tcp = TcpConfig::new(&self.console.host, self.console.port)
            .timeout(self.console.timeout_secs);
        let mut config = SessionConfig::new(&self.console.host, tcp);
        config.auto_reconnect = self.session.auto_reconnect;
        config.reconnect_delay_secs = self.session.reconnect_delay_secs;
        config.max_reconnect_attempts = self.session.max_reconnect_attempts;
        config
    }
}

/// Console connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Console IP or host name
    pub host: String,
    /// SCP port
    pub port: u16,
    /// Console family
    pub model: ConsoleFamily,
    /// Directory holding the catalog files
    pub catalog_dir: Option<PathBuf>,
    /// Connection timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: SCP_PORT,
            model: ConsoleFamily::ClQl,
            catalog_dir: None,
            timeout_secs: 10,
        }
    }
}

/// One channel alias slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSlot {
    /// Label shown in channel selectors
    pub name: String,
    /// Channel the slot points at (0 = unassigned)
    pub channel: u32,
}

/// Session behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Reconnect after the console drops the connection
    pub auto_reconnect: bool,
    /// Delay between reconnect attempts (seconds)
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect attempts (0 = unlimited)
    pub max_reconnect_attempts: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            reconnect_delay_secs: 5,
            max_reconnect_attempts: 0,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
