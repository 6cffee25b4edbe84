//! Configuration file support.
//!
//! Loaded from `$XDG_CONFIG_HOME/femcare/config.toml`; every section and
//! field falls back to a default when missing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::KdfParams;
use crate::distress::{DistressClassifier, DEFAULT_DISTRESS_KEYWORDS};
use crate::notify::NotificationPolicy;
use crate::responses::Region;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config directory not found")]
    NoConfigDir,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Falls back to the platform data directory when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub encrypted: bool,

    #[serde(default = "default_kdf_memory_kib")]
    pub kdf_memory_kib: u32,

    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            encrypted: true,
            kdf_memory_kib: default_kdf_memory_kib(),
            kdf_iterations: default_kdf_iterations(),
        }
    }
}

impl StorageConfig {
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            memory_kib: self.kdf_memory_kib,
            iterations: self.kdf_iterations,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TrackerConfig {
    #[serde(default)]
    pub show_fertility: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub notification_policy: NotificationPolicy,

    /// Checked in order; the first contained phrase is reported.
    #[serde(default = "default_distress_keywords")]
    pub distress_keywords: Vec<String>,

    #[serde(default)]
    pub region: Region,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            notification_policy: NotificationPolicy::default(),
            distress_keywords: default_distress_keywords(),
            region: Region::default(),
        }
    }
}

impl ChatConfig {
    pub fn classifier(&self) -> DistressClassifier {
        DistressClassifier::new(&self.distress_keywords)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_kdf_memory_kib() -> u32 {
    KdfParams::default().memory_kib
}

fn default_kdf_iterations() -> u32 {
    KdfParams::default().iterations
}

fn default_distress_keywords() -> Vec<String> {
    DEFAULT_DISTRESS_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        Ok(dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("femcare")
            .join("config.toml"))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
