use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::ConfigError;
use secrecy::SecretString;
use serde::Deserialize;

use crate::utils;

const CONFIG: &str = include_str!("../../.config/config.json5");

const ENV_PREFIX: &str = "ARTCAFE_FEED";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub _data_dir: PathBuf,
    #[serde(default)]
    pub _config_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "ApiConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    fn default_timeout_secs() -> u64 {
        15
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    pub page_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NotificationConfig {
    pub poll_interval_secs: u64,
}

impl NotificationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
        }
    }
}

/// Layered settings: embedded defaults, then user files, then
/// `ARTCAFE_FEED__SECTION__KEY` environment variables
#[derive(Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    token: Option<String>,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(&utils::get_config_dir(), &utils::get_data_dir(), true)
    }

    /// Builds the configuration from `config_dir`, optionally reading the environment
    pub fn load(config_dir: &Path, data_dir: &Path, with_env: bool) -> Result<Self, ConfigError> {
        let default_config: Config = json5::from_str(CONFIG)
            .map_err(|e| ConfigError::Message(format!("Failed to load default config: {e}")))?;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5))
            .set_default("_data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("_config_dir", config_dir.to_string_lossy().to_string())?;

        let config_files = [
            ("config.json5", config::FileFormat::Json5),
            ("config.json", config::FileFormat::Json),
            ("config.yaml", config::FileFormat::Yaml),
            ("config.toml", config::FileFormat::Toml),
            ("config.ini", config::FileFormat::Ini),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            builder = builder.add_source(
                config::File::from(config_dir.join(file))
                    .format(*format)
                    .required(false),
            );
            if config_dir.join(file).exists() {
                found_config = true
            }
        }
        if !found_config {
            log::info!(
                "No configuration file in {}, using defaults",
                config_dir.display()
            );
        }

        if with_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut cfg: Self = builder.build()?.try_deserialize()?;

        if cfg.api.base_url.trim().is_empty() {
            return Err(ConfigError::NotFound(String::from("api.base_url")));
        }
        if cfg.feed.page_size == 0 {
            log::warn!("feed.page_size must be positive, using the default");
            cfg.feed.page_size = default_config.feed.page_size;
        }
        if cfg.notifications.poll_interval_secs == 0 {
            cfg.notifications.poll_interval_secs =
                default_config.notifications.poll_interval_secs;
        }

        Ok(cfg)
    }

    /// Session token, if one was configured
    pub fn token(&self) -> Option<SecretString> {
        self.token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("config", &self.config)
            .field("api", &self.api)
            .field("feed", &self.feed)
            .field("notifications", &self.notifications)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
