//! Configuration loading and typed config structures for the notifier.
//!
//! The configuration is a single YAML document with three sections:
//!
//! ```yaml
//! api:
//!   base_url: "http://game-host:8080"
//!   secret: "c2VjcmV0LWtleQ=="
//! engine:
//!   tick_interval_ms: 1000
//!   min_grid_blocks: 20
//! logging:
//!   level: "info"
//!   json: false
//! ```
//!
//! Every field is optional; missing fields take the defaults documented on
//! each struct. When loading from a file, the API URL and secret can be
//! overridden from the environment (see [`ApiConfig::apply_env_overrides`]).
//! [`NotifyConfig::parse`] never reads the environment.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use spacelab_api::ApiConfig;

/// Smallest accepted tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid config: {reason}")]
    Invalid {
        /// Which value was rejected and why.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level notifier configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotifyConfig {
    /// Remote API connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Polling and reconciliation parameters.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NotifyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are applied before validation:
    /// - `SPACELAB_API_URL` overrides `api.base_url`
    /// - `SPACELAB_API_SECRET` overrides `api.secret`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.api.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, exactly as written.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(invalid("api.base_url must not be empty"));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(invalid("api.request_timeout_ms must be positive"));
        }
        self.engine.validate()
    }
}

/// Polling and reconciliation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Time between ticks in milliseconds. At least 100.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Non-static grids with fewer blocks than this are not tracked.
    #[serde(default = "default_min_grid_blocks")]
    pub min_grid_blocks: u32,

    /// A tracked entity must move further than this (squared meters)
    /// before an update is published.
    #[serde(default = "default_min_move_distance_sq")]
    pub min_move_distance_sq: f64,

    /// How far a grid's block counter must advance before its blocks are
    /// fetched again.
    #[serde(default = "default_blocks_refresh_delta")]
    pub blocks_refresh_delta: u64,

    /// Maximum chat messages requested per tick.
    #[serde(default = "default_chat_batch_size")]
    pub chat_batch_size: u32,

    /// Subscriber callbacks slower than this are logged as warnings.
    #[serde(default = "default_slow_subscriber_warn_ms")]
    pub slow_subscriber_warn_ms: u64,
}

impl EngineConfig {
    /// The tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// The slow-subscriber threshold as a [`Duration`].
    pub const fn slow_subscriber_warn(&self) -> Duration {
        Duration::from_millis(self.slow_subscriber_warn_ms)
    }

    /// Check that every engine value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(invalid(format!(
                "engine.tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}, got {}",
                self.tick_interval_ms
            )));
        }
        if !self.min_move_distance_sq.is_finite() || self.min_move_distance_sq < 0.0 {
            return Err(invalid(format!(
                "engine.min_move_distance_sq must be finite and non-negative, got {}",
                self.min_move_distance_sq
            )));
        }
        if self.chat_batch_size == 0 {
            return Err(invalid("engine.chat_batch_size must be positive"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            min_grid_blocks: default_min_grid_blocks(),
            min_move_distance_sq: default_min_move_distance_sq(),
            blocks_refresh_delta: default_blocks_refresh_delta(),
            chat_batch_size: default_chat_batch_size(),
            slow_subscriber_warn_ms: default_slow_subscriber_warn_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (`info`, `spacelab_notify=debug`, ...).
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_min_grid_blocks() -> u32 {
    20
}

const fn default_min_move_distance_sq() -> f64 {
    10.0
}

const fn default_blocks_refresh_delta() -> u64 {
    30
}

const fn default_chat_batch_size() -> u32 {
    100
}

const fn default_slow_subscriber_warn_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_owned()
}
