//! Configuration loading for the agent core
//!
//! Settings come from three layered sources: built-in defaults, an optional
//! TOML/JSON/YAML file, and `PETPAL__`-prefixed environment variables.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the agent core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Dispatcher tuning
    #[serde(default)]
    pub dispatcher: DispatcherSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format
    #[serde(default)]
    pub json: bool,
}

/// Dispatcher queue and retry tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// Maximum queued tasks before oldest-first eviction
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Maximum tasks running at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Retries before a task is recorded as permanently failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Queue processing tick, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Execution history ring size
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_queue_size() -> usize {
    50
}

fn default_max_concurrency() -> usize {
    3
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_tick_ms() -> u64 {
    100
}

fn default_history_size() -> usize {
    1000
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            tick_ms: default_tick_ms(),
            history_size: default_history_size(),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            logging: LoggingSettings::default(),
            dispatcher: DispatcherSettings::default(),
        }
    }
}

/// Load configuration from a file, layered with environment variables
///
/// Supports TOML, JSON, and YAML formats based on file extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CoreConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CoreError::config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("PETPAL").separator("__"))
        .build()?;

    let config: CoreConfig = settings.try_deserialize()?;

    tracing::info!("Configuration loaded from {}", path.display());

    Ok(config)
}

/// Load configuration with defaults if the file doesn't exist
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> CoreConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            CoreConfig::default()
        }
    }
}
