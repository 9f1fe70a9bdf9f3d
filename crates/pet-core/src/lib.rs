//! Pet Core
//!
//! Shared foundation for the petpal agent orchestration core: error
//! handling, configuration loading, and logging setup.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{load_config, load_config_or_default, CoreConfig, DispatcherSettings, LoggingSettings};
pub use error::{CoreError, Result};
pub use logging::init_logging;
