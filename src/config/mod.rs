//! Worker settings
//!
//! Settings are resolved once at startup, in increasing precedence:
//! built-in defaults, the TOML file, legacy deployment variables
//! (`DL_SCRIPT_ADDRESS`, `DL_SCRIPT_NAME`, `PROXYADDRESS`) and finally
//! `FETCHRELAY__<SECTION>__<KEY>` variables. The resulting [`Config`] is
//! passed to component constructors; nothing else reads the environment.
//!
//! ```no_run
//! use fetchrelay::config::Config;
//!
//! let config = Config::load(None).expect("Failed to load configuration");
//! println!("Pool size: {}", config.worker.pool_size);
//! ```
//!
//! Durations accept `500ms`, `30s`, `4m`, `1h` or bare seconds, e.g.
//! `FETCHRELAY__WORKER__DOWNLOAD_TIMEOUT=4m`.
//!
//! The dispatcher token never comes from the file: it is read from
//! `FETCHRELAY_TOKEN`, falling back to `ADMIN_TOKEN`. The file defaults to
//! `config/fetchrelay.toml` and moves with `FETCHRELAY_CONFIG` or `--config`.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{
    Config, DispatcherConfig, OriginConfig, ReconcileConfig, SupportingConfig, WorkerConfig,
};
pub use validation::ValidationError;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// `path` overrides the configuration file location.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (missing dispatcher address, empty pool, etc.)
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, without secrets or legacy variables
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration assembled in code
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate(self)?;
        Ok(())
    }

    /// Client identity; present once validation has passed
    pub fn client_name(&self) -> &str {
        self.worker.client_name.as_deref().unwrap_or_default()
    }
}
