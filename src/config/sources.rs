use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "FETCHRELAY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/fetchrelay.toml";
const ENV_PREFIX: &str = "FETCHRELAY";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load(path_override: Option<PathBuf>) -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = path_override.unwrap_or_else(|| {
        env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    });

    let mut config = load_from_sources(config_path)?;

    load_secrets(&mut config, |key| env::var(key).ok());
    load_legacy(&mut config, |key| env::var(key).ok());

    Ok(config)
}

/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    config.dispatcher.token = lookup("FETCHRELAY_TOKEN").or_else(|| lookup("ADMIN_TOKEN"));
}

/// Fill unset keys from the variable names older deployments export
fn load_legacy(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if config.dispatcher.base_url.is_none() {
        config.dispatcher.base_url = lookup("DL_SCRIPT_ADDRESS");
    }
    if config.worker.client_name.is_none() {
        config.worker.client_name = lookup("DL_SCRIPT_NAME");
    }
    if config.origin.proxy.is_none() {
        config.origin.proxy = lookup("PROXYADDRESS");
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // FETCHRELAY__WORKER__POOL_SIZE -> worker.pool_size
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}
