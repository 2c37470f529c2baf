use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default)]
    pub supporting: SupportingConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Dispatcher connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatcherConfig {
    /// Base address, e.g. `http://dispatcher:8000`
    pub base_url: Option<String>,
    #[serde(default = "default_dispatcher_timeout")]
    pub request_timeout: HumanDuration,
    /// Bearer token (loaded from environment, not from config file)
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout: default_dispatcher_timeout(),
            token: None,
        }
    }
}

fn default_dispatcher_timeout() -> HumanDuration {
    HumanDuration::from_secs(60)
}

/// Worker pool settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Identity reported to the dispatcher when polling
    pub client_name: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_task_interval")]
    pub task_interval: HumanDuration,
    #[serde(default = "default_download_timeout")]
    pub download_timeout: HumanDuration,
    /// Run exactly one pipeline in-process and exit
    #[serde(default)]
    pub debug_once: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            client_name: None,
            pool_size: default_pool_size(),
            task_interval: default_task_interval(),
            download_timeout: default_download_timeout(),
            debug_once: false,
        }
    }
}

fn default_pool_size() -> usize {
    2
}

fn default_task_interval() -> HumanDuration {
    HumanDuration::from_secs(5)
}

fn default_download_timeout() -> HumanDuration {
    HumanDuration::from_secs(240)
}

/// Origin content server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    #[serde(default = "default_download_base")]
    pub download_base: String,
    /// Proxy for origin traffic only
    pub proxy: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_origin_timeout")]
    pub request_timeout: HumanDuration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            download_base: default_download_base(),
            proxy: None,
            connect_timeout: default_connect_timeout(),
            request_timeout: default_origin_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_download_base() -> String {
    "https://download.archiveofourown.org".to_string()
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_origin_timeout() -> HumanDuration {
    HumanDuration::from_secs(180)
}

fn default_user_agent() -> String {
    format!("fetchrelay/{}", env!("CARGO_PKG_VERSION"))
}

/// Supporting-object collection limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupportingConfig {
    /// Ceiling on metadata form fields emitted for supporting objects.
    /// The dispatcher rejects submissions with too many form fields.
    #[serde(default = "default_max_metadata_fields")]
    pub max_metadata_fields: usize,
}

impl Default for SupportingConfig {
    fn default() -> Self {
        Self {
            max_metadata_fields: default_max_metadata_fields(),
        }
    }
}

fn default_max_metadata_fields() -> usize {
    496
}

/// Post-submission follow-up fetch settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_reconcile_user_agent")]
    pub user_agent: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            user_agent: default_reconcile_user_agent(),
        }
    }
}

fn default_reconcile_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".to_string()
}
