//! # Application State
//!
//! Shared state for the Axum application and the environment-driven
//! configuration it is built from.

use std::path::PathBuf;
use std::sync::Arc;

use harvest_core::LedgerAddress;
use harvest_ledger::LedgerClient;
use harvest_registry::{BatchRegistry, MemoryRecordStore};
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;

use crate::auth::SecretString;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 4000;
/// Browser origin allowed to call the API when `HARVEST_FRONTEND_URL` is unset.
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
/// Network name used when `HARVEST_NETWORK` is unset.
pub const DEFAULT_NETWORK: &str = "polygon-amoy";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Connection settings for the EVM ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub rpc_url: String,
    pub contract: LedgerAddress,
    pub from: LedgerAddress,
    pub network: String,
    pub timeout_secs: Option<u64>,
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `None` disables the admin routes unless `allow_open_admin` is set.
    pub admin_token: Option<SecretString>,
    pub allow_open_admin: bool,
    /// Origin the browser front end is served from, for CORS.
    pub frontend_url: String,
    pub database_url: Option<String>,
    /// File store directory, used when no database is configured.
    pub data_dir: Option<PathBuf>,
    /// `None` runs without a ledger.
    pub ledger: Option<LedgerSettings>,
    pub metrics_enabled: bool,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            admin_token: None,
            allow_open_admin: false,
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            database_url: None,
            data_dir: None,
            ledger: None,
            metrics_enabled: true,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("HARVEST_PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "HARVEST_PORT",
                expected: "port number",
                value: v,
            })?,
            None => DEFAULT_PORT,
        };

        let rpc_url = get("HARVEST_RPC_URL");
        let contract = get("HARVEST_CONTRACT_ADDRESS");
        let from = get("HARVEST_FROM_ADDRESS");
        let ledger = match (rpc_url, contract, from) {
            (Some(rpc_url), Some(contract), Some(from)) => {
                let address = |var: &'static str, value: String| {
                    LedgerAddress::parse(&value).map_err(|_| ConfigError::Invalid {
                        var,
                        expected: "0x-prefixed 20-byte address",
                        value,
                    })
                };
                let timeout_secs = match get("HARVEST_RPC_TIMEOUT_SECS") {
                    Some(v) => Some(v.trim().parse().map_err(|_| ConfigError::Invalid {
                        var: "HARVEST_RPC_TIMEOUT_SECS",
                        expected: "number of seconds",
                        value: v,
                    })?),
                    None => None,
                };
                Some(LedgerSettings {
                    rpc_url,
                    contract: address("HARVEST_CONTRACT_ADDRESS", contract)?,
                    from: address("HARVEST_FROM_ADDRESS", from)?,
                    network: get("HARVEST_NETWORK").unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
                    timeout_secs,
                })
            }
            (None, None, None) => None,
            _ => {
                tracing::warn!(
                    "HARVEST_RPC_URL, HARVEST_CONTRACT_ADDRESS and HARVEST_FROM_ADDRESS \
                     must all be set to enable the ledger; running without one"
                );
                None
            }
        };

        let frontend_url = get("HARVEST_FRONTEND_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());
        if axum::http::HeaderValue::from_str(&frontend_url).is_err() {
            return Err(ConfigError::Invalid {
                var: "HARVEST_FRONTEND_URL",
                expected: "origin URL",
                value: frontend_url,
            });
        }

        Ok(Self {
            port,
            admin_token: get("HARVEST_ADMIN_TOKEN").map(SecretString::new),
            allow_open_admin: get("HARVEST_ALLOW_OPEN_ADMIN")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            frontend_url,
            database_url: get("DATABASE_URL"),
            data_dir: get("HARVEST_DATA_DIR").map(PathBuf::from),
            ledger,
            metrics_enabled: get("HARVEST_METRICS_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            log_json: get("HARVEST_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BatchRegistry>,
    pub config: AppConfig,
    /// Set when a Prometheus recorder is installed; `/metrics` is only
    /// mounted when present.
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    pub fn new(registry: BatchRegistry, config: AppConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
            metrics: None,
        }
    }

    /// In-memory store, default configuration, and the given ledger.
    pub fn in_memory(ledger: Option<Arc<dyn LedgerClient>>) -> Self {
        Self::with_config(AppConfig::default(), ledger)
    }

    /// In-memory store with an explicit configuration.
    pub fn with_config(config: AppConfig, ledger: Option<Arc<dyn LedgerClient>>) -> Self {
        let registry = BatchRegistry::new(Arc::new(MemoryRecordStore::new()), ledger);
        Self::new(registry, config)
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
