use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::log_level::LogLevel;

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataTypeConfig {
    #[serde(default)]
    pub enabled: bool,
    /// `["*"]` means "all known pairs", resolved against the tradable-pairs
    /// cache at job-invocation time rather than here.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Poll cadence hint; absent for stream mode.
    pub interval: Option<String>,
    /// Orderbook depth; only meaningful for the `orderbook` entry.
    pub depth: Option<u32>,
    /// Kline intervals to poll; only meaningful for the `kline` entry.
    pub intervals: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradablePairsConfig {
    #[serde(default = "default_true")]
    pub fetch_from_api: bool,
    pub update_interval: Option<String>,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    pub cache_ttl: Option<String>,
    #[serde(default)]
    pub supported_assets: Vec<String>,
    #[serde(default)]
    pub auto_update: bool,
    #[serde(default)]
    pub skip_on_network_error: bool,
}

impl Default for TradablePairsConfig {
    fn default() -> Self {
        Self {
            fetch_from_api: true,
            update_interval: None,
            cache_enabled: true,
            cache_ttl: None,
            supported_assets: Vec::new(),
            auto_update: false,
            skip_on_network_error: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default)]
    pub enabled: bool,
    pub api_url: Option<String>,
    pub websocket_url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    #[serde(default)]
    pub use_websocket: bool,
    #[serde(default)]
    pub data_types: HashMap<String, DataTypeConfig>,
    #[serde(default)]
    pub tradable_pairs: TradablePairsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub exchange: String,
    pub data_type: String,
    /// Six-field cron expression: second, minute, hour, day-of-month,
    /// month, day-of-week.
    pub cron: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub max_concurrent_jobs: usize,
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// Top-level configuration tree. `storage`/`monitoring` are parsed but not
/// acted upon; they're carried as opaque JSON so peripheral sections don't
/// need field-by-field modeling.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    #[serde(default)]
    pub exchanges: HashMap<String, ExchangeConfig>,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    pub storage: Option<Value>,
    pub monitoring: Option<Value>,
}

fn default_true() -> bool {
    true
}
