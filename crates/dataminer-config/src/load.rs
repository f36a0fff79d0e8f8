use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::schema::AppConfig;

/// Reads and parses a YAML config file into a typed [`AppConfig`], then
/// validates it. `tracing::warn!` fires once for each passthrough section
/// (`storage`, `monitoring`) present in the file, since nothing in this
/// crate acts on them.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let raw = fs::read_to_string(path)?;
    load_from_str(&raw)
}

pub fn load_from_str(raw: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_yaml::from_str(raw)?;
    validate(&config)?;
    warn_on_passthrough_sections(&config);
    Ok(config)
}

fn warn_on_passthrough_sections(config: &AppConfig) {
    if config.storage.is_some() {
        tracing::warn!("config has a `storage` section; dataminer-config carries it unvalidated and unused");
    }
    if config.monitoring.is_some() {
        tracing::warn!("config has a `monitoring` section; dataminer-config carries it unvalidated and unused");
    }
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    for (name, exchange) in &config.exchanges {
        if !exchange.enabled {
            continue;
        }
        if exchange.api_url.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::Validation(format!(
                "exchange `{name}` is enabled but has no api_url"
            )));
        }
        if exchange.use_websocket && exchange.websocket_url.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::Validation(format!(
                "exchange `{name}` has use_websocket=true but no websocket_url"
            )));
        }
    }

    if config.scheduler.enabled {
        for job in &config.scheduler.jobs {
            if !config.exchanges.contains_key(&job.exchange) {
                return Err(ConfigError::Validation(format!(
                    "job `{}` references unknown exchange `{}`",
                    job.name, job.exchange
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
app:
  name: dataminer
  version: "0.1.0"
  log_level: info
exchanges:
  binance:
    enabled: true
    api_url: "https://api.binance.com"
    data_types:
      ticker:
        enabled: true
        symbols: ["*"]
scheduler:
  enabled: true
  max_concurrent_jobs: 4
  jobs:
    - name: ticker-job
      exchange: binance
      data_type: ticker
      cron: "0 */1 * * * *"
"#;

    #[test]
    fn loads_minimal_valid_config() {
        let config = load_from_str(MINIMAL).unwrap();
        assert_eq!(config.app.name, "dataminer");
        let binance = &config.exchanges["binance"];
        assert!(binance.enabled);
        assert_eq!(
            binance.data_types["ticker"].symbols,
            vec!["*".to_string()]
        );
    }

    #[test]
    fn enabled_exchange_without_api_url_fails_validation() {
        let yaml = r#"
app:
  name: dataminer
  version: "0.1.0"
exchanges:
  binance:
    enabled: true
"#;
        let err = load_from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn disabled_exchange_without_api_url_is_allowed() {
        let yaml = r#"
app:
  name: dataminer
  version: "0.1.0"
exchanges:
  binance:
    enabled: false
"#;
        assert!(load_from_str(yaml).is_ok());
    }

    #[test]
    fn job_referencing_unknown_exchange_fails_validation() {
        let yaml = r#"
app:
  name: dataminer
  version: "0.1.0"
exchanges:
  binance:
    enabled: true
    api_url: "https://api.binance.com"
scheduler:
  enabled: true
  jobs:
    - name: ghost-job
      exchange: kraken
      data_type: ticker
      cron: "0 * * * * *"
"#;
        let err = load_from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn use_websocket_without_websocket_url_fails_validation() {
        let yaml = r#"
app:
  name: dataminer
  version: "0.1.0"
exchanges:
  binance:
    enabled: true
    api_url: "https://api.binance.com"
    use_websocket: true
"#;
        let err = load_from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
