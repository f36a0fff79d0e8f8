use std::io::Write;

use dataminer_config::{load_from_path, ConfigError};

fn write_temp_yaml(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_a_full_config_file_from_disk() {
    let yaml = r#"
app:
  name: dataminer
  version: "0.1.0"
  log_level: debug
exchanges:
  binance:
    enabled: true
    api_url: "https://api.binance.com"
    data_types:
      ticker:
        enabled: true
        symbols: ["BTCUSDT", "ETHUSDT"]
      orderbook:
        enabled: true
        symbols: ["BTCUSDT"]
        depth: 20
      kline:
        enabled: true
        symbols: ["*"]
        intervals: ["1m", "5m"]
    tradable_pairs:
      fetch_from_api: true
      update_interval: "1h"
      cache_enabled: true
      cache_ttl: "24h"
      supported_assets: ["spot"]
      auto_update: true
      skip_on_network_error: true
scheduler:
  enabled: true
  max_concurrent_jobs: 4
  jobs:
    - name: ticker-poll
      exchange: binance
      data_type: ticker
      cron: "0 */1 * * * *"
storage:
  backend: "postgres"
monitoring:
  enabled: true
"#;
    let file = write_temp_yaml(yaml);

    let config = load_from_path(file.path()).unwrap();

    assert_eq!(config.app.name, "dataminer");
    let binance = &config.exchanges["binance"];
    assert_eq!(binance.data_types["orderbook"].depth, Some(20));
    assert_eq!(
        binance.data_types["kline"].intervals,
        Some(vec!["1m".to_string(), "5m".to_string()])
    );
    assert!(binance.tradable_pairs.auto_update);
    assert!(config.storage.is_some());
    assert!(config.monitoring.is_some());
}

#[test]
fn missing_file_surfaces_as_io_error() {
    let err = load_from_path("/nonexistent/path/to/config.yaml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn malformed_yaml_surfaces_as_yaml_error() {
    let file = write_temp_yaml("app: [this is not a valid mapping");
    let err = load_from_path(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Yaml(_)));
}
