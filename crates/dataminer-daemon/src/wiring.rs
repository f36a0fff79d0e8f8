//! Turns a loaded [`dataminer_config::AppConfig`] into running components:
//! one [`IpPool`] + [`HttpClient`] per exchange hostname, one
//! [`BinanceAdapter`] + optional [`PairsCache`] per enabled exchange, one
//! [`Scheduler`] per exchange fed from `scheduler.jobs[]`, and (when
//! `use_websocket = true`) a [`StreamClient`] in place of the poll path.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use dataminer_config::{AppConfig, ExchangeConfig, JobConfig};
use dataminer_exchange::{AssetClass, BinanceAdapter};
use dataminer_http::{DynamicHost, HttpClient, HttpClientConfig};
use dataminer_ippool::{DnsResolver, IpPool, IpPoolConfig, MultiServerResolver};
use dataminer_model::RecordSink;
use dataminer_pairs::{PairsCache, PairsCacheConfig};
use dataminer_scheduler::{JobSpec, Scheduler, SchedulerConfig};
use dataminer_ws::{StreamClient, StreamClientConfig};

use crate::state::ExchangeRuntime;

/// Public DNS servers queried directly (bypassing the system resolver).
/// Not yet exposed as a config knob; every IP pool uses the same pair.
fn default_dns_servers() -> Vec<SocketAddr> {
    vec![
        SocketAddr::from(([8, 8, 8, 8], 53)),
        SocketAddr::from(([1, 1, 1, 1], 53)),
    ]
}

#[derive(Debug)]
pub struct WiringError(pub String);

impl std::fmt::Display for WiringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "startup wiring error: {}", self.0)
    }
}

impl std::error::Error for WiringError {}

/// Splits a `scheme://host[:port][/path]` URL into `(host, port)`, not
/// relying on a generic URL-parsing crate since only the authority is
/// ever needed here.
fn split_host_port(url: &str, default_port: u16) -> Result<(String, u16), WiringError> {
    let without_scheme = url.split("://").nth(1).unwrap_or(url);
    let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
    match authority.split_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| WiringError(format!("invalid port in url `{url}`")))?;
            Ok((host.to_string(), port))
        }
        None => Ok((authority.to_string(), default_port)),
    }
}

/// Parses a simple `<number><unit>` duration hint (`s`/`m`/`h`/`d`), the
/// shape `tradable_pairs.update_interval`/`cache_ttl` use in config. Not a
/// general-purpose duration parser — just enough for the suffixes the
/// config schema documents.
fn parse_duration_hint(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let unit = raw.chars().last()?;
    let (digits, multiplier) = match unit {
        's' => (&raw[..raw.len() - 1], 1u64),
        'm' => (&raw[..raw.len() - 1], 60),
        'h' => (&raw[..raw.len() - 1], 3600),
        'd' => (&raw[..raw.len() - 1], 86400),
        _ => (raw, 1),
    };
    digits.trim().parse::<u64>().ok().map(|n| Duration::from_secs(n * multiplier))
}

fn pairs_cache_config(cfg: &dataminer_config::TradablePairsConfig) -> PairsCacheConfig {
    let mut config = PairsCacheConfig::default();
    if let Some(ttl) = cfg.cache_ttl.as_deref().and_then(parse_duration_hint) {
        config.ttl = ttl;
    }
    config.update_interval = if cfg.auto_update {
        Some(cfg.update_interval.as_deref().and_then(parse_duration_hint).unwrap_or(config.ttl))
    } else {
        None
    };
    config
}

async fn build_ip_pool(hostname: &str) -> Result<Arc<IpPool>, WiringError> {
    let resolvers = default_dns_servers();
    let resolver: Arc<dyn DnsResolver> =
        Arc::new(MultiServerResolver::new(resolvers.clone(), Duration::from_secs(5)));
    let config = IpPoolConfig {
        resolvers,
        ..IpPoolConfig::default()
    };
    let pool = Arc::new(IpPool::new(hostname, config, resolver));
    pool.start()
        .await
        .map_err(|err| WiringError(format!("ip pool for `{hostname}` failed to start: {err}")))?;
    Ok(pool)
}

fn data_type_from_str(raw: &str) -> Option<dataminer_scheduler::DataType> {
    use dataminer_scheduler::DataType;
    match raw.to_ascii_lowercase().as_str() {
        "ticker" | "tickers" => Some(DataType::Ticker),
        "orderbook" | "orderbooks" => Some(DataType::Orderbook),
        "trade" | "trades" => Some(DataType::Trade),
        "kline" | "klines" => Some(DataType::Kline),
        _ => None,
    }
}

/// Expands one `scheduler.jobs[]` entry into one `JobSpec` per kline
/// interval (or a single spec for every other data type), pulling
/// symbols/depth/limit from the matching `exchanges.<name>.data_types.<type>`
/// section.
fn job_specs_for(job: &JobConfig, exchange_cfg: &ExchangeConfig, batch_size: usize) -> Result<Vec<JobSpec>, WiringError> {
    let data_type = data_type_from_str(&job.data_type)
        .ok_or_else(|| WiringError(format!("job `{}` has unknown data_type `{}`", job.name, job.data_type)))?;

    let dt_cfg = exchange_cfg.data_types.get(&job.data_type);
    let symbols = dt_cfg.map(|c| c.symbols.clone()).unwrap_or_else(|| vec!["*".to_string()]);
    let depth = dt_cfg.and_then(|c| c.depth).unwrap_or(20);
    let asset_class = exchange_cfg
        .tradable_pairs
        .supported_assets
        .first()
        .and_then(|s| AssetClass::parse(s))
        .unwrap_or(AssetClass::Spot);

    let base = JobSpec {
        name: job.name.clone(),
        data_type,
        cron_expr: job.cron.clone(),
        symbols,
        asset_class,
        batch_size,
        depth,
        limit: None,
        interval: None,
    };

    if data_type == dataminer_scheduler::DataType::Kline {
        let intervals = dt_cfg.and_then(|c| c.intervals.clone()).unwrap_or_else(|| vec!["1m".to_string()]);
        return Ok(intervals
            .into_iter()
            .map(|interval| JobSpec {
                name: format!("{}-{}", base.name, interval),
                interval: Some(interval),
                ..base.clone()
            })
            .collect());
    }

    Ok(vec![base])
}

/// Wires every enabled exchange into a running [`ExchangeRuntime`],
/// starting its IP pool(s), HTTP client, pairs cache, and scheduler (or,
/// for `use_websocket = true` exchanges, a [`StreamClient`] instead).
/// `ws_shutdown` is the `Notify` the daemon's shutdown coordinator signals
/// to stop every spawned stream client.
pub async fn wire_exchanges(
    config: &AppConfig,
    sink: Arc<dyn RecordSink>,
    ws_shutdown: Arc<Notify>,
) -> Result<Vec<ExchangeRuntime>, WiringError> {
    let mut runtimes = Vec::new();

    for (name, exchange_cfg) in &config.exchanges {
        if !exchange_cfg.enabled {
            continue;
        }

        let api_url = exchange_cfg
            .api_url
            .clone()
            .ok_or_else(|| WiringError(format!("exchange `{name}` missing api_url")))?;
        let (api_host, api_port) = split_host_port(&api_url, 443)?;

        let api_pool = build_ip_pool(&api_host).await?;

        let http_config = HttpClientConfig::default();
        let http_client = HttpClient::new(
            http_config,
            Some(DynamicHost {
                hostname: api_host.clone(),
                port: api_port,
                pool: api_pool.clone(),
            }),
        )
        .map_err(|err| WiringError(format!("http client for `{name}` failed to build: {err}")))?;

        let adapter = Arc::new(BinanceAdapter::new(http_client, api_url.clone()));
        let mut ip_pools = vec![api_pool.clone()];

        let pairs_cache = if exchange_cfg.tradable_pairs.cache_enabled {
            let classes: Vec<AssetClass> = exchange_cfg
                .tradable_pairs
                .supported_assets
                .iter()
                .filter_map(|s| AssetClass::parse(s))
                .collect();
            let classes = if classes.is_empty() { vec![AssetClass::Spot] } else { classes };

            let cache_config = pairs_cache_config(&exchange_cfg.tradable_pairs);
            let cache = Arc::new(PairsCache::new(adapter.clone(), classes, cache_config));
            match cache.start().await {
                Ok(()) => Some(cache),
                Err(err) if exchange_cfg.tradable_pairs.skip_on_network_error => {
                    tracing::warn!(exchange = %name, error = %err, "pairs cache failed to start, continuing without wildcard expansion");
                    None
                }
                Err(err) => {
                    return Err(WiringError(format!("pairs cache for `{name}` failed to start: {err}")));
                }
            }
        } else {
            None
        };

        if exchange_cfg.use_websocket {
            let ws_url = exchange_cfg
                .websocket_url
                .clone()
                .ok_or_else(|| WiringError(format!("exchange `{name}` missing websocket_url")))?;
            let (ws_host, ws_port) = split_host_port(&ws_url, 443)?;
            let ws_pool = if ws_host == api_host { api_pool.clone() } else {
                let pool = build_ip_pool(&ws_host).await?;
                ip_pools.push(pool.clone());
                pool
            };

            let streams = collect_stream_names(exchange_cfg);
            let client = Arc::new(StreamClient::new(
                name.clone(),
                ws_host,
                &streams,
                ws_pool,
                sink.clone(),
                StreamClientConfig { port: ws_port, ..StreamClientConfig::default() },
            ));
            let shutdown = ws_shutdown.clone();
            tokio::spawn(async move { client.run(shutdown).await });

            // No poll-path scheduler for a stream-mode exchange; its
            // capability surface is still reachable via `/status` through
            // the IP pool entries above.
            continue;
        }

        let scheduler = Arc::new(Scheduler::new(
            adapter.clone(),
            sink.clone(),
            pairs_cache.clone(),
            Some(adapter.clone()),
            SchedulerConfig::default(),
        ));

        for job in &config.scheduler.jobs {
            if &job.exchange != name {
                continue;
            }
            for spec in job_specs_for(job, exchange_cfg, SchedulerConfig::default().default_batch_size)? {
                scheduler
                    .add_job(spec)
                    .await
                    .map_err(|err| WiringError(format!("job for `{name}` rejected: {err}")))?;
            }
        }

        if config.scheduler.enabled {
            scheduler.start().await;
        }

        runtimes.push(ExchangeRuntime {
            name: name.clone(),
            scheduler,
            ip_pools,
        });
    }

    Ok(runtimes)
}

/// Builds the combined-stream subscription list from every enabled
/// `data_types` entry, using Binance's `<symbol>@<stream>` naming and
/// lower-cased symbols per its stream convention.
fn collect_stream_names(exchange_cfg: &ExchangeConfig) -> Vec<String> {
    let mut streams = Vec::new();
    for (data_type, cfg) in &exchange_cfg.data_types {
        if !cfg.enabled {
            continue;
        }
        let suffix = match data_type.as_str() {
            "ticker" => "ticker",
            "orderbook" => "depth",
            "trades" | "trade" => "trade",
            "klines" | "kline" => continue, // interval-specific; skipped for the default stream set
            other => other,
        };
        for symbol in &cfg.symbols {
            if symbol == "*" {
                continue;
            }
            streams.push(format!("{}@{}", symbol.to_ascii_lowercase(), suffix));
        }
    }
    streams
}

/// Stops every wired exchange's scheduler, then its pairs cache and IP
/// pools: scheduler stop first, then adapter close (HTTP client + pairs
/// cache + IP pools).
pub async fn shutdown_exchanges(runtimes: &[ExchangeRuntime], deadline: Duration) {
    for runtime in runtimes {
        if let Err(err) = runtime.scheduler.stop(deadline).await {
            tracing::warn!(exchange = %runtime.name, error = %err, "scheduler did not stop within deadline");
        }
        for pool in &runtime.ip_pools {
            pool.stop().await;
        }
    }
}
