//! Shared runtime state for `dataminer-daemon`.
//!
//! Everything the health-check router reads is collected here so
//! `routes.rs` only ever touches `Arc<AppState>`, with handlers owning
//! nothing async themselves.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use dataminer_ippool::IpPool;
use dataminer_scheduler::Scheduler;

/// Static build metadata included in `/status` responses.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// One running exchange's wired-up components, kept around so `/status`
/// can report per-exchange job and IP-pool state and so shutdown can stop
/// them in dependency order.
pub struct ExchangeRuntime {
    pub name: String,
    pub scheduler: Arc<Scheduler>,
    pub ip_pools: Vec<Arc<IpPool>>,
}

/// Cloneable (`Arc`) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub build: BuildInfo,
    pub started_at: Instant,
    pub exchanges: Arc<Vec<ExchangeRuntime>>,
}

impl AppState {
    pub fn new(exchanges: Vec<ExchangeRuntime>) -> Self {
        Self {
            build: BuildInfo {
                service: "dataminer-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            started_at: Instant::now(),
            exchanges: Arc::new(exchanges),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct JobStatusView {
    pub name: String,
    pub data_type: String,
    pub status: String,
    pub last_run: Option<chrono::DateTime<chrono::Utc>>,
    pub next_run: Option<chrono::DateTime<chrono::Utc>>,
    pub run_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IpPoolView {
    pub hostname: String,
    pub running: bool,
    pub current_ip: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExchangeStatusView {
    pub exchange: String,
    pub jobs: Vec<JobStatusView>,
    pub ip_pools: Vec<IpPoolView>,
    pub rate_limit_local_estimate: u64,
    pub rate_limit_threshold: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub exchanges: Vec<ExchangeStatusView>,
}

impl AppState {
    /// Builds the point-in-time status snapshot served by `GET /status`.
    pub async fn status_snapshot(&self) -> StatusResponse {
        let mut exchanges = Vec::with_capacity(self.exchanges.len());
        for runtime in self.exchanges.iter() {
            let jobs = runtime
                .scheduler
                .list_jobs()
                .await
                .into_iter()
                .map(|record| JobStatusView {
                    name: record.name,
                    data_type: record.data_type.to_string(),
                    status: format!("{:?}", record.status).to_lowercase(),
                    last_run: record.last_run,
                    next_run: record.next_run,
                    run_count: record.run_count,
                    error_count: record.error_count,
                    last_error: record.last_error,
                })
                .collect();

            let mut ip_pools = Vec::with_capacity(runtime.ip_pools.len());
            for pool in runtime.ip_pools.iter() {
                let status = pool.status().await;
                ip_pools.push(IpPoolView {
                    hostname: status.hostname,
                    running: status.running,
                    current_ip: pool.current().await.ok(),
                });
            }

            let rate_limit = runtime.scheduler.get_rate_limit_status();

            exchanges.push(ExchangeStatusView {
                exchange: runtime.name.clone(),
                jobs,
                ip_pools,
                rate_limit_local_estimate: rate_limit.local_estimate,
                rate_limit_threshold: rate_limit.threshold,
            });
        }

        StatusResponse {
            service: self.build.service,
            version: self.build.version,
            uptime_secs: self.uptime_secs(),
            exchanges,
        }
    }
}
