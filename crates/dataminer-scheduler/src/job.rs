use chrono::{DateTime, Utc};
use dataminer_exchange::AssetClass;

use crate::weight::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Stopped,
    Failed,
}

/// A job's static configuration, supplied once via `Scheduler::add_job`.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
    pub data_type: DataType,
    /// Six-field cron expression: second, minute, hour, day-of-month,
    /// month, day-of-week.
    pub cron_expr: String,
    /// Raw symbol list as configured; `["*"]` is expanded against
    /// `asset_class` via the pairs cache at each invocation.
    pub symbols: Vec<String>,
    pub asset_class: AssetClass,
    pub batch_size: usize,
    /// Orderbook depth; ignored for other data types.
    pub depth: u32,
    /// Trades/klines result limit; `None` uses the adapter's default.
    pub limit: Option<u32>,
    /// Kline interval label (e.g. `"1m"`); required for kline jobs.
    pub interval: Option<String>,
}

/// Observable state of a job, returned by `Scheduler::get_job_status`.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub name: String,
    pub data_type: DataType,
    pub cron_expr: String,
    pub status: JobStatus,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
}

impl JobRecord {
    pub fn new(spec: &JobSpec) -> Self {
        Self {
            name: spec.name.clone(),
            data_type: spec.data_type,
            cron_expr: spec.cron_expr.clone(),
            status: JobStatus::Pending,
            last_run: None,
            next_run: None,
            run_count: 0,
            error_count: 0,
            last_error: None,
        }
    }
}
