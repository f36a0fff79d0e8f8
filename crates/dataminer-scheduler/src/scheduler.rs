use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cron::Schedule;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;

use dataminer_exchange::QuotaReporter;
use dataminer_model::RecordSink;
use dataminer_pairs::PairsCache;

use crate::adapter::Adapter;
use crate::error::SchedulerError;
use crate::execute::run_invocation;
use crate::job::{JobRecord, JobSpec, JobStatus};
use crate::rate_gate::{RateLimitStatus, SchedulerConfig, WeightGate};

struct JobEntry {
    spec: JobSpec,
    record: Arc<RwLock<JobRecord>>,
    handle: Option<JoinHandle<()>>,
}

/// Drives cron-scheduled ingestion jobs against an exchange adapter,
/// pacing dispatch against the adapter's reported (or estimated) request
/// weight and delivering canonical records to a sink.
pub struct Scheduler {
    adapter: Arc<dyn Adapter>,
    sink: Arc<dyn RecordSink>,
    pairs: Option<Arc<PairsCache>>,
    gate: Arc<WeightGate>,
    jobs: RwLock<HashMap<String, JobEntry>>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    sequence: Arc<AtomicU64>,
}

impl Scheduler {
    pub fn new(
        adapter: Arc<dyn Adapter>,
        sink: Arc<dyn RecordSink>,
        pairs: Option<Arc<PairsCache>>,
        quota: Option<Arc<dyn QuotaReporter>>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            adapter,
            sink,
            pairs,
            gate: Arc::new(WeightGate::new(quota, config)),
            jobs: RwLock::new(HashMap::new()),
            shutdown: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registers a job. If the scheduler is already running, the job's
    /// background loop is spawned immediately; otherwise it starts when
    /// `start` is called.
    pub async fn add_job(&self, spec: JobSpec) -> Result<(), SchedulerError> {
        Schedule::from_str(&spec.cron_expr)
            .map_err(|_| SchedulerError::InvalidCron(spec.cron_expr.clone()))?;

        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&spec.name) {
            return Err(SchedulerError::JobAlreadyExists(spec.name.clone()));
        }

        let record = Arc::new(RwLock::new(JobRecord::new(&spec)));
        let handle = if self.running.load(Ordering::SeqCst) {
            Some(self.spawn_job(spec.clone(), record.clone()))
        } else {
            None
        };

        jobs.insert(spec.name.clone(), JobEntry { spec, record, handle });
        Ok(())
    }

    /// Starts the background loop for every registered job that isn't
    /// already running.
    pub async fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        let mut jobs = self.jobs.write().await;
        for entry in jobs.values_mut() {
            if entry.handle.is_none() {
                entry.handle = Some(self.spawn_job(entry.spec.clone(), entry.record.clone()));
            }
        }
    }

    /// Signals every job's background loop to stop after its current
    /// invocation (if any) finishes, waiting up to `deadline`. Jobs still
    /// running past `deadline` are abandoned and `StopTimeout` is returned,
    /// but the scheduler is still marked stopped either way.
    pub async fn stop(&self, deadline: Duration) -> Result<(), SchedulerError> {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();

        let handles: Vec<JoinHandle<()>> = {
            let mut jobs = self.jobs.write().await;
            jobs.values_mut().filter_map(|entry| entry.handle.take()).collect()
        };

        let joined = tokio::time::timeout(deadline, futures_util::future::join_all(handles)).await;
        if joined.is_err() {
            return Err(SchedulerError::StopTimeout);
        }
        Ok(())
    }

    pub async fn get_job_status(&self, name: &str) -> Result<JobRecord, SchedulerError> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(name).ok_or_else(|| SchedulerError::JobNotFound(name.to_string()))?;
        Ok(entry.record.read().await.clone())
    }

    pub async fn list_jobs(&self) -> Vec<JobRecord> {
        let jobs = self.jobs.read().await;
        let mut out = Vec::with_capacity(jobs.len());
        for entry in jobs.values() {
            out.push(entry.record.read().await.clone());
        }
        out
    }

    pub fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.gate.status()
    }

    fn spawn_job(&self, spec: JobSpec, record: Arc<RwLock<JobRecord>>) -> JoinHandle<()> {
        let adapter = self.adapter.clone();
        let sink = self.sink.clone();
        let pairs = self.pairs.clone();
        let gate = self.gate.clone();
        let shutdown = self.shutdown.clone();
        let running = self.running.clone();
        let sequence = self.sequence.clone();

        tokio::spawn(async move {
            let schedule = match Schedule::from_str(&spec.cron_expr) {
                Ok(schedule) => schedule,
                Err(err) => {
                    let mut rec = record.write().await;
                    rec.status = JobStatus::Failed;
                    rec.last_error = Some(format!("invalid cron expression: {err}"));
                    return;
                }
            };

            loop {
                if !running.load(Ordering::SeqCst) {
                    let mut rec = record.write().await;
                    rec.status = JobStatus::Stopped;
                    return;
                }

                let next_fire = match schedule.upcoming(Utc).next() {
                    Some(fire) => fire,
                    None => return,
                };
                {
                    let mut rec = record.write().await;
                    rec.next_run = Some(next_fire);
                }

                let wait = (next_fire - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::from_secs(0));

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = shutdown.notified() => {}
                }

                if !running.load(Ordering::SeqCst) {
                    let mut rec = record.write().await;
                    rec.status = JobStatus::Stopped;
                    return;
                }

                {
                    let mut rec = record.write().await;
                    rec.status = JobStatus::Running;
                }

                let result = run_invocation(&spec, &adapter, &sink, pairs.as_ref(), &gate, &sequence).await;

                let mut rec = record.write().await;
                rec.last_run = Some(Utc::now());
                rec.run_count += 1;
                match result {
                    Ok(()) => {
                        rec.status = JobStatus::Pending;
                        rec.last_error = None;
                    }
                    Err(err) => {
                        tracing::error!(job = %spec.name, error = %err, "job invocation failed");
                        rec.status = JobStatus::Failed;
                        rec.error_count += 1;
                        rec.last_error = Some(err.to_string());
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dataminer_exchange::{AdapterError, AssetClass, KlineSource, OrderbookSource, QuotaSnapshot, TickerSource, TradeSource};
    use dataminer_model::{Kline, Orderbook, Record, RecordPayload, Ticker, Trade, TradeSide};

    use crate::weight::DataType;

    struct StubAdapter {
        calls: Arc<AtomicU64>,
    }

    #[async_trait]
    impl TickerSource for StubAdapter {
        async fn get_ticker(&self, _symbol: &str) -> Result<Ticker, AdapterError> {
            unimplemented!()
        }

        async fn get_multiple_tickers(&self, symbols: &[String]) -> Result<Vec<Record>, AdapterError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(symbols
                .iter()
                .map(|s| Record {
                    exchange: "binance".to_string(),
                    symbol: s.clone(),
                    timestamp: Utc::now(),
                    sequence: 0,
                    payload: RecordPayload::Ticker(Ticker {
                        price: 1.0,
                        volume: 1.0,
                        high_24h: 1.0,
                        low_24h: 1.0,
                        change_24h: 0.0,
                    }),
                })
                .collect())
        }
    }

    #[async_trait]
    impl OrderbookSource for StubAdapter {
        async fn get_orderbook(&self, _symbol: &str, _depth: u32) -> Result<Orderbook, AdapterError> {
            unimplemented!()
        }

        async fn get_multiple_orderbooks(
            &self,
            _symbols: &[String],
            _depth: u32,
        ) -> Result<Vec<Record>, AdapterError> {
            Ok(vec![])
        }
    }

    #[async_trait]
    impl TradeSource for StubAdapter {
        async fn get_trades(&self, _symbol: &str, _limit: Option<u32>) -> Result<Vec<Trade>, AdapterError> {
            Ok(vec![Trade {
                trade_id: 1,
                price: 1.0,
                quantity: 1.0,
                side: TradeSide::Buy,
                timestamp: Utc::now(),
            }])
        }
    }

    #[async_trait]
    impl KlineSource for StubAdapter {
        async fn get_klines(
            &self,
            _symbol: &str,
            _interval: &str,
            _limit: Option<u32>,
            _start_time: Option<i64>,
            _end_time: Option<i64>,
        ) -> Result<Vec<Kline>, AdapterError> {
            Ok(vec![])
        }
    }

    struct StubQuota;

    #[async_trait]
    impl QuotaReporter for StubQuota {
        async fn get_time_and_weight(&self) -> Result<QuotaSnapshot, AdapterError> {
            Ok(QuotaSnapshot { used_weight: 0, limit: 1200 })
        }
    }

    fn ticker_spec(name: &str, cron_expr: &str) -> JobSpec {
        JobSpec {
            name: name.to_string(),
            data_type: DataType::Ticker,
            cron_expr: cron_expr.to_string(),
            symbols: vec!["BTCUSDT".to_string()],
            asset_class: AssetClass::Spot,
            batch_size: 80,
            depth: 0,
            limit: None,
            interval: None,
        }
    }

    fn new_scheduler(calls: Arc<AtomicU64>) -> Scheduler {
        let adapter: Arc<dyn Adapter> = Arc::new(StubAdapter { calls });
        let received: Arc<Mutex<Vec<Record>>> = Arc::new(Mutex::new(Vec::new()));
        let sink: Arc<dyn RecordSink> = Arc::new(dataminer_model::FnSink(move |r: Record| {
            received.lock().unwrap().push(r);
        }));
        Scheduler::new(adapter, sink, None, Some(Arc::new(StubQuota)), SchedulerConfig::default())
    }

    #[tokio::test]
    async fn add_job_rejects_invalid_cron_expression() {
        let scheduler = new_scheduler(Arc::new(AtomicU64::new(0)));
        let spec = ticker_spec("bad", "not a cron expression");
        let err = scheduler.add_job(spec).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCron(_)));
    }

    #[tokio::test]
    async fn add_job_rejects_duplicate_names() {
        let scheduler = new_scheduler(Arc::new(AtomicU64::new(0)));
        scheduler.add_job(ticker_spec("dup", "* * * * * *")).await.unwrap();
        let err = scheduler.add_job(ticker_spec("dup", "* * * * * *")).await.unwrap_err();
        assert!(matches!(err, SchedulerError::JobAlreadyExists(_)));
    }

    #[tokio::test]
    async fn get_job_status_on_unknown_job_fails() {
        let scheduler = new_scheduler(Arc::new(AtomicU64::new(0)));
        let err = scheduler.get_job_status("ghost").await.unwrap_err();
        assert!(matches!(err, SchedulerError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn running_job_executes_on_every_second_and_updates_status() {
        let calls = Arc::new(AtomicU64::new(0));
        let scheduler = new_scheduler(calls.clone());
        scheduler.add_job(ticker_spec("every-second", "* * * * * *")).await.unwrap();
        scheduler.start().await;

        tokio::time::sleep(Duration::from_millis(1200)).await;
        scheduler.stop(Duration::from_secs(2)).await.unwrap();

        assert!(calls.load(Ordering::Relaxed) >= 1);
        let status = scheduler.get_job_status("every-second").await.unwrap();
        assert!(status.run_count >= 1);
    }
}
