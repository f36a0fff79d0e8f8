use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dataminer_exchange::{
    AdapterError, AssetClass, Kline, KlineSource, Orderbook, OrderbookSource, QuotaReporter,
    QuotaSnapshot, Ticker, TickerSource, Trade, TradeSource,
};
use dataminer_model::{FnSink, Record, RecordSink};
use dataminer_scheduler::{DataType, JobSpec, JobStatus, Scheduler, SchedulerConfig};

struct NoopAdapter {
    ticker_calls: Arc<std::sync::atomic::AtomicU64>,
}

#[async_trait]
impl TickerSource for NoopAdapter {
    async fn get_ticker(&self, _symbol: &str) -> Result<Ticker, AdapterError> {
        unimplemented!()
    }
    async fn get_multiple_tickers(&self, symbols: &[String]) -> Result<Vec<Record>, AdapterError> {
        self.ticker_calls
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(symbols
            .iter()
            .map(|s| Record {
                exchange: "binance".to_string(),
                symbol: s.clone(),
                timestamp: chrono::Utc::now(),
                sequence: 0,
                payload: dataminer_model::RecordPayload::Ticker(Ticker {
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
impl OrderbookSource for NoopAdapter {
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
impl TradeSource for NoopAdapter {
    async fn get_trades(&self, _symbol: &str, _limit: Option<u32>) -> Result<Vec<Trade>, AdapterError> {
        Ok(vec![])
    }
}

#[async_trait]
impl KlineSource for NoopAdapter {
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

struct FixedQuota {
    used_weight: u64,
}

#[async_trait]
impl QuotaReporter for FixedQuota {
    async fn get_time_and_weight(&self) -> Result<QuotaSnapshot, AdapterError> {
        Ok(QuotaSnapshot {
            used_weight: self.used_weight,
            limit: 1200,
        })
    }
}

fn ticker_spec() -> JobSpec {
    JobSpec {
        name: "ticker-job".to_string(),
        data_type: DataType::Ticker,
        cron_expr: "* * * * * *".to_string(),
        symbols: vec!["BTCUSDT".to_string()],
        asset_class: AssetClass::Spot,
        batch_size: 80,
        depth: 0,
        limit: None,
        interval: None,
    }
}

/// A quota reporter already past the safety threshold still lets the
/// scheduler run (pacing happens inside the job loop, not at startup);
/// the configured threshold is exposed unchanged through
/// `get_rate_limit_status` regardless of how close to it the reporter is.
#[tokio::test]
async fn rate_limit_status_reflects_configured_threshold_independent_of_quota_reporter() {
    let quota: Arc<dyn QuotaReporter> = Arc::new(FixedQuota { used_weight: 1199 });
    let scheduler = Scheduler::new(
        Arc::new(NoopAdapter {
            ticker_calls: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }),
        Arc::new(FnSink(|_: Record| {})),
        None,
        Some(quota),
        SchedulerConfig::default(),
    );

    let status = scheduler.get_rate_limit_status();
    assert_eq!(status.threshold, 1080);
    assert_eq!(status.max_weight_per_minute, 1200);
}

#[tokio::test]
async fn job_runs_on_cron_schedule_and_reports_success() {
    let ticker_calls = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let scheduler = Scheduler::new(
        Arc::new(NoopAdapter {
            ticker_calls: ticker_calls.clone(),
        }),
        Arc::new(FnSink(|_: Record| {})),
        None,
        None,
        SchedulerConfig::default(),
    );

    scheduler.add_job(ticker_spec()).await.unwrap();
    scheduler.start().await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    scheduler.stop(Duration::from_secs(2)).await.unwrap();

    assert!(ticker_calls.load(std::sync::atomic::Ordering::Relaxed) >= 1);
    let status = scheduler.get_job_status("ticker-job").await.unwrap();
    assert!(status.run_count >= 1);
    assert_eq!(status.error_count, 0);
    assert!(status.status == JobStatus::Pending || status.status == JobStatus::Stopped);
}
