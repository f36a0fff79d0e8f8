use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use rand::Rng;

use dataminer_exchange::QuotaReporter;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub safety_threshold: f64,
    pub max_weight_per_minute: u64,
    pub max_wait_time: Duration,
    pub inter_batch_delay: Duration,
    pub default_batch_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            safety_threshold: 0.9,
            max_weight_per_minute: 1200,
            max_wait_time: Duration::from_secs(90),
            inter_batch_delay: Duration::from_millis(100),
            default_batch_size: 80,
        }
    }
}

/// Point-in-time view of the scheduler's pacing state, returned by
/// `Scheduler::get_rate_limit_status`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    pub local_estimate: u64,
    pub threshold: u64,
    pub max_weight_per_minute: u64,
}

/// Paces batch dispatch against the exchange's reported used-weight
/// window. When no `QuotaReporter` capability is available, falls back to
/// a locally accumulated estimate that resets on the same cadence a real
/// quota window would.
pub struct WeightGate {
    quota: Option<Arc<dyn QuotaReporter>>,
    config: SchedulerConfig,
    local_estimate: AtomicU64,
}

impl WeightGate {
    pub fn new(quota: Option<Arc<dyn QuotaReporter>>, config: SchedulerConfig) -> Self {
        Self {
            quota,
            config,
            local_estimate: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> RateLimitStatus {
        RateLimitStatus {
            local_estimate: self.local_estimate.load(Ordering::Relaxed),
            threshold: self.threshold(),
            max_weight_per_minute: self.config.max_weight_per_minute,
        }
    }

    fn threshold(&self) -> u64 {
        (self.config.safety_threshold * self.config.max_weight_per_minute as f64) as u64
    }

    /// Queries (or estimates) the current used weight; if it already
    /// exceeds the safety threshold, sleeps until the next wall-clock
    /// minute boundary (plus jitter, bounded by `max_wait_time`) and resets
    /// the local estimate. Always accounts `weight` into the local
    /// estimate afterward.
    pub async fn precheck(&self, weight: u64) {
        let current_used = self.current_used().await;

        if current_used > self.threshold() {
            let wait = self.time_to_next_minute_with_jitter();
            tracing::info!(
                current_used,
                weight,
                threshold = self.threshold(),
                wait_ms = wait.as_millis() as u64,
                "weight threshold exceeded, pacing until next minute boundary"
            );
            tokio::time::sleep(wait).await;
            self.local_estimate.store(0, Ordering::Relaxed);
        }

        self.local_estimate.fetch_add(weight, Ordering::Relaxed);
    }

    pub async fn inter_batch_delay(&self) {
        tokio::time::sleep(self.config.inter_batch_delay).await;
    }

    async fn current_used(&self) -> u64 {
        match &self.quota {
            Some(reporter) => match reporter.get_time_and_weight().await {
                Ok(snapshot) => snapshot.used_weight,
                Err(err) => {
                    tracing::warn!(error = %err, "quota reporter unavailable, falling back to local estimate");
                    self.local_estimate.load(Ordering::Relaxed)
                }
            },
            None => self.local_estimate.load(Ordering::Relaxed),
        }
    }

    fn time_to_next_minute_with_jitter(&self) -> Duration {
        let now = Utc::now();
        let remaining_ms = (60 - now.second() as u64) * 1000 - now.nanosecond() as u64 / 1_000_000;
        let jitter_ms: u64 = rand::thread_rng().gen_range(0..500);
        let wait = Duration::from_millis(remaining_ms + jitter_ms);
        wait.min(self.config.max_wait_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_point_nine_of_twelve_hundred() {
        let gate = WeightGate::new(None, SchedulerConfig::default());
        assert_eq!(gate.threshold(), 1080);
    }

    #[tokio::test]
    async fn precheck_without_quota_reporter_accumulates_local_estimate() {
        let gate = WeightGate::new(None, SchedulerConfig::default());
        gate.precheck(100).await;
        gate.precheck(200).await;
        assert_eq!(gate.status().local_estimate, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn precheck_paces_out_and_resets_the_local_estimate_once_over_threshold() {
        let config = SchedulerConfig {
            max_wait_time: Duration::from_millis(5),
            ..SchedulerConfig::default()
        };
        let gate = WeightGate::new(None, config);
        gate.local_estimate.store(1199, Ordering::Relaxed);

        gate.precheck(50).await;

        assert_eq!(gate.status().local_estimate, 50);
    }

    struct FixedQuota {
        used_weight: u64,
    }

    #[async_trait::async_trait]
    impl QuotaReporter for FixedQuota {
        async fn get_time_and_weight(&self) -> Result<dataminer_exchange::QuotaSnapshot, dataminer_exchange::AdapterError> {
            Ok(dataminer_exchange::QuotaSnapshot {
                used_weight: self.used_weight,
                limit: 1200,
            })
        }
    }

    /// Mirrors spec scenario 4: after batch 2 the reporter's *current* used
    /// weight is 960 (< 1080), so batch 3's precheck must proceed without
    /// pacing even though `960 + upcoming_weight` would exceed the
    /// threshold — the gate only looks at the server-reported figure, not
    /// the sum with the upcoming batch.
    #[tokio::test]
    async fn precheck_admits_batch_when_only_reported_used_weight_is_under_threshold() {
        let gate = WeightGate::new(
            Some(Arc::new(FixedQuota { used_weight: 960 })),
            SchedulerConfig::default(),
        );
        gate.local_estimate.store(500, Ordering::Relaxed);

        gate.precheck(160).await;

        assert_eq!(gate.status().local_estimate, 660);
    }
}
