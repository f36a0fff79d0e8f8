use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Point-in-time snapshot of [`HttpClientStats`], returned by
/// `HttpClient::get_status`.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub retry_count: u64,
    pub last_request_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Counters updated once per call to `HttpClient::do_request`, satisfying
/// the invariant `successful_requests + failed_requests == total_requests`.
#[derive(Default)]
pub struct HttpClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    retry_count: AtomicU64,
    last_request_at: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
}

impl HttpClientStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self) {
        *self.last_request_at.lock().unwrap() = Some(Utc::now());
    }

    pub fn record_retry(&self) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap() = None;
    }

    pub fn record_failure(&self, error: impl ToString) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap() = Some(error.to_string());
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            retry_count: self.retry_count.load(Ordering::Relaxed),
            last_request_at: *self.last_request_at.lock().unwrap(),
            last_error: self.last_error.lock().unwrap().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_failure_both_advance_total() {
        let stats = HttpClientStats::new();
        stats.record_success();
        stats.record_failure("boom");
        stats.record_success();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.successful_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(
            snapshot.successful_requests + snapshot.failed_requests,
            snapshot.total_requests
        );
    }

    #[test]
    fn last_error_clears_on_subsequent_success() {
        let stats = HttpClientStats::new();
        stats.record_failure("timed out");
        assert_eq!(stats.snapshot().last_error.as_deref(), Some("timed out"));
        stats.record_success();
        assert_eq!(stats.snapshot().last_error, None);
    }

    #[test]
    fn retry_count_accumulates_independently_of_totals() {
        let stats = HttpClientStats::new();
        stats.record_retry();
        stats.record_retry();
        stats.record_success();
        assert_eq!(stats.snapshot().retry_count, 2);
        assert_eq!(stats.snapshot().total_requests, 1);
    }
}
