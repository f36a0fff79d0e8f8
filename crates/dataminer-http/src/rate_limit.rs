use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Per-minute sliding-window request limiter. The window resets wholesale
/// once a full minute has elapsed since the last reset (not a rolling
/// log).
pub struct RateLimiter {
    limit: u64,
    state: Mutex<WindowState>,
}

struct WindowState {
    count: u64,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            state: Mutex::new(WindowState {
                count: 0,
                window_start: Instant::now(),
            }),
        }
    }

    /// Called once per request attempt, before any network I/O. Returns
    /// `true` (and increments the counter) if the request may proceed;
    /// `false` if the per-minute limit has already been reached.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.window_start.elapsed() >= Duration::from_secs(60) {
            state.count = 0;
            state.window_start = Instant::now();
        }

        if state.count >= self.limit {
            return false;
        }

        state.count += 1;
        true
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn current_count(&self) -> u64 {
        let state = self.state.lock().unwrap();
        state.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn window_resets_after_a_minute_elapses() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        {
            let mut state = limiter.state.lock().unwrap();
            state.window_start = Instant::now() - Duration::from_secs(61);
        }

        assert!(limiter.try_acquire());
    }

    #[test]
    fn zero_limit_never_admits_a_request() {
        let limiter = RateLimiter::new(0);
        assert!(!limiter.try_acquire());
    }
}
