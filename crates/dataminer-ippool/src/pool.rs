use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;

use crate::error::IpPoolError;
use crate::record::{sort_by_latency, IpRecord};
use crate::resolver::DnsResolver;

/// Optional TCP latency probing. When set, a background task periodically
/// dials `(ip, port)` for every pool member and re-sorts the pool by
/// (available desc, latency asc).
#[derive(Debug, Clone)]
pub struct LatencyProbeConfig {
    pub port: u16,
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct IpPoolConfig {
    pub refresh_interval: Duration,
    pub resolve_timeout: Duration,
    pub latency_probe: Option<LatencyProbeConfig>,
    /// The DNS resolver endpoints the pool is configured to query, purely
    /// for reporting through [`IpPool::status`] — the actual queries are
    /// issued by whichever `DnsResolver` the pool was constructed with.
    pub resolvers: Vec<SocketAddr>,
}

impl Default for IpPoolConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
            resolve_timeout: Duration::from_secs(5),
            latency_probe: None,
            resolvers: Vec::new(),
        }
    }
}

/// Point-in-time view returned by [`IpPool::status`].
#[derive(Debug, Clone)]
pub struct PoolStatus {
    pub hostname: String,
    pub running: bool,
    pub cursor: usize,
    pub records: Vec<IpRecord>,
    pub refresh_interval: Duration,
    pub resolvers: Vec<SocketAddr>,
}

struct Inner {
    records: Vec<IpRecord>,
    cursor: usize,
}

/// An ordered set of candidate IPv4 addresses for a hostname, kept fresh by
/// a background resolution loop and (optionally) a latency-probing loop.
pub struct IpPool {
    hostname: String,
    config: IpPoolConfig,
    resolver: Arc<dyn DnsResolver>,
    inner: Arc<RwLock<Inner>>,
    running: Arc<AtomicBool>,
    force_refresh: Arc<Notify>,
    shutdown: Arc<Notify>,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl IpPool {
    pub fn new(hostname: impl Into<String>, config: IpPoolConfig, resolver: Arc<dyn DnsResolver>) -> Self {
        Self {
            hostname: hostname.into(),
            config,
            resolver,
            inner: Arc::new(RwLock::new(Inner {
                records: Vec::new(),
                cursor: 0,
            })),
            running: Arc::new(AtomicBool::new(false)),
            force_refresh: Arc::new(Notify::new()),
            shutdown: Arc::new(Notify::new()),
            tasks: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolves the hostname once and, on success, begins the background
    /// refresh (and optional latency-probe) loop.
    pub async fn start(&self) -> Result<(), IpPoolError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(IpPoolError::AlreadyRunning);
        }

        let addrs = self.resolver.resolve_ipv4(&self.hostname).await;
        if addrs.is_empty() {
            self.running.store(false, Ordering::SeqCst);
            return Err(IpPoolError::ResolutionEmpty);
        }

        self.apply_resolution(addrs).await;

        let mut tasks = self.tasks.lock().await;
        tasks.push(self.spawn_refresh_loop());
        if let Some(probe) = self.config.latency_probe.clone() {
            tasks.push(self.spawn_probe_loop(probe));
        }

        Ok(())
    }

    /// Idempotent. Stops background tasks; subsequent reads fail with
    /// [`IpPoolError::NotRunning`].
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.notify_waiters();

        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    pub async fn current(&self) -> Result<String, IpPoolError> {
        self.require_running()?;
        let inner = self.inner.read().await;
        inner
            .records
            .get(inner.cursor)
            .map(|r| r.address.clone())
            .ok_or(IpPoolError::Empty)
    }

    pub async fn next(&self) -> Result<String, IpPoolError> {
        self.require_running()?;
        let mut inner = self.inner.write().await;
        if inner.records.is_empty() {
            return Err(IpPoolError::Empty);
        }
        inner.cursor = (inner.cursor + 1) % inner.records.len();
        Ok(inner.records[inner.cursor].address.clone())
    }

    pub async fn all(&self) -> Result<Vec<IpRecord>, IpPoolError> {
        self.require_running()?;
        let inner = self.inner.read().await;
        Ok(inner.records.clone())
    }

    /// Requests an out-of-band resolution. Coalesced: if a refresh is
    /// already pending, this is a no-op beyond the one already queued.
    pub fn force_refresh(&self) -> Result<(), IpPoolError> {
        if !self.is_running() {
            return Err(IpPoolError::NotRunning);
        }
        self.force_refresh.notify_one();
        Ok(())
    }

    pub async fn status(&self) -> PoolStatus {
        let inner = self.inner.read().await;
        PoolStatus {
            hostname: self.hostname.clone(),
            running: self.is_running(),
            cursor: inner.cursor,
            records: inner.records.clone(),
            refresh_interval: self.config.refresh_interval,
            resolvers: self.config.resolvers.clone(),
        }
    }

    /// Called by the HTTP client when a dial/TLS handshake against `address`
    /// fails, so the failure counter reflects live-traffic health and not
    /// just periodic probing.
    pub async fn record_failure(&self, address: &str) {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.records.iter_mut().find(|r| r.address == address) {
            record.record_failure();
        }
    }

    fn require_running(&self) -> Result<(), IpPoolError> {
        if !self.is_running() {
            return Err(IpPoolError::NotRunning);
        }
        Ok(())
    }

    async fn apply_resolution(&self, addrs: Vec<Ipv4Addr>) {
        if addrs.is_empty() {
            tracing::warn!(hostname = %self.hostname, "refresh cycle: all resolvers failed, keeping previous pool");
            return;
        }

        let mut inner = self.inner.write().await;
        let previous = std::mem::take(&mut inner.records);

        inner.records = dedup_addrs(addrs)
            .into_iter()
            .map(|address| {
                previous
                    .iter()
                    .find(|r| r.address == address)
                    .cloned()
                    .unwrap_or_else(|| IpRecord::new(address))
            })
            .collect();

        if inner.cursor >= inner.records.len() {
            inner.cursor = 0;
        }

        tracing::info!(hostname = %self.hostname, count = inner.records.len(), "ip pool resolution refreshed");
    }

    fn spawn_refresh_loop(&self) -> JoinHandle<()> {
        let hostname = self.hostname.clone();
        let resolver = self.resolver.clone();
        let inner = self.inner.clone();
        let running = self.running.clone();
        let force_refresh = self.force_refresh.clone();
        let shutdown = self.shutdown.clone();
        let interval = self.config.refresh_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume the immediate first tick

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = force_refresh.notified() => {}
                    _ = shutdown.notified() => break,
                }

                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let addrs = resolver.resolve_ipv4(&hostname).await;
                if addrs.is_empty() {
                    tracing::warn!(hostname = %hostname, "refresh cycle: all resolvers failed, keeping previous pool");
                    continue;
                }

                let mut guard = inner.write().await;
                let previous = std::mem::take(&mut guard.records);
                guard.records = dedup_addrs(addrs)
                    .into_iter()
                    .map(|address| {
                        previous
                            .iter()
                            .find(|r| r.address == address)
                            .cloned()
                            .unwrap_or_else(|| IpRecord::new(address))
                    })
                    .collect();
                if guard.cursor >= guard.records.len() {
                    guard.cursor = 0;
                }
            }
        })
    }

    fn spawn_probe_loop(&self, probe: LatencyProbeConfig) -> JoinHandle<()> {
        let inner = self.inner.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(probe.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.notified() => break,
                }

                let addresses: Vec<String> = {
                    let guard = inner.read().await;
                    guard.records.iter().map(|r| r.address.clone()).collect()
                };

                let mut measured = Vec::with_capacity(addresses.len());
                for address in addresses {
                    let latency = probe_one(&address, probe.port, probe.timeout).await;
                    measured.push((address, latency));
                }

                let mut guard = inner.write().await;
                for (address, latency) in measured {
                    if let Some(record) = guard.records.iter_mut().find(|r| r.address == address) {
                        record.record_probe(latency);
                    }
                }
                sort_by_latency(&mut guard.records);
            }
        })
    }
}

/// Dedups addresses to their string form, preserving first-seen order.
fn dedup_addrs(addrs: Vec<Ipv4Addr>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    addrs
        .into_iter()
        .map(|addr| addr.to_string())
        .filter(|address| seen.insert(address.clone()))
        .collect()
}

async fn probe_one(address: &str, port: u16, timeout: Duration) -> Option<Duration> {
    let ip = Ipv4Addr::from_str(address).ok()?;
    let target = SocketAddr::from((ip, port));
    let start = std::time::Instant::now();
    match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(target)).await {
        Ok(Ok(_stream)) => Some(start.elapsed()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests_support::FakeResolver;

    fn ip(s: &str) -> Ipv4Addr {
        Ipv4Addr::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn start_fails_resolution_empty_when_no_resolver_returns_anything() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![]]));
        let pool = IpPool::new("example.com", IpPoolConfig::default(), resolver);
        let err = pool.start().await.unwrap_err();
        assert_eq!(err, IpPoolError::ResolutionEmpty);
        assert!(!pool.is_running());
    }

    #[tokio::test]
    async fn start_twice_fails_already_running() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![ip("1.1.1.1")]]));
        let pool = IpPool::new("example.com", IpPoolConfig::default(), resolver);
        pool.start().await.unwrap();
        let err = pool.start().await.unwrap_err();
        assert_eq!(err, IpPoolError::AlreadyRunning);
        pool.stop().await;
    }

    #[tokio::test]
    async fn reads_fail_not_running_before_start_and_after_stop() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![ip("1.1.1.1")]]));
        let pool = IpPool::new("example.com", IpPoolConfig::default(), resolver);

        assert_eq!(pool.current().await.unwrap_err(), IpPoolError::NotRunning);

        pool.start().await.unwrap();
        assert!(pool.current().await.is_ok());

        pool.stop().await;
        assert_eq!(pool.current().await.unwrap_err(), IpPoolError::NotRunning);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![ip("1.1.1.1")]]));
        let pool = IpPool::new("example.com", IpPoolConfig::default(), resolver);
        pool.start().await.unwrap();
        pool.stop().await;
        pool.stop().await;
        assert!(!pool.is_running());
    }

    #[tokio::test]
    async fn single_ip_pool_next_returns_same_ip() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![ip("1.1.1.1")]]));
        let pool = IpPool::new("example.com", IpPoolConfig::default(), resolver);
        pool.start().await.unwrap();

        let first = pool.current().await.unwrap();
        let second = pool.next().await.unwrap();
        let third = pool.next().await.unwrap();
        assert_eq!(first, "1.1.1.1");
        assert_eq!(second, "1.1.1.1");
        assert_eq!(third, "1.1.1.1");
        pool.stop().await;
    }

    #[tokio::test]
    async fn next_advances_cursor_modulo_pool_size() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![
            ip("1.1.1.1"),
            ip("2.2.2.2"),
        ]]));
        let pool = IpPool::new("example.com", IpPoolConfig::default(), resolver);
        pool.start().await.unwrap();

        assert_eq!(pool.current().await.unwrap(), "1.1.1.1");
        assert_eq!(pool.next().await.unwrap(), "2.2.2.2");
        assert_eq!(pool.next().await.unwrap(), "1.1.1.1");
        pool.stop().await;
    }

    #[tokio::test]
    async fn all_returns_deduplicated_snapshot_containing_current() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![
            ip("1.1.1.1"),
            ip("1.1.1.1"),
            ip("2.2.2.2"),
        ]]));
        let pool = IpPool::new("example.com", IpPoolConfig::default(), resolver);
        pool.start().await.unwrap();

        let all = pool.all().await.unwrap();
        let current = pool.current().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|r| r.address == current));
        pool.stop().await;
    }

    #[tokio::test]
    async fn record_failure_increments_matching_ip() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![ip("1.1.1.1")]]));
        let pool = IpPool::new("example.com", IpPoolConfig::default(), resolver);
        pool.start().await.unwrap();

        pool.record_failure("1.1.1.1").await;
        let all = pool.all().await.unwrap();
        assert_eq!(all[0].failure_count, 1);
        pool.stop().await;
    }

    #[tokio::test]
    async fn status_reports_hostname_and_running_flag_even_when_stopped() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![ip("1.1.1.1")]]));
        let pool = IpPool::new("example.com", IpPoolConfig::default(), resolver);
        pool.start().await.unwrap();
        let status = pool.status().await;
        assert_eq!(status.hostname, "example.com");
        assert!(status.running);

        pool.stop().await;
        let status = pool.status().await;
        assert!(!status.running);
    }

    #[tokio::test]
    async fn status_reports_configured_resolvers() {
        let resolver = Arc::new(FakeResolver::new(vec![vec![ip("1.1.1.1")]]));
        let resolvers = vec![
            SocketAddr::from(([8, 8, 8, 8], 53)),
            SocketAddr::from(([1, 1, 1, 1], 53)),
        ];
        let config = IpPoolConfig {
            resolvers: resolvers.clone(),
            ..IpPoolConfig::default()
        };
        let pool = IpPool::new("example.com", config, resolver);
        pool.start().await.unwrap();

        let status = pool.status().await;
        assert_eq!(status.resolvers, resolvers);
        pool.stop().await;
    }
}
