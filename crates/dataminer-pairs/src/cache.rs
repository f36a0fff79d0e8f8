use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;

use dataminer_exchange::{format_symbol, AdapterError, AssetClass, PairsSource};

use crate::error::PairsCacheError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PairsCacheConfig {
    pub ttl: Duration,
    /// When set, a background ticker refreshes every configured asset
    /// class at this interval.
    pub update_interval: Option<Duration>,
    pub retry: RetryConfig,
}

impl Default for PairsCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            update_interval: None,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Clone, Default)]
struct CacheEntry {
    pairs: Vec<(String, String)>,
    last_refresh: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        match self.last_refresh {
            Some(at) => match chrono::Duration::from_std(ttl) {
                Ok(ttl) => Utc::now() - at < ttl,
                Err(_) => false,
            },
            None => false,
        }
    }
}

type Entries = Arc<RwLock<HashMap<AssetClass, CacheEntry>>>;

/// TTL-bounded, per-asset-class cache of tradable pairs. Constructed with
/// an injected `Arc<dyn PairsSource>` rather than owning the adapter
/// outright, per the design notes' cyclic-reference guidance: the adapter
/// owns the cache, not vice versa.
pub struct PairsCache {
    source: Arc<dyn PairsSource>,
    asset_classes: Vec<AssetClass>,
    config: PairsCacheConfig,
    entries: Entries,
    refresh_locks: HashMap<AssetClass, Mutex<()>>,
    shutdown: Arc<Notify>,
    task: Mutex<Option<JoinHandle<()>>>,
    running: AtomicBool,
}

impl PairsCache {
    pub fn new(
        source: Arc<dyn PairsSource>,
        asset_classes: Vec<AssetClass>,
        config: PairsCacheConfig,
    ) -> Self {
        let refresh_locks = asset_classes.iter().map(|class| (*class, Mutex::new(()))).collect();
        Self {
            source,
            asset_classes,
            config,
            entries: Arc::new(RwLock::new(HashMap::new())),
            refresh_locks,
            shutdown: Arc::new(Notify::new()),
            task: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Refreshes every configured asset class once. Succeeds if at least
    /// one asset class's initial refresh succeeds; classes that fail are
    /// left empty and surfaced as errors on subsequent reads until a later
    /// refresh succeeds. Starts the background `AutoUpdate` loop if
    /// configured.
    pub async fn start(&self) -> Result<(), PairsCacheError> {
        let mut any_succeeded = false;
        for class in &self.asset_classes {
            if self.refresh(*class).await.is_ok() {
                any_succeeded = true;
            }
        }

        if !any_succeeded {
            return Err(PairsCacheError::AllRefreshesFailed);
        }

        if let Some(interval) = self.config.update_interval {
            *self.task.lock().await = Some(self.spawn_auto_update(interval));
        }

        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
    }

    /// Returns the cached pair list, refreshing inline first if the entry
    /// is stale or missing. Fails with [`PairsCacheError::NotRunning`] if
    /// the cache was never started or has since been stopped.
    pub async fn get(&self, class: AssetClass) -> Result<Vec<(String, String)>, PairsCacheError> {
        if !self.is_running() {
            return Err(PairsCacheError::NotRunning);
        }
        if !self.asset_classes.contains(&class) {
            return Err(PairsCacheError::UnknownAssetClass);
        }

        if let Some(pairs) = self.fresh_entry(class).await {
            return Ok(pairs);
        }

        // Coalesce: only one refresh per asset class in flight at a time.
        let lock = self
            .refresh_locks
            .get(&class)
            .expect("asset_classes and refresh_locks are built together");
        let _guard = lock.lock().await;

        if let Some(pairs) = self.fresh_entry(class).await {
            return Ok(pairs);
        }

        self.refresh(class).await.map_err(PairsCacheError::Upstream)?;

        Ok(self.fresh_entry(class).await.unwrap_or_default())
    }

    async fn fresh_entry(&self, class: AssetClass) -> Option<Vec<(String, String)>> {
        let entries = self.entries.read().await;
        entries
            .get(&class)
            .filter(|entry| entry.is_fresh(self.config.ttl))
            .map(|entry| entry.pairs.clone())
    }

    pub async fn get_symbols(&self, class: AssetClass) -> Result<Vec<String>, PairsCacheError> {
        let pairs = self.get(class).await?;
        Ok(pairs
            .into_iter()
            .map(|(base, quote)| format_symbol(&base, &quote))
            .collect())
    }

    pub async fn is_supported(
        &self,
        class: AssetClass,
        pair: &(String, String),
    ) -> Result<bool, PairsCacheError> {
        let pairs = self.get(class).await?;
        Ok(pairs.contains(pair))
    }

    /// `["*"]` expands to the full cached symbol list; anything else
    /// passes through unchanged.
    pub async fn resolve(
        &self,
        raw_symbols: &[String],
        class: AssetClass,
    ) -> Result<Vec<String>, PairsCacheError> {
        if raw_symbols == ["*"] {
            self.get_symbols(class).await
        } else {
            Ok(raw_symbols.to_vec())
        }
    }

    async fn refresh(&self, class: AssetClass) -> Result<(), AdapterError> {
        let pairs = fetch_with_retry(&self.source, class, &self.config.retry).await?;
        let mut entries = self.entries.write().await;
        entries.insert(
            class,
            CacheEntry {
                pairs,
                last_refresh: Some(Utc::now()),
            },
        );
        Ok(())
    }

    fn spawn_auto_update(&self, interval: Duration) -> JoinHandle<()> {
        let source = self.source.clone();
        let asset_classes = self.asset_classes.clone();
        let retry = self.config.retry.clone();
        let entries = self.entries.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.notified() => break,
                }

                for class in &asset_classes {
                    match fetch_with_retry(&source, *class, &retry).await {
                        Ok(pairs) => {
                            let mut guard = entries.write().await;
                            guard.insert(
                                *class,
                                CacheEntry {
                                    pairs,
                                    last_refresh: Some(Utc::now()),
                                },
                            );
                        }
                        Err(err) => {
                            tracing::warn!(asset_class = %class, error = %err, "auto-update refresh failed, keeping previous entry");
                        }
                    }
                }
            }
        })
    }
}

async fn fetch_with_retry(
    source: &Arc<dyn PairsSource>,
    class: AssetClass,
    retry: &RetryConfig,
) -> Result<Vec<(String, String)>, AdapterError> {
    let mut delay = retry.initial_delay;
    let mut last_error = None;

    for attempt in 1..=retry.max_attempts {
        match source.fetch_tradable_pairs(class).await {
            Ok(pairs) => return Ok(pairs),
            Err(err) => {
                tracing::warn!(asset_class = %class, attempt, error = %err, "tradable pairs refresh failed");
                let retryable = err.retryable();
                last_error = Some(err);
                if !retryable || attempt == retry.max_attempts {
                    break;
                }
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(retry.max_delay);
            }
        }
    }

    Err(last_error.expect("loop runs at least once"))
}
