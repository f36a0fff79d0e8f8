use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;

use dataminer_ippool::IpPool;

use crate::dial::PinnedResolver;
use crate::error::{classify_transport_error, HttpError};
use crate::rate_limit::RateLimiter;
use crate::stats::{HttpClientStats, StatusSnapshot};

/// Tunables for a single [`HttpClient`] instance. Defaults follow the
/// values named in the ingestion spec's end-to-end scenarios.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub rate_limit_per_minute: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "dataminer/0.1".to_string(),
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            rate_limit_per_minute: 1200,
        }
    }
}

/// A dynamic-IP host: the client substitutes the dial address for this
/// hostname with the pool's current IP while keeping TLS SNI/Host intact.
#[derive(Clone)]
pub struct DynamicHost {
    pub hostname: String,
    pub port: u16,
    pub pool: Arc<IpPool>,
}

/// Uniform request primitive shared by every exchange adapter call.
/// Enforces a per-minute rate-limit precheck, retries classified-retryable
/// failures with exponential backoff, and rotates the IP pool's cursor
/// between attempts when a dynamic host is configured.
pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpClientConfig,
    default_headers: RwLock<HeaderMap>,
    rate_limiter: RateLimiter,
    stats: HttpClientStats,
    dynamic_host: Option<DynamicHost>,
    closed: AtomicBool,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig, dynamic_host: Option<DynamicHost>) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .http1_only();

        if let Some(dynamic) = &dynamic_host {
            builder = builder.dns_resolver(Arc::new(PinnedResolver::new(
                dynamic.hostname.clone(),
                dynamic.port,
                dynamic.pool.clone(),
            )));
        }

        let inner = builder
            .build()
            .map_err(|err| HttpError::Unknown(err.to_string()))?;

        Ok(Self {
            inner,
            rate_limiter: RateLimiter::new(config.rate_limit_per_minute),
            stats: HttpClientStats::new(),
            default_headers: RwLock::new(HeaderMap::new()),
            dynamic_host,
            closed: AtomicBool::new(false),
            config,
        })
    }

    pub async fn set_headers(&self, headers: HeaderMap) {
        *self.default_headers.write().await = headers;
    }

    pub fn get_status(&self) -> StatusSnapshot {
        self.stats.snapshot()
    }

    /// Marks the client closed; subsequent calls fail with
    /// [`HttpError::ClientClosed`] without touching the network.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        self.do_request(Method::GET, url, None, None).await
    }

    pub async fn post<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T, HttpError> {
        self.do_request(Method::POST, url, Some(body), None).await
    }

    pub async fn put<T: DeserializeOwned>(&self, url: &str, body: Value) -> Result<T, HttpError> {
        self.do_request(Method::PUT, url, Some(body), None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        self.do_request(Method::DELETE, url, None, None).await
    }

    /// Full-control request primitive. Performs the rate-limit precheck
    /// once, then retries the request itself up to `max_attempts` times,
    /// rotating the dynamic host's IP pool cursor between retryable
    /// failures.
    pub async fn do_request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, HttpError> {
        let response = self.execute_with_retry(method, url, body, extra_headers).await?;
        match response.json::<T>().await {
            Ok(decoded) => {
                self.stats.record_success();
                Ok(decoded)
            }
            Err(err) => {
                let classified = HttpError::Unknown(err.to_string());
                self.stats.record_failure(&classified);
                Err(classified)
            }
        }
    }

    /// Same lifecycle as [`Self::do_request`] but returns the raw response
    /// headers and body bytes undecoded — used by callers that need
    /// response headers (e.g. an exchange's used-weight window) rather than
    /// a JSON-decoded body.
    pub async fn do_request_raw(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<(HeaderMap, bytes::Bytes), HttpError> {
        let response = self.execute_with_retry(method, url, body, extra_headers).await?;
        let headers = response.headers().clone();
        match response.bytes().await {
            Ok(bytes) => {
                self.stats.record_success();
                Ok((headers, bytes))
            }
            Err(err) => {
                let classified = HttpError::Unknown(err.to_string());
                self.stats.record_failure(&classified);
                Err(classified)
            }
        }
    }

    async fn execute_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, HttpError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HttpError::ClientClosed);
        }

        if !self.rate_limiter.try_acquire() {
            self.stats.record_failure("rate limit exceeded");
            return Err(HttpError::RateLimit);
        }

        let headers = self.build_headers(extra_headers).await;

        let mut last_error = HttpError::Unknown("no attempts made".to_string());
        for attempt in 1..=self.config.max_attempts {
            self.stats.record_attempt();

            tracing::debug!(method = %method, url, attempt, "http request attempt");

            match self.attempt_once(&method, url, body.clone(), headers.clone()).await {
                Ok(response) => match response.status().as_u16() {
                    status if (200..300).contains(&status) => return Ok(response),
                    status => {
                        last_error = HttpError::Http { status };
                    }
                },
                Err(err) => {
                    last_error = err;
                }
            }

            if !last_error.retryable() || attempt == self.config.max_attempts {
                break;
            }

            tracing::warn!(method = %method, url, attempt, error = %last_error, "retryable http failure, rotating ip");
            self.stats.record_retry();
            if let Some(dynamic) = &self.dynamic_host {
                let _ = dynamic.pool.next().await;
            }

            let delay = self.backoff_delay(attempt);
            tokio::time::sleep(delay).await;
        }

        tracing::error!(method = %method, url, error = %last_error, "http request exhausted all attempts");
        self.stats.record_failure(&last_error);
        Err(last_error)
    }

    async fn attempt_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<Value>,
        headers: HeaderMap,
    ) -> Result<reqwest::Response, HttpError> {
        let mut request = self.inner.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            request = request.json(&body);
        }

        request
            .send()
            .await
            .map_err(|err| classify_transport_error(&err))
    }

    async fn build_headers(&self, extra: Option<HeaderMap>) -> HeaderMap {
        let mut headers = self.default_headers.read().await.clone();
        if let Some(extra) = extra {
            headers.extend(extra);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&self.config.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let scale = 1u32 << attempt.saturating_sub(1).min(16);
        let delay = self.config.initial_delay.saturating_mul(scale);
        delay.min(self.config.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        ok: bool,
    }

    fn client() -> HttpClient {
        HttpClient::new(HttpClientConfig::default(), None).unwrap()
    }

    #[tokio::test]
    async fn successful_json_round_trip() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({"ok": true}));
        });

        let client = client();
        let result: Echo = client.get(&server.url("/ok")).await.unwrap();
        assert_eq!(result, Echo { ok: true });
        mock.assert();

        let status = client.get_status();
        assert_eq!(status.successful_requests, 1);
        assert_eq!(status.failed_requests, 0);
    }

    #[tokio::test]
    async fn retries_on_503_then_succeeds() {
        let server = MockServer::start();
        let first = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let client = client();
        // Only the first mock is registered, so all attempts see 503 — this
        // exercises retry-until-exhausted without needing mock sequencing.
        let err = client.get::<Echo>(&server.url("/flaky")).await.unwrap_err();
        assert!(matches!(err, HttpError::Http { status: 503 }));
        assert!(err.retryable());

        let status = client.get_status();
        assert_eq!(status.failed_requests, 1);
        assert!(status.retry_count >= 1);
        assert!(first.hits() >= 2);
    }

    #[tokio::test]
    async fn non_retryable_4xx_fails_without_retry() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/bad");
            then.status(400);
        });

        let client = client();
        let err = client.get::<Echo>(&server.url("/bad")).await.unwrap_err();
        assert!(matches!(err, HttpError::Http { status: 400 }));
        assert!(!err.retryable());
        assert_eq!(mock.hits(), 1);
    }

    #[tokio::test]
    async fn rate_limit_precheck_rejects_third_call_without_network() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/limited");
            then.status(200).json_body(serde_json::json!({"ok": true}));
        });

        let mut config = HttpClientConfig::default();
        config.rate_limit_per_minute = 2;
        let client = HttpClient::new(config, None).unwrap();

        let url = server.url("/limited");
        let _: Echo = client.get(&url).await.unwrap();
        let _: Echo = client.get(&url).await.unwrap();
        let err = client.get::<Echo>(&url).await.unwrap_err();

        assert_eq!(err, HttpError::RateLimit);
        assert_eq!(mock.hits(), 2);
    }

    #[tokio::test]
    async fn closed_client_rejects_without_network() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/closed");
            then.status(200);
        });

        let client = client();
        client.close();
        let err = client.get::<Echo>(&server.url("/closed")).await.unwrap_err();
        assert_eq!(err, HttpError::ClientClosed);
        assert_eq!(mock.hits(), 0);
    }
}
