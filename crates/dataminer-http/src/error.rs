use std::fmt;

/// Classified HTTP/transport error, shared by every request made through
/// [`crate::HttpClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Connection refused/reset, unreachable network/host, mid-stream EOF,
    /// DNS failure ("no such host").
    Network(String),
    /// Any deadline-exceeded / read / write timeout.
    Timeout(String),
    /// TLS handshake failure or certificate error.
    Tls(String),
    /// Non-2xx HTTP response.
    Http { status: u16 },
    /// Synthesized at the rate-limit precheck; no network call was made.
    RateLimit,
    /// The request's context was canceled before completion.
    Canceled,
    /// The client was closed via `Close()`; no network call was attempted.
    ClientClosed,
    /// Doesn't fit the other categories (e.g. response body decode failure).
    Unknown(String),
}

impl HttpError {
    /// Retryability rules, inclusive, per the ingestion spec's error
    /// taxonomy:
    /// - `Network`, `Timeout`, `Tls`, `RateLimit` -> always retryable.
    /// - `Http`: 5xx and 429 retryable; other 4xx not.
    /// - `Canceled`, `ClientClosed`, `Unknown` -> never retryable.
    pub fn retryable(&self) -> bool {
        match self {
            HttpError::Network(_) => true,
            HttpError::Timeout(_) => true,
            HttpError::Tls(_) => true,
            HttpError::Http { status } => *status >= 500 || *status == 429,
            HttpError::RateLimit => true,
            HttpError::Canceled => false,
            HttpError::ClientClosed => false,
            HttpError::Unknown(_) => false,
        }
    }

    /// Short machine-readable tag used in log lines (`kind` field) and in
    /// job-record `last_error` annotations.
    pub fn kind(&self) -> &'static str {
        match self {
            HttpError::Network(_) => "network",
            HttpError::Timeout(_) => "timeout",
            HttpError::Tls(_) => "tls",
            HttpError::Http { .. } => "http",
            HttpError::RateLimit => "rate_limit",
            HttpError::Canceled => "canceled",
            HttpError::ClientClosed => "client_closed",
            HttpError::Unknown(_) => "unknown",
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::Network(msg) => write!(f, "network error: {msg}"),
            HttpError::Timeout(msg) => write!(f, "timeout: {msg}"),
            HttpError::Tls(msg) => write!(f, "tls error: {msg}"),
            HttpError::Http { status } => write!(f, "http error: status {status}"),
            HttpError::RateLimit => write!(f, "rate limit exceeded"),
            HttpError::Canceled => write!(f, "request canceled"),
            HttpError::ClientClosed => write!(f, "client is closed"),
            HttpError::Unknown(msg) => write!(f, "unknown error: {msg}"),
        }
    }
}

impl std::error::Error for HttpError {}

/// Classifies a [`reqwest::Error`] into the taxonomy above by inspecting
/// its category and, for categories `reqwest` doesn't distinguish directly
/// (TLS vs. plain network failure), its message text.
pub fn classify_transport_error(err: &reqwest::Error) -> HttpError {
    if err.is_timeout() {
        return HttpError::Timeout(err.to_string());
    }

    let msg = err.to_string();
    let lower = msg.to_lowercase();

    if lower.contains("certificate") || lower.contains("tls") || lower.contains("handshake") {
        return HttpError::Tls(msg);
    }

    if err.is_connect()
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("network unreachable")
        || lower.contains("no route to host")
        || lower.contains("unexpected eof")
        || lower.contains("no such host")
    {
        return HttpError::Network(msg);
    }

    HttpError::Unknown(msg)
}
