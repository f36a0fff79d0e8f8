use std::fmt;

use dataminer_http::HttpError;

/// Error surfaced by an adapter operation. HTTP errors propagate unchanged
/// (same variant, same retryability) so callers don't need to re-classify;
/// `Protocol` is reserved for payloads that fail to parse into the
/// canonical model.
#[derive(Debug, Clone)]
pub enum AdapterError {
    Http(HttpError),
    Protocol(String),
}

impl AdapterError {
    pub fn retryable(&self) -> bool {
        match self {
            AdapterError::Http(err) => err.retryable(),
            AdapterError::Protocol(_) => false,
        }
    }
}

impl From<HttpError> for AdapterError {
    fn from(err: HttpError) -> Self {
        AdapterError::Http(err)
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::Http(err) => write!(f, "{err}"),
            AdapterError::Protocol(msg) => write!(f, "protocol error: {msg}"),
        }
    }
}

impl std::error::Error for AdapterError {}
