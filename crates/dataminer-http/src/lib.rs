//! Resilient HTTP client.
//!
//! Wraps a `reqwest::Client` with a per-minute rate-limit precheck, a
//! classified error taxonomy with per-kind retryability, exponential
//! backoff, and (when a dynamic host is configured) IP-pool-pinned
//! dialing that keeps TLS SNI/Host pointed at the original hostname.

mod client;
mod dial;
mod error;
mod rate_limit;
mod stats;

pub use client::{DynamicHost, HttpClient, HttpClientConfig};
pub use dial::PinnedResolver;
pub use error::{classify_transport_error, HttpError};
pub use rate_limit::RateLimiter;
pub use stats::{HttpClientStats, StatusSnapshot};
