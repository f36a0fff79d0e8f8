//! Tradable-pairs cache.
//!
//! A TTL-bounded, per-asset-class index of active trading pairs, refreshed
//! inline on a stale read (coalesced so only one refresh per asset class
//! is in flight at a time) and optionally kept warm by a background
//! ticker.

mod cache;
mod error;
pub mod tests_support;

pub use cache::{PairsCache, PairsCacheConfig, RetryConfig};
pub use error::PairsCacheError;
