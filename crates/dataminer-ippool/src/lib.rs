//! IP Pool Manager.
//!
//! Resolves a hostname against multiple external DNS resolvers, tracks
//! per-IP liveness and latency, and exposes the current/next candidate IP
//! to callers (primarily `dataminer-http`'s dialer). See the crate's tests
//! for the boundary cases named in the ingestion spec (`Empty`,
//! `ResolutionEmpty`, single-IP pools, dedup across resolvers).

mod error;
mod pool;
mod record;
mod resolver;

pub use error::IpPoolError;
pub use pool::{IpPool, IpPoolConfig, LatencyProbeConfig, PoolStatus};
pub use record::IpRecord;
pub use resolver::{tests_support, DnsResolver, MultiServerResolver};
