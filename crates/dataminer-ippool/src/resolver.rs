//! DNS resolution backend.
//!
//! [`DnsResolver`] is the seam tests substitute a fake behind; production
//! code uses [`MultiServerResolver`], which queries each configured
//! resolver address directly (bypassing the system resolver) via
//! `hickory-resolver`, unioning the IPv4 results.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;

/// Resolves a hostname against a fixed set of upstream DNS servers.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Resolves `hostname` against every configured resolver, returning the
    /// union of IPv4 addresses. A single resolver's failure or timeout must
    /// not fail the whole call — it should simply contribute nothing.
    async fn resolve_ipv4(&self, hostname: &str) -> Vec<Ipv4Addr>;
}

/// Queries each `server:port` resolver address independently and unions the
/// results, preserving first-seen order across resolvers.
pub struct MultiServerResolver {
    servers: Vec<std::net::SocketAddr>,
    query_timeout: Duration,
}

impl MultiServerResolver {
    pub fn new(servers: Vec<std::net::SocketAddr>, query_timeout: Duration) -> Self {
        Self {
            servers,
            query_timeout,
        }
    }

    fn build_resolver(&self, server: std::net::SocketAddr) -> TokioAsyncResolver {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig {
            socket_addr: server,
            protocol: Protocol::Udp,
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });

        let mut opts = ResolverOpts::default();
        opts.timeout = self.query_timeout;
        opts.attempts = 1;

        TokioAsyncResolver::tokio(config, opts)
    }

    async fn query_one(&self, server: std::net::SocketAddr, hostname: &str) -> Vec<Ipv4Addr> {
        let resolver = self.build_resolver(server);
        match tokio::time::timeout(self.query_timeout, resolver.lookup(hostname, RecordType::A))
            .await
        {
            Ok(Ok(lookup)) => lookup
                .iter()
                .filter_map(|rdata| rdata.as_a().map(|a| Ipv4Addr::from(*a.0)))
                .collect(),
            Ok(Err(err)) => {
                tracing::warn!(server = %server, hostname, error = %err, "dns resolver query failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(server = %server, hostname, "dns resolver query timed out");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DnsResolver for MultiServerResolver {
    async fn resolve_ipv4(&self, hostname: &str) -> Vec<Ipv4Addr> {
        let futures = self
            .servers
            .iter()
            .map(|server| self.query_one(*server, hostname));
        let per_server: Vec<Vec<Ipv4Addr>> = futures_util::future::join_all(futures).await;

        let mut seen = std::collections::HashSet::new();
        let mut union = Vec::new();
        for addrs in per_server {
            for addr in addrs {
                if seen.insert(addr) {
                    union.push(addr);
                }
            }
        }
        union
    }
}

/// Fakes for downstream crates' tests (no network, no hickory).
pub mod tests_support {
    use super::*;
    use std::sync::Mutex;

    /// In-memory resolver for unit tests — no network, no hickory.
    pub struct FakeResolver {
        pub responses: Mutex<Vec<Vec<Ipv4Addr>>>,
    }

    impl FakeResolver {
        /// Each call to `resolve_ipv4` pops the next configured response;
        /// the last response repeats once the queue is drained.
        pub fn new(responses: Vec<Vec<Ipv4Addr>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl DnsResolver for FakeResolver {
        async fn resolve_ipv4(&self, _hostname: &str) -> Vec<Ipv4Addr> {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses.first().cloned().unwrap_or_default()
            }
        }
    }
}
