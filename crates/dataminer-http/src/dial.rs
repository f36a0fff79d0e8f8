use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};

use dataminer_ippool::IpPool;

/// Custom resolver installed on the `reqwest::Client` via
/// `ClientBuilder::dns_resolver`. For the one hostname it's pinned to, it
/// resolves to the IP pool's *current* candidate address instead of asking
/// the system resolver — every other hostname falls through to
/// `reqwest::dns::GaiResolver` unchanged.
///
/// Crucially this only changes which `SocketAddr` the TCP connection dials:
/// `reqwest` still sends the original `Host` header and verifies TLS
/// against the original hostname from the request URL, so SNI/cert
/// validation is unaffected.
pub struct PinnedResolver {
    pinned_host: String,
    port: u16,
    pool: Arc<IpPool>,
    fallback: reqwest::dns::GaiResolver,
}

impl PinnedResolver {
    pub fn new(pinned_host: impl Into<String>, port: u16, pool: Arc<IpPool>) -> Self {
        Self {
            pinned_host: pinned_host.into(),
            port,
            pool,
            fallback: reqwest::dns::GaiResolver::default(),
        }
    }
}

impl Resolve for PinnedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        if name.as_str() == self.pinned_host {
            let pool = self.pool.clone();
            let port = self.port;
            return Box::pin(async move {
                let address = pool
                    .current()
                    .await
                    .map_err(|err| -> Box<dyn std::error::Error + Send + Sync> { Box::new(err) })?;
                let ip: std::net::Ipv4Addr = address
                    .parse()
                    .map_err(|err: std::net::AddrParseError| -> Box<dyn std::error::Error + Send + Sync> {
                        Box::new(err)
                    })?;
                let addr = SocketAddr::from((ip, port));
                let addrs: Addrs = Box::new(std::iter::once(addr));
                Ok(addrs)
            });
        }

        self.fallback.resolve(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataminer_ippool::IpPoolConfig;
    use std::net::Ipv4Addr;

    struct OneShotResolver(Ipv4Addr);

    #[async_trait::async_trait]
    impl dataminer_ippool::DnsResolver for OneShotResolver {
        async fn resolve_ipv4(&self, _hostname: &str) -> Vec<Ipv4Addr> {
            vec![self.0]
        }
    }

    #[tokio::test]
    async fn pinned_hostname_resolves_to_pool_current_ip() {
        let resolver = Arc::new(OneShotResolver(Ipv4Addr::new(10, 0, 0, 9)));
        let pool = Arc::new(IpPool::new(
            "api.example.com",
            IpPoolConfig::default(),
            resolver,
        ));
        pool.start().await.unwrap();

        let dialer = PinnedResolver::new("api.example.com", 443, pool.clone());
        let name: Name = "api.example.com".parse().unwrap();
        let addrs: Vec<SocketAddr> = dialer.resolve(name).await.unwrap().collect();

        assert_eq!(addrs, vec![SocketAddr::from((Ipv4Addr::new(10, 0, 0, 9), 443))]);
        pool.stop().await;
    }
}
