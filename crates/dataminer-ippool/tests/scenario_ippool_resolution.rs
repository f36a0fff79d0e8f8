use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;

use dataminer_ippool::{tests_support::FakeResolver, IpPool, IpPoolConfig, IpPoolError};

fn ip(s: &str) -> Ipv4Addr {
    Ipv4Addr::from_str(s).unwrap()
}

#[tokio::test]
async fn empty_pool_at_start_returns_resolution_empty() {
    let resolver = Arc::new(FakeResolver::new(vec![vec![]]));
    let pool = IpPool::new("api.example.com", IpPoolConfig::default(), resolver);

    let err = pool.start().await.unwrap_err();
    assert_eq!(err, IpPoolError::ResolutionEmpty);
}

#[tokio::test]
async fn force_refresh_picks_up_a_changed_address_set() {
    let resolver = Arc::new(FakeResolver::new(vec![
        vec![ip("10.0.0.1")],
        vec![ip("10.0.0.2"), ip("10.0.0.3")],
    ]));
    let pool = IpPool::new("api.example.com", IpPoolConfig::default(), resolver);

    pool.start().await.unwrap();
    assert_eq!(pool.current().await.unwrap(), "10.0.0.1");

    pool.force_refresh().unwrap();
    // The background task picks up the force-refresh signal asynchronously.
    for _ in 0..50 {
        let all = pool.all().await.unwrap();
        if all.len() == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let all = pool.all().await.unwrap();
    assert_eq!(all.len(), 2);

    pool.stop().await;
}

#[tokio::test]
async fn force_refresh_on_stopped_pool_is_not_running() {
    let resolver = Arc::new(FakeResolver::new(vec![vec![ip("10.0.0.1")]]));
    let pool = IpPool::new("api.example.com", IpPoolConfig::default(), resolver);

    assert_eq!(pool.force_refresh().unwrap_err(), IpPoolError::NotRunning);
}

#[tokio::test]
async fn stop_then_all_reads_fail_not_running() {
    let resolver = Arc::new(FakeResolver::new(vec![vec![ip("10.0.0.1")]]));
    let pool = IpPool::new("api.example.com", IpPoolConfig::default(), resolver);

    pool.start().await.unwrap();
    pool.stop().await;

    assert_eq!(pool.current().await.unwrap_err(), IpPoolError::NotRunning);
    assert_eq!(pool.next().await.unwrap_err(), IpPoolError::NotRunning);
    assert_eq!(pool.all().await.unwrap_err(), IpPoolError::NotRunning);
}
