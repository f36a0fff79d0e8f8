use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single resolved candidate address plus its observed health.
///
/// Created when resolution yields a new address; mutated by the latency
/// prober and by the HTTP client on dial failure; discarded only when the
/// next resolution cycle omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpRecord {
    pub address: String,
    #[serde(with = "duration_millis_opt")]
    pub latency: Option<Duration>,
    pub available: bool,
    pub last_check: Option<DateTime<Utc>>,
    pub failure_count: u64,
}

impl IpRecord {
    pub fn new(address: String) -> Self {
        Self {
            address,
            latency: None,
            available: true,
            last_check: None,
            failure_count: 0,
        }
    }

    pub fn record_probe(&mut self, latency: Option<Duration>) {
        self.available = latency.is_some();
        self.latency = latency;
        self.last_check = Some(Utc::now());
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }
}

mod duration_millis_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        v.map(|d| d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let millis: Option<u64> = Option::deserialize(d)?;
        Ok(millis.map(Duration::from_millis))
    }
}

/// Ordering policy applied to a [`crate::IpPool`] snapshot.
///
/// When latency checking is enabled, available records sort first, then by
/// ascending latency. Otherwise the DNS resolution insertion order
/// (deduplicated across resolvers) is preserved.
pub fn sort_by_latency(records: &mut [IpRecord]) {
    records.sort_by(|a, b| {
        b.available
            .cmp(&a.available)
            .then_with(|| latency_key(a).partial_cmp(&latency_key(b)).unwrap())
    });
}

fn latency_key(r: &IpRecord) -> f64 {
    r.latency.map(|d| d.as_secs_f64()).unwrap_or(f64::MAX)
}
