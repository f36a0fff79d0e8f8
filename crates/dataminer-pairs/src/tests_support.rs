//! Fakes for downstream crates' tests (no network).

use std::sync::Mutex;

use async_trait::async_trait;
use dataminer_exchange::{AdapterError, AssetClass, PairsSource};

/// In-memory [`PairsSource`] that pops one configured response per call
/// (the last response repeats once the queue drains), or always fails
/// when constructed via [`FakePairsSource::always_failing`].
pub struct FakePairsSource {
    responses: Mutex<Vec<Result<Vec<(String, String)>, String>>>,
}

impl FakePairsSource {
    pub fn new(responses: Vec<Vec<(String, String)>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
        }
    }

    pub fn always_failing() -> Self {
        Self {
            responses: Mutex::new(vec![Err("upstream unavailable".to_string())]),
        }
    }
}

#[async_trait]
impl PairsSource for FakePairsSource {
    async fn fetch_tradable_pairs(
        &self,
        _asset_class: AssetClass,
    ) -> Result<Vec<(String, String)>, AdapterError> {
        let mut responses = self.responses.lock().unwrap();
        let next = if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses.first().cloned().unwrap_or_else(|| Ok(Vec::new()))
        };
        next.map_err(AdapterError::Protocol)
    }
}
