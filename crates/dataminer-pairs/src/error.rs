use std::fmt;

use dataminer_exchange::AdapterError;

#[derive(Debug, Clone)]
pub enum PairsCacheError {
    /// No asset class's initial refresh succeeded at `start`.
    AllRefreshesFailed,
    /// Requested an asset class the cache was never configured with.
    UnknownAssetClass,
    /// The asset class is configured but its most recent refresh failed
    /// and no prior successful entry exists to fall back to.
    Upstream(AdapterError),
    /// The cache was stopped (or never started); no reads are served.
    NotRunning,
}

impl fmt::Display for PairsCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairsCacheError::AllRefreshesFailed => write!(f, "all configured asset-class refreshes failed"),
            PairsCacheError::UnknownAssetClass => write!(f, "asset class not configured"),
            PairsCacheError::Upstream(err) => write!(f, "pairs refresh failed: {err}"),
            PairsCacheError::NotRunning => write!(f, "pairs cache is not running"),
        }
    }
}

impl std::error::Error for PairsCacheError {}
