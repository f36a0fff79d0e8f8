use std::fmt;

/// Closed set of supported exchanges. New venues are added here, not via
/// a runtime-registered type, so the scheduler/daemon can match on a fixed
/// enum instead of probing an adapter's concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    Binance,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
