use std::fmt;

/// Trading mode distinguishing which permission bit on an exchange symbol
/// gates trading, per the ingestion glossary. `spot`/`margin`/`futures` are
/// the variants `GetExchangeInfo` responses expose permission bits for
/// today; the set is closed at compile time, same as `Exchange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Spot,
    Margin,
    Futures,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Spot => "spot",
            AssetClass::Margin => "margin",
            AssetClass::Futures => "futures",
        }
    }

    /// The exchange-info permission bit this asset class corresponds to.
    pub fn permission(&self) -> &'static str {
        match self {
            AssetClass::Spot => "SPOT",
            AssetClass::Margin => "MARGIN",
            AssetClass::Futures => "FUTURES",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spot" => Some(AssetClass::Spot),
            "margin" => Some(AssetClass::Margin),
            "futures" => Some(AssetClass::Futures),
            _ => None,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_through_as_str() {
        for class in [AssetClass::Spot, AssetClass::Margin, AssetClass::Futures] {
            assert_eq!(AssetClass::parse(class.as_str()), Some(class));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(AssetClass::parse("SPOT"), Some(AssetClass::Spot));
        assert_eq!(AssetClass::parse("bogus"), None);
    }
}
