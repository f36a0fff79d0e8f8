//! Canonical data model shared across the ingestion pipeline.
//!
//! Every exchange adapter converts its wire responses into these types
//! before handing them to a [`RecordSink`]. Nothing downstream of this
//! crate should need to know which exchange a record came from to
//! interpret its fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single price/quantity level in an orderbook.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

/// Trade side as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Some(TradeSide::Buy),
            "sell" => Some(TradeSide::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub price: f64,
    pub volume: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub change_24h: f64,
}

/// Bids sorted descending by price, asks sorted ascending by price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orderbook {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl Orderbook {
    /// `true` iff bids are sorted strictly descending and asks strictly
    /// ascending by price. Used by tests and by adapters as a sanity check
    /// after conversion.
    pub fn is_sorted(&self) -> bool {
        self.bids.windows(2).all(|w| w[0].price >= w[1].price)
            && self.asks.windows(2).all(|w| w[0].price <= w[1].price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: u64,
    pub price: f64,
    pub quantity: f64,
    pub side: TradeSide,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    /// e.g. "1m", "5m", "1h", "1d".
    pub interval: String,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub trade_count: u64,
    pub taker_buy_volume: f64,
}

/// The type-specific payload of a canonical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "data_type", rename_all = "snake_case")]
pub enum RecordPayload {
    Ticker(Ticker),
    Orderbook(Orderbook),
    Trade(Trade),
    Kline(Kline),
}

impl RecordPayload {
    pub fn data_type(&self) -> &'static str {
        match self {
            RecordPayload::Ticker(_) => "ticker",
            RecordPayload::Orderbook(_) => "orderbook",
            RecordPayload::Trade(_) => "trade",
            RecordPayload::Kline(_) => "kline",
        }
    }
}

/// A tagged observation delivered to a [`RecordSink`].
///
/// `sequence` is assigned by the scheduler at emission time: it increases
/// monotonically per job invocation so a sink can detect gaps or
/// reordering across concurrently-running job invocations without keeping
/// its own bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub exchange: String,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
    pub payload: RecordPayload,
}

impl Record {
    pub fn data_type(&self) -> &'static str {
        self.payload.data_type()
    }
}

/// Downstream delivery contract.
///
/// Implementations must be `Send + Sync`: callback invocations are
/// serialized per job invocation but may interleave across concurrently
/// running jobs, so a single sink instance is called from multiple tasks.
pub trait RecordSink: Send + Sync {
    fn deliver(&self, record: Record);
}

/// Convenience [`RecordSink`] that forwards every record to a closure.
/// Mirrors the "pass a function, not an object" ergonomics most callers want.
pub struct FnSink<F>(pub F)
where
    F: Fn(Record) + Send + Sync;

impl<F> RecordSink for FnSink<F>
where
    F: Fn(Record) + Send + Sync,
{
    fn deliver(&self, record: Record) {
        (self.0)(record)
    }
}
