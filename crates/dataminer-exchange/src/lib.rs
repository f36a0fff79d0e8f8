//! Exchange adapters.
//!
//! Hides an exchange's endpoint layout, pagination, and wire response
//! shape behind the canonical data model and a set of capability traits
//! the scheduler can query without runtime type inspection.

mod asset_class;
mod binance;
mod error;
mod exchange;
mod traits;
mod wire;

pub use asset_class::AssetClass;
pub use binance::{format_symbol, BinanceAdapter};
pub use error::AdapterError;
pub use exchange::Exchange;
pub use traits::{
    ExchangeInfoSource, KlineSource, OrderbookSource, PairsSource, QuotaReporter, QuotaSnapshot,
    SymbolMeta, TickerSource, TradeSource,
};
