use async_trait::async_trait;
use dataminer_model::{Kline, Orderbook, Record, Ticker, Trade};

use crate::asset_class::AssetClass;
use crate::error::AdapterError;

/// Used-weight window reported by a lightweight time-and-weight endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaSnapshot {
    pub used_weight: u64,
    pub limit: u64,
}

/// Capability interfaces, per the ingestion design notes: the scheduler
/// asks an adapter for the capability it needs rather than probing its
/// concrete type, and substitutes a local weight estimate when a capability
/// (namely `QuotaReporter`) is absent.

#[async_trait]
pub trait TickerSource: Send + Sync {
    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, AdapterError>;
    /// Empty `symbols` means "all".
    async fn get_multiple_tickers(&self, symbols: &[String]) -> Result<Vec<Record>, AdapterError>;
}

#[async_trait]
pub trait OrderbookSource: Send + Sync {
    async fn get_orderbook(&self, symbol: &str, depth: u32) -> Result<Orderbook, AdapterError>;
    async fn get_multiple_orderbooks(
        &self,
        symbols: &[String],
        depth: u32,
    ) -> Result<Vec<Record>, AdapterError>;
}

#[async_trait]
pub trait TradeSource: Send + Sync {
    /// `limit` defaults to 500 when the caller passes `None`.
    async fn get_trades(&self, symbol: &str, limit: Option<u32>) -> Result<Vec<Trade>, AdapterError>;
}

#[async_trait]
pub trait KlineSource: Send + Sync {
    async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<u32>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<Kline>, AdapterError>;
}

#[async_trait]
pub trait QuotaReporter: Send + Sync {
    async fn get_time_and_weight(&self) -> Result<QuotaSnapshot, AdapterError>;
}

/// Symbol/pairs discovery, consumed by `dataminer-pairs`.
#[async_trait]
pub trait PairsSource: Send + Sync {
    async fn fetch_tradable_pairs(
        &self,
        asset_class: AssetClass,
    ) -> Result<Vec<(String, String)>, AdapterError>;
}

/// Per-symbol exchange metadata decoded from an exchange-info response:
/// trading status flag and the asset-class permission bits.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolMeta {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub permissions: Vec<String>,
}

/// Exchange metadata lookup. `fetch_tradable_pairs` is built on top of this
/// (filters by `status == "TRADING"` and the requested asset class's
/// permission bit) rather than duplicating the exchange-info call.
#[async_trait]
pub trait ExchangeInfoSource: Send + Sync {
    async fn get_exchange_info(&self) -> Result<Vec<SymbolMeta>, AdapterError>;
}
