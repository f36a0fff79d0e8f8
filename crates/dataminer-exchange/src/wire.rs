//! Wire-format decoding for Binance-shaped REST responses.
//!
//! Numeric fields arrive as JSON strings and must be parsed to `f64`;
//! orderbook/kline rows arrive as positional arrays and are decoded with
//! fixed-arity tuple types rather than a generic struct-tag decoder, per
//! the adapter's response-conversion rules.

use serde::Deserialize;

use crate::error::AdapterError;
use dataminer_model::{Kline, PriceLevel, Trade, TradeSide};

pub fn parse_f64(field: &str, raw: &str) -> Result<f64, AdapterError> {
    raw.parse::<f64>()
        .map_err(|_| AdapterError::Protocol(format!("field `{field}`: not a number: {raw:?}")))
}

#[derive(Debug, Deserialize)]
pub struct TickerResponse {
    #[serde(rename = "lastPrice")]
    pub last_price: String,
    pub volume: String,
    #[serde(rename = "highPrice")]
    pub high_price: String,
    #[serde(rename = "lowPrice")]
    pub low_price: String,
    #[serde(rename = "priceChangePercent")]
    pub price_change_percent: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderbookResponse {
    pub bids: Vec<(String, String)>,
    pub asks: Vec<(String, String)>,
}

pub fn decode_levels(field: &str, raw: &[(String, String)]) -> Result<Vec<PriceLevel>, AdapterError> {
    raw.iter()
        .map(|(price, quantity)| {
            Ok(PriceLevel {
                price: parse_f64(field, price)?,
                quantity: parse_f64(field, quantity)?,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct TradeResponse {
    pub id: u64,
    pub price: String,
    pub qty: String,
    #[serde(rename = "isBuyerMaker")]
    pub is_buyer_maker: bool,
    pub time: i64,
}

pub fn decode_trade(raw: &TradeResponse) -> Result<Trade, AdapterError> {
    Ok(Trade {
        trade_id: raw.id,
        price: parse_f64("price", &raw.price)?,
        quantity: parse_f64("qty", &raw.qty)?,
        side: if raw.is_buyer_maker {
            TradeSide::Sell
        } else {
            TradeSide::Buy
        },
        timestamp: chrono::DateTime::from_timestamp_millis(raw.time)
            .ok_or_else(|| AdapterError::Protocol(format!("trade time out of range: {}", raw.time)))?,
    })
}

/// Decodes an 11-element kline row with the fixed column order: open time,
/// open, high, low, close, volume, close time, quote volume, trade count,
/// taker buy base volume, taker buy quote volume.
pub fn decode_kline(interval: &str, row: &serde_json::Value) -> Result<Kline, AdapterError> {
    let elements = row
        .as_array()
        .ok_or_else(|| AdapterError::Protocol("kline row is not an array".to_string()))?;
    if elements.len() < 11 {
        return Err(AdapterError::Protocol(format!(
            "kline row has {} elements, expected 11",
            elements.len()
        )));
    }

    let as_i64 = |idx: usize| -> Result<i64, AdapterError> {
        elements[idx]
            .as_i64()
            .ok_or_else(|| AdapterError::Protocol(format!("kline[{idx}] is not an integer")))
    };
    let as_num_str = |idx: usize| -> Result<f64, AdapterError> {
        let value = elements[idx]
            .as_str()
            .ok_or_else(|| AdapterError::Protocol(format!("kline[{idx}] is not a string")))?;
        parse_f64("kline", value)
    };

    let open_time = as_i64(0)?;
    let open = as_num_str(1)?;
    let high = as_num_str(2)?;
    let low = as_num_str(3)?;
    let close = as_num_str(4)?;
    let volume = as_num_str(5)?;
    let close_time = as_i64(6)?;
    let trade_count = elements[8]
        .as_u64()
        .ok_or_else(|| AdapterError::Protocol("kline[8] is not an integer".to_string()))?;
    let taker_buy_volume = as_num_str(9)?;

    let parse_time = |millis: i64, idx: usize| {
        chrono::DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| AdapterError::Protocol(format!("kline[{idx}] time out of range: {millis}")))
    };

    Ok(Kline {
        interval: interval.to_string(),
        open_time: parse_time(open_time, 0)?,
        close_time: parse_time(close_time, 6)?,
        open,
        high,
        low,
        close,
        volume,
        trade_count,
        taker_buy_volume,
    })
}

#[derive(Debug, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(rename = "baseAsset")]
    pub base_asset: String,
    #[serde(rename = "quoteAsset")]
    pub quote_asset: String,
    pub permissions: Vec<String>,
}
