use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;

use dataminer_http::HttpClient;
use dataminer_model::{Kline, Orderbook, Record, RecordPayload, Ticker, Trade};

use crate::asset_class::AssetClass;
use crate::error::AdapterError;
use crate::traits::{
    ExchangeInfoSource, KlineSource, OrderbookSource, PairsSource, QuotaReporter, QuotaSnapshot,
    SymbolMeta, TickerSource, TradeSource,
};
use crate::wire::{
    decode_kline, decode_levels, decode_trade, ExchangeInfoResponse, OrderbookResponse,
    TickerResponse, TradeResponse,
};

/// Formats a canonical `(base, quote)` pair as the exchange's wire symbol:
/// plain concatenation, no separator (e.g. `("BTC", "USDT") -> "BTCUSDT"`).
pub fn format_symbol(base: &str, quote: &str) -> String {
    format!("{base}{quote}")
}

/// Binance Spot REST adapter. Holds an owning [`HttpClient`] (itself backed
/// by one `IpPool` per dynamic hostname) and implements every capability
/// trait the scheduler may request.
pub struct BinanceAdapter {
    http: HttpClient,
    base_url: String,
}

impl BinanceAdapter {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn ticker_to_canonical(raw: &TickerResponse) -> Result<Ticker, AdapterError> {
        Ok(Ticker {
            price: crate::wire::parse_f64("lastPrice", &raw.last_price)?,
            volume: crate::wire::parse_f64("volume", &raw.volume)?,
            high_24h: crate::wire::parse_f64("highPrice", &raw.high_price)?,
            low_24h: crate::wire::parse_f64("lowPrice", &raw.low_price)?,
            change_24h: crate::wire::parse_f64("priceChangePercent", &raw.price_change_percent)?,
        })
    }

    fn orderbook_to_canonical(raw: &OrderbookResponse) -> Result<Orderbook, AdapterError> {
        Ok(Orderbook {
            bids: decode_levels("bids", &raw.bids)?,
            asks: decode_levels("asks", &raw.asks)?,
        })
    }

    fn ticker_record(&self, symbol: &str, ticker: Ticker) -> Record {
        Record {
            exchange: "binance".to_string(),
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            sequence: 0,
            payload: RecordPayload::Ticker(ticker),
        }
    }
}

#[async_trait]
impl TickerSource for BinanceAdapter {
    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, AdapterError> {
        let url = format!("{}?symbol={}", self.url("/api/v3/ticker/24hr"), symbol);
        let raw: TickerResponse = self.http.get(&url).await?;
        Self::ticker_to_canonical(&raw)
    }

    async fn get_multiple_tickers(&self, symbols: &[String]) -> Result<Vec<Record>, AdapterError> {
        if symbols.is_empty() {
            let raw: Vec<(String, TickerResponse)> = {
                let wrapped: Vec<serde_json::Value> = self.http.get(&self.url("/api/v3/ticker/24hr")).await?;
                wrapped
                    .into_iter()
                    .map(|value| {
                        let symbol = value["symbol"].as_str().unwrap_or_default().to_string();
                        let parsed: TickerResponse = serde_json::from_value(value)
                            .map_err(|err| AdapterError::Protocol(err.to_string()))?;
                        Ok((symbol, parsed))
                    })
                    .collect::<Result<Vec<_>, AdapterError>>()?
            };
            return raw
                .iter()
                .map(|(symbol, ticker)| Ok(self.ticker_record(symbol, Self::ticker_to_canonical(ticker)?)))
                .collect();
        }

        let encoded = serde_json::to_string(symbols).unwrap_or_default();
        let url = format!(
            "{}?symbols={}",
            self.url("/api/v3/ticker/24hr"),
            urlencode(&encoded)
        );
        let wrapped: Vec<serde_json::Value> = self.http.get(&url).await?;
        wrapped
            .into_iter()
            .map(|value| {
                let symbol = value["symbol"].as_str().unwrap_or_default().to_string();
                let parsed: TickerResponse =
                    serde_json::from_value(value).map_err(|err| AdapterError::Protocol(err.to_string()))?;
                Ok(self.ticker_record(&symbol, Self::ticker_to_canonical(&parsed)?))
            })
            .collect()
    }
}

#[async_trait]
impl OrderbookSource for BinanceAdapter {
    async fn get_orderbook(&self, symbol: &str, depth: u32) -> Result<Orderbook, AdapterError> {
        let url = format!("{}?symbol={}&limit={}", self.url("/api/v3/depth"), symbol, depth);
        let raw: OrderbookResponse = self.http.get(&url).await?;
        Self::orderbook_to_canonical(&raw)
    }

    async fn get_multiple_orderbooks(
        &self,
        symbols: &[String],
        depth: u32,
    ) -> Result<Vec<Record>, AdapterError> {
        let results = join_all(symbols.iter().map(|symbol| async move {
            let ob = self.get_orderbook(symbol, depth).await?;
            Ok::<Record, AdapterError>(Record {
                exchange: "binance".to_string(),
                symbol: symbol.clone(),
                timestamp: Utc::now(),
                sequence: 0,
                payload: RecordPayload::Orderbook(ob),
            })
        }))
        .await;

        for (symbol, result) in symbols.iter().zip(results.iter()) {
            if let Err(err) = result {
                tracing::warn!(symbol = %symbol, error = %err, "orderbook fetch failed");
            }
        }

        results.into_iter().collect()
    }
}

#[async_trait]
impl TradeSource for BinanceAdapter {
    async fn get_trades(&self, symbol: &str, limit: Option<u32>) -> Result<Vec<Trade>, AdapterError> {
        let limit = limit.unwrap_or(500);
        let url = format!("{}?symbol={}&limit={}", self.url("/api/v3/trades"), symbol, limit);
        let raw: Vec<TradeResponse> = self.http.get(&url).await?;
        raw.iter().map(decode_trade).collect()
    }
}

#[async_trait]
impl KlineSource for BinanceAdapter {
    async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<u32>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Result<Vec<Kline>, AdapterError> {
        let mut url = format!(
            "{}?symbol={}&interval={}",
            self.url("/api/v3/klines"),
            symbol,
            interval
        );
        if let Some(limit) = limit {
            url.push_str(&format!("&limit={limit}"));
        }
        if let Some(start) = start_time {
            url.push_str(&format!("&startTime={start}"));
        }
        if let Some(end) = end_time {
            url.push_str(&format!("&endTime={end}"));
        }

        let rows: Vec<serde_json::Value> = self.http.get(&url).await?;
        rows.iter().map(|row| decode_kline(interval, row)).collect()
    }
}

#[async_trait]
impl QuotaReporter for BinanceAdapter {
    async fn get_time_and_weight(&self) -> Result<QuotaSnapshot, AdapterError> {
        let (headers, _body) = self
            .http
            .do_request_raw(reqwest::Method::GET, &self.url("/api/v3/time"), None, None)
            .await?;

        let used_weight = headers
            .get("x-mbx-used-weight-1m")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);

        Ok(QuotaSnapshot {
            used_weight,
            limit: 1200,
        })
    }
}

#[async_trait]
impl ExchangeInfoSource for BinanceAdapter {
    async fn get_exchange_info(&self) -> Result<Vec<SymbolMeta>, AdapterError> {
        let info: ExchangeInfoResponse = self.http.get(&self.url("/api/v3/exchangeInfo")).await?;
        Ok(info
            .symbols
            .into_iter()
            .map(|symbol| SymbolMeta {
                symbol: symbol.symbol,
                status: symbol.status,
                base_asset: symbol.base_asset,
                quote_asset: symbol.quote_asset,
                permissions: symbol.permissions,
            })
            .collect())
    }
}

#[async_trait]
impl PairsSource for BinanceAdapter {
    async fn fetch_tradable_pairs(
        &self,
        asset_class: AssetClass,
    ) -> Result<Vec<(String, String)>, AdapterError> {
        let symbols = self.get_exchange_info().await?;
        let permission = asset_class.permission();

        Ok(symbols
            .into_iter()
            .filter(|symbol| symbol.status == "TRADING")
            .filter(|symbol| symbol.permissions.iter().any(|p| p == permission))
            .map(|symbol| (symbol.base_asset, symbol.quote_asset))
            .collect())
    }
}

fn urlencode(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '"' => "%22".to_string(),
            '[' => "%5B".to_string(),
            ']' => "%5D".to_string(),
            ',' => "%2C".to_string(),
            other => other.to_string(),
        })
        .collect()
}
