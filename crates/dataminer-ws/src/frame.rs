use chrono::{DateTime, Utc};
use serde_json::Value;

use dataminer_model::{Kline, Orderbook, PriceLevel, Record, RecordPayload, Ticker, Trade, TradeSide};

use crate::error::WsProtocolError;

fn parse_f64(value: &Value, field: &'static str) -> Result<f64, WsProtocolError> {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .ok_or(WsProtocolError::MissingField(field))
}

fn field<'a>(payload: &'a Value, name: &'static str) -> Result<&'a Value, WsProtocolError> {
    payload.get(name).ok_or(WsProtocolError::MissingField(name))
}

fn timestamp_millis(payload: &Value, name: &'static str) -> Result<DateTime<Utc>, WsProtocolError> {
    let millis = field(payload, name)?
        .as_i64()
        .ok_or(WsProtocolError::MissingField(name))?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| WsProtocolError::Malformed(format!("timestamp out of range: {millis}")))
}

/// Decodes one Binance combined-stream frame (`{"stream": "...", "data": {...}}`)
/// into a canonical [`Record`]. The event type is read from `data.e`, per
/// Binance's stream payload convention.
pub fn decode_frame(exchange: &str, raw: &str) -> Result<Record, WsProtocolError> {
    let envelope: Value =
        serde_json::from_str(raw).map_err(|err| WsProtocolError::Malformed(err.to_string()))?;
    let data = envelope.get("data").unwrap_or(&envelope);

    let event_type = data
        .get("e")
        .and_then(Value::as_str)
        .ok_or(WsProtocolError::MissingField("e"))?;

    let symbol = data
        .get("s")
        .and_then(Value::as_str)
        .ok_or(WsProtocolError::MissingField("s"))?
        .to_string();

    let payload = match event_type {
        "24hrTicker" => RecordPayload::Ticker(decode_ticker_event(data)?),
        "depthUpdate" => RecordPayload::Orderbook(decode_depth_event(data)?),
        "trade" => RecordPayload::Trade(decode_trade_event(data)?),
        "kline" => RecordPayload::Kline(decode_kline_event(data)?),
        other => return Err(WsProtocolError::UnknownStream(other.to_string())),
    };

    Ok(Record {
        exchange: exchange.to_string(),
        symbol,
        timestamp: timestamp_millis(data, "E")?,
        sequence: 0,
        payload,
    })
}

fn decode_ticker_event(data: &Value) -> Result<Ticker, WsProtocolError> {
    Ok(Ticker {
        price: parse_f64(field(data, "c")?, "c")?,
        volume: parse_f64(field(data, "v")?, "v")?,
        high_24h: parse_f64(field(data, "h")?, "h")?,
        low_24h: parse_f64(field(data, "l")?, "l")?,
        change_24h: parse_f64(field(data, "P")?, "P")?,
    })
}

fn decode_levels(data: &Value, key: &'static str) -> Result<Vec<PriceLevel>, WsProtocolError> {
    let rows = field(data, key)?
        .as_array()
        .ok_or(WsProtocolError::MissingField(key))?;
    rows.iter()
        .map(|row| {
            let row = row.as_array().ok_or(WsProtocolError::MissingField(key))?;
            let price = parse_f64(row.first().ok_or(WsProtocolError::MissingField(key))?, key)?;
            let quantity = parse_f64(row.get(1).ok_or(WsProtocolError::MissingField(key))?, key)?;
            Ok(PriceLevel { price, quantity })
        })
        .collect()
}

fn decode_depth_event(data: &Value) -> Result<Orderbook, WsProtocolError> {
    Ok(Orderbook {
        bids: decode_levels(data, "b")?,
        asks: decode_levels(data, "a")?,
    })
}

fn decode_trade_event(data: &Value) -> Result<Trade, WsProtocolError> {
    let trade_id = field(data, "t")?
        .as_u64()
        .ok_or(WsProtocolError::MissingField("t"))?;
    let is_buyer_maker = field(data, "m")?
        .as_bool()
        .ok_or(WsProtocolError::MissingField("m"))?;
    Ok(Trade {
        trade_id,
        price: parse_f64(field(data, "p")?, "p")?,
        quantity: parse_f64(field(data, "q")?, "q")?,
        side: if is_buyer_maker { TradeSide::Sell } else { TradeSide::Buy },
        timestamp: timestamp_millis(data, "T")?,
    })
}

fn decode_kline_event(data: &Value) -> Result<Kline, WsProtocolError> {
    let k = field(data, "k")?;
    Ok(Kline {
        interval: field(k, "i")?
            .as_str()
            .ok_or(WsProtocolError::MissingField("i"))?
            .to_string(),
        open_time: timestamp_millis(k, "t")?,
        close_time: timestamp_millis(k, "T")?,
        open: parse_f64(field(k, "o")?, "o")?,
        high: parse_f64(field(k, "h")?, "h")?,
        low: parse_f64(field(k, "l")?, "l")?,
        close: parse_f64(field(k, "c")?, "c")?,
        volume: parse_f64(field(k, "v")?, "v")?,
        trade_count: field(k, "n")?.as_u64().ok_or(WsProtocolError::MissingField("n"))?,
        taker_buy_volume: parse_f64(field(k, "V")?, "V")?,
    })
}
