/// The data-type tag a job polls for. Determines both the batch dispatch
/// strategy and the per-call weight formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Ticker,
    Orderbook,
    Trade,
    Kline,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Ticker => "ticker",
            DataType::Orderbook => "orderbook",
            DataType::Trade => "trade",
            DataType::Kline => "kline",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Estimates the exchange-reported weight a batch of `count` symbols will
/// cost, per the scheduler's weight model:
/// - klines: `2 * count`
/// - ticker: `count` if `count <= 20`, else `40` if `count <= 100`, else `80`
/// - orderbook: `10 * count`
/// - trades: `count`
pub fn estimate_weight(data_type: DataType, count: usize) -> u64 {
    let count = count as u64;
    match data_type {
        DataType::Kline => 2 * count,
        DataType::Ticker => {
            if count <= 20 {
                count
            } else if count <= 100 {
                40
            } else {
                80
            }
        }
        DataType::Orderbook => 10 * count,
        DataType::Trade => count,
    }
}

/// Splits `symbols` into fixed-size, order-preserving batches. `batch_size`
/// of `0` is treated as "no batching" (one batch containing everything).
pub fn partition_batches(symbols: &[String], batch_size: usize) -> Vec<Vec<String>> {
    if symbols.is_empty() {
        return Vec::new();
    }
    if batch_size == 0 {
        return vec![symbols.to_vec()];
    }
    symbols.chunks(batch_size).map(|chunk| chunk.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_weight_tiers() {
        assert_eq!(estimate_weight(DataType::Ticker, 5), 5);
        assert_eq!(estimate_weight(DataType::Ticker, 20), 20);
        assert_eq!(estimate_weight(DataType::Ticker, 21), 40);
        assert_eq!(estimate_weight(DataType::Ticker, 100), 40);
        assert_eq!(estimate_weight(DataType::Ticker, 101), 80);
    }

    #[test]
    fn kline_orderbook_trade_weight_formulas() {
        assert_eq!(estimate_weight(DataType::Kline, 10), 20);
        assert_eq!(estimate_weight(DataType::Orderbook, 10), 100);
        assert_eq!(estimate_weight(DataType::Trade, 10), 10);
    }

    #[test]
    fn partition_default_batch_size_80_splits_240_into_three() {
        let symbols: Vec<String> = (0..240).map(|i| format!("SYM{i}")).collect();
        let batches = partition_batches(&symbols, 80);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 80);
        assert_eq!(batches[2].len(), 80);
    }

    #[test]
    fn partition_handles_remainder() {
        let symbols: Vec<String> = (0..85).map(|i| format!("SYM{i}")).collect();
        let batches = partition_batches(&symbols, 80);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].len(), 5);
    }

    #[test]
    fn partition_empty_symbols_yields_no_batches() {
        let batches = partition_batches(&[], 80);
        assert!(batches.is_empty());
    }
}
