use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use dataminer_exchange::AdapterError;
use dataminer_model::{Record, RecordPayload, RecordSink};
use dataminer_pairs::PairsCache;

use crate::adapter::Adapter;
use crate::job::JobSpec;
use crate::rate_gate::WeightGate;
use crate::weight::{estimate_weight, partition_batches};

/// Resolves the job's configured symbol list, expanding a literal `["*"]`
/// through the pairs cache.
pub async fn resolve_symbols(
    spec: &JobSpec,
    pairs: Option<&Arc<PairsCache>>,
) -> Result<Vec<String>, AdapterError> {
    match pairs {
        Some(cache) => cache
            .resolve(&spec.symbols, spec.asset_class)
            .await
            .map_err(|err| AdapterError::Protocol(err.to_string())),
        None => Ok(spec.symbols.clone()),
    }
}

/// Runs one full job invocation: resolves symbols, partitions into
/// batches, and for each batch applies the weight precheck before
/// dispatching by data type. A batch error fails the whole invocation
/// immediately, per the scheduler's failure semantics.
pub async fn run_invocation(
    spec: &JobSpec,
    adapter: &Arc<dyn Adapter>,
    sink: &Arc<dyn RecordSink>,
    pairs: Option<&Arc<PairsCache>>,
    gate: &Arc<WeightGate>,
    sequence: &Arc<AtomicU64>,
) -> Result<(), AdapterError> {
    let symbols = resolve_symbols(spec, pairs).await?;
    let batch_size = if spec.batch_size == 0 { 80 } else { spec.batch_size };
    let batches = partition_batches(&symbols, batch_size);
    let batch_count = batches.len();

    for (index, batch) in batches.into_iter().enumerate() {
        let weight = estimate_weight(spec.data_type, batch.len());
        gate.precheck(weight).await;

        let records = dispatch_batch(spec, adapter, &batch).await?;
        for mut record in records {
            record.sequence = sequence.fetch_add(1, Ordering::Relaxed);
            sink.deliver(record);
        }

        if index + 1 < batch_count {
            gate.inter_batch_delay().await;
        }
    }

    Ok(())
}

async fn dispatch_batch(
    spec: &JobSpec,
    adapter: &Arc<dyn Adapter>,
    batch: &[String],
) -> Result<Vec<Record>, AdapterError> {
    use crate::weight::DataType;

    match spec.data_type {
        DataType::Ticker => adapter.get_multiple_tickers(batch).await,
        DataType::Orderbook => adapter.get_multiple_orderbooks(batch, spec.depth).await,
        DataType::Trade => {
            let mut records = Vec::with_capacity(batch.len());
            for symbol in batch {
                let trades = adapter.get_trades(symbol, spec.limit).await?;
                for trade in trades {
                    records.push(Record {
                        exchange: "binance".to_string(),
                        symbol: symbol.clone(),
                        timestamp: Utc::now(),
                        sequence: 0,
                        payload: RecordPayload::Trade(trade),
                    });
                }
            }
            Ok(records)
        }
        DataType::Kline => {
            let interval = spec
                .interval
                .as_deref()
                .ok_or_else(|| AdapterError::Protocol("kline job missing interval".to_string()))?;
            let mut records = Vec::with_capacity(batch.len());
            for symbol in batch {
                let klines = adapter
                    .get_klines(symbol, interval, spec.limit, None, None)
                    .await?;
                for kline in klines {
                    records.push(Record {
                        exchange: "binance".to_string(),
                        symbol: symbol.clone(),
                        timestamp: Utc::now(),
                        sequence: 0,
                        payload: RecordPayload::Kline(kline),
                    });
                }
            }
            Ok(records)
        }
    }
}
