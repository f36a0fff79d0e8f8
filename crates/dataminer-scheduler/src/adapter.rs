use dataminer_exchange::{KlineSource, OrderbookSource, TickerSource, TradeSource};

/// Everything a scheduled job can dispatch against. `QuotaReporter` is
/// deliberately not part of this bundle: it's requested separately as an
/// `Option<Arc<dyn QuotaReporter>>` so the scheduler can substitute a local
/// weight estimate when an adapter doesn't implement it, per the
/// capability-interface design notes.
pub trait Adapter: TickerSource + OrderbookSource + TradeSource + KlineSource + Send + Sync {}

impl<T> Adapter for T where T: TickerSource + OrderbookSource + TradeSource + KlineSource + Send + Sync {}
