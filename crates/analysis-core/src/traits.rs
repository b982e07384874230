use async_trait::async_trait;
use chrono::Duration;

use crate::{Bar, Financials, FundamentalsRecord};

/// Source of per-symbol fundamentals.
///
/// Implementations return `None` when a symbol is unknown or the upstream
/// fetch failed; callers treat absence as a data condition, not an error.
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    /// Latest snapshot of valuation / quality factors for `symbol`.
    async fn fundamentals(&self, symbol: &str) -> Option<FundamentalsRecord>;

    /// Quarterly statements ordered newest first.
    async fn quarterly_financials(&self, symbol: &str) -> Option<Vec<Financials>>;
}

/// Source of daily OHLCV history.
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Bars covering at most `lookback`, ordered oldest to newest.
    async fn price_history(&self, symbol: &str, lookback: Duration) -> Option<Vec<Bar>>;
}
