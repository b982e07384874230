//! Data providers for the scoring and funnel engines.
//!
//! Everything here implements the `FundamentalsProvider` /
//! `PriceHistoryProvider` traits from `analysis-core`; the engines never see
//! where the data came from.

pub mod cache;
pub mod error;
pub mod memory;
pub mod snapshot;

pub use cache::{CachedProvider, CACHE_TTL_SECS};
pub use error::MarketDataError;
pub use memory::InMemoryMarketData;
pub use snapshot::SnapshotStore;

use analysis_core::Bar;
use chrono::Duration;

/// Keep the bars within `lookback` of the newest bar. Input is oldest first.
pub(crate) fn trim_to_lookback(bars: &[Bar], lookback: Duration) -> Vec<Bar> {
    let Some(latest) = bars.last().map(|b| b.timestamp) else {
        return vec![];
    };
    let cutoff = latest - lookback;
    bars.iter().filter(|b| b.timestamp >= cutoff).cloned().collect()
}
