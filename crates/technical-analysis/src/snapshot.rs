use analysis_core::{AnalysisError, Bar, TechnicalIndicators};

use crate::indicators::{rsi, sma};

pub const SMA_FAST_PERIOD: usize = 50;
pub const SMA_SLOW_PERIOD: usize = 200;
pub const RSI_PERIOD: usize = 14;

/// Sessions required before the funnel trusts the indicator snapshot.
pub const MIN_HISTORY_SESSIONS: usize = 250;

/// Compute SMA50 / SMA200 / RSI14 at the last bar of `bars` (oldest first).
///
/// Fails with `InsufficientData` when fewer than `min_sessions` bars are
/// available and with `InvalidData` when any indicator comes out undefined
/// (e.g. a NaN close somewhere in the window).
pub fn indicator_snapshot(bars: &[Bar], min_sessions: usize) -> Result<TechnicalIndicators, AnalysisError> {
    let required = min_sessions.max(SMA_SLOW_PERIOD);
    if bars.len() < required {
        return Err(AnalysisError::InsufficientData(format!(
            "{} sessions of price history, need {}",
            bars.len(),
            required
        )));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let price = *closes
        .last()
        .ok_or_else(|| AnalysisError::InsufficientData("empty price history".to_string()))?;

    let indicators = TechnicalIndicators {
        price,
        sma50: sma(&closes, SMA_FAST_PERIOD).last().copied().unwrap_or(f64::NAN),
        sma200: sma(&closes, SMA_SLOW_PERIOD).last().copied().unwrap_or(f64::NAN),
        rsi14: rsi(&closes, RSI_PERIOD).last().copied().unwrap_or(f64::NAN),
    };

    if !indicators.is_valid() {
        tracing::debug!(?indicators, "indicator snapshot contains undefined values");
        return Err(AnalysisError::InvalidData(
            "moving averages or RSI undefined".to_string(),
        ));
    }

    Ok(indicators)
}
