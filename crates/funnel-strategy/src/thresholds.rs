use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Cut-offs applied by the funnel gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelThresholds {
    // Size filter
    pub min_price: f64,       // $10
    pub min_market_cap: f64,  // $20B

    // Three cards
    pub min_revenue_growth_pct: f64,   // 18%
    pub min_earnings_growth_pct: f64,  // 18%

    // Two lines
    pub sma50_tolerance: f64,  // ±8% around the 50-day average
    pub rsi_low: f64,          // 38
    pub rsi_high: f64,         // 55

    // Price history
    pub min_history_sessions: usize,  // 250
    pub history_lookback_days: i64,   // 2 years
}

impl Default for FunnelThresholds {
    fn default() -> Self {
        Self {
            min_price: 10.0,
            min_market_cap: 20e9,
            min_revenue_growth_pct: 18.0,
            min_earnings_growth_pct: 18.0,
            sma50_tolerance: 0.08,
            rsi_low: 38.0,
            rsi_high: 55.0,
            min_history_sessions: 250,
            history_lookback_days: 730,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl FunnelThresholds {
    /// Defaults overridden by `FUNNEL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let thresholds = Self {
            min_price: env_or("FUNNEL_MIN_PRICE", d.min_price)?,
            min_market_cap: env_or("FUNNEL_MIN_MARKET_CAP", d.min_market_cap)?,
            min_revenue_growth_pct: env_or("FUNNEL_MIN_REVENUE_GROWTH", d.min_revenue_growth_pct)?,
            min_earnings_growth_pct: env_or("FUNNEL_MIN_EARNINGS_GROWTH", d.min_earnings_growth_pct)?,
            sma50_tolerance: env_or("FUNNEL_SMA50_TOLERANCE", d.sma50_tolerance)?,
            rsi_low: env_or("FUNNEL_RSI_LOW", d.rsi_low)?,
            rsi_high: env_or("FUNNEL_RSI_HIGH", d.rsi_high)?,
            min_history_sessions: env_or("FUNNEL_MIN_SESSIONS", d.min_history_sessions)?,
            history_lookback_days: env_or("FUNNEL_LOOKBACK_DAYS", d.history_lookback_days)?,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.rsi_low <= self.rsi_high,
            "RSI band is inverted ({} > {})",
            self.rsi_low,
            self.rsi_high
        );
        anyhow::ensure!(
            (0.0..1.0).contains(&self.sma50_tolerance),
            "SMA50 tolerance must be in [0, 1), got {}",
            self.sma50_tolerance
        );
        anyhow::ensure!(self.history_lookback_days > 0, "lookback must be positive");
        Ok(())
    }
}
