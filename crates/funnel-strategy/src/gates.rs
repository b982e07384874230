//! Individual funnel gates.
//!
//! Each gate is a pure function over already-fetched data. It either lets
//! the symbol through with the facts the next gate needs
//! (`ControlFlow::Continue`) or ends the funnel with a verdict
//! (`ControlFlow::Break`).

use analysis_core::{Action, Bar, FinancialData, Financials, FundamentalsRecord, StrategyResult, TechnicalIndicators};
use fundamental_analysis::derive_financial_data;
use serde::Serialize;
use std::ops::ControlFlow;
use technical_analysis::indicator_snapshot;

use crate::thresholds::FunnelThresholds;

pub type Gate<T> = ControlFlow<StrategyResult, T>;

pub const CONFIDENCE_THREE_CARDS_FAIL: f64 = 0.3;
pub const CONFIDENCE_NO_TECHNICALS: f64 = 0.5;
pub const CONFIDENCE_WAIT_FOR_ENTRY: f64 = 0.6;
pub const CONFIDENCE_TREND_BROKEN: f64 = 0.8;
pub const CONFIDENCE_BUY: f64 = 0.9;

/// Price and size facts that passed the size filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BasicInfo {
    pub price: f64,
    pub market_cap: f64,
}

/// Gate 1: price and market-cap floor.
pub fn basic_info_gate(
    symbol: &str,
    record: Option<&FundamentalsRecord>,
    thresholds: &FunnelThresholds,
) -> Gate<BasicInfo> {
    let Some(record) = record else {
        return ControlFlow::Break(StrategyResult::skip(symbol, "Basic data unavailable"));
    };
    let Some(price) = record.price.filter(|p| p.is_finite() && *p > 0.0) else {
        return ControlFlow::Break(StrategyResult::skip(symbol, "Price data unavailable"));
    };
    let market_cap = record.market_cap.filter(|c| c.is_finite()).unwrap_or(0.0);

    if price < thresholds.min_price || market_cap < thresholds.min_market_cap {
        return ControlFlow::Break(
            StrategyResult::skip(
                symbol,
                format!(
                    "Penny stock or market cap too small (price: ${:.2}, market cap: {:.1}B)",
                    price,
                    market_cap / 1e9
                ),
            )
            .with_detail("price", price)
            .with_detail("market_cap", market_cap),
        );
    }

    ControlFlow::Continue(BasicInfo { price, market_cap })
}

/// Gate 2: quarterly statements must yield growth and cash-flow facts.
pub fn financial_data_gate(
    symbol: &str,
    basic: &BasicInfo,
    quarters: Option<&[Financials]>,
) -> Gate<FinancialData> {
    let Some(quarters) = quarters else {
        return ControlFlow::Break(
            StrategyResult::skip(symbol, "Financial statements unavailable").with_detail("price", basic.price),
        );
    };

    match derive_financial_data(quarters) {
        Ok(data) => ControlFlow::Continue(data),
        Err(e) => ControlFlow::Break(
            StrategyResult::skip(symbol, format!("Insufficient financial data: {}", e))
                .with_detail("price", basic.price),
        ),
    }
}

/// Gate 3: revenue and earnings growth above the floor, free cash flow
/// positive and rising.
pub fn three_cards_gate(
    symbol: &str,
    basic: &BasicInfo,
    data: &FinancialData,
    thresholds: &FunnelThresholds,
) -> Gate<()> {
    let mut unmet = Vec::new();

    if data.revenue_growth_pct <= thresholds.min_revenue_growth_pct {
        unmet.push(format!(
            "revenue growth {:.1}% <= {}%",
            data.revenue_growth_pct, thresholds.min_revenue_growth_pct
        ));
    }
    if data.earnings_growth_pct <= thresholds.min_earnings_growth_pct {
        unmet.push(format!(
            "EPS growth {:.1}% <= {}%",
            data.earnings_growth_pct, thresholds.min_earnings_growth_pct
        ));
    }
    if !data.fcf_positive {
        unmet.push("free cash flow negative".to_string());
    }
    if !data.fcf_growing {
        unmet.push("free cash flow not growing".to_string());
    }

    if unmet.is_empty() {
        return ControlFlow::Continue(());
    }

    ControlFlow::Break(
        StrategyResult::new(
            symbol,
            Action::Hold,
            CONFIDENCE_THREE_CARDS_FAIL,
            format!("Failed three cards check: {}", unmet.join(", ")),
        )
        .with_detail("price", basic.price)
        .with_detail("revenue_growth", data.revenue_growth_pct)
        .with_detail("earnings_growth", data.earnings_growth_pct)
        .with_detail("fcf_positive", data.fcf_positive)
        .with_detail("fcf_growing", data.fcf_growing),
    )
}

/// Gate 4: enough history for SMA50 / SMA200 / RSI14.
pub fn technical_data_gate(
    symbol: &str,
    basic: &BasicInfo,
    bars: Option<&[Bar]>,
    thresholds: &FunnelThresholds,
) -> Gate<TechnicalIndicators> {
    let hold = |reason: String| {
        ControlFlow::Break(
            StrategyResult::new(symbol, Action::Hold, CONFIDENCE_NO_TECHNICALS, reason)
                .with_detail("price", basic.price),
        )
    };

    let Some(bars) = bars else {
        return hold("Fundamentals pass, but price history is unavailable".to_string());
    };

    match indicator_snapshot(bars, thresholds.min_history_sessions) {
        Ok(indicators) => ControlFlow::Continue(indicators),
        Err(e) => hold(format!("Fundamentals pass, but technical indicators are unavailable: {}", e)),
    }
}

/// Trend and entry-timing facts for gate 5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingCheck {
    /// Price above the 200-day average.
    pub trend_pass: bool,
    /// Price within the band around the 50-day average and RSI in range.
    pub timing_pass: bool,
    pub rsi: f64,
    pub sma50_distance_pct: f64,
}

pub fn check_timing(indicators: &TechnicalIndicators, thresholds: &FunnelThresholds) -> TimingCheck {
    let price = indicators.price;
    let lower = (1.0 - thresholds.sma50_tolerance) * indicators.sma50;
    let upper = (1.0 + thresholds.sma50_tolerance) * indicators.sma50;

    let in_band = lower <= price && price <= upper;
    let rsi_ok = thresholds.rsi_low <= indicators.rsi14 && indicators.rsi14 <= thresholds.rsi_high;

    TimingCheck {
        trend_pass: price > indicators.sma200,
        timing_pass: in_band && rsi_ok,
        rsi: indicators.rsi14,
        sma50_distance_pct: indicators.sma50_distance_pct(),
    }
}

/// Gate 5: the final verdict for a symbol that cleared every other gate.
pub fn timing_verdict(
    symbol: &str,
    basic: &BasicInfo,
    indicators: &TechnicalIndicators,
    thresholds: &FunnelThresholds,
) -> StrategyResult {
    let timing = check_timing(indicators, thresholds);

    let result = match (timing.trend_pass, timing.timing_pass) {
        (true, true) => StrategyResult::new(
            symbol,
            Action::Buy,
            CONFIDENCE_BUY,
            format!(
                "Strong buy: RSI {:.1}, {:+.1}% from 50-day SMA, above 200-day SMA. \
                 Three cards pass and the pullback sits in the buy zone.",
                timing.rsi, timing.sma50_distance_pct
            ),
        )
        .with_detail("sma50_distance", timing.sma50_distance_pct),
        (false, _) => StrategyResult::new(
            symbol,
            Action::Sell,
            CONFIDENCE_TREND_BROKEN,
            format!(
                "Defensive sell: trend broken (below 200-day SMA). RSI {:.1}",
                timing.rsi
            ),
        ),
        (true, false) => StrategyResult::new(
            symbol,
            Action::Hold,
            CONFIDENCE_WAIT_FOR_ENTRY,
            format!(
                "Hold: fundamentals are strong but this is not an entry point. \
                 RSI {:.1} (target {}-{}), {:+.1}% from 50-day SMA.",
                timing.rsi, thresholds.rsi_low, thresholds.rsi_high, timing.sma50_distance_pct
            ),
        ),
    };

    result
        .with_detail("price", basic.price)
        .with_detail("rsi", timing.rsi)
        .with_detail("sma50", indicators.sma50)
        .with_detail("sma200", indicators.sma200)
}
