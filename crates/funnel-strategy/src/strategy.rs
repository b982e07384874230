use analysis_core::{Action, FundamentalsProvider, PriceHistoryProvider, StrategyResult};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::gates::{
    basic_info_gate, financial_data_gate, technical_data_gate, three_cards_gate, timing_verdict,
};
use crate::thresholds::FunnelThresholds;

/// Symbols analysed at once during a scan.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Results returned by a scan.
pub const SCAN_RESULT_LIMIT: usize = 5;

/// Summary of a universe scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub results: Vec<StrategyResult>,
    pub total_scanned: usize,
    pub buy_signals: usize,
    /// No buy signals were found; `results` holds the first analysed symbols.
    pub fallback: bool,
}

/// Runs symbols through the funnel against pluggable data providers.
#[derive(Clone)]
pub struct FunnelStrategy {
    fundamentals: Arc<dyn FundamentalsProvider>,
    prices: Arc<dyn PriceHistoryProvider>,
    thresholds: FunnelThresholds,
    concurrency: usize,
}

impl FunnelStrategy {
    pub fn new(fundamentals: Arc<dyn FundamentalsProvider>, prices: Arc<dyn PriceHistoryProvider>) -> Self {
        Self {
            fundamentals,
            prices,
            thresholds: FunnelThresholds::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_thresholds(mut self, thresholds: FunnelThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn thresholds(&self) -> &FunnelThresholds {
        &self.thresholds
    }

    /// Analyse one symbol. Never fails: missing data becomes a `skip` or
    /// `hold` verdict.
    pub async fn analyze_single(&self, symbol: &str) -> StrategyResult {
        let symbol = symbol.trim().to_uppercase();
        let result = match self.evaluate(&symbol).await {
            ControlFlow::Break(result) | ControlFlow::Continue(result) => result,
        };
        tracing::debug!(symbol = %symbol, action = %result.action, "{}", result.reason);
        result
    }

    /// Data is fetched lazily, so a symbol rejected early costs no further
    /// provider calls.
    async fn evaluate(&self, symbol: &str) -> ControlFlow<StrategyResult, StrategyResult> {
        let t = &self.thresholds;

        let record = self.fundamentals.fundamentals(symbol).await;
        let basic = basic_info_gate(symbol, record.as_ref(), t)?;

        let quarters = self.fundamentals.quarterly_financials(symbol).await;
        let financial = financial_data_gate(symbol, &basic, quarters.as_deref())?;

        three_cards_gate(symbol, &basic, &financial, t)?;

        let bars = self
            .prices
            .price_history(symbol, Duration::days(t.history_lookback_days))
            .await;
        let indicators = technical_data_gate(symbol, &basic, bars.as_deref(), t)?;

        ControlFlow::Continue(timing_verdict(symbol, &basic, &indicators, t))
    }

    /// Analyse every symbol concurrently. Results keep the input order.
    pub async fn analyze_all(&self, symbols: &[String]) -> Vec<StrategyResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (index, symbol) in symbols.iter().enumerate() {
            let strategy = self.clone();
            let symbol = symbol.clone();
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, strategy.analyze_single(&symbol).await)
            });
        }

        let mut slots: Vec<Option<StrategyResult>> = vec![None; symbols.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!("Funnel analysis task failed: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(symbols)
            .map(|(slot, symbol)| {
                slot.unwrap_or_else(|| {
                    StrategyResult::skip(&symbol.trim().to_uppercase(), "analysis task failed")
                })
            })
            .collect()
    }

    /// Analyse a universe and return the best buy signals, or the first few
    /// results when nothing qualifies.
    pub async fn scan_all(&self, symbols: &[String]) -> Vec<StrategyResult> {
        self.scan_report(symbols).await.results
    }

    pub async fn scan_report(&self, symbols: &[String]) -> ScanReport {
        tracing::info!("Running funnel over {} symbols", symbols.len());

        let analysed = self.analyze_all(symbols).await;
        let total_scanned = analysed.len();
        let buy_signals = analysed.iter().filter(|r| r.action == Action::Buy).count();
        let results = select_top(analysed, SCAN_RESULT_LIMIT);

        tracing::info!(
            "Funnel scan complete: {} scanned, {} buy signals",
            total_scanned,
            buy_signals
        );

        ScanReport {
            results,
            total_scanned,
            buy_signals,
            fallback: buy_signals == 0,
        }
    }
}

/// Buy verdicts by descending confidence (ties keep input order), capped at
/// `limit`. Without any buys, the first `limit` results as analysed.
pub fn select_top(results: Vec<StrategyResult>, limit: usize) -> Vec<StrategyResult> {
    let mut buys: Vec<StrategyResult> = results
        .iter()
        .filter(|r| r.action == Action::Buy)
        .cloned()
        .collect();

    if buys.is_empty() {
        return results.into_iter().take(limit).collect();
    }

    buys.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    buys.truncate(limit);
    buys
}
