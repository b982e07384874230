use analysis_core::{Bar, Financials, FundamentalsProvider, FundamentalsRecord, PriceHistoryProvider};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;

use crate::trim_to_lookback;

/// Hash-map backed provider. Symbols are stored upper-cased.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketData {
    fundamentals: HashMap<String, FundamentalsRecord>,
    financials: HashMap<String, Vec<Financials>>,
    bars: HashMap<String, Vec<Bar>>,
    order: Vec<String>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_fundamentals(&mut self, record: FundamentalsRecord) {
        let symbol = record.symbol.to_uppercase();
        if !self.fundamentals.contains_key(&symbol) {
            self.order.push(symbol.clone());
        }
        self.fundamentals.insert(symbol, record);
    }

    /// Quarters newest first.
    pub fn insert_financials(&mut self, symbol: &str, quarters: Vec<Financials>) {
        self.financials.insert(symbol.to_uppercase(), quarters);
    }

    /// Bars in any order; stored oldest first.
    pub fn insert_bars(&mut self, symbol: &str, mut bars: Vec<Bar>) {
        bars.sort_by_key(|b| b.timestamp);
        self.bars.insert(symbol.to_uppercase(), bars);
    }

    pub fn with_fundamentals(mut self, record: FundamentalsRecord) -> Self {
        self.insert_fundamentals(record);
        self
    }

    pub fn with_financials(mut self, symbol: &str, quarters: Vec<Financials>) -> Self {
        self.insert_financials(symbol, quarters);
        self
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.insert_bars(symbol, bars);
        self
    }

    /// Symbols with a fundamentals record, in insertion order.
    pub fn symbols(&self) -> &[String] {
        &self.order
    }

    /// All fundamentals records, in insertion order.
    pub fn records(&self) -> Vec<FundamentalsRecord> {
        self.order
            .iter()
            .filter_map(|s| self.fundamentals.get(s).cloned())
            .collect()
    }
}

#[async_trait]
impl FundamentalsProvider for InMemoryMarketData {
    async fn fundamentals(&self, symbol: &str) -> Option<FundamentalsRecord> {
        self.fundamentals.get(&symbol.to_uppercase()).cloned()
    }

    async fn quarterly_financials(&self, symbol: &str) -> Option<Vec<Financials>> {
        self.financials
            .get(&symbol.to_uppercase())
            .filter(|q| !q.is_empty())
            .cloned()
    }
}

#[async_trait]
impl PriceHistoryProvider for InMemoryMarketData {
    async fn price_history(&self, symbol: &str, lookback: Duration) -> Option<Vec<Bar>> {
        let bars = self.bars.get(&symbol.to_uppercase())?;
        let trimmed = trim_to_lookback(bars, lookback);
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}
