use analysis_core::{Bar, Financials, FundamentalsProvider, FundamentalsRecord, PriceHistoryProvider};
use async_trait::async_trait;
use chrono::Duration;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::MarketDataError;
use crate::trim_to_lookback;

pub const FUNDAMENTALS_FILE: &str = "fundamentals.json";
pub const FINANCIALS_DIR: &str = "financials";
pub const BARS_DIR: &str = "bars";

/// Provider over a snapshot directory:
///
/// ```text
/// <dir>/fundamentals.json        array of fundamentals records
/// <dir>/financials/<SYMBOL>.json quarterly statements, newest first
/// <dir>/bars/<SYMBOL>.json       daily bars
/// ```
///
/// Fundamentals are loaded up front; statements and bars are read on demand.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    fundamentals: HashMap<String, FundamentalsRecord>,
    order: Vec<String>,
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, MarketDataError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(MarketDataError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| MarketDataError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

impl SnapshotStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, MarketDataError> {
        let dir = dir.into();
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(MarketDataError::MissingSnapshot(dir));
        }

        let path = dir.join(FUNDAMENTALS_FILE);
        let records: Vec<FundamentalsRecord> = read_json(&path).await?.unwrap_or_default();

        let mut fundamentals = HashMap::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());
        for mut record in records {
            record.symbol = record.symbol.trim().to_uppercase();
            if record.symbol.is_empty() {
                continue;
            }
            if !fundamentals.contains_key(&record.symbol) {
                order.push(record.symbol.clone());
            }
            fundamentals.insert(record.symbol.clone(), record);
        }

        tracing::info!("Loaded {} fundamentals records from {}", order.len(), dir.display());
        Ok(Self { dir, fundamentals, order })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Symbols in the order they appear in `fundamentals.json`.
    pub fn symbols(&self) -> &[String] {
        &self.order
    }

    pub fn records(&self) -> Vec<FundamentalsRecord> {
        self.order
            .iter()
            .filter_map(|s| self.fundamentals.get(s).cloned())
            .collect()
    }

    fn symbol_file(&self, subdir: &str, symbol: &str) -> PathBuf {
        self.dir
            .join(subdir)
            .join(format!("{}.json", symbol.trim().to_uppercase()))
    }

    pub async fn load_financials(&self, symbol: &str) -> Result<Option<Vec<Financials>>, MarketDataError> {
        read_json(&self.symbol_file(FINANCIALS_DIR, symbol)).await
    }

    /// Bars sorted oldest first.
    pub async fn load_bars(&self, symbol: &str) -> Result<Option<Vec<Bar>>, MarketDataError> {
        let bars: Option<Vec<Bar>> = read_json(&self.symbol_file(BARS_DIR, symbol)).await?;
        Ok(bars.map(|mut bars| {
            bars.sort_by_key(|b| b.timestamp);
            bars
        }))
    }
}

#[async_trait]
impl FundamentalsProvider for SnapshotStore {
    async fn fundamentals(&self, symbol: &str) -> Option<FundamentalsRecord> {
        self.fundamentals.get(&symbol.trim().to_uppercase()).cloned()
    }

    async fn quarterly_financials(&self, symbol: &str) -> Option<Vec<Financials>> {
        match self.load_financials(symbol).await {
            Ok(quarters) => quarters.filter(|q| !q.is_empty()),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }
}

#[async_trait]
impl PriceHistoryProvider for SnapshotStore {
    async fn price_history(&self, symbol: &str, lookback: Duration) -> Option<Vec<Bar>> {
        let bars = match self.load_bars(symbol).await {
            Ok(bars) => bars?,
            Err(e) => {
                tracing::warn!("{}", e);
                return None;
            }
        };
        let trimmed = trim_to_lookback(&bars, lookback);
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}
