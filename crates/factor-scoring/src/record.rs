use analysis_core::FundamentalsRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Factors a record must carry to be ranked at all.
pub const REQUIRED_FACTORS: &[&str] = &["pe", "revenue_growth"];

/// Raw factor values for one symbol.
///
/// Serialised flat (`{"symbol": "AAPL", "pe": 28.1, ...}`). On input, nulls
/// and non-numeric fields such as `sector` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct StockRecord {
    pub symbol: String,
    #[serde(flatten)]
    pub factors: BTreeMap<String, f64>,
}

impl StockRecord {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), factors: BTreeMap::new() }
    }

    pub fn with(mut self, factor: &str, value: f64) -> Self {
        self.factors.insert(factor.to_string(), value);
        self
    }

    /// Value of `factor`; absent factors read as 0.
    pub fn value(&self, factor: &str) -> f64 {
        self.factors.get(factor).copied().unwrap_or(0.0)
    }

    pub fn has(&self, factor: &str) -> bool {
        self.factors.get(factor).is_some_and(|v| v.is_finite())
    }

    pub fn from_fundamentals(record: &FundamentalsRecord) -> Self {
        Self {
            symbol: record.symbol.clone(),
            factors: record
                .factor_values()
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

impl TryFrom<Map<String, Value>> for StockRecord {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let symbol = match map.remove("symbol") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => return Err("stock record needs a non-empty string 'symbol'".to_string()),
        };
        let factors = map
            .into_iter()
            .filter_map(|(name, value)| value.as_f64().map(|v| (name, v)))
            .collect();
        Ok(Self { symbol, factors })
    }
}

/// Clean a universe before scoring.
///
/// Drops records lacking a finite value for any of `required`; every other
/// non-finite value is reset to 0.
pub fn prepare_records(records: Vec<StockRecord>, required: &[&str]) -> Vec<StockRecord> {
    let total = records.len();
    let kept: Vec<StockRecord> = records
        .into_iter()
        .filter(|record| {
            let complete = required.iter().all(|f| record.has(f));
            if !complete {
                tracing::debug!(symbol = %record.symbol, "dropping record missing required factors");
            }
            complete
        })
        .map(|mut record| {
            for value in record.factors.values_mut() {
                if !value.is_finite() {
                    *value = 0.0;
                }
            }
            record
        })
        .collect();

    if kept.len() < total {
        tracing::info!("{} of {} records kept for scoring", kept.len(), total);
    }
    kept
}
