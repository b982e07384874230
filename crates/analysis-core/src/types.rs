use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Point-in-time fundamentals snapshot for one symbol.
///
/// Growth, margin and return fields are fractions as reported by the data
/// vendor (0.25 = 25%). Every numeric field is optional because vendors
/// routinely omit some of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalsRecord {
    pub symbol: String,
    #[serde(default)]
    pub pe: Option<f64>,
    #[serde(default)]
    pub peg: Option<f64>,
    #[serde(default)]
    pub revenue_growth: Option<f64>,
    #[serde(default)]
    pub profit_margin: Option<f64>,
    #[serde(default)]
    pub roe: Option<f64>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
}

impl FundamentalsRecord {
    /// Numeric factor fields by name, skipping the ones the vendor omitted.
    pub fn factor_values(&self) -> Vec<(&'static str, f64)> {
        [
            ("pe", self.pe),
            ("peg", self.peg),
            ("revenue_growth", self.revenue_growth),
            ("profit_margin", self.profit_margin),
            ("roe", self.roe),
            ("dividend_yield", self.dividend_yield),
            ("beta", self.beta),
            ("price", self.price),
            ("market_cap", self.market_cap),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

/// One quarter of company financials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Financials {
    pub symbol: String,
    pub fiscal_period: String,
    pub fiscal_year: i32,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub net_income: Option<f64>,
    #[serde(default)]
    pub eps: Option<f64>,
    #[serde(default)]
    pub cash_flow_operating: Option<f64>,
    #[serde(default)]
    pub capital_expenditure: Option<f64>,
    /// Vendor-reported free cash flow; derived from operating cash flow and
    /// capex when absent.
    #[serde(default)]
    pub free_cash_flow: Option<f64>,
}

impl Financials {
    /// Free cash flow for the quarter. Capex may be reported with either sign.
    pub fn fcf(&self) -> Option<f64> {
        self.free_cash_flow.or_else(|| {
            let ocf = self.cash_flow_operating?;
            let capex = self.capital_expenditure?;
            Some(ocf - capex.abs())
        })
    }

    /// Earnings for growth purposes: net income, falling back to EPS.
    pub fn earnings(&self) -> Option<f64> {
        self.net_income.or(self.eps)
    }
}

/// Growth and cash-flow facts derived from quarterly statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialData {
    pub revenue_growth_pct: f64,
    pub earnings_growth_pct: f64,
    /// Most recent quarters first.
    pub free_cash_flow: Vec<f64>,
    pub fcf_positive: bool,
    pub fcf_growing: bool,
}

/// Indicator snapshot at the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalIndicators {
    pub price: f64,
    pub sma50: f64,
    pub sma200: f64,
    pub rsi14: f64,
}

impl TechnicalIndicators {
    pub fn is_valid(&self) -> bool {
        [self.price, self.sma50, self.sma200, self.rsi14]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Distance of price from the 50-day average, in percent.
    pub fn sma50_distance_pct(&self) -> f64 {
        (self.price / self.sma50 - 1.0) * 100.0
    }
}

/// Funnel verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
    Skip,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::Hold => "hold",
            Action::Skip => "skip",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of analysing one symbol through the funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub symbol: String,
    pub action: Action,
    pub confidence: f64, // 0.0 to 1.0
    pub reason: String,
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl StrategyResult {
    pub fn new(symbol: &str, action: Action, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            action,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            details: serde_json::Map::new(),
        }
    }

    pub fn skip(symbol: &str, reason: impl Into<String>) -> Self {
        Self::new(symbol, Action::Skip, 0.0, reason)
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}
