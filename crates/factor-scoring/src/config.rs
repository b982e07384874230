use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ScoringError;
use crate::normalize::{normalize_quantile, normalize_zscore};

pub const DEFAULT_QUANTILE_BUCKETS: usize = 5;

/// How a factor column is turned into comparable scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Logistic of the batch z-score, in (0, 1).
    Zscore,
    /// Equal-frequency buckets over the batch ranks, in [0, 1].
    Quantile { buckets: usize },
}

/// Validated settings for one factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "FactorSpecInput")]
pub struct FactorSpec {
    pub normalization: Normalization,
    pub weight: f64,
    /// Lower raw values score higher (valuation multiples, volatility).
    pub reverse: bool,
}

impl FactorSpec {
    pub fn zscore(weight: f64) -> Self {
        Self { normalization: Normalization::Zscore, weight, reverse: false }
    }

    pub fn quantile(weight: f64, buckets: usize) -> Self {
        Self { normalization: Normalization::Quantile { buckets }, weight, reverse: false }
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    fn validate(&self, factor: &str) -> Result<(), ScoringError> {
        if factor.trim().is_empty() {
            return Err(ScoringError::invalid(factor, "factor name is empty"));
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(ScoringError::invalid(
                factor,
                format!("weight must be a positive number, got {}", self.weight),
            ));
        }
        if let Normalization::Quantile { buckets } = self.normalization {
            if buckets < 2 {
                return Err(ScoringError::invalid(
                    factor,
                    format!("quantile bucket count must be at least 2, got {}", buckets),
                ));
            }
        }
        Ok(())
    }

    /// Normalise one factor column. Scores depend on the whole column.
    pub fn normalize(&self, values: &[f64]) -> Vec<f64> {
        match self.normalization {
            Normalization::Zscore => {
                let scores = normalize_zscore(values);
                if self.reverse {
                    scores.into_iter().map(|s| 1.0 - s).collect()
                } else {
                    scores
                }
            }
            Normalization::Quantile { buckets } => normalize_quantile(values, buckets, self.reverse),
        }
    }

    fn from_input(factor: &str, input: FactorSpecInput) -> Result<Self, ScoringError> {
        let normalization = match input.method.trim().to_ascii_lowercase().as_str() {
            "zscore" | "z_score" => Normalization::Zscore,
            "quantile" => Normalization::Quantile {
                buckets: input
                    .buckets
                    .or_else(|| input.kwargs.as_ref().and_then(|k| k.q))
                    .unwrap_or(DEFAULT_QUANTILE_BUCKETS),
            },
            other => {
                return Err(ScoringError::invalid(
                    factor,
                    format!("unknown normalization method '{}' (expected 'zscore' or 'quantile')", other),
                ))
            }
        };

        let spec = Self { normalization, weight: input.weight, reverse: input.reverse };
        spec.validate(factor)?;
        Ok(spec)
    }
}

/// Wire form of a factor entry, as written in JSON config files and requests.
///
/// ```json
/// { "pe": { "method": "quantile", "weight": 0.15, "reverse": true, "q": 5 } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorSpecInput {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default, alias = "q", skip_serializing_if = "Option::is_none")]
    pub buckets: Option<usize>,
    /// Legacy nesting: `"kwargs": { "q": 5 }`.
    #[serde(default, skip_serializing)]
    pub kwargs: Option<QuantileKwargs>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuantileKwargs {
    #[serde(default)]
    pub q: Option<usize>,
}

fn default_method() -> String {
    "zscore".to_string()
}

fn default_weight() -> f64 {
    1.0
}

impl From<FactorSpec> for FactorSpecInput {
    fn from(spec: FactorSpec) -> Self {
        let (method, buckets) = match spec.normalization {
            Normalization::Zscore => ("zscore", None),
            Normalization::Quantile { buckets } => ("quantile", Some(buckets)),
        };
        Self {
            method: method.to_string(),
            weight: spec.weight,
            reverse: spec.reverse,
            buckets,
            kwargs: None,
        }
    }
}

/// Factor name → scoring settings.
///
/// Weights need not sum to one; the engine divides by their total. Entries
/// are kept sorted by name so a batch scores identically however the
/// configuration was written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, FactorSpecInput>")]
pub struct FactorConfig {
    #[serde(flatten)]
    factors: BTreeMap<String, FactorSpec>,
}

impl FactorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seven-factor blend used for the fundamentals dashboard: cheap, low-beta
    /// names with strong growth, margins and returns float to the top.
    pub fn fundamental_default() -> Self {
        let factors = BTreeMap::from([
            ("pe".to_string(), FactorSpec::quantile(0.15, 5).reversed()),
            ("peg".to_string(), FactorSpec::quantile(0.15, 5).reversed()),
            ("revenue_growth".to_string(), FactorSpec::zscore(0.2)),
            ("profit_margin".to_string(), FactorSpec::zscore(0.15)),
            ("roe".to_string(), FactorSpec::zscore(0.1)),
            ("dividend_yield".to_string(), FactorSpec::zscore(0.1)),
            ("beta".to_string(), FactorSpec::quantile(0.15, 5).reversed()),
        ]);
        Self { factors }
    }

    /// Parse and validate a JSON factor map.
    pub fn from_json(json: &str) -> Result<Self, ScoringError> {
        let raw: BTreeMap<String, FactorSpecInput> =
            serde_json::from_str(json).map_err(|e| ScoringError::Parse(e.to_string()))?;
        Self::try_from(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScoringError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ScoringError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&raw)
    }

    /// The file at `path` when one is given, otherwise [`fundamental_default`](Self::fundamental_default).
    pub fn load(path: Option<&Path>) -> Result<Self, ScoringError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::fundamental_default()),
        }
    }

    pub fn insert(&mut self, factor: impl Into<String>, spec: FactorSpec) -> Result<(), ScoringError> {
        let factor = factor.into();
        spec.validate(&factor)?;
        self.factors.insert(factor, spec);
        Ok(())
    }

    pub fn with_factor(mut self, factor: impl Into<String>, spec: FactorSpec) -> Result<Self, ScoringError> {
        self.insert(factor, spec)?;
        Ok(self)
    }

    pub fn get(&self, factor: &str) -> Option<&FactorSpec> {
        self.factors.get(factor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FactorSpec)> {
        self.factors.iter()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.factors.values().map(|s| s.weight).sum()
    }

    /// Check every entry; fails on the first bad factor.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.factors.is_empty() {
            return Err(ScoringError::EmptyConfiguration);
        }
        self.factors.iter().try_for_each(|(name, spec)| spec.validate(name))
    }
}

impl TryFrom<BTreeMap<String, FactorSpecInput>> for FactorConfig {
    type Error = ScoringError;

    fn try_from(raw: BTreeMap<String, FactorSpecInput>) -> Result<Self, Self::Error> {
        let factors = raw
            .into_iter()
            .map(|(name, input)| FactorSpec::from_input(&name, input).map(|spec| (name, spec)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        let config = Self { factors };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_and_flat_quantile_forms() {
        let config = FactorConfig::from_json(
            r#"{
                "pe": {"method": "quantile", "weight": 0.15, "reverse": true, "kwargs": {"q": 4}},
                "beta": {"method": "quantile", "weight": 0.15, "reverse": true, "q": 3},
                "peg": {"method": "quantile"},
                "roe": {"weight": 0.1}
            }"#,
        )
        .unwrap();

        assert_eq!(config.get("pe").unwrap().normalization, Normalization::Quantile { buckets: 4 });
        assert_eq!(config.get("beta").unwrap().normalization, Normalization::Quantile { buckets: 3 });
        assert_eq!(
            config.get("peg").unwrap().normalization,
            Normalization::Quantile { buckets: DEFAULT_QUANTILE_BUCKETS }
        );
        let roe = config.get("roe").unwrap();
        assert_eq!(roe.normalization, Normalization::Zscore);
        assert!(!roe.reverse);
    }

    #[test]
    fn test_unknown_method_names_factor() {
        let err = FactorConfig::from_json(r#"{"pe": {"method": "minmax"}}"#).unwrap_err();
        match err {
            ScoringError::InvalidConfiguration { factor, reason } => {
                assert_eq!(factor, "pe");
                assert!(reason.contains("minmax"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_weights_and_buckets() {
        assert!(matches!(
            FactorConfig::from_json(r#"{"pe": {"weight": 0}}"#),
            Err(ScoringError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            FactorConfig::from_json(r#"{"pe": {"weight": -1.0}}"#),
            Err(ScoringError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            FactorConfig::from_json(r#"{"pe": {"method": "quantile", "q": 1}}"#),
            Err(ScoringError::InvalidConfiguration { .. })
        ));
        assert!(FactorConfig::new().with_factor("", FactorSpec::zscore(1.0)).is_err());
    }

    #[test]
    fn test_empty_and_malformed() {
        assert_eq!(FactorConfig::from_json("{}").unwrap_err(), ScoringError::EmptyConfiguration);
        assert!(matches!(FactorConfig::from_json("[1, 2]"), Err(ScoringError::Parse(_))));
    }

    #[test]
    fn test_default_config_round_trips_through_json() {
        let config = FactorConfig::fundamental_default();
        assert_eq!(config.len(), 7);
        assert!((config.total_weight() - 1.0).abs() < 1e-9);

        let json = serde_json::to_string(&config).unwrap();
        let parsed = FactorConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_deserialize_inside_request_body() {
        #[derive(Deserialize)]
        struct Body {
            factors: FactorConfig,
        }
        let body: Body = serde_json::from_str(r#"{"factors": {"pe": {"method": "zscore"}}}"#).unwrap();
        assert_eq!(body.factors.len(), 1);

        let bad = serde_json::from_str::<Body>(r#"{"factors": {"pe": {"method": "rank"}}}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_load_from_file_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factors.json");
        std::fs::write(&path, r#"{"pe": {"method": "quantile", "kwargs": {"q": 4}, "reverse": true}}"#).unwrap();

        let config = FactorConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(FactorConfig::load(None).unwrap(), FactorConfig::fundamental_default());

        let missing = FactorConfig::from_path(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ScoringError::Io { .. }));

        std::fs::write(&path, "{}").unwrap();
        assert_eq!(FactorConfig::from_path(&path).unwrap_err(), ScoringError::EmptyConfiguration);
    }
}
