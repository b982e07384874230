use rayon::prelude::*;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::{FactorConfig, FactorSpec};
use crate::error::ScoringError;
use crate::record::StockRecord;

/// A record with its per-factor scores and weighted total.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredStock {
    pub record: StockRecord,
    /// Unweighted normalised score per configured factor.
    pub scores: BTreeMap<String, f64>,
    pub total_score: f64,
}

impl ScoredStock {
    pub fn symbol(&self) -> &str {
        &self.record.symbol
    }

    /// The `{factor}_score` value, if `factor` was configured.
    pub fn score(&self, factor: &str) -> Option<f64> {
        self.scores.get(factor).copied()
    }

    /// Raw keys that would shadow a computed column.
    fn is_computed_column(&self, key: &str) -> bool {
        key == "symbol"
            || key == "total_score"
            || key
                .strip_suffix("_score")
                .is_some_and(|factor| self.scores.contains_key(factor))
    }
}

// Flat row: raw factors, then `{factor}_score` columns, then `total_score`.
// A raw factor named like a computed column is left out.
impl Serialize for ScoredStock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw: Vec<_> = self
            .record
            .factors
            .iter()
            .filter(|(key, _)| !self.is_computed_column(key))
            .collect();
        let mut map = serializer.serialize_map(Some(2 + raw.len() + self.scores.len()))?;
        map.serialize_entry("symbol", &self.record.symbol)?;
        for (factor, value) in raw {
            map.serialize_entry(factor, value)?;
        }
        for (factor, score) in &self.scores {
            map.serialize_entry(&format!("{}_score", factor), score)?;
        }
        map.serialize_entry("total_score", &self.total_score)?;
        map.end()
    }
}

/// Highest total first; NaN totals sink to the bottom.
fn by_total_desc(a: &ScoredStock, b: &ScoredStock) -> Ordering {
    b.total_score
        .partial_cmp(&a.total_score)
        .unwrap_or_else(|| a.total_score.is_nan().cmp(&b.total_score.is_nan()))
}

/// Score and rank a batch.
///
/// Each factor column is normalised against the whole batch, so a record's
/// score depends on its peers. `total_score` is
/// `Σ(score × weight) / Σ(weight)`. Ties keep input order.
pub fn score_batch(records: &[StockRecord], config: &FactorConfig) -> Result<Vec<ScoredStock>, ScoringError> {
    config.validate()?;

    let factors: Vec<(&String, &FactorSpec)> = config.iter().collect();
    let columns: Vec<Vec<f64>> = factors
        .par_iter()
        .map(|(name, spec)| {
            let raw: Vec<f64> = records.iter().map(|r| r.value(name)).collect();
            spec.normalize(&raw)
        })
        .collect();

    let total_weight = config.total_weight();

    let mut scored: Vec<ScoredStock> = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let mut scores = BTreeMap::new();
            let mut weighted = 0.0;
            for ((name, spec), column) in factors.iter().zip(&columns) {
                scores.insert((*name).clone(), column[i]);
                weighted += column[i] * spec.weight;
            }
            ScoredStock {
                record: record.clone(),
                scores,
                total_score: weighted / total_weight,
            }
        })
        .collect();

    scored.sort_by(by_total_desc);

    tracing::debug!(records = scored.len(), factors = factors.len(), "scored batch");
    Ok(scored)
}

/// Keep the `n` best-ranked entries.
pub fn top_n(mut scored: Vec<ScoredStock>, n: usize) -> Vec<ScoredStock> {
    scored.truncate(n);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_stock_batch() -> Vec<StockRecord> {
        vec![
            StockRecord::new("A").with("pe", 10.0).with("revenue_growth", 30.0),
            StockRecord::new("B").with("pe", 50.0).with("revenue_growth", 5.0),
        ]
    }

    fn two_factor_config() -> FactorConfig {
        FactorConfig::new()
            .with_factor("pe", FactorSpec::quantile(1.0, 2).reversed())
            .unwrap()
            .with_factor("revenue_growth", FactorSpec::zscore(1.0))
            .unwrap()
    }

    #[test]
    fn test_cheap_fast_grower_ranks_first() {
        let ranked = score_batch(&two_stock_batch(), &two_factor_config()).unwrap();

        assert_eq!(ranked[0].symbol(), "A");
        assert_eq!(ranked[0].score("pe"), Some(1.0));
        assert_eq!(ranked[1].score("pe"), Some(0.0));
        assert!(ranked[0].score("revenue_growth").unwrap() > 0.5);
        assert!(ranked[1].score("revenue_growth").unwrap() < 0.5);
        assert!(ranked[0].total_score > ranked[1].total_score);
    }

    #[test]
    fn test_total_is_weighted_mean() {
        let records = vec![
            StockRecord::new("A").with("pe", 12.0).with("roe", 0.25).with("beta", 1.4),
            StockRecord::new("B").with("pe", 30.0).with("roe", 0.10).with("beta", 0.8),
            StockRecord::new("C").with("pe", 18.0).with("roe", 0.18).with("beta", 1.1),
            StockRecord::new("D").with("pe", 9.0).with("roe", 0.02).with("beta", 2.0),
        ];
        let config = FactorConfig::new()
            .with_factor("pe", FactorSpec::quantile(3.0, 4).reversed())
            .unwrap()
            .with_factor("roe", FactorSpec::zscore(2.0))
            .unwrap()
            .with_factor("beta", FactorSpec::quantile(0.5, 3).reversed())
            .unwrap();

        for stock in score_batch(&records, &config).unwrap() {
            let expected = (stock.score("pe").unwrap() * 3.0
                + stock.score("roe").unwrap() * 2.0
                + stock.score("beta").unwrap() * 0.5)
                / 5.5;
            assert_relative_eq!(stock.total_score, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_configuration_order_does_not_matter() {
        let forward = FactorConfig::from_json(
            r#"{"pe": {"method": "quantile", "q": 2, "reverse": true}, "revenue_growth": {"method": "zscore"}}"#,
        )
        .unwrap();
        let backward = FactorConfig::from_json(
            r#"{"revenue_growth": {"method": "zscore"}, "pe": {"method": "quantile", "q": 2, "reverse": true}}"#,
        )
        .unwrap();

        let a = score_batch(&two_stock_batch(), &forward).unwrap();
        let b = score_batch(&two_stock_batch(), &backward).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![
            StockRecord::new("X").with("roe", 0.1),
            StockRecord::new("Y").with("roe", 0.1),
            StockRecord::new("Z").with("roe", 0.1),
        ];
        let config = FactorConfig::new().with_factor("roe", FactorSpec::zscore(1.0)).unwrap();
        let ranked = score_batch(&records, &config).unwrap();

        let symbols: Vec<_> = ranked.iter().map(|s| s.symbol()).collect();
        assert_eq!(symbols, vec!["X", "Y", "Z"]);
        assert!(ranked.iter().all(|s| (s.total_score - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_missing_factor_reads_as_zero() {
        let records = vec![
            StockRecord::new("A").with("dividend_yield", 0.03),
            StockRecord::new("B"),
        ];
        let config = FactorConfig::new().with_factor("dividend_yield", FactorSpec::zscore(1.0)).unwrap();
        let ranked = score_batch(&records, &config).unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].symbol(), "A");
        assert_eq!(ranked[1].symbol(), "B");
    }

    #[test]
    fn test_reverse_zscore_prefers_low_values() {
        let records = vec![
            StockRecord::new("VOLATILE").with("beta", 2.1),
            StockRecord::new("STEADY").with("beta", 0.6),
        ];
        let config = FactorConfig::new().with_factor("beta", FactorSpec::zscore(1.0).reversed()).unwrap();
        let ranked = score_batch(&records, &config).unwrap();
        assert_eq!(ranked[0].symbol(), "STEADY");
    }

    #[test]
    fn test_empty_config_is_rejected() {
        let err = score_batch(&two_stock_batch(), &FactorConfig::new()).unwrap_err();
        assert_eq!(err, ScoringError::EmptyConfiguration);
    }

    #[test]
    fn test_empty_batch() {
        assert!(score_batch(&[], &two_factor_config()).unwrap().is_empty());
    }

    #[test]
    fn test_serializes_flat_row() {
        let ranked = score_batch(&two_stock_batch(), &two_factor_config()).unwrap();
        let row = serde_json::to_value(&ranked[0]).unwrap();

        assert_eq!(row["symbol"], "A");
        assert_eq!(row["pe"], 10.0);
        assert_eq!(row["pe_score"], 1.0);
        assert!(row["revenue_growth_score"].as_f64().unwrap() > 0.5);
        assert!(row["total_score"].is_number());
    }

    #[test]
    fn test_raw_column_named_like_score_is_dropped() {
        let records = vec![
            StockRecord::new("A").with("pe", 10.0).with("pe_score", 42.0).with("total_score", 7.0),
            StockRecord::new("B").with("pe", 50.0),
        ];
        let config = FactorConfig::new()
            .with_factor("pe", FactorSpec::quantile(1.0, 2).reversed())
            .unwrap();
        let ranked = score_batch(&records, &config).unwrap();

        let json = serde_json::to_string(&ranked[0]).unwrap();
        assert_eq!(json.matches("\"pe_score\"").count(), 1);
        assert_eq!(json.matches("\"total_score\"").count(), 1);

        let row: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(row["pe_score"], 1.0);
        assert_eq!(row["total_score"], 1.0);
    }

    #[test]
    fn test_top_n() {
        let ranked = score_batch(&two_stock_batch(), &two_factor_config()).unwrap();
        let top = top_n(ranked, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].symbol(), "A");
    }
}
