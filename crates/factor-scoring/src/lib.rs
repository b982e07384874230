//! Multi-factor stock scoring.
//!
//! Each configured factor is normalised across the whole batch (z-score
//! through a logistic curve, or equal-frequency quantile buckets), then the
//! per-factor scores are combined into a weighted mean and the batch is
//! ranked by it.

pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod record;

pub use config::{FactorConfig, FactorSpec, FactorSpecInput, Normalization};
pub use engine::{score_batch, top_n, ScoredStock};
pub use error::ScoringError;
pub use normalize::{normalize_quantile, normalize_zscore};
pub use record::{prepare_records, StockRecord, REQUIRED_FACTORS};
