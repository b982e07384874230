use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Invalid configuration for factor '{factor}': {reason}")]
    InvalidConfiguration { factor: String, reason: String },

    #[error("Invalid configuration: no factors configured")]
    EmptyConfiguration,

    #[error("Malformed factor configuration: {0}")]
    Parse(String),

    #[error("Failed to read factor config {path}: {reason}")]
    Io { path: String, reason: String },
}

impl ScoringError {
    pub(crate) fn invalid(factor: &str, reason: impl Into<String>) -> Self {
        ScoringError::InvalidConfiguration {
            factor: factor.to_string(),
            reason: reason.into(),
        }
    }
}
