use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Snapshot directory not found: {}", .0.display())]
    MissingSnapshot(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
