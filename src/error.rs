//! Error types for ledger loading and input parsing
//!
//! The solvers themselves never fail; only the I/O-facing layers do.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV decode error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported ledger format: {} (expected .csv or .json)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("invalid as-of date: {0:?}")]
    InvalidAsOfDate(String),

    #[error("duplicate mark for position {0:?}")]
    DuplicateMark(String),
}

pub type Result<T> = std::result::Result<T, Error>;
