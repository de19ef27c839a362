//! Error types for dataset loading and multiplier computation

use std::path::PathBuf;
use thiserror::Error;

/// Construction-time failure. The engine is never handed out half-built.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to read dataset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset: {0}")]
    Parse(#[from] polars::prelude::PolarsError),

    #[error("{context}: missing required column '{column}'")]
    MissingColumn { context: String, column: String },

    #[error("{context}: column '{column}' is not {expected}")]
    InvalidColumnType {
        context: String,
        column: String,
        expected: &'static str,
    },

    #[error("{context}: none of {rows} rows has a country code and year")]
    NoUsableRows { context: String, rows: usize },
}

/// Per-query failure for a known country
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("country '{country}' has no {indicator} value in its latest record")]
    MissingIndicator {
        country: String,
        indicator: &'static str,
    },
}
