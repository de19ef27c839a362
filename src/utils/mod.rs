//! Utility modules for multiplier scoring
//!
//! - Normalization: reference ranges and [0, 1] rescaling
//! - LazyFrame helpers: column projection with validation

pub mod lazy_helpers;
pub mod normalization;

// Re-export commonly used types
pub use lazy_helpers::{materialize_with_columns, require_columns, ColumnSpec};
pub use normalization::{clamp01, round2, ReferenceRange, ReferenceRanges};
