//! LazyFrame materialization helpers with column validation
//!
//! Source tables carry long, human-readable headers. These helpers check the
//! required headers up front and project them onto short, typed aliases so a
//! missing column is reported by name instead of surfacing as a Polars error.

use crate::error::DataLoadError;
use polars::prelude::*;
use std::collections::HashSet;

/// One projected column: source header, output alias, target dtype
#[derive(Debug, Clone)]
pub struct ColumnSpec<'a> {
    pub source: &'a str,
    pub alias: &'a str,
    pub dtype: DataType,
}

impl<'a> ColumnSpec<'a> {
    pub fn new(source: &'a str, alias: &'a str, dtype: DataType) -> Self {
        Self { source, alias, dtype }
    }
}

/// Fail with `MissingColumn` for the first required header not in `df`
pub fn require_columns(df: &DataFrame, columns: &[&str], context: &str) -> Result<(), DataLoadError> {
    let actual: HashSet<&str> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.as_str())
        .collect();

    for &expected in columns {
        if !actual.contains(expected) {
            return Err(DataLoadError::MissingColumn {
                context: context.to_string(),
                column: expected.to_string(),
            });
        }
    }

    Ok(())
}

/// Materialize exactly the given columns, renamed and cast.
///
/// Casts are non-strict: unparseable cells become nulls.
///
/// # Example
/// ```rust,ignore
/// let df = materialize_with_columns(
///     &raw,
///     &[ColumnSpec::new("Country Code", "country", DataType::String)],
///     "indicators",
/// )?;
/// ```
pub fn materialize_with_columns(
    df: &DataFrame,
    columns: &[ColumnSpec<'_>],
    context: &str,
) -> Result<DataFrame, DataLoadError> {
    let sources: Vec<&str> = columns.iter().map(|c| c.source).collect();
    require_columns(df, &sources, context)?;

    let exprs: Vec<Expr> = columns
        .iter()
        .map(|c| col(c.source).cast(c.dtype.clone()).alias(c.alias))
        .collect();

    let projected = df.clone().lazy().select(exprs).collect()?;

    Ok(projected)
}
