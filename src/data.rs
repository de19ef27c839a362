//! Data Loading
//!
//! Reads the country-year sustainability table with Polars and turns it into
//! typed records, preserving source row order.

use crate::error::DataLoadError;
use crate::utils::lazy_helpers::{materialize_with_columns, ColumnSpec};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

const CONTEXT: &str = "sustainability dataset";

pub const COL_COUNTRY: &str = "Country Code";
pub const COL_YEAR: &str = "Year";
pub const COL_CO2: &str = "Adjusted savings: carbon dioxide damage (% of GNI) - NY.ADJ.DCO2.GN.ZS";
pub const COL_GDP: &str = "GDP per capita (current US$) - NY.GDP.PCAP.CD";
pub const COL_RES: &str = "Adjusted savings: natural resources depletion (% of GNI) - NY.ADJ.DRES.GN.ZS";
pub const COL_POV: &str = "Proportion of population below international poverty line (%) - SI_POV_DAY1 - 1.1.1";
pub const COL_REN: &str = "Renewable energy consumption (% of total final energy consumption) - EG.FEC.RNEW.ZS";

/// Source header for each required column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorColumns {
    pub country: String,
    pub year: String,
    pub co2: String,
    pub gdp: String,
    pub resource: String,
    pub poverty: String,
    pub renewable: String,
}

impl Default for IndicatorColumns {
    fn default() -> Self {
        Self {
            country: COL_COUNTRY.to_string(),
            year: COL_YEAR.to_string(),
            co2: COL_CO2.to_string(),
            gdp: COL_GDP.to_string(),
            resource: COL_RES.to_string(),
            poverty: COL_POV.to_string(),
            renewable: COL_REN.to_string(),
        }
    }
}

/// One row: a country's indicators for one year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SustainabilityRecord {
    pub country_code: String,
    pub year: i64,
    /// CO2 damage, % of GNI
    pub co2_damage: Option<f64>,
    /// GDP per capita, current US$
    pub gdp_per_capita: Option<f64>,
    /// Natural resource depletion, % of GNI
    pub resource_depletion: Option<f64>,
    /// Population below the international poverty line, %
    pub poverty_rate: Option<f64>,
    /// Renewable share of final energy consumption, %
    pub renewable_share: Option<f64>,
}

/// Read a delimited file with a header row
pub fn read_csv(path: &Path) -> Result<DataFrame, DataLoadError> {
    // Surface a missing file as an IO error rather than an opaque parse failure
    std::fs::metadata(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    Ok(df)
}

/// Typed records plus the CO2 / GDP values of every row.
///
/// Rows skipped for a missing country code or year still contribute their
/// indicator values to the derived reference ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorTable {
    pub records: Vec<SustainabilityRecord>,
    pub co2_values: Vec<Option<f64>>,
    pub gdp_values: Vec<Option<f64>>,
}

/// Convert a raw table, skipping rows without a country code or year.
///
/// A non-empty table must yield at least one usable row, and a year column
/// with values must parse as integers.
pub fn table_from_dataframe(df: &DataFrame, columns: &IndicatorColumns) -> Result<IndicatorTable, DataLoadError> {
    let projected = materialize_with_columns(
        df,
        &[
            ColumnSpec::new(&columns.country, "country", DataType::String),
            ColumnSpec::new(&columns.year, "year", DataType::Int64),
            ColumnSpec::new(&columns.co2, "co2", DataType::Float64),
            ColumnSpec::new(&columns.gdp, "gdp", DataType::Float64),
            ColumnSpec::new(&columns.resource, "res", DataType::Float64),
            ColumnSpec::new(&columns.poverty, "pov", DataType::Float64),
            ColumnSpec::new(&columns.renewable, "ren", DataType::Float64),
        ],
        CONTEXT,
    )?;

    let country = string_column(&projected, "country")?;
    let year = int_column(&projected, "year")?;
    let co2 = float_column(&projected, "co2")?;
    let gdp = float_column(&projected, "gdp")?;
    let res = float_column(&projected, "res")?;
    let pov = float_column(&projected, "pov")?;
    let ren = float_column(&projected, "ren")?;

    let height = projected.height();

    // Non-strict casts null out unparseable cells; a year column that loses every value is mistyped
    let raw_year = df.column(&columns.year)?;
    let raw_years = raw_year.len() - raw_year.null_count();
    if raw_years > 0 && year.null_count() == height {
        return Err(invalid_type(&columns.year, "an integer column"));
    }

    let mut records = Vec::with_capacity(height);
    let mut skipped = 0usize;

    for idx in 0..height {
        let (Some(code), Some(yr)) = (country.get(idx), year.get(idx)) else {
            skipped += 1;
            continue;
        };

        let code = code.trim();
        if code.is_empty() {
            skipped += 1;
            continue;
        }

        records.push(SustainabilityRecord {
            country_code: code.to_string(),
            year: yr,
            co2_damage: finite(co2.get(idx)),
            gdp_per_capita: finite(gdp.get(idx)),
            resource_depletion: finite(res.get(idx)),
            poverty_rate: finite(pov.get(idx)),
            renewable_share: finite(ren.get(idx)),
        });
    }

    if height > 0 && records.is_empty() {
        return Err(DataLoadError::NoUsableRows {
            context: CONTEXT.to_string(),
            rows: height,
        });
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} rows without a country code or year", skipped);
    }

    Ok(IndicatorTable {
        records,
        co2_values: co2.into_iter().map(finite).collect(),
        gdp_values: gdp.into_iter().map(finite).collect(),
    })
}

/// Read and convert in one step
pub fn load_table(path: &Path, columns: &IndicatorColumns) -> Result<IndicatorTable, DataLoadError> {
    let df = read_csv(path)?;
    tracing::debug!("Read {} rows x {} columns from {:?}", df.height(), df.width(), path);
    table_from_dataframe(&df, columns)
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn string_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked, DataLoadError> {
    df.column(name)?
        .str()
        .map_err(|_| invalid_type(name, "a string column"))
}

fn int_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Int64Chunked, DataLoadError> {
    df.column(name)?
        .i64()
        .map_err(|_| invalid_type(name, "an integer column"))
}

fn float_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Float64Chunked, DataLoadError> {
    df.column(name)?
        .f64()
        .map_err(|_| invalid_type(name, "a float column"))
}

fn invalid_type(column: &str, expected: &'static str) -> DataLoadError {
    DataLoadError::InvalidColumnType {
        context: CONTEXT.to_string(),
        column: column.to_string(),
        expected,
    }
}
