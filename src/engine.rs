//! Sustainability Engine - reward multiplier scoring
//!
//! Maps a country's latest sustainability indicators onto a reward
//! multiplier in [0.5, 3.0]:
//!
//! 1. Normalize five indicators onto [0, 1]
//!    - CO2 damage: dataset min/max (higher damage → higher reward)
//!    - GDP per capita: dataset min/max, INVERTED (poorer → higher reward)
//!    - Resource depletion: |value| / 30, clamped
//!    - Poverty rate: value / 50, clamped; missing → 10
//!    - Renewable share: value / 100, clamped, INVERTED
//! 2. Weighted composite score (weights sum to 1.0)
//! 3. Linear map: multiplier = 0.5 + score × 2.5, rounded to 2 decimals
//!
//! State is loaded once and never mutated, so one engine can be shared
//! across request handlers behind an `Arc`.

use crate::data::{load_table, table_from_dataframe, IndicatorColumns, IndicatorTable, SustainabilityRecord};
use crate::error::{ComputationError, DataLoadError};
use crate::utils::normalization::{clamp01, round2, ReferenceRange, ReferenceRanges};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::Path;

/// Normalized components plus the composite score, keyed by name
pub type Breakdown = BTreeMap<String, f64>;

/// Multiplier for countries without data
pub const NEUTRAL_MULTIPLIER: f64 = 1.0;

/// Poverty rate assumed when a country's latest record has none (%)
pub const DEFAULT_POVERTY_RATE: f64 = 10.0;

pub const MIN_MULTIPLIER: f64 = 0.5;
pub const MAX_MULTIPLIER: f64 = 3.0;

/// Component weights (sum to 1.0)
pub const WEIGHT_CO2: f64 = 0.25;
pub const WEIGHT_GDP: f64 = 0.20;
pub const WEIGHT_RES: f64 = 0.20;
pub const WEIGHT_POV: f64 = 0.15;
pub const WEIGHT_REN: f64 = 0.20;

// Breakdown keys
pub const KEY_CO2: &str = "co2";
pub const KEY_GDP_INV: &str = "gdp_inv";
pub const KEY_RES: &str = "res";
pub const KEY_POVERTY: &str = "poverty";
pub const KEY_REN_INV: &str = "ren_inv";
pub const KEY_SCORE: &str = "score";

/// Normalized indicator values for one country, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedIndicators {
    pub co2: f64,
    pub gdp_inv: f64,
    pub res: f64,
    pub poverty: f64,
    pub ren_inv: f64,
}

impl NormalizedIndicators {
    /// Weighted composite, clamped to [0, 1] against float drift in the weight sum
    pub fn score(&self) -> f64 {
        clamp01(
            self.co2 * WEIGHT_CO2
                + self.gdp_inv * WEIGHT_GDP
                + self.res * WEIGHT_RES
                + self.poverty * WEIGHT_POV
                + self.ren_inv * WEIGHT_REN,
        )
    }

    fn into_breakdown(self, score: f64) -> Breakdown {
        let mut breakdown = Breakdown::new();
        breakdown.insert(KEY_CO2.to_string(), self.co2);
        breakdown.insert(KEY_GDP_INV.to_string(), self.gdp_inv);
        breakdown.insert(KEY_RES.to_string(), self.res);
        breakdown.insert(KEY_POVERTY.to_string(), self.poverty);
        breakdown.insert(KEY_REN_INV.to_string(), self.ren_inv);
        breakdown.insert(KEY_SCORE.to_string(), score);
        breakdown
    }
}

/// Map a composite score in [0, 1] onto [0.5, 3.0], rounded to 2 decimals
pub fn score_to_multiplier(score: f64) -> f64 {
    round2(MIN_MULTIPLIER + clamp01(score) * (MAX_MULTIPLIER - MIN_MULTIPLIER))
}

/// Reward multiplier scorer over a country-year indicator table
#[derive(Debug, Clone)]
pub struct SustainabilityEngine {
    latest_by_country: FxHashMap<String, SustainabilityRecord>,
    ranges: ReferenceRanges,
    row_count: usize,
}

impl SustainabilityEngine {
    /// Load from a CSV file with the default World Bank headers
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DataLoadError> {
        Self::from_csv_with_columns(path, &IndicatorColumns::default())
    }

    pub fn from_csv_with_columns(
        path: impl AsRef<Path>,
        columns: &IndicatorColumns,
    ) -> Result<Self, DataLoadError> {
        let path = path.as_ref();
        tracing::info!("Loading sustainability dataset from {:?}", path);
        let table = load_table(path, columns)?;
        Ok(Self::from_table(table))
    }

    pub fn from_dataframe(df: &DataFrame, columns: &IndicatorColumns) -> Result<Self, DataLoadError> {
        let table = table_from_dataframe(df, columns)?;
        Ok(Self::from_table(table))
    }

    /// Build from a loaded table; ranges span every row, skipped ones included
    pub fn from_table(table: IndicatorTable) -> Self {
        let co2 = ReferenceRange::derive(table.co2_values);
        let gdp = ReferenceRange::derive(table.gdp_values);
        Self::build(table.records, co2, gdp)
    }

    /// Build from records in source order.
    ///
    /// For each country the row with the highest year wins; on equal years
    /// the later row wins.
    pub fn from_records(records: Vec<SustainabilityRecord>) -> Self {
        let co2 = ReferenceRange::derive(records.iter().map(|r| r.co2_damage));
        let gdp = ReferenceRange::derive(records.iter().map(|r| r.gdp_per_capita));
        Self::build(records, co2, gdp)
    }

    fn build(records: Vec<SustainabilityRecord>, co2: ReferenceRange, gdp: ReferenceRange) -> Self {
        let ranges = ReferenceRanges::new(co2, gdp);

        if co2.is_degenerate() {
            tracing::warn!("CO2 damage range is degenerate ({:?}); component will normalize to 0", co2);
        }
        if gdp.is_degenerate() {
            tracing::warn!("GDP per capita range is degenerate ({:?}); component will normalize to 0", gdp);
        }

        let row_count = records.len();
        let mut latest_by_country: FxHashMap<String, SustainabilityRecord> = FxHashMap::default();

        for record in records {
            let replace = latest_by_country
                .get(&record.country_code)
                .map_or(true, |current| record.year >= current.year);

            if replace {
                latest_by_country.insert(record.country_code.clone(), record);
            }
        }

        tracing::info!(
            "Sustainability engine ready: {} rows, {} countries",
            row_count,
            latest_by_country.len()
        );

        Self {
            latest_by_country,
            ranges,
            row_count,
        }
    }

    /// Multiplier and breakdown for a country.
    ///
    /// Unknown countries get `(1.0, {})`.
    pub fn get_multiplier(&self, country_code: &str) -> Result<(f64, Breakdown), ComputationError> {
        let Some(record) = self.latest_by_country.get(country_code) else {
            tracing::debug!("No sustainability data for '{}', using neutral multiplier", country_code);
            return Ok((NEUTRAL_MULTIPLIER, Breakdown::new()));
        };

        let normalized = self.normalize(record)?;
        let score = normalized.score();
        let multiplier = score_to_multiplier(score);

        Ok((multiplier, normalized.into_breakdown(score)))
    }

    /// Normalize a record's indicators against this engine's reference ranges
    pub fn normalize(&self, record: &SustainabilityRecord) -> Result<NormalizedIndicators, ComputationError> {
        let require = |value: Option<f64>, indicator: &'static str| {
            value.ok_or_else(|| ComputationError::MissingIndicator {
                country: record.country_code.clone(),
                indicator,
            })
        };

        let co2 = require(record.co2_damage, "CO2 damage")?;
        let gdp = require(record.gdp_per_capita, "GDP per capita")?;
        let res = require(record.resource_depletion, "resource depletion")?;
        let ren = require(record.renewable_share, "renewable energy share")?;
        let pov = record.poverty_rate.unwrap_or(DEFAULT_POVERTY_RATE);

        Ok(NormalizedIndicators {
            co2: self.ranges.co2.normalize(co2),
            gdp_inv: self.ranges.gdp.normalize_inverted(gdp),
            res: self.ranges.resource.normalize(res.abs()),
            poverty: self.ranges.poverty.normalize(pov),
            ren_inv: self.ranges.renewable.normalize_inverted(ren),
        })
    }

    /// Batch lookup, evaluated in parallel; output order matches input order
    pub fn multipliers_for(
        &self,
        country_codes: &[String],
    ) -> Vec<(String, Result<(f64, Breakdown), ComputationError>)> {
        country_codes
            .par_iter()
            .map(|code| (code.clone(), self.get_multiplier(code)))
            .collect()
    }

    pub fn latest_record(&self, country_code: &str) -> Option<&SustainabilityRecord> {
        self.latest_by_country.get(country_code)
    }

    pub fn contains(&self, country_code: &str) -> bool {
        self.latest_by_country.contains_key(country_code)
    }

    /// Known country codes, sorted
    pub fn countries(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.latest_by_country.keys().map(|s| s.as_str()).collect();
        codes.sort_unstable();
        codes
    }

    pub fn reference_ranges(&self) -> &ReferenceRanges {
        &self.ranges
    }

    /// Rows the engine was built from
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn len(&self) -> usize {
        self.latest_by_country.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest_by_country.is_empty()
    }
}
