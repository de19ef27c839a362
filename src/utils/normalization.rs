//! Normalization Utilities
//!
//! Rescales raw indicator values onto [0, 1] using either dataset-derived
//! min/max bounds or a fixed saturation constant.

use serde::Serialize;

/// Saturation constant for natural resource depletion (% of GNI)
pub const RESOURCE_SATURATION: f64 = 30.0;

/// Saturation constant for poverty rate (% of population)
pub const POVERTY_SATURATION: f64 = 50.0;

/// Saturation constant for renewable energy share (% of final consumption)
pub const RENEWABLE_SATURATION: f64 = 100.0;

/// Normalization bounds for a single indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReferenceRange {
    /// Min and max observed across every row of the dataset
    Derived { min: f64, max: f64 },
    /// Value beyond which the indicator counts as maximally extreme
    Saturation { cap: f64 },
}

impl ReferenceRange {
    /// Derive min/max from raw values, skipping missing and non-finite entries.
    ///
    /// An empty input yields the degenerate range `[0, 0]`.
    pub fn derive<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for v in values.into_iter().flatten().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
        }

        if min > max {
            return ReferenceRange::Derived { min: 0.0, max: 0.0 };
        }

        ReferenceRange::Derived { min, max }
    }

    pub fn saturation(cap: f64) -> Self {
        ReferenceRange::Saturation { cap }
    }

    /// True when the range cannot separate values (derived min == max)
    pub fn is_degenerate(&self) -> bool {
        match *self {
            ReferenceRange::Derived { min, max } => !(max - min > 0.0),
            ReferenceRange::Saturation { cap } => !(cap > 0.0),
        }
    }

    /// Map a raw value onto [0, 1].
    ///
    /// A degenerate range normalizes everything to 0.
    pub fn normalize(&self, raw: f64) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }

        let scaled = match *self {
            ReferenceRange::Derived { min, max } => (raw - min) / (max - min),
            ReferenceRange::Saturation { cap } => raw / cap,
        };

        clamp01(scaled)
    }

    /// `1 - normalize(raw)`, for indicators where lower raw values earn more
    pub fn normalize_inverted(&self, raw: f64) -> f64 {
        1.0 - self.normalize(raw)
    }
}

/// Reference ranges for the five indicators
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceRanges {
    pub co2: ReferenceRange,
    pub gdp: ReferenceRange,
    pub resource: ReferenceRange,
    pub poverty: ReferenceRange,
    pub renewable: ReferenceRange,
}

impl ReferenceRanges {
    /// Derived CO2 / GDP bounds plus the fixed saturation constants
    pub fn new(co2: ReferenceRange, gdp: ReferenceRange) -> Self {
        Self {
            co2,
            gdp,
            resource: ReferenceRange::saturation(RESOURCE_SATURATION),
            poverty: ReferenceRange::saturation(POVERTY_SATURATION),
            renewable: ReferenceRange::saturation(RENEWABLE_SATURATION),
        }
    }
}

/// Clamp into [0, 1]. NaN maps to 0.
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Round to two decimal places, exact halves to even (1.125 → 1.12)
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}
