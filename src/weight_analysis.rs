//! Weight Analysis
//!
//! The vision model is asked for a bare JSON object, but in practice it often
//! wraps the answer in a markdown code fence. Parsing tolerates that and
//! validates the weights.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Instruction sent with the annotated frame
pub const WEIGHT_PROMPT: &str = r#"Identify the marine debris in this image (already boxed by the detector).
Estimate the weight of each item in Kilograms (kg).
Return ONLY a JSON object like this:
{"items": [{"label": "plastic", "weight": 0.5}], "total_weight": 0.5}"#;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("vision model returned no JSON object")]
    Empty,

    #[error("vision model output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid weight {value} for '{label}'")]
    InvalidWeight { label: String, value: f64 },
}

/// One debris item as labelled by the vision model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebrisItem {
    #[serde(default)]
    pub label: String,
    /// Estimated weight in kg
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightAnalysis {
    #[serde(default)]
    pub items: Vec<DebrisItem>,
    /// Total estimated weight in kg
    #[serde(default)]
    pub total_weight: f64,
}

impl WeightAnalysis {
    pub fn items_weight(&self) -> f64 {
        self.items.iter().map(|i| i.weight).sum()
    }
}

/// Parse the vision model's text reply into a validated analysis.
///
/// A zero `total_weight` with non-empty items falls back to the items' sum.
pub fn parse_weight_analysis(text: &str) -> Result<WeightAnalysis, AnalysisError> {
    let cleaned = strip_code_fence(text);
    if cleaned.is_empty() {
        return Err(AnalysisError::Empty);
    }

    let mut analysis: WeightAnalysis = serde_json::from_str(cleaned)?;

    for item in &analysis.items {
        check_weight(&item.label, item.weight)?;
    }
    check_weight("total_weight", analysis.total_weight)?;

    if analysis.total_weight == 0.0 && !analysis.items.is_empty() {
        analysis.total_weight = analysis.items_weight();
    }

    Ok(analysis)
}

fn check_weight(label: &str, value: f64) -> Result<(), AnalysisError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalysisError::InvalidWeight {
            label: label.to_string(),
            value,
        });
    }
    Ok(())
}

/// Drop ```json / ``` fences and surrounding whitespace
fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}
