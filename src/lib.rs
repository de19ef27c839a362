//! Debris Reward Engine
//!
//! Country-adjusted rewards for collected marine debris.
//!
//! Module layout:
//! - `data`: Indicator table loading with Polars
//! - `utils/`: Normalization against reference ranges, column projection helpers
//! - `engine`: `SustainabilityEngine`, the reward multiplier scorer
//! - `weight_analysis`: Parsing of vision model weight estimates
//! - `reward`: SOL / lamport reward quotes
//! - `scan_state`: Single-slot store for the latest scan
//! - `services/`: Blocking clients for the vision model, geolocation and ledger relay
//! - `api_server`: Axum REST API (feature `api`)

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod reward;
pub mod scan_state;
pub mod services;
pub mod utils;
pub mod weight_analysis;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use config::AppConfig;
pub use data::{IndicatorColumns, IndicatorTable, SustainabilityRecord};
pub use engine::{Breakdown, SustainabilityEngine, NEUTRAL_MULTIPLIER};
pub use error::{ComputationError, DataLoadError};
pub use reward::{RewardPolicy, RewardQuote};
pub use scan_state::{LastScanStore, ScanResult};
pub use utils::{ReferenceRange, ReferenceRanges};
pub use weight_analysis::{parse_weight_analysis, DebrisItem, WeightAnalysis};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
