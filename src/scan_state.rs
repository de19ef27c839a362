//! Latest scan result, shared between the detection and recycling endpoints.
//!
//! A single slot with last-write-wins semantics. Owned by the app state
//! rather than a process global.

use crate::engine::Breakdown;
use crate::weight_analysis::DebrisItem;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

/// Outcome of one successful detection run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    /// Country code the multiplier was computed for
    pub location: String,
    /// Estimated weight in kg
    pub weight: f64,
    pub multiplier: f64,
    pub breakdown: Breakdown,
    pub reward_sol: f64,
    pub lamports: u64,
    /// Minted certificate, if a reward was due
    pub nft_address: Option<String>,
    pub collector_wallet: String,
    pub items: Vec<DebrisItem>,
}

#[derive(Debug, Default)]
pub struct LastScanStore {
    slot: Mutex<Option<ScanResult>>,
}

impl LastScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored scan
    pub fn record(&self, scan: ScanResult) {
        *self.lock() = Some(scan);
    }

    pub fn latest(&self) -> Option<ScanResult> {
        self.lock().clone()
    }

    /// Remove and return the stored scan if it minted `asset_id`
    pub fn take_certificate(&self, asset_id: &str) -> Option<ScanResult> {
        let mut slot = self.lock();
        match slot.as_ref() {
            Some(scan) if scan.nft_address.as_deref() == Some(asset_id) => slot.take(),
            _ => None,
        }
    }

    // Poisoned locks are recovered; the slot only ever holds whole values
    fn lock(&self) -> MutexGuard<'_, Option<ScanResult>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
