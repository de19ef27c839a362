//! Reward quotes: collected kg × base rate × country multiplier, in SOL and lamports

use serde::{Deserialize, Serialize};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Base reward per kg of collected debris, in SOL
pub const DEFAULT_SOL_PER_KG: f64 = 0.01;

/// Smallest transfer the ledger accepts
pub const DEFAULT_MIN_LAMPORTS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardPolicy {
    pub sol_per_kg: f64,
    pub min_lamports: u64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            sol_per_kg: DEFAULT_SOL_PER_KG,
            min_lamports: DEFAULT_MIN_LAMPORTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RewardQuote {
    pub total_kg: f64,
    pub multiplier: f64,
    pub base_sol: f64,
    pub reward_sol: f64,
    /// 0 means no transfer is due
    pub lamports: u64,
}

impl RewardQuote {
    pub fn is_payable(&self) -> bool {
        self.lamports > 0
    }
}

impl RewardPolicy {
    /// Quote a reward. Negative or non-finite weights count as zero.
    pub fn quote(&self, total_kg: f64, multiplier: f64) -> RewardQuote {
        let total_kg = if total_kg.is_finite() { total_kg.max(0.0) } else { 0.0 };
        let base_sol = total_kg * self.sol_per_kg;
        let reward_sol = base_sol * multiplier;

        RewardQuote {
            total_kg,
            multiplier,
            base_sol,
            reward_sol,
            lamports: self.lamports_for(reward_sol),
        }
    }

    /// SOL → lamports, floored, raised to the ledger minimum when positive
    pub fn lamports_for(&self, sol: f64) -> u64 {
        if !sol.is_finite() || sol <= 0.0 {
            return 0;
        }
        let lamports = (sol * LAMPORTS_PER_SOL as f64).floor() as u64;
        lamports.max(self.min_lamports)
    }
}

/// Memo attached to the reward transfer after a recycler confirms a certificate
pub fn transfer_memo(certificate_id: &str, amount_sol: f64) -> String {
    format!(
        "Marine debris recycled | certificate {} | reward {:.4} SOL",
        certificate_id, amount_sol
    )
}
