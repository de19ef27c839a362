//! Server configuration from environment variables

use crate::reward::{RewardPolicy, DEFAULT_MIN_LAMPORTS, DEFAULT_SOL_PER_KG};
use crate::services::geo::{DEFAULT_GEO_FIELD, DEFAULT_GEO_URL};
use crate::services::vision::DEFAULT_GEMINI_MODEL;
use std::path::PathBuf;

pub const DEFAULT_DATA_PATH: &str = "data/sustainability_indicators.csv";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_COUNTRY: &str = "IDN";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub port: u16,
    pub policy: RewardPolicy,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub geo_url: String,
    pub geo_field: String,
    pub ledger_url: String,
    pub ledger_api_key: Option<String>,
    /// Used when geolocation fails and the request names no country
    pub default_country: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            port: DEFAULT_PORT,
            policy: RewardPolicy::default(),
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            geo_url: DEFAULT_GEO_URL.to_string(),
            geo_field: DEFAULT_GEO_FIELD.to_string(),
            ledger_url: String::new(),
            ledger_api_key: None,
            default_country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; unset or unparseable values keep defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            data_path: get("DATA_PATH").map(PathBuf::from).unwrap_or(defaults.data_path),
            port: get("PORT").and_then(|p| p.parse().ok()).unwrap_or(defaults.port),
            policy: RewardPolicy {
                sol_per_kg: get("SOL_PER_KG")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SOL_PER_KG),
                min_lamports: get("MIN_LAMPORTS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MIN_LAMPORTS),
            },
            gemini_api_key: get("GEMINI_API_KEY").unwrap_or(defaults.gemini_api_key),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            geo_url: get("GEO_URL").unwrap_or(defaults.geo_url),
            geo_field: get("GEO_FIELD").unwrap_or(defaults.geo_field),
            ledger_url: get("LEDGER_URL").unwrap_or(defaults.ledger_url),
            ledger_api_key: get("LEDGER_API_KEY"),
            default_country: get("DEFAULT_COUNTRY")
                .map(|c| c.trim().to_ascii_uppercase())
                .unwrap_or(defaults.default_country),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.policy, RewardPolicy::default());
        assert_eq!(config.default_country, "IDN");
        assert!(config.ledger_api_key.is_none());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let env: HashMap<&str, &str> = [
            ("PORT", "not-a-port"),
            ("SOL_PER_KG", "0.05"),
            ("DATA_PATH", "/srv/wdi.csv"),
            ("DEFAULT_COUNTRY", "phl"),
            ("LEDGER_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.policy.sol_per_kg, 0.05);
        assert_eq!(config.data_path, PathBuf::from("/srv/wdi.csv"));
        assert_eq!(config.default_country, "PHL");
        assert!(config.ledger_api_key.is_none());
    }
}
