//! Reward ledger: impact certificates (compressed NFTs) and SOL transfers.
//!
//! Keys and transaction signing live behind an HTTP relay; this side only
//! describes what to mint, update or pay.

use super::{blocking_client, send_json, ServiceError, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const SERVICE: &str = "ledger";

pub const CERTIFICATE_NAME: &str = "Marine Debris Impact";
pub const STATUS_COLLECTED: &str = "Collected";
pub const STATUS_RECYCLED: &str = "Recycled";

pub trait RewardLedger: Send + Sync {
    /// Mint a certificate to `owner`, returning its asset id
    fn mint_certificate(&self, owner: &str, metadata: &CertificateMetadata) -> Result<String, ServiceError>;

    /// Replace a certificate's metadata, returning the transaction signature
    fn update_certificate(&self, asset_id: &str, metadata: &CertificateMetadata) -> Result<String, ServiceError>;

    /// Pay `lamports` to `recipient` with a memo, returning the transaction signature
    fn transfer(&self, recipient: &str, lamports: u64, memo: &str) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateAttribute {
    pub trait_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateMetadata {
    pub name: String,
    pub description: String,
    pub attributes: Vec<CertificateAttribute>,
}

impl CertificateMetadata {
    /// Metadata for a collection event
    pub fn for_collection(weight_kg: f64, country: &str, multiplier: f64, reward_sol: f64) -> Self {
        Self {
            name: CERTIFICATE_NAME.to_string(),
            description: format!("{:.2} kg of marine debris collected in {}", weight_kg, country),
            attributes: vec![
                attribute("Mass", format!("{:.2} kg", weight_kg)),
                attribute("Country", country.to_string()),
                attribute("Multiplier", format!("{:.2}x", multiplier)),
                attribute("Reward", format!("{:.6} SOL", reward_sol)),
                attribute("Status", STATUS_COLLECTED.to_string()),
            ],
        }
    }

    /// Same certificate with its status attribute replaced
    pub fn with_status(mut self, status: &str) -> Self {
        match self.attributes.iter_mut().find(|a| a.trait_type == "Status") {
            Some(attr) => attr.value = status.to_string(),
            None => self.attributes.push(attribute("Status", status.to_string())),
        }
        self
    }

    /// Minimal metadata marking a certificate recycled when the original is unknown
    pub fn recycled(asset_id: &str) -> Self {
        Self {
            name: CERTIFICATE_NAME.to_string(),
            description: format!("Certificate {} confirmed recycled", asset_id),
            attributes: vec![attribute("Status", STATUS_RECYCLED.to_string())],
        }
    }
}

fn attribute(trait_type: &str, value: String) -> CertificateAttribute {
    CertificateAttribute {
        trait_type: trait_type.to_string(),
        value,
    }
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    asset_id: Option<String>,
    signature: Option<String>,
    error: Option<String>,
}

impl RelayResponse {
    fn into_field(self, pick: fn(RelayResponse) -> Option<String>, name: &str) -> Result<String, ServiceError> {
        if let Some(error) = self.error.clone() {
            return Err(ServiceError::Malformed {
                service: SERVICE,
                message: format!("relay error: {}", error),
            });
        }
        pick(self).ok_or_else(|| ServiceError::Malformed {
            service: SERVICE,
            message: format!("response has no {}", name),
        })
    }
}

/// JSON client for the signing relay
#[derive(Debug, Clone)]
pub struct HttpLedger {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpLedger {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str, body: serde_json::Value) -> Result<RelayResponse, ServiceError> {
        if self.base_url.is_empty() {
            return Err(ServiceError::NotConfigured {
                service: SERVICE,
                message: "missing relay URL".to_string(),
            });
        }

        let client = blocking_client(SERVICE, self.timeout)?;
        let mut request = client.post(self.url(path)).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        send_json(SERVICE, request)
    }
}

impl RewardLedger for HttpLedger {
    fn mint_certificate(&self, owner: &str, metadata: &CertificateMetadata) -> Result<String, ServiceError> {
        let response = self.post("certificates", json!({ "owner": owner, "metadata": metadata }))?;
        let asset_id = response.into_field(|r| r.asset_id, "asset_id")?;
        tracing::info!("Minted certificate {} for {}", asset_id, owner);
        Ok(asset_id)
    }

    fn update_certificate(&self, asset_id: &str, metadata: &CertificateMetadata) -> Result<String, ServiceError> {
        let response = self.post(&format!("certificates/{}", asset_id), json!({ "metadata": metadata }))?;
        response.into_field(|r| r.signature, "signature")
    }

    fn transfer(&self, recipient: &str, lamports: u64, memo: &str) -> Result<String, ServiceError> {
        let response = self.post(
            "transfers",
            json!({ "recipient": recipient, "lamports": lamports, "memo": memo }),
        )?;
        let signature = response.into_field(|r| r.signature, "signature")?;
        tracing::info!("Transferred {} lamports to {} ({})", lamports, recipient, signature);
        Ok(signature)
    }
}
