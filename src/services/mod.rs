//! External collaborators
//!
//! The vision model, geolocation lookup and reward ledger are black boxes
//! behind small synchronous traits. The bundled implementations are blocking
//! HTTP clients; async callers run them on a blocking thread pool.
//!
//! Clients are built per call so a client is never created or dropped on an
//! async runtime thread.

pub mod geo;
pub mod ledger;
pub mod vision;

pub use geo::{GeoLocator, HttpGeoLocator};
pub use ledger::{CertificateAttribute, CertificateMetadata, HttpLedger, RewardLedger};
pub use vision::{GeminiVision, VisionAnalyzer};

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service}: request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service}: unexpected status {status}: {body}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{service}: malformed response: {message}")]
    Malformed { service: &'static str, message: String },

    #[error("{service}: not configured ({message})")]
    NotConfigured { service: &'static str, message: String },
}

pub(crate) fn blocking_client(
    service: &'static str,
    timeout: Duration,
) -> Result<reqwest::blocking::Client, ServiceError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| ServiceError::Http { service, source })
}

/// Send a prepared request and decode a JSON body, mapping non-2xx to `Status`
pub(crate) fn send_json<T: serde::de::DeserializeOwned>(
    service: &'static str,
    request: reqwest::blocking::RequestBuilder,
) -> Result<T, ServiceError> {
    let response = request
        .send()
        .map_err(|source| ServiceError::Http { service, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ServiceError::Status { service, status, body });
    }

    response
        .json::<T>()
        .map_err(|source| ServiceError::Http { service, source })
}
