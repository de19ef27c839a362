//! IP geolocation lookup returning a country code

use super::{blocking_client, send_json, ServiceError, DEFAULT_TIMEOUT};
use std::time::Duration;

const SERVICE: &str = "geolocation";

/// ipapi.co reports ISO3 codes, matching the indicator table
pub const DEFAULT_GEO_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_GEO_FIELD: &str = "country_code_iso3";

pub trait GeoLocator: Send + Sync {
    fn country_code(&self) -> Result<String, ServiceError>;
}

/// GETs a JSON document and reads one string field as the country code
#[derive(Debug, Clone)]
pub struct HttpGeoLocator {
    url: String,
    field: String,
    timeout: Duration,
}

impl HttpGeoLocator {
    pub fn new(url: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            field: field.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pull an upper-cased country code out of the response body
    pub fn extract_code(body: &serde_json::Value, field: &str) -> Result<String, ServiceError> {
        body.get(field)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ServiceError::Malformed {
                service: SERVICE,
                message: format!("field '{}' missing or empty", field),
            })
    }
}

impl Default for HttpGeoLocator {
    fn default() -> Self {
        Self::new(DEFAULT_GEO_URL, DEFAULT_GEO_FIELD)
    }
}

impl GeoLocator for HttpGeoLocator {
    fn country_code(&self) -> Result<String, ServiceError> {
        let client = blocking_client(SERVICE, self.timeout)?;
        let body: serde_json::Value = send_json(SERVICE, client.get(&self.url))?;
        let code = Self::extract_code(&body, &self.field)?;
        tracing::debug!("Geolocated to {}", code);
        Ok(code)
    }
}
