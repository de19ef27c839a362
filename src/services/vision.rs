//! Generative vision model client (Gemini `generateContent`)

use super::{blocking_client, send_json, ServiceError, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

const SERVICE: &str = "vision";

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Answers a natural-language instruction about an image with free text
pub trait VisionAnalyzer: Send + Sync {
    fn analyze(&self, image_jpeg: &[u8], prompt: &str) -> Result<String, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct GeminiVision {
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
}

impl GeminiVision {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }

    /// Prompt first, then the inline JPEG
    pub fn request_body(image_jpeg: &[u8], prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": "image/jpeg", "data": base64::encode(image_jpeg) } }
                ]
            }]
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Part {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl VisionAnalyzer for GeminiVision {
    fn analyze(&self, image_jpeg: &[u8], prompt: &str) -> Result<String, ServiceError> {
        if self.api_key.is_empty() {
            return Err(ServiceError::NotConfigured {
                service: SERVICE,
                message: "missing API key".to_string(),
            });
        }

        tracing::debug!("Requesting weight analysis from {} ({} image bytes)", self.model, image_jpeg.len());

        let client = blocking_client(SERVICE, self.timeout)?;
        let request = client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::request_body(image_jpeg, prompt));

        let response: GenerateContentResponse = send_json(SERVICE, request)?;

        response.text().ok_or_else(|| ServiceError::Malformed {
            service: SERVICE,
            message: "response has no text candidate".to_string(),
        })
    }
}
