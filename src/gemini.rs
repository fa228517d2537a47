use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::models::ExtractionRequest;

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model unavailable: {0}")]
    Unavailable(String),
}

/// Seam for the hosted multimodal model. The production implementation talks
/// to the Gemini REST API; tests substitute a fake.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn infer(&self, request: &ExtractionRequest) -> Result<String, ModelError>;
}

pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, ModelError> {
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;
        Ok(Self { api_key, client })
    }
}

/// Wire shape of a single-turn request: the three message parts in order,
/// plus the fixed generation config.
pub fn request_body(request: &ExtractionRequest) -> Value {
    serde_json::json!({
        "contents": [{
            "parts": [
                { "text": request.system_instruction },
                { "inline_data": {
                    "mime_type": request.image.format.mime_type(),
                    "data": STANDARD.encode(&request.image.bytes)
                } },
                { "text": request.user_instruction }
            ]
        }],
        "generationConfig": {
            "temperature": 1.0,
            "topP": 0.95,
            "topK": 64,
            "maxOutputTokens": 8192,
            "responseMimeType": "text/plain"
        }
    })
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn infer(&self, request: &ExtractionRequest) -> Result<String, ModelError> {
        tracing::info!(image = %request.image.filename, "sending extraction request to Gemini");

        let response = self
            .client
            .post(GEMINI_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Unavailable(format!("TimeoutError: {}", e))
                } else if e.is_connect() {
                    ModelError::Unavailable(format!("ConnectError: {}", e))
                } else {
                    ModelError::Unavailable(format!("RequestError: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Unavailable(format!("{}: {}", status, body)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        // No schema validation of the completion itself: take the text part
        // as-is, empty if absent.
        Ok(json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}
