// src/services/llm_service.rs
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

use crate::errors::TravelAgentError;
use crate::models::UploadedImage;
use crate::services::prompt;

/// One structured-output generation call: a text instruction followed by
/// the images in upload order.
pub struct ModelRequest<'a> {
    pub model_id: &'a str,
    pub instruction: String,
    pub images: &'a [UploadedImage],
}

/// Hosted multimodal model. Returns the raw JSON text the model produced.
#[async_trait]
pub trait ContentModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest<'_>) -> Result<String, TravelAgentError>;
}

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client: Client::new(),
        }
    }

    fn request_body(request: &ModelRequest<'_>) -> Value {
        let mut parts = vec![json!({ "text": request.instruction })];
        parts.extend(request.images.iter().map(|img| {
            json!({
                "inline_data": {
                    "mime_type": img.mime_type,
                    "data": img.base64
                }
            })
        }));

        json!({
            "contents": [{
                "role": "user",
                "parts": parts
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": prompt::response_schema(),
                "temperature": prompt::TEMPERATURE
            }
        })
    }
}

#[async_trait]
impl ContentModel for GeminiClient {
    async fn generate(&self, request: &ModelRequest<'_>) -> Result<String, TravelAgentError> {
        let start = Instant::now();
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model_id
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| TravelAgentError::Model(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TravelAgentError::Model(format!(
                "Gemini error ({}): {}",
                status, error_text
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| TravelAgentError::Model(format!("Failed to parse Gemini response: {}", e)))?;

        debug!(
            "Gemini {} answered in {} ms",
            request.model_id,
            start.elapsed().as_millis()
        );

        extract_text(&result)
    }
}

fn extract_text(result: &Value) -> Result<String, TravelAgentError> {
    let text: String = result["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .concat()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = result["candidates"][0]["finishReason"]
            .as_str()
            .or_else(|| result["promptFeedback"]["blockReason"].as_str())
            .unwrap_or("no candidates");
        return Err(TravelAgentError::Model(format!(
            "Empty response from Gemini ({})",
            reason
        )));
    }

    Ok(text)
}
