use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::food::image::ImageData;
use crate::providers::traits::InferenceProvider;

#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    model: String,
    api_url: String,
    temperature: f32,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key: config.api_key,
            client,
            model: config.model,
            api_url: config.api_url,
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }

    fn request_body(&self, image: &ImageData, instruction: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": image.mime_type,
                            "data": STANDARD.encode(&image.bytes)
                        }
                    },
                    { "text": instruction }
                ]
            }],
            "generationConfig": {
                "temperature": self.temperature
            }
        })
    }
}

/// Joins the text parts of the first candidate.
fn extract_text(response: &Value) -> Result<String> {
    if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
        return Err(anyhow!("Request blocked by the model: {}", reason));
    }

    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| anyhow!("Invalid response format"))?;

    let text = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(anyhow!("Model returned no text"));
    }
    Ok(text)
}

/// Pulls `error.message` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "unknown error".to_string()
            } else {
                body.chars().take(200).collect()
            }
        })
}

#[async_trait]
impl InferenceProvider for GeminiProvider {
    async fn analyze_image(&self, image: &ImageData, instruction: &str) -> Result<String> {
        debug!("Sending {} byte {} image to {}", image.bytes.len(), image.mime_type, self.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(image, instruction))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error ({}): {}", status, error_message(&body)));
        }

        let response_json: Value = response.json().await?;
        extract_text(&response_json)
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok(self.model.clone())
    }
}
