use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::GeminiConfig;

#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("No API key configured")]
    NoApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Model returned no text")]
    EmptyResponse,
}

/// Client for a Gemini-style `generateContent` endpoint.
#[derive(Clone)]
pub struct AdviceClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl AdviceClient {
    pub fn new(config: GeminiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn url(&self) -> String {
        let model = self.config.model.trim_start_matches("models/");
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            model
        )
    }

    /// Send `prompt` and return the model's text, trimmed.
    pub async fn generate(&self, prompt: &str) -> Result<String, AdviceError> {
        let api_key = self.config.api_key.as_deref().ok_or(AdviceError::NoApiKey)?;

        let resp = self
            .http
            .post(self.url())
            .query(&[("key", api_key)])
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AdviceError::Status { status, body });
        }

        let parsed: GenerateResponse = resp.json().await?;
        extract_text(parsed).ok_or(AdviceError::EmptyResponse)
    }
}

fn extract_text(resp: GenerateResponse) -> Option<String> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
