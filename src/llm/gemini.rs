//! Google Gemini `generateContent` client
//!
//! One request per prompt, no streaming and no conversation history.

use crate::llm::config::GatewayConfig;
use crate::llm::gateway::{Gateway, GatewayError};
use crate::{ChatError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, if it has any
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

pub struct GeminiClient {
    client: Client,
    config: GatewayConfig,
    api_key: String,
}

impl GeminiClient {
    /// Build a client. Fails when no API key is configured.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ChatError::ConfigError("Gemini API key is not set".into()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ChatError::GatewayError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Perform the request, keeping the real failure cause
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::GatewayError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::GatewayError(format!(
                "Gemini request failed with status {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ChatError::GatewayError(format!("Malformed response: {}", e)))?;

        parsed
            .text()
            .ok_or_else(|| ChatError::GatewayError("Response contained no text".into()))
    }
}

#[async_trait]
impl Gateway for GeminiClient {
    async fn send(&self, prompt: &str) -> std::result::Result<String, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }

        let start = Instant::now();
        debug!(model = %self.config.model, chars = prompt.len(), "Sending prompt to Gemini");

        match self.generate(prompt).await {
            Ok(text) => {
                debug!(
                    "Gemini replied with {} chars in {}ms",
                    text.len(),
                    start.elapsed().as_millis()
                );
                Ok(text)
            }
            Err(e) => {
                warn!("Gemini call failed: {}", e);
                Err(GatewayError::unavailable())
            }
        }
    }
}
