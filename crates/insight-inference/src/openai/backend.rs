//! OpenAI-compatible chat gateway implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use insight_core::defaults::{CHOICE_COUNT, GEN_MODEL, GEN_TIMEOUT_SECS, OPENAI_URL};
use insight_core::{Error, GatewayError, LlmGateway, Result};

use super::error::{decode_error, transport_error, OpenAIErrorCode};
use super::types::*;

/// Configuration for the OpenAI-compatible gateway.
///
/// The API key is not part of the configuration: it is read from the stored
/// application settings for every call.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// Model to use for chat completions.
    pub gen_model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_URL.to_string(),
            gen_model: GEN_MODEL.to_string(),
            timeout_seconds: GEN_TIMEOUT_SECS,
        }
    }
}

impl OpenAIConfig {
    /// Load from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
    /// | `OPENAI_GEN_MODEL` | `gpt-3.5-turbo` |
    /// | `OPENAI_TIMEOUT` | `300` |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| OPENAI_URL.to_string()),
            gen_model: std::env::var("OPENAI_GEN_MODEL").unwrap_or_else(|_| GEN_MODEL.to_string()),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(GEN_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.gen_model = model.into();
        self
    }

    pub fn with_timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = secs;
        self
    }
}

/// Chat gateway for any OpenAI-compatible endpoint.
pub struct OpenAIGateway {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIGateway {
    /// Create a gateway with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing OpenAI gateway: url={}, model={}",
            config.base_url, config.gen_model
        );

        Ok(Self { client, config })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OpenAIConfig::default())
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Build a request, adding the bearer header only when a key is given.
    fn build_request(&self, endpoint: &str, api_key: Option<&str>) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(api_key) = api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req.header("Content-Type", "application/json")
    }
}

#[async_trait]
impl LlmGateway for OpenAIGateway {
    async fn chat(
        &self,
        api_key: Option<&str>,
        prompt: &str,
    ) -> std::result::Result<String, GatewayError> {
        let start = Instant::now();
        debug!(
            subsystem = "inference",
            component = "openai",
            op = "chat",
            model = %self.config.gen_model,
            prompt_len = prompt.len(),
            has_key = api_key.is_some(),
            "Sending chat completion"
        );

        let request = ChatCompletionRequest {
            model: self.config.gen_model.clone(),
            n: CHOICE_COUNT,
            messages: vec![ChatMessage::user(prompt)],
        };

        let response = self
            .build_request("/chat/completions", api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        // Only a 200 carries a completion; any other status is kept as text.
        if status != StatusCode::OK {
            warn!(
                subsystem = "inference",
                component = "openai",
                http_status = status.as_u16(),
                code = ?OpenAIErrorCode::from_status(status.as_u16()),
                duration_ms = start.elapsed().as_millis() as u64,
                "Chat completion returned error status"
            );
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let result: ChatCompletionResponse = serde_json::from_str(&body).map_err(decode_error)?;

        let content = result
            .choices
            .into_iter()
            .next()
            .ok_or(GatewayError::NoChoices)?
            .message
            .content
            .unwrap_or_default();

        debug!(
            subsystem = "inference",
            component = "openai",
            response_len = content.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion finished"
        );
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}
