//! Anthropic provider adapter
//!
//! Calls the Messages API. Usage is `input_tokens + output_tokens` when the
//! response reports it, otherwise a word-count estimate.

use super::catalog::{DEFAULT_MAX_TOKENS, ModelId, Provider};
use super::provider::{ProviderAdapter, ProviderError, ProviderResponse, TokenUsage, preview};
use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages adapter
pub struct AnthropicAdapter {
    api_key: SecretString,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicAdapter")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AnthropicAdapter {
    /// Create the adapter from provider configuration
    ///
    /// The API key is taken from config, falling back to `ANTHROPIC_API_KEY`.
    pub fn new(config: &ProviderConfig, default_timeout_seconds: u64) -> AppResult<Self> {
        let api_key = config
            .api_key()
            .map(str::to_string)
            .or_else(|| std::env::var(ANTHROPIC_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Anthropic API key not found. Set {} or providers.anthropic.api_key in config",
                    ANTHROPIC_API_KEY_ENV
                ))
            })?;

        let timeout = Duration::from_secs(config.timeout_seconds().unwrap_or(default_timeout_seconds));
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create Anthropic HTTP client: {}", e))
            })?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            base_url: config
                .base_url()
                .unwrap_or(DEFAULT_ANTHROPIC_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            timeout,
            client,
        })
    }

    async fn send(&self, prompt: &str, model: ModelId) -> Result<ProviderResponse, ProviderError> {
        let request = MessagesRequest {
            model: model.as_str(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };
        let url = format!("{}/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: Provider::Anthropic,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: Provider::Anthropic,
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let body: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse {
                    provider: Provider::Anthropic,
                    details: e.to_string(),
                })?;

        // First text block carries the answer
        let text = body
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse {
                provider: Provider::Anthropic,
                model,
            })?;

        let usage = match body.usage {
            Some(usage) => TokenUsage::exact(usage.input_tokens + usage.output_tokens),
            None => {
                tracing::debug!(
                    model = %model,
                    "Anthropic response carried no usage block, estimating tokens from word counts"
                );
                TokenUsage::estimated(prompt, &text)
            }
        };

        Ok(ProviderResponse { text, usage })
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn query(&self, prompt: &str, model: ModelId) -> Result<ProviderResponse, ProviderError> {
        if model.provider() != Provider::Anthropic {
            return Err(ProviderError::UnsupportedModel {
                provider: Provider::Anthropic,
                model,
            });
        }

        tracing::debug!(
            model = %model,
            prompt_length = prompt.len(),
            timeout_seconds = self.timeout.as_secs(),
            "Starting Anthropic query"
        );

        match tokio::time::timeout(self.timeout, self.send(prompt, model)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ProviderError::Timeout {
                provider: Provider::Anthropic,
                model,
                timeout_seconds: self.timeout.as_secs(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
