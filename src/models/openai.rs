//! OpenAI provider adapter
//!
//! Calls the Chat Completions API. Token usage comes from `usage.total_tokens`
//! when present, otherwise it is estimated from word counts.

use super::catalog::{DEFAULT_MAX_TOKENS, ModelId, Provider};
use super::provider::{ProviderAdapter, ProviderError, ProviderResponse, TokenUsage, preview};
use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const TEMPERATURE: f32 = 0.7;

/// OpenAI Chat Completions adapter
pub struct OpenAiAdapter {
    api_key: SecretString,
    organization: Option<String>,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("api_key", &"[REDACTED]")
            .field("organization", &self.organization)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiAdapter {
    /// Create the adapter from provider configuration
    ///
    /// The API key is taken from config, falling back to `OPENAI_API_KEY`.
    ///
    /// # Errors
    /// Returns `AppError::Config` if no API key is available or the HTTP
    /// client cannot be built.
    pub fn new(config: &ProviderConfig, default_timeout_seconds: u64) -> AppResult<Self> {
        let api_key = config
            .api_key()
            .map(str::to_string)
            .or_else(|| std::env::var(OPENAI_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "OpenAI API key not found. Set {} or providers.openai.api_key in config",
                    OPENAI_API_KEY_ENV
                ))
            })?;

        let timeout = Duration::from_secs(config.timeout_seconds().unwrap_or(default_timeout_seconds));
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create OpenAI HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            organization: config.organization().map(str::to_string),
            base_url: config
                .base_url()
                .unwrap_or(DEFAULT_OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            timeout,
            client,
        })
    }

    async fn send(&self, prompt: &str, model: ModelId) -> Result<ProviderResponse, ProviderError> {
        let request = ChatCompletionRequest {
            model: model.as_str(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: TEMPERATURE,
        };
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request);
        if let Some(org) = &self.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder.send().await.map_err(|e| ProviderError::Request {
            provider: Provider::OpenAi,
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: Provider::OpenAi,
                status: status.as_u16(),
                body: preview(&body),
            });
        }

        let body: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::MalformedResponse {
                    provider: Provider::OpenAi,
                    details: e.to_string(),
                })?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse {
                provider: Provider::OpenAi,
                model,
            })?;

        let usage = match body.usage {
            Some(usage) => TokenUsage::exact(usage.total_tokens),
            None => {
                tracing::debug!(
                    model = %model,
                    "OpenAI response carried no usage block, estimating tokens from word counts"
                );
                TokenUsage::estimated(prompt, &text)
            }
        };

        Ok(ProviderResponse { text, usage })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn query(&self, prompt: &str, model: ModelId) -> Result<ProviderResponse, ProviderError> {
        if model.provider() != Provider::OpenAi {
            return Err(ProviderError::UnsupportedModel {
                provider: Provider::OpenAi,
                model,
            });
        }

        tracing::debug!(
            model = %model,
            prompt_length = prompt.len(),
            timeout_seconds = self.timeout.as_secs(),
            "Starting OpenAI query"
        );

        match tokio::time::timeout(self.timeout, self.send(prompt, model)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ProviderError::Timeout {
                provider: Provider::OpenAi,
                model,
                timeout_seconds: self.timeout.as_secs(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u64,
}
