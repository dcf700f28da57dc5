//! Provider adapter abstraction
//!
//! A provider adapter executes one prompt against a named model of one
//! backend and reports the generated text plus token usage. Cost and timing
//! are computed by the dispatch engine, so adapters only own their transport,
//! credentials and timeout.

use super::catalog::{ModelId, Provider};
use async_trait::async_trait;

/// Token usage reported for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    /// Total tokens (prompt + completion)
    pub tokens: u64,
    /// `false` when the provider did not report usage and the count was
    /// estimated by [`estimate_tokens`]
    pub exact: bool,
}

impl TokenUsage {
    pub fn exact(tokens: u64) -> Self {
        Self {
            tokens,
            exact: true,
        }
    }

    pub fn estimated(prompt: &str, response: &str) -> Self {
        Self {
            tokens: estimate_tokens(prompt, response),
            exact: false,
        }
    }
}

/// Successful provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// Failure of a single provider call
///
/// Every variant is a distinguishable failure; adapters never return empty
/// text as a success.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {message}")]
    Request { provider: Provider, message: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("{provider} request for {model} timed out after {timeout_seconds}s")]
    Timeout {
        provider: Provider,
        model: ModelId,
        timeout_seconds: u64,
    },

    #[error("{provider} returned a malformed response: {details}")]
    MalformedResponse { provider: Provider, details: String },

    #[error("{provider} returned an empty response for {model}")]
    EmptyResponse { provider: Provider, model: ModelId },

    #[error("{provider} does not serve model {model}")]
    UnsupportedModel { provider: Provider, model: ModelId },

    #[error("no adapter configured for provider {0}")]
    NotConfigured(Provider),
}

impl ProviderError {
    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Request { .. } => "request",
            Self::Status { .. } => "status",
            Self::Timeout { .. } => "timeout",
            Self::MalformedResponse { .. } => "malformed",
            Self::EmptyResponse { .. } => "empty",
            Self::UnsupportedModel { .. } => "unsupported_model",
            Self::NotConfigured(_) => "not_configured",
        }
    }
}

/// One LLM backend
///
/// Implementations must bound every call by their own timeout.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which backend this adapter talks to
    fn provider(&self) -> Provider;

    /// Execute `prompt` against `model`
    async fn query(&self, prompt: &str, model: ModelId) -> Result<ProviderResponse, ProviderError>;
}

/// Approximate token count: whitespace-separated words of prompt plus response
///
/// Used only when a provider does not report usage. Real tokenizers usually
/// count more tokens than words, so costs derived from this are a lower bound.
pub fn estimate_tokens(prompt: &str, response: &str) -> u64 {
    (prompt.split_whitespace().count() + response.split_whitespace().count()) as u64
}

/// Truncate a provider error body for logs and error messages
pub(crate) fn preview(body: &str) -> String {
    const MAX_PREVIEW: usize = 500;
    if body.chars().count() <= MAX_PREVIEW {
        body.to_string()
    } else {
        let truncated: String = body.chars().take(MAX_PREVIEW).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_counts_words() {
        assert_eq!(estimate_tokens("hello world", "hi there friend"), 5);
        assert_eq!(estimate_tokens("", ""), 0);
        assert_eq!(estimate_tokens("  spaced   out  ", "\nnew\tline "), 4);
    }

    #[test]
    fn test_token_usage_constructors() {
        assert_eq!(
            TokenUsage::exact(42),
            TokenUsage {
                tokens: 42,
                exact: true
            }
        );
        let estimated = TokenUsage::estimated("one two", "three");
        assert_eq!(estimated.tokens, 3);
        assert!(!estimated.exact);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let body = "é".repeat(600);
        let p = preview(&body);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 503);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_error_kind_labels() {
        let err = ProviderError::Timeout {
            provider: Provider::OpenAi,
            model: ModelId::Gpt4o,
            timeout_seconds: 30,
        };
        assert_eq!(err.kind(), "timeout");
        assert_eq!(
            err.to_string(),
            "openai request for gpt-4o timed out after 30s"
        );
        assert_eq!(
            ProviderError::NotConfigured(Provider::Anthropic).kind(),
            "not_configured"
        );
    }
}
