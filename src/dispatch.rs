//! Primary-then-fallback dispatch
//!
//! Selects a model from the classification, calls its provider, and on any
//! provider failure retries exactly once against the fixed fallback model.
//! There is no backoff, no re-selection and no further retry.

use crate::limits::UsageAccountant;
use crate::metrics::Metrics;
use crate::models::{ModelId, ProviderError, ProviderRegistry, ProviderResponse};
use crate::router::{self, Classification, ModelChoice};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Suffix appended to `model_used` when the fallback answered
pub const FALLBACK_MARKER: &str = " (fallback)";

/// Default model used when the primary call fails
pub const DEFAULT_FALLBACK_MODEL: ModelId = ModelId::Gpt4oMini;

/// Outcome of one admitted query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub response_text: String,
    /// Serving model id, suffixed with `" (fallback)"` on the fallback path
    pub model_used: String,
    pub tokens_used: u64,
    pub cost_usd: f64,
    /// Wall time of the call that produced the response
    pub processing_time_seconds: f64,
    pub fallback: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Primary and fallback both failed
    #[error("all providers unavailable (primary {primary}: {primary_error}; fallback {fallback}: {fallback_error})")]
    AllProvidersUnavailable {
        primary: ModelId,
        primary_error: ProviderError,
        fallback: ModelId,
        fallback_error: ProviderError,
    },
}

/// Runs the selected model with a single fallback
#[derive(Debug, Clone)]
pub struct DispatchEngine {
    registry: Arc<ProviderRegistry>,
    accountant: Arc<UsageAccountant>,
    fallback_model: ModelId,
    metrics: Option<Metrics>,
}

impl DispatchEngine {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        accountant: Arc<UsageAccountant>,
        fallback_model: ModelId,
    ) -> Self {
        Self {
            registry,
            accountant,
            fallback_model,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn fallback_model(&self) -> ModelId {
        self.fallback_model
    }

    /// Answer a classified query
    ///
    /// Dropping the returned future abandons the in-flight provider call;
    /// nothing is recorded for a cancelled dispatch.
    pub async fn dispatch(
        &self,
        query_text: &str,
        classification: Classification,
    ) -> Result<DispatchResult, DispatchError> {
        let choice = router::select(classification.category, classification.complexity);

        tracing::info!(
            model = %choice.model,
            provider = %choice.provider,
            category = classification.category.as_str(),
            complexity = classification.complexity.as_str(),
            "Dispatching query to primary model"
        );

        let started = Instant::now();
        let primary_error = match self.registry.query(query_text, choice.model).await {
            Ok(response) => {
                return Ok(self.finish(choice, classification, response, started, false));
            }
            Err(e) => e,
        };

        tracing::warn!(
            model = %choice.model,
            provider = %choice.provider,
            error = %primary_error,
            error_kind = primary_error.kind(),
            fallback_model = %self.fallback_model,
            "Primary model failed, trying fallback"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_provider_error(choice.provider, primary_error.kind());
            metrics.record_fallback(choice.model);
        }

        let fallback = ModelChoice::from(self.fallback_model);
        let started = Instant::now();
        match self.registry.query(query_text, fallback.model).await {
            Ok(response) => Ok(self.finish(fallback, classification, response, started, true)),
            Err(fallback_error) => {
                tracing::error!(
                    primary_model = %choice.model,
                    primary_error = %primary_error,
                    fallback_model = %fallback.model,
                    fallback_error = %fallback_error,
                    "All providers unavailable"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_provider_error(fallback.provider, fallback_error.kind());
                }
                Err(DispatchError::AllProvidersUnavailable {
                    primary: choice.model,
                    primary_error,
                    fallback: fallback.model,
                    fallback_error,
                })
            }
        }
    }

    fn finish(
        &self,
        choice: ModelChoice,
        classification: Classification,
        response: ProviderResponse,
        started: Instant,
        fallback: bool,
    ) -> DispatchResult {
        let processing_time_seconds = started.elapsed().as_secs_f64();
        let tokens_used = response.usage.tokens;
        let cost_usd = self.accountant.cost(tokens_used, choice.model);

        if !response.usage.exact {
            tracing::debug!(
                model = %choice.model,
                tokens = tokens_used,
                "Provider omitted usage, tokens estimated from word counts"
            );
        }

        if let Some(metrics) = &self.metrics
            && let Err(e) = metrics.record_dispatch(
                choice.model,
                classification.category,
                cost_usd,
                processing_time_seconds,
            )
        {
            tracing::warn!(error = %e, "Failed to record dispatch metrics");
        }

        let model_used = if fallback {
            format!("{}{}", choice.model, FALLBACK_MARKER)
        } else {
            choice.model.to_string()
        };

        tracing::info!(
            model_used = %model_used,
            tokens_used,
            cost_usd,
            processing_time_seconds,
            fallback,
            "Query dispatched"
        );

        DispatchResult {
            response_text: response.text,
            model_used,
            tokens_used,
            cost_usd,
            processing_time_seconds,
            fallback,
        }
    }
}
