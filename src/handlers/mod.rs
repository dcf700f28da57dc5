//! HTTP request handlers for the VexaRoute API

use crate::accounts::{AccountStore, InMemoryAccountStore};
use crate::config::{ClassifierStrategy, Config};
use crate::dispatch::DispatchEngine;
use crate::error::{AppError, AppResult};
use crate::limits::{AdmissionController, CounterStore, InMemoryCounterStore, UsageAccountant};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::models::{ModelCatalog, ProviderRegistry};
use crate::router::{LlmClassifier, QueryClassifier};
use crate::service::QueryService;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod health;
pub mod metrics;
pub mod models;
pub mod query;
pub mod usage;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    catalog: Arc<ModelCatalog>,
    service: Arc<QueryService>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Build state with provider adapters from config and in-memory stores
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let registry = ProviderRegistry::from_config(&config)?;
        Self::with_registry(config, registry)
    }

    /// Build state around an explicit provider registry
    pub fn with_registry(config: Arc<Config>, registry: ProviderRegistry) -> AppResult<Self> {
        let accounts = Arc::new(InMemoryAccountStore::with_accounts(config.seed_accounts()));
        Self::with_parts(
            config,
            registry,
            accounts,
            Arc::new(InMemoryCounterStore::new()),
        )
    }

    /// Build state from every external collaborator
    pub fn with_parts(
        config: Arc<Config>,
        registry: ProviderRegistry,
        accounts: Arc<dyn AccountStore>,
        counters: Arc<dyn CounterStore>,
    ) -> AppResult<Self> {
        let metrics = Metrics::new()
            .map_err(|e| AppError::Internal(format!("Failed to initialize metrics: {}", e)))?;

        let registry = Arc::new(registry);
        let catalog = Arc::new(ModelCatalog::new(&config.pricing));
        let accountant = Arc::new(UsageAccountant::new(
            catalog.clone(),
            config.limits.free_daily_queries(),
        ));

        let classifier = match config.routing.classifier {
            ClassifierStrategy::Llm => QueryClassifier::new(Some(LlmClassifier::new(
                registry.clone(),
                config.routing.classification_model,
            ))),
            ClassifierStrategy::Keyword => QueryClassifier::keyword_only(),
        };
        let uses_llm = classifier.uses_llm();
        if uses_llm
            && registry
                .adapter_for(config.routing.classification_model)
                .is_none()
        {
            tracing::warn!(
                classification_model = %config.routing.classification_model,
                "Classification model has no configured provider; every query will use keyword classification"
            );
        }

        let dispatcher =
            DispatchEngine::new(registry, accountant.clone(), config.routing.fallback_model)
                .with_metrics(metrics.clone());

        let admission = AdmissionController::new(
            counters,
            config.limits.free_requests_per_window(),
            config.limits.window_seconds(),
        );

        let service = QueryService::new(classifier, dispatcher, admission, accountant, accounts)
            .with_metrics(metrics.clone());

        tracing::debug!(
            classifier = ?config.routing.classifier,
            llm_classification = uses_llm,
            classification_model = %config.routing.classification_model,
            fallback_model = %config.routing.fallback_model,
            free_requests_per_window = config.limits.free_requests_per_window(),
            window_seconds = config.limits.window_seconds(),
            "Application state initialized"
        );

        Ok(Self {
            config,
            catalog,
            service: Arc::new(service),
            metrics: Arc::new(metrics),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn service(&self) -> &QueryService {
        &self.service
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// All routes with request-id and tracing layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/ai/query", post(query::handler))
        .route("/api/v1/ai/models", get(models::handler))
        .route("/api/v1/ai/usage/{user_id}", get(usage::handler))
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_state_uses_configured_limits() {
        let state = state_without_providers();
        assert_eq!(state.service().admission().limit(), 5);
        assert_eq!(state.service().admission().window_seconds(), 60);
        assert_eq!(state.service().accountant().free_daily_queries(), 5);
    }

    #[tokio::test]
    async fn test_state_seeds_accounts_from_config() {
        let state = state_without_providers();
        let accounts = state.service().accounts();
        assert_eq!(
            accounts.get_plan_tier(2).await.unwrap(),
            crate::accounts::PlanTier::Pro
        );
        assert!(accounts.get_plan_tier(3).await.is_err());
    }

    #[test]
    fn test_classifier_follows_configured_strategy() {
        let state = state_without_providers();
        assert!(!state.service().classifier().uses_llm());

        let toml = TEST_CONFIG.replace(r#"classifier = "keyword""#, r#"classifier = "llm""#);
        let config = Config::from_str(&toml).expect("should parse llm config");
        let state = AppState::with_registry(Arc::new(config), ProviderRegistry::new())
            .expect("should create AppState");
        assert!(state.service().classifier().uses_llm());
    }

    #[test]
    fn test_state_is_cheap_to_clone() {
        let state = state_without_providers();
        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.service, &cloned.service));
    }
}
