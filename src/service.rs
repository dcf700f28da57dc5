//! Query service: admission, classification, dispatch and accounting
//!
//! This is the surface the HTTP layer calls. One admitted query yields
//! exactly one [`DispatchResult`] or [`QueryError::AllProvidersUnavailable`].

use crate::accounts::{AccountError, AccountStore, PlanTier};
use crate::dispatch::{DispatchEngine, DispatchError, DispatchResult};
use crate::limits::{AdmissionController, AdmissionError, UsageAccountant};
use crate::metrics::Metrics;
use crate::router::{Classification, QueryClassifier};
use std::sync::Arc;

/// Longest accepted query, in characters
pub const MAX_QUERY_CHARS: usize = 5000;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    Validation(String),

    #[error("user {0} not found")]
    UserNotFound(u64),

    #[error("rate limit exceeded ({remaining} of {limit} requests left in {window_seconds}s window)")]
    RateLimited {
        remaining: u64,
        limit: u64,
        window_seconds: u64,
    },

    #[error("all providers unavailable")]
    AllProvidersUnavailable,

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Account(AccountError),
}

impl From<AccountError> for QueryError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound(user_id) => Self::UserNotFound(user_id),
            other => Self::Account(other),
        }
    }
}

impl From<DispatchError> for QueryError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::AllProvidersUnavailable { .. } => Self::AllProvidersUnavailable,
        }
    }
}

/// Answer to an admitted query
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub result: DispatchResult,
    pub classification: Classification,
    pub plan: PlanTier,
    /// Daily queries left after this one
    pub remaining_queries: u64,
}

#[derive(Clone)]
pub struct QueryService {
    classifier: QueryClassifier,
    dispatcher: DispatchEngine,
    admission: AdmissionController,
    accountant: Arc<UsageAccountant>,
    accounts: Arc<dyn AccountStore>,
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("classifier", &self.classifier)
            .field("dispatcher", &self.dispatcher)
            .field("admission", &self.admission)
            .finish_non_exhaustive()
    }
}

impl QueryService {
    pub fn new(
        classifier: QueryClassifier,
        dispatcher: DispatchEngine,
        admission: AdmissionController,
        accountant: Arc<UsageAccountant>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            classifier,
            dispatcher,
            admission,
            accountant,
            accounts,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    pub fn accounts(&self) -> &Arc<dyn AccountStore> {
        &self.accounts
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn accountant(&self) -> &UsageAccountant {
        &self.accountant
    }

    /// Resolve the user's plan, then [`handle_query`](Self::handle_query)
    pub async fn handle_query_for_user(
        &self,
        query_text: &str,
        user_id: u64,
        session_id: &str,
    ) -> Result<QueryOutcome, QueryError> {
        let plan = self.accounts.get_plan_tier(user_id).await?;

        tracing::debug!(
            user_id = user_id,
            session_id = %session_id,
            plan = %plan,
            "Resolved user plan"
        );

        self.handle_query(query_text, user_id, plan).await
    }

    /// Admit, classify, dispatch and account for one query
    ///
    /// Invalid text and unknown users are rejected before any quota is
    /// consumed. A rate-limited query is never classified or dispatched.
    pub async fn handle_query(
        &self,
        query_text: &str,
        user_id: u64,
        plan: PlanTier,
    ) -> Result<QueryOutcome, QueryError> {
        validate_query(query_text)?;

        // Unknown user must fail here, not after a billed dispatch
        self.accounts.get_daily_query_count(user_id).await?;

        if !self.admission.is_allowed(user_id, plan).await? {
            let remaining = self.admission.remaining(user_id, plan).await?;
            tracing::info!(
                user_id = user_id,
                plan = %plan,
                limit = self.admission.limit(),
                "Query rejected by rate limit"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_rate_limited();
            }
            return Err(QueryError::RateLimited {
                remaining,
                limit: self.admission.limit(),
                window_seconds: self.admission.window_seconds(),
            });
        }
        self.admission.record(user_id, plan).await?;

        let classification = self.classifier.classify(query_text).await;
        if let Some(metrics) = &self.metrics {
            metrics.record_classification(classification.source);
        }

        let result = self.dispatcher.dispatch(query_text, classification).await?;

        let daily_count = self.accounts.increment_daily_query_count(user_id).await?;
        let remaining_queries = self.accountant.remaining_quota(plan, daily_count);

        Ok(QueryOutcome {
            result,
            classification,
            plan,
            remaining_queries,
        })
    }

    /// Daily queries left for a plan at a given count
    pub fn get_remaining_quota(&self, user_id: u64, plan: PlanTier, daily_query_count: u64) -> u64 {
        let remaining = self.accountant.remaining_quota(plan, daily_query_count);
        tracing::debug!(
            user_id = user_id,
            plan = %plan,
            daily_query_count,
            remaining,
            "Computed remaining quota"
        );
        remaining
    }
}

/// Reject blank or oversized query text
pub fn validate_query(query_text: &str) -> Result<(), QueryError> {
    if query_text.trim().is_empty() {
        return Err(QueryError::Validation(
            "query cannot be empty or contain only whitespace".to_string(),
        ));
    }

    let chars = query_text.chars().count();
    if chars > MAX_QUERY_CHARS {
        return Err(QueryError::Validation(format!(
            "query exceeds maximum length of {} characters (got {})",
            MAX_QUERY_CHARS, chars
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{Account, InMemoryAccountStore};
    use crate::dispatch::DEFAULT_FALLBACK_MODEL;
    use crate::limits::{InMemoryCounterStore, UNLIMITED};
    use crate::models::{
        ModelId, Provider, ProviderAdapter, ProviderError, ProviderRegistry, ProviderResponse,
        TokenUsage,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAdapter {
        provider: Provider,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ProviderAdapter for CountingAdapter {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn query(
            &self,
            _prompt: &str,
            _model: ModelId,
        ) -> Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ProviderError::Request {
                    provider: self.provider,
                    message: "connection reset".to_string(),
                })
            } else {
                Ok(ProviderResponse {
                    text: "answer".to_string(),
                    usage: TokenUsage::exact(100),
                })
            }
        }
    }

    fn service(fail: bool) -> (QueryService, Arc<CountingAdapter>) {
        let adapter = Arc::new(CountingAdapter {
            provider: Provider::OpenAi,
            fail,
            calls: AtomicUsize::new(0),
        });
        let registry = Arc::new(ProviderRegistry::new().with_adapter(adapter.clone()));
        let accountant = Arc::new(UsageAccountant::default());
        let dispatcher =
            DispatchEngine::new(registry, accountant.clone(), DEFAULT_FALLBACK_MODEL);
        let admission = AdmissionController::new(Arc::new(InMemoryCounterStore::new()), 5, 60);
        let accounts = Arc::new(InMemoryAccountStore::with_accounts([
            Account::new(1, PlanTier::Free),
            Account::new(2, PlanTier::Pro),
        ]));

        let service = QueryService::new(
            QueryClassifier::keyword_only(),
            dispatcher,
            admission,
            accountant,
            accounts,
        );
        (service, adapter)
    }

    #[test]
    fn test_validate_query_bounds() {
        assert!(validate_query("hi").is_ok());
        assert!(validate_query(&"a".repeat(MAX_QUERY_CHARS)).is_ok());
        assert!(matches!(
            validate_query(&"a".repeat(MAX_QUERY_CHARS + 1)),
            Err(QueryError::Validation(_))
        ));
        assert!(matches!(validate_query(" \n\t"), Err(QueryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_free_user_gets_remaining_daily_queries() {
        let (service, _) = service(false);
        let outcome = service
            .handle_query("what is the weather today", 1, PlanTier::Free)
            .await
            .unwrap();

        assert_eq!(outcome.result.model_used, "gpt-4o-mini");
        assert_eq!(outcome.remaining_queries, 4);
        assert!((outcome.result.cost_usd - 0.000015).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_sixth_free_query_is_rate_limited_without_dispatch() {
        let (service, adapter) = service(false);
        for _ in 0..5 {
            service.handle_query("hello", 1, PlanTier::Free).await.unwrap();
        }
        let calls_before = adapter.calls.load(Ordering::SeqCst);

        let err = service
            .handle_query("hello", 1, PlanTier::Free)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            QueryError::RateLimited {
                remaining: 0,
                limit: 5,
                window_seconds: 60
            }
        ));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test]
    async fn test_pro_user_is_never_rate_limited() {
        let (service, _) = service(false);
        for _ in 0..10 {
            let outcome = service.handle_query("hello", 2, PlanTier::Pro).await.unwrap();
            assert_eq!(outcome.remaining_queries, UNLIMITED);
        }
    }

    #[tokio::test]
    async fn test_invalid_query_consumes_no_quota() {
        let (service, adapter) = service(false);
        assert!(matches!(
            service.handle_query("   ", 1, PlanTier::Free).await,
            Err(QueryError::Validation(_))
        ));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            service.admission().remaining(1, PlanTier::Free).await.unwrap(),
            5
        );
    }

    #[tokio::test]
    async fn test_provider_outage_is_all_providers_unavailable() {
        let (service, adapter) = service(true);
        let err = service
            .handle_query("hello", 2, PlanTier::Pro)
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::AllProvidersUnavailable));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.accounts().get_daily_query_count(2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_is_reported_before_admission() {
        let (service, adapter) = service(false);
        let err = service
            .handle_query_for_user("hello", 99, "session-abc")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::UserNotFound(99)));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_get_remaining_quota_at_limit_is_zero() {
        let (service, _) = service(false);
        assert_eq!(service.get_remaining_quota(1, PlanTier::Free, 5), 0);
        assert_eq!(service.get_remaining_quota(2, PlanTier::Expert, 500), UNLIMITED);
    }

    #[tokio::test]
    async fn test_unknown_user_fails_before_window_or_dispatch() {
        let (service, adapter) = service(false);
        let err = service
            .handle_query("hello", 42, PlanTier::Free)
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::UserNotFound(42)));
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            service.admission().remaining(42, PlanTier::Free).await.unwrap(),
            5
        );
    }
}
