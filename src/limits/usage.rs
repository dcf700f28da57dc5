//! Usage accounting: per-call cost and remaining daily quota

use crate::accounts::PlanTier;
use crate::models::{ModelCatalog, ModelId};
use std::sync::Arc;

/// Sentinel for "no limit" returned to pro and expert users
pub const UNLIMITED: u64 = 999_999;

/// Default daily query allowance for free users
pub const DEFAULT_FREE_DAILY_QUERIES: u64 = 5;

#[derive(Debug, Clone)]
pub struct UsageAccountant {
    catalog: Arc<ModelCatalog>,
    free_daily_queries: u64,
}

impl UsageAccountant {
    pub fn new(catalog: Arc<ModelCatalog>, free_daily_queries: u64) -> Self {
        Self {
            catalog,
            free_daily_queries,
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn free_daily_queries(&self) -> u64 {
        self.free_daily_queries
    }

    /// `tokens / 1000 * cost_per_1k(model)`, never negative
    pub fn cost(&self, tokens_used: u64, model: ModelId) -> f64 {
        (tokens_used as f64 / 1000.0) * self.catalog.cost_per_1k(model)
    }

    /// Queries left today
    ///
    /// Free tier: `max(0, limit - daily_query_count)`. Pro and expert:
    /// [`UNLIMITED`].
    pub fn remaining_quota(&self, plan: PlanTier, daily_query_count: u64) -> u64 {
        match plan {
            PlanTier::Free => self.free_daily_queries.saturating_sub(daily_query_count),
            PlanTier::Pro | PlanTier::Expert => UNLIMITED,
        }
    }
}

impl Default for UsageAccountant {
    fn default() -> Self {
        Self::new(Arc::new(ModelCatalog::default()), DEFAULT_FREE_DAILY_QUERIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cost_uses_catalog_price() {
        let accountant = UsageAccountant::default();
        assert!((accountant.cost(1000, ModelId::Gpt4o) - 0.005).abs() < 1e-12);
        assert!((accountant.cost(2000, ModelId::ClaudeSonnet) - 0.006).abs() < 1e-12);
        assert_eq!(accountant.cost(0, ModelId::Gpt4oMini), 0.0);
    }

    #[test]
    fn test_free_user_at_limit_has_zero_remaining() {
        let accountant = UsageAccountant::default();
        assert_eq!(accountant.remaining_quota(PlanTier::Free, 5), 0);
        assert_eq!(accountant.remaining_quota(PlanTier::Free, 2), 3);
        assert_eq!(accountant.remaining_quota(PlanTier::Free, 0), 5);
    }

    #[test]
    fn test_free_user_over_limit_saturates_at_zero() {
        let accountant = UsageAccountant::default();
        assert_eq!(accountant.remaining_quota(PlanTier::Free, 50), 0);
    }

    #[test]
    fn test_paid_plans_are_unlimited() {
        let accountant = UsageAccountant::default();
        assert_eq!(accountant.remaining_quota(PlanTier::Pro, 10_000), UNLIMITED);
        assert_eq!(accountant.remaining_quota(PlanTier::Expert, 0), UNLIMITED);
    }

    proptest! {
        #[test]
        fn prop_cost_round_trips_to_tokens(tokens in 0u64..10_000_000, idx in 0usize..4) {
            let accountant = UsageAccountant::default();
            let model = ModelId::ALL[idx];
            let cost = accountant.cost(tokens, model);
            prop_assert!(cost >= 0.0);

            let per_token = accountant.catalog().cost_per_1k(model) / 1000.0;
            let recovered = cost / per_token;
            prop_assert!((recovered - tokens as f64).abs() <= 1e-6 * (tokens as f64).max(1.0));
        }

        #[test]
        fn prop_free_remaining_never_exceeds_limit(count in 0u64..1_000) {
            let accountant = UsageAccountant::default();
            let remaining = accountant.remaining_quota(PlanTier::Free, count);
            prop_assert!(remaining <= DEFAULT_FREE_DAILY_QUERIES);
            prop_assert_eq!(remaining, DEFAULT_FREE_DAILY_QUERIES.saturating_sub(count));
        }
    }
}
