//! User accounts: plan tier and daily query counts
//!
//! The account store is an external collaborator. [`InMemoryAccountStore`]
//! is seeded from `[[accounts]]` config entries so the server runs standalone.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tokio::sync::RwLock;

/// Subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Expert,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Expert => "expert",
        }
    }

    /// Paid plans skip the request-rate window
    pub fn bypasses_rate_limit(&self) -> bool {
        !matches!(self, PlanTier::Free)
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(PlanTier::Free),
            "pro" => Ok(PlanTier::Pro),
            "expert" => Ok(PlanTier::Expert),
            other => Err(format!(
                "unknown plan '{}'. Supported plans: free, pro, expert",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub user_id: u64,
    pub plan: PlanTier,
    pub daily_query_count: u64,
}

impl Account {
    pub fn new(user_id: u64, plan: PlanTier) -> Self {
        Self {
            user_id,
            plan,
            daily_query_count: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("user {0} not found")]
    NotFound(u64),

    #[error("account store error: {0}")]
    Backend(String),
}

/// Read/write access to user plan and daily counters
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_plan_tier(&self, user_id: u64) -> Result<PlanTier, AccountError>;

    async fn get_daily_query_count(&self, user_id: u64) -> Result<u64, AccountError>;

    /// Add one to today's count and return the new value
    async fn increment_daily_query_count(&self, user_id: u64) -> Result<u64, AccountError>;

    /// Zero every user's daily count (day rollover)
    async fn reset_daily_counts(&self) -> Result<(), AccountError>;
}

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<u64, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: RwLock::new(accounts.into_iter().map(|a| (a.user_id, a)).collect()),
        }
    }

    /// Insert or replace an account
    pub async fn upsert(&self, account: Account) {
        self.accounts.write().await.insert(account.user_id, account);
    }

    pub async fn get(&self, user_id: u64) -> Option<Account> {
        self.accounts.read().await.get(&user_id).cloned()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_plan_tier(&self, user_id: u64) -> Result<PlanTier, AccountError> {
        self.accounts
            .read()
            .await
            .get(&user_id)
            .map(|a| a.plan)
            .ok_or(AccountError::NotFound(user_id))
    }

    async fn get_daily_query_count(&self, user_id: u64) -> Result<u64, AccountError> {
        self.accounts
            .read()
            .await
            .get(&user_id)
            .map(|a| a.daily_query_count)
            .ok_or(AccountError::NotFound(user_id))
    }

    async fn increment_daily_query_count(&self, user_id: u64) -> Result<u64, AccountError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&user_id)
            .ok_or(AccountError::NotFound(user_id))?;
        account.daily_query_count = account.daily_query_count.saturating_add(1);
        Ok(account.daily_query_count)
    }

    async fn reset_daily_counts(&self) -> Result<(), AccountError> {
        let mut accounts = self.accounts.write().await;
        for account in accounts.values_mut() {
            account.daily_query_count = 0;
        }
        tracing::info!(accounts = accounts.len(), "Reset daily query counts");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_tier_parsing() {
        assert_eq!("free".parse::<PlanTier>().unwrap(), PlanTier::Free);
        assert_eq!(" PRO ".parse::<PlanTier>().unwrap(), PlanTier::Pro);
        assert_eq!("expert".parse::<PlanTier>().unwrap(), PlanTier::Expert);
        assert!("enterprise".parse::<PlanTier>().is_err());
    }

    #[test]
    fn test_plan_tier_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&PlanTier::Expert).unwrap(), "\"expert\"");
        let plan: PlanTier = serde_json::from_str("\"pro\"").unwrap();
        assert_eq!(plan, PlanTier::Pro);
    }

    #[test]
    fn test_only_free_is_rate_limited() {
        assert!(!PlanTier::Free.bypasses_rate_limit());
        assert!(PlanTier::Pro.bypasses_rate_limit());
        assert!(PlanTier::Expert.bypasses_rate_limit());
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let store = InMemoryAccountStore::new();
        assert!(matches!(
            store.get_plan_tier(42).await,
            Err(AccountError::NotFound(42))
        ));
        assert!(matches!(
            store.increment_daily_query_count(42).await,
            Err(AccountError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_increment_and_reset() {
        let store = InMemoryAccountStore::with_accounts([
            Account::new(1, PlanTier::Free),
            Account::new(2, PlanTier::Pro),
        ]);

        assert_eq!(store.increment_daily_query_count(1).await.unwrap(), 1);
        assert_eq!(store.increment_daily_query_count(1).await.unwrap(), 2);
        assert_eq!(store.increment_daily_query_count(2).await.unwrap(), 1);
        assert_eq!(store.get_daily_query_count(1).await.unwrap(), 2);

        store.reset_daily_counts().await.unwrap();
        assert_eq!(store.get_daily_query_count(1).await.unwrap(), 0);
        assert_eq!(store.get_daily_query_count(2).await.unwrap(), 0);
        assert_eq!(store.get_plan_tier(2).await.unwrap(), PlanTier::Pro);
    }

    #[tokio::test]
    async fn test_upsert_replaces_plan() {
        let store = InMemoryAccountStore::new();
        store.upsert(Account::new(5, PlanTier::Free)).await;
        store.upsert(Account::new(5, PlanTier::Expert)).await;
        assert_eq!(store.get_plan_tier(5).await.unwrap(), PlanTier::Expert);
        assert_eq!(store.get(5).await.unwrap().daily_query_count, 0);
    }
}
