//! Per-user request-rate admission control
//!
//! Free-tier users get `limit` requests per fixed (non-sliding) window. The
//! counter for a window lives in an injected [`CounterStore`] under
//! `rate_limit:{user_id}:{window_id}` where
//! `window_id = floor(unix_seconds / window_seconds)`. Pro and expert users
//! never touch the store.
//!
//! The check and the increment are two separate store calls. Two concurrent
//! requests from one user can both pass the check before either increments,
//! so a window may admit a few requests over the limit.

use super::usage::UNLIMITED;
use crate::accounts::PlanTier;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Default free-tier requests per window
pub const DEFAULT_FREE_REQUESTS_PER_WINDOW: u64 = 5;
/// Default window length in seconds
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;

/// Failure of the shared counter store
#[derive(Debug, Clone, thiserror::Error)]
#[error("counter store error: {0}")]
pub struct CounterStoreError(pub String);

/// Shared counters with expiry (Redis-like `GET` / `INCR` / `EXPIRE`)
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current value, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError>;

    /// Increment (creating at 0 first) and return the new value
    async fn incr(&self, key: &str) -> Result<u64, CounterStoreError>;

    /// Expire `key` after `ttl`; no-op for absent keys
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CounterStoreError>;
}

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    expires_at: Option<Instant>,
}

impl CounterEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Map size at which `incr` first sweeps expired counters
const SWEEP_THRESHOLD: usize = 1024;

/// Process-local [`CounterStore`]
///
/// Expired entries are treated as absent. Window ids are part of every key, so
/// a past window's key is never read again; `incr` sweeps expired entries
/// whenever the map grows past a threshold that doubles with the live count.
#[derive(Debug)]
pub struct InMemoryCounterStore {
    entries: Mutex<HashMap<String, CounterEntry>>,
    /// Map size that triggers the next sweep; only touched under `entries`
    sweep_at: AtomicUsize,
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            sweep_at: AtomicUsize::new(SWEEP_THRESHOLD),
        }
    }
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored entries, expired ones included
    pub async fn raw_len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Drop every expired counter, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of live (unexpired) counters
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<u64>, CounterStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.count)),
            None => Ok(None),
        }
    }

    async fn incr(&self, key: &str) -> Result<u64, CounterStoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(key) && entries.len() >= self.sweep_at.load(Ordering::Relaxed) {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            let next = (entries.len() * 2).max(SWEEP_THRESHOLD);
            self.sweep_at.store(next, Ordering::Relaxed);
            tracing::debug!(
                removed = before - entries.len(),
                live = entries.len(),
                next_sweep_at = next,
                "Swept expired rate-limit counters"
            );
        }

        let entry = entries.entry(key.to_string()).or_insert(CounterEntry {
            count: 0,
            expires_at: None,
        });
        if entry.is_expired(now) {
            *entry = CounterEntry {
                count: 0,
                expires_at: None,
            };
        }
        entry.count += 1;
        Ok(entry.count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CounterStoreError> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}

/// Admission failure (only the store can fail)
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Store(#[from] CounterStoreError),
}

/// Fixed-window rate limiter gating dispatch
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn CounterStore>,
    limit: u64,
    window_seconds: u64,
}

impl std::fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionController")
            .field("limit", &self.limit)
            .field("window_seconds", &self.window_seconds)
            .finish()
    }
}

impl AdmissionController {
    /// Create a controller over `store`
    ///
    /// `window_seconds` must be non-zero; config validation guarantees this for
    /// configured values.
    pub fn new(store: Arc<dyn CounterStore>, limit: u64, window_seconds: u64) -> Self {
        Self {
            store,
            limit,
            window_seconds: window_seconds.max(1),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    /// Window bucket containing `unix_seconds`
    pub fn window_id(&self, unix_seconds: u64) -> u64 {
        unix_seconds / self.window_seconds
    }

    /// Counter key for a user in a window
    pub fn key(user_id: u64, window_id: u64) -> String {
        format!("rate_limit:{}:{}", user_id, window_id)
    }

    /// Whether the user may dispatch a request now
    pub async fn is_allowed(&self, user_id: u64, plan: PlanTier) -> Result<bool, AdmissionError> {
        self.is_allowed_at(user_id, plan, unix_now()).await
    }

    /// Count one admitted request, returning the window's new count
    pub async fn record(&self, user_id: u64, plan: PlanTier) -> Result<u64, AdmissionError> {
        self.record_at(user_id, plan, unix_now()).await
    }

    /// Requests left in the current window
    pub async fn remaining(&self, user_id: u64, plan: PlanTier) -> Result<u64, AdmissionError> {
        self.remaining_at(user_id, plan, unix_now()).await
    }

    /// [`is_allowed`](Self::is_allowed) at a given time
    pub async fn is_allowed_at(
        &self,
        user_id: u64,
        plan: PlanTier,
        unix_seconds: u64,
    ) -> Result<bool, AdmissionError> {
        if plan.bypasses_rate_limit() {
            return Ok(true);
        }

        let key = Self::key(user_id, self.window_id(unix_seconds));
        let count = self.store.get(&key).await?.unwrap_or(0);
        Ok(count < self.limit)
    }

    /// [`record`](Self::record) at a given time
    pub async fn record_at(
        &self,
        user_id: u64,
        plan: PlanTier,
        unix_seconds: u64,
    ) -> Result<u64, AdmissionError> {
        if plan.bypasses_rate_limit() {
            return Ok(UNLIMITED);
        }

        let key = Self::key(user_id, self.window_id(unix_seconds));
        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.store
                .expire(&key, Duration::from_secs(self.window_seconds))
                .await?;
        }

        tracing::debug!(
            user_id = user_id,
            window_count = count,
            limit = self.limit,
            "Recorded request in rate window"
        );

        Ok(count)
    }

    /// [`remaining`](Self::remaining) at a given time
    pub async fn remaining_at(
        &self,
        user_id: u64,
        plan: PlanTier,
        unix_seconds: u64,
    ) -> Result<u64, AdmissionError> {
        if plan.bypasses_rate_limit() {
            return Ok(UNLIMITED);
        }

        let key = Self::key(user_id, self.window_id(unix_seconds));
        Ok(match self.store.get(&key).await? {
            Some(count) => self.limit.saturating_sub(count),
            None => self.limit,
        })
    }
}

fn unix_now() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs(),
        Err(e) => {
            tracing::warn!(error = %e, "System clock is before UNIX epoch, using window 0");
            0
        }
    }
}
