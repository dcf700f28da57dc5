//! Configuration management for VexaRoute
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::accounts::{Account, PlanTier};
use crate::error::{AppError, AppResult};
use crate::models::ModelId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Upper bound for any timeout, in seconds
const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Upper bound for the rate window (one day)
const MAX_WINDOW_SECONDS: u64 = 86_400;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Default per-call provider timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    30
}

/// Provider sections; an absent section leaves that provider unregistered
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    openai: Option<ProviderConfig>,
    #[serde(default)]
    anthropic: Option<ProviderConfig>,
}

impl ProvidersConfig {
    pub fn openai(&self) -> Option<&ProviderConfig> {
        self.openai.as_ref()
    }

    pub fn anthropic(&self) -> Option<&ProviderConfig> {
        self.anthropic.as_ref()
    }
}

/// Connection settings for one provider
///
/// `api_key` may be omitted; adapters then read `OPENAI_API_KEY` /
/// `ANTHROPIC_API_KEY`. The key is never serialized or printed.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
    #[serde(default)]
    organization: Option<String>,
}

impl ProviderConfig {
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Per-provider timeout override
    pub fn timeout_seconds(&self) -> Option<u64> {
        self.timeout_seconds
    }

    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    fn validate(&self, provider: &str) -> AppResult<()> {
        if let Some(base_url) = &self.base_url
            && !base_url.starts_with("http://")
            && !base_url.starts_with("https://")
        {
            return Err(AppError::Config(format!(
                "providers.{}.base_url must start with http:// or https://, got '{}'",
                provider, base_url
            )));
        }

        if let Some(timeout) = self.timeout_seconds
            && (timeout == 0 || timeout > MAX_TIMEOUT_SECONDS)
        {
            return Err(AppError::Config(format!(
                "providers.{}.timeout_seconds must be in 1..={}, got {}",
                provider, MAX_TIMEOUT_SECONDS, timeout
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("organization", &self.organization)
            .finish()
    }
}

/// Category strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierStrategy {
    /// LLM call with keyword fallback
    #[default]
    Llm,
    /// Keyword matching only, no provider call
    Keyword,
}

/// Routing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub classifier: ClassifierStrategy,
    /// Must be a lightweight model
    #[serde(default = "default_classification_model")]
    pub classification_model: ModelId,
    /// Must be a lightweight model
    #[serde(default = "default_fallback_model")]
    pub fallback_model: ModelId,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierStrategy::default(),
            classification_model: default_classification_model(),
            fallback_model: default_fallback_model(),
        }
    }
}

fn default_classification_model() -> ModelId {
    ModelId::Gpt4oMini
}

fn default_fallback_model() -> ModelId {
    crate::dispatch::DEFAULT_FALLBACK_MODEL
}

/// Free-tier limits
///
/// Deserialization goes through the validated constructor, so a
/// `LimitsConfig` with a zero window or zero request limit cannot exist.
#[derive(Debug, Clone, Serialize)]
pub struct LimitsConfig {
    free_requests_per_window: u64,
    window_seconds: u64,
    free_daily_queries: u64,
}

impl LimitsConfig {
    /// # Errors
    ///
    /// Returns an error if the request limit is zero or the window is outside
    /// 1..=86400 seconds.
    pub fn new(
        free_requests_per_window: u64,
        window_seconds: u64,
        free_daily_queries: u64,
    ) -> AppResult<Self> {
        if free_requests_per_window == 0 {
            return Err(AppError::Config(
                "limits.free_requests_per_window must be greater than 0".to_string(),
            ));
        }
        if window_seconds == 0 || window_seconds > MAX_WINDOW_SECONDS {
            return Err(AppError::Config(format!(
                "limits.window_seconds must be in 1..={}, got {}",
                MAX_WINDOW_SECONDS, window_seconds
            )));
        }
        Ok(Self {
            free_requests_per_window,
            window_seconds,
            free_daily_queries,
        })
    }

    pub fn free_requests_per_window(&self) -> u64 {
        self.free_requests_per_window
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    pub fn free_daily_queries(&self) -> u64 {
        self.free_daily_queries
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            free_requests_per_window: crate::limits::rate_limiter::DEFAULT_FREE_REQUESTS_PER_WINDOW,
            window_seconds: crate::limits::rate_limiter::DEFAULT_WINDOW_SECONDS,
            free_daily_queries: crate::limits::usage::DEFAULT_FREE_DAILY_QUERIES,
        }
    }
}

impl<'de> Deserialize<'de> for LimitsConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct RawLimitsConfig {
            free_requests_per_window: Option<u64>,
            window_seconds: Option<u64>,
            free_daily_queries: Option<u64>,
        }

        let raw = RawLimitsConfig::deserialize(deserializer)?;
        let defaults = LimitsConfig::default();

        LimitsConfig::new(
            raw.free_requests_per_window
                .unwrap_or(defaults.free_requests_per_window),
            raw.window_seconds.unwrap_or(defaults.window_seconds),
            raw.free_daily_queries.unwrap_or(defaults.free_daily_queries),
        )
        .map_err(|e| serde::de::Error::custom(format!("Invalid limits configuration: {}", e)))
    }
}

/// USD per 1000 tokens for each model
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    #[serde(default = "default_gpt_4o_mini_price")]
    pub gpt_4o_mini: f64,
    #[serde(default = "default_gpt_4o_price")]
    pub gpt_4o: f64,
    #[serde(default = "default_claude_sonnet_price")]
    pub claude_sonnet: f64,
    #[serde(default = "default_claude_haiku_price")]
    pub claude_haiku: f64,
}

impl PricingConfig {
    pub fn cost_per_1k(&self, model: ModelId) -> f64 {
        match model {
            ModelId::Gpt4oMini => self.gpt_4o_mini,
            ModelId::Gpt4o => self.gpt_4o,
            ModelId::ClaudeSonnet => self.claude_sonnet,
            ModelId::ClaudeHaiku => self.claude_haiku,
        }
    }

    fn validate(&self) -> AppResult<()> {
        for model in ModelId::ALL {
            let price = self.cost_per_1k(model);
            if !price.is_finite() || price < 0.0 {
                return Err(AppError::Config(format!(
                    "pricing for {} must be a finite non-negative number, got {}",
                    model, price
                )));
            }
        }
        Ok(())
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            gpt_4o_mini: default_gpt_4o_mini_price(),
            gpt_4o: default_gpt_4o_price(),
            claude_sonnet: default_claude_sonnet_price(),
            claude_haiku: default_claude_haiku_price(),
        }
    }
}

fn default_gpt_4o_mini_price() -> f64 {
    0.00015
}

fn default_gpt_4o_price() -> f64 {
    0.005
}

fn default_claude_sonnet_price() -> f64 {
    0.003
}

fn default_claude_haiku_price() -> f64 {
    0.00025
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Seed entry for the in-memory account store
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    pub user_id: u64,
    pub plan: PlanTier,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Accounts to seed the in-memory store with
    pub fn seed_accounts(&self) -> Vec<Account> {
        self.accounts
            .iter()
            .map(|a| Account::new(a.user_id, a.plan))
            .collect()
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`.
    pub fn validate(&self) -> AppResult<()> {
        if self.server.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "server.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.server.request_timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "server.request_timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, self.server.request_timeout_seconds
            )));
        }

        if let Some(openai) = self.providers.openai() {
            openai.validate("openai")?;
        }
        if let Some(anthropic) = self.providers.anthropic() {
            anthropic.validate("anthropic")?;
        }

        if !self.routing.classification_model.is_lightweight() {
            return Err(AppError::Config(format!(
                "routing.classification_model must be a lightweight model (gpt-4o-mini or \
                claude-3-haiku-20240307), got {}",
                self.routing.classification_model
            )));
        }

        if !self.routing.fallback_model.is_lightweight() {
            return Err(AppError::Config(format!(
                "routing.fallback_model must be a lightweight model (gpt-4o-mini or \
                claude-3-haiku-20240307), got {}",
                self.routing.fallback_model
            )));
        }

        self.pricing.validate()?;

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.user_id == 0 {
                return Err(AppError::Config(
                    "accounts.user_id must be greater than 0".to_string(),
                ));
            }
            if !seen.insert(account.user_id) {
                return Err(AppError::Config(format!(
                    "duplicate account entry for user_id {}",
                    account.user_id
                )));
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
