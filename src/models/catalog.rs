//! Static model catalog
//!
//! Four supported models, two per provider: one lightweight model that can
//! also run query classification, and one flagship model. Prices are read-only
//! after startup (defaults can be overridden through `[pricing]` in config).

use crate::config::PricingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Upstream LLM provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl Provider {
    /// Lowercase identifier used in config keys and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Vendor display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four supported models
///
/// Serialized as the provider's model identifier (e.g. `"gpt-4o-mini"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum ModelId {
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "claude-3-5-sonnet-20241022")]
    ClaudeSonnet,
    #[serde(rename = "claude-3-haiku-20240307")]
    ClaudeHaiku,
}

impl ModelId {
    pub const ALL: [ModelId; 4] = [
        ModelId::Gpt4oMini,
        ModelId::Gpt4o,
        ModelId::ClaudeSonnet,
        ModelId::ClaudeHaiku,
    ];

    /// Provider-side model identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Gpt4o => "gpt-4o",
            Self::ClaudeSonnet => "claude-3-5-sonnet-20241022",
            Self::ClaudeHaiku => "claude-3-haiku-20240307",
        }
    }

    /// The provider that serves this model
    pub fn provider(&self) -> Provider {
        match self {
            Self::Gpt4oMini | Self::Gpt4o => Provider::OpenAi,
            Self::ClaudeSonnet | Self::ClaudeHaiku => Provider::Anthropic,
        }
    }

    /// Lightweight models are cheap enough to run classification prompts
    pub fn is_lightweight(&self) -> bool {
        matches!(self, Self::Gpt4oMini | Self::ClaudeHaiku)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown model '{}'. Supported models: {}",
                    s,
                    ModelId::ALL.map(|m| m.as_str()).join(", ")
                )
            })
    }
}

/// Maximum generation length requested from every model
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Catalog entry exposed on `GET /api/v1/ai/models`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub provider: Provider,
    pub use_case: &'static str,
    pub cost_per_1k_tokens: f64,
    pub max_tokens: u32,
    pub is_lightweight: bool,
}

/// Read-only model catalog
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    models: BTreeMap<ModelId, ModelInfo>,
}

impl ModelCatalog {
    /// Build the catalog with prices from configuration
    pub fn new(pricing: &PricingConfig) -> Self {
        let models = ModelId::ALL
            .into_iter()
            .map(|model| {
                let info = ModelInfo {
                    provider: model.provider(),
                    use_case: use_case(model),
                    cost_per_1k_tokens: pricing.cost_per_1k(model),
                    max_tokens: DEFAULT_MAX_TOKENS,
                    is_lightweight: model.is_lightweight(),
                };
                (model, info)
            })
            .collect();

        Self { models }
    }

    /// Look up a model's catalog entry
    pub fn info(&self, model: ModelId) -> &ModelInfo {
        // Every ModelId variant is inserted in new()
        &self.models[&model]
    }

    pub fn all(&self) -> &BTreeMap<ModelId, ModelInfo> {
        &self.models
    }

    pub fn cost_per_1k(&self, model: ModelId) -> f64 {
        self.info(model).cost_per_1k_tokens
    }

    /// Models usable for query classification
    pub fn lightweight(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.models
            .iter()
            .filter(|(_, info)| info.is_lightweight)
            .map(|(model, _)| *model)
    }

    /// Models used to answer queries on the primary path
    pub fn flagship(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.models
            .iter()
            .filter(|(_, info)| !info.is_lightweight)
            .map(|(model, _)| *model)
    }

    /// The cheapest model in the catalog
    pub fn lowest_cost(&self) -> ModelId {
        self.models
            .iter()
            .min_by(|(_, a), (_, b)| a.cost_per_1k_tokens.total_cmp(&b.cost_per_1k_tokens))
            .map(|(model, _)| *model)
            .unwrap_or(ModelId::Gpt4oMini)
    }

    /// Human-readable description of the selection policy
    pub fn selection_logic() -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([
            ("simple_queries", "GPT-4o-mini (cost-effective)"),
            ("code_queries", "GPT-4o (better code understanding)"),
            ("creative_writing", "Claude Sonnet (creative capabilities)"),
            ("complex_queries", "Claude Sonnet (better reasoning)"),
            ("fallback", "GPT-4o-mini (reliability)"),
        ])
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(&PricingConfig::default())
    }
}

fn use_case(model: ModelId) -> &'static str {
    match model {
        ModelId::Gpt4oMini => "Simple queries (< 50 words)",
        ModelId::Gpt4o => "Complex queries, code-related tasks",
        ModelId::ClaudeSonnet => "Creative writing, complex reasoning",
        ModelId::ClaudeHaiku => "Lightweight classification tasks",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_four_models_two_per_provider() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.all().len(), 4);

        for provider in [Provider::OpenAi, Provider::Anthropic] {
            let models: Vec<_> = catalog
                .all()
                .iter()
                .filter(|(_, info)| info.provider == provider)
                .collect();
            assert_eq!(models.len(), 2, "{} should own two models", provider);
            assert_eq!(
                models.iter().filter(|(_, info)| info.is_lightweight).count(),
                1,
                "{} should own exactly one lightweight model",
                provider
            );
        }
    }

    #[test]
    fn test_default_prices() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.cost_per_1k(ModelId::Gpt4oMini), 0.00015);
        assert_eq!(catalog.cost_per_1k(ModelId::Gpt4o), 0.005);
        assert_eq!(catalog.cost_per_1k(ModelId::ClaudeSonnet), 0.003);
        assert_eq!(catalog.cost_per_1k(ModelId::ClaudeHaiku), 0.00025);
    }

    #[test]
    fn test_lowest_cost_is_gpt4o_mini_by_default() {
        assert_eq!(ModelCatalog::default().lowest_cost(), ModelId::Gpt4oMini);
    }

    #[test]
    fn test_lightweight_and_flagship_partition() {
        let catalog = ModelCatalog::default();
        let light: Vec<_> = catalog.lightweight().collect();
        let flagship: Vec<_> = catalog.flagship().collect();
        assert_eq!(light, vec![ModelId::Gpt4oMini, ModelId::ClaudeHaiku]);
        assert_eq!(flagship, vec![ModelId::Gpt4o, ModelId::ClaudeSonnet]);
    }

    #[test]
    fn test_model_id_from_str() {
        assert_eq!("gpt-4o".parse::<ModelId>(), Ok(ModelId::Gpt4o));
        assert_eq!(
            "claude-3-haiku-20240307".parse::<ModelId>(),
            Ok(ModelId::ClaudeHaiku)
        );
        let err = "gpt-5".parse::<ModelId>().unwrap_err();
        assert!(err.contains("unknown model 'gpt-5'"));
    }

    #[test]
    fn test_model_id_serde_uses_provider_identifier() {
        assert_eq!(
            serde_json::to_string(&ModelId::ClaudeSonnet).unwrap(),
            r#""claude-3-5-sonnet-20241022""#
        );
        assert_eq!(
            serde_json::from_str::<ModelId>(r#""gpt-4o-mini""#).unwrap(),
            ModelId::Gpt4oMini
        );
    }

    #[test]
    fn test_provider_serde() {
        assert_eq!(
            serde_json::to_string(&Provider::OpenAi).unwrap(),
            r#""openai""#
        );
        assert_eq!(
            serde_json::from_str::<Provider>(r#""anthropic""#).unwrap(),
            Provider::Anthropic
        );
    }

    #[test]
    fn test_selection_logic_lists_fallback() {
        let logic = ModelCatalog::selection_logic();
        assert_eq!(logic.len(), 5);
        assert!(logic["fallback"].contains("GPT-4o-mini"));
    }
}
