//! Query classification and model selection
//!
//! A query is classified into a [`Category`] (by an LLM call with keyword
//! fallback) and a [`Complexity`] bucket (by word count), then mapped to a
//! [`ModelChoice`] by the fixed selection policy.

pub mod hybrid;
pub mod llm_based;
pub mod policy;
pub mod rule_based;

pub use hybrid::QueryClassifier;
pub use llm_based::{ClassificationError, LlmClassifier};
pub use policy::select;
pub use rule_based::KeywordClassifier;

use crate::models::{ModelId, Provider};
use serde::{Deserialize, Serialize};

/// Queries with fewer words than this are `Simple`
pub const COMPLEXITY_WORD_THRESHOLD: usize = 50;

/// Intent of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Code,
    Creative,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Creative => "creative",
            Self::General => "general",
        }
    }
}

/// Length bucket of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Complex,
}

impl Complexity {
    /// Bucket a query by whitespace-separated word count
    pub fn of(query: &str) -> Self {
        if query.split_whitespace().count() < COMPLEXITY_WORD_THRESHOLD {
            Self::Simple
        } else {
            Self::Complex
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Complex => "complex",
        }
    }
}

/// Which strategy produced the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    /// LLM classification call succeeded
    Llm,
    /// Keyword matching (LLM disabled, failed, or answered nonsense)
    Keyword,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Keyword => "keyword",
        }
    }
}

/// Per-request classification, never cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub complexity: Complexity,
    pub source: ClassificationSource,
}

impl Classification {
    pub fn new(category: Category, complexity: Complexity, source: ClassificationSource) -> Self {
        Self {
            category,
            complexity,
            source,
        }
    }
}

/// Model picked for a request, with the provider whose adapter serves it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelChoice {
    pub model: ModelId,
    pub provider: Provider,
}

impl From<ModelId> for ModelChoice {
    fn from(model: ModelId) -> Self {
        Self {
            model,
            provider: model.provider(),
        }
    }
}
