//! Query classifier combining LLM and keyword strategies
//!
//! Tries the LLM classifier first when one is configured and falls back to
//! keyword matching on any failure. The fallback is an explicit branch on the
//! LLM result.

use super::{
    Classification, ClassificationSource, Complexity, KeywordClassifier, LlmClassifier,
};

/// Classifies queries into category and complexity
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    llm: Option<LlmClassifier>,
    keywords: KeywordClassifier,
}

impl QueryClassifier {
    /// Create a classifier; `None` disables the LLM strategy
    pub fn new(llm: Option<LlmClassifier>) -> Self {
        Self {
            llm,
            keywords: KeywordClassifier::new(),
        }
    }

    /// Classifier that never calls a provider
    pub fn keyword_only() -> Self {
        Self::new(None)
    }

    pub fn uses_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Classify a query
    ///
    /// Never fails: complexity is pure, and category falls back to keywords
    /// whenever the LLM strategy is unavailable or errors.
    pub async fn classify(&self, query: &str) -> Classification {
        let complexity = Complexity::of(query);

        let (category, source) = match &self.llm {
            None => (self.keywords.classify(query), ClassificationSource::Keyword),
            Some(llm) => match llm.classify(query).await {
                Ok(category) => (category, ClassificationSource::Llm),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        classification_model = %llm.model(),
                        query_preview = %query.chars().take(100).collect::<String>(),
                        "LLM classification unavailable, falling back to keyword matching"
                    );
                    (self.keywords.classify(query), ClassificationSource::Keyword)
                }
            },
        };

        tracing::debug!(
            category = category.as_str(),
            complexity = complexity.as_str(),
            source = source.as_str(),
            "Query classified"
        );

        Classification::new(category, complexity, source)
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::keyword_only()
    }
}
