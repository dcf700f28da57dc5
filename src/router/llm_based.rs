//! LLM-based classification
//!
//! Sends one structured prompt to a lightweight model and expects exactly one
//! of `code`, `creative` or `general` back. Anything else is an error so the
//! caller can fall back to keyword matching.

use super::Category;
use crate::models::{ModelId, ProviderError, ProviderRegistry};
use std::sync::Arc;

/// Characters of a bad classifier answer kept in the error
const MAX_RESPONSE_PREVIEW: usize = 100;

/// Why LLM classification produced no category
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// Provider call failed (network, status, timeout, empty body)
    #[error("classification call failed: {0}")]
    Provider(#[from] ProviderError),

    /// Model answered something other than the three labels
    #[error("classifier returned unrecognized label ({response_length} bytes): {response}")]
    Unrecognized {
        response: String,
        response_length: usize,
    },
}

/// Classifier that asks an LLM for the query category
#[derive(Debug, Clone)]
pub struct LlmClassifier {
    registry: Arc<ProviderRegistry>,
    model: ModelId,
}

impl LlmClassifier {
    /// Create a classifier running on `model`
    ///
    /// `model` should be a lightweight catalog entry; config validation
    /// enforces that for the configured classification model.
    pub fn new(registry: Arc<ProviderRegistry>, model: ModelId) -> Self {
        Self { registry, model }
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Ask the model for the query's category
    pub async fn classify(&self, query: &str) -> Result<Category, ClassificationError> {
        let prompt = build_classification_prompt(query);
        let response = self.registry.query(&prompt, self.model).await?;

        tracing::debug!(
            model = %self.model,
            tokens = response.usage.tokens,
            response_length = response.text.len(),
            "Classification call completed"
        );

        parse_category(&response.text)
    }
}

/// Build the classification prompt for a query
pub fn build_classification_prompt(query: &str) -> String {
    format!(
        r#"Analyze the following query and classify it into one of three categories:

Query: "{query}"

Respond with ONLY one of these three options:
- "code" - if the query is about programming, coding, software development, algorithms, APIs, databases, technical implementation
- "creative" - if the query is about creative writing, storytelling, poems, fiction, artistic expression, creative content
- "general" - if the query is about general topics, factual information, or doesn't fit the above categories

Examples:
- "Write a Python function" → code
- "Debug this JavaScript error" → code
- "Write a story about a robot" → creative
- "Compose a poem about nature" → creative
- "What's the weather like?" → general
- "Explain quantum physics" → general

Response:"#
    )
}

/// Parse a classifier answer
///
/// The answer is trimmed and lower-cased; surrounding quotes and a trailing
/// period are tolerated. Any other text is [`ClassificationError::Unrecognized`].
pub fn parse_category(response: &str) -> Result<Category, ClassificationError> {
    let normalized = response
        .trim()
        .trim_end_matches('.')
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_lowercase();

    match normalized.as_str() {
        "code" => Ok(Category::Code),
        "creative" => Ok(Category::Creative),
        "general" => Ok(Category::General),
        _ => Err(ClassificationError::Unrecognized {
            response: response.chars().take(MAX_RESPONSE_PREVIEW).collect(),
            response_length: response.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Provider, ProviderAdapter, ProviderResponse, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedAdapter {
        reply: Result<&'static str, ()>,
        prompts: Mutex<Vec<(String, ModelId)>>,
    }

    impl ScriptedAdapter {
        fn new(reply: Result<&'static str, ()>) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn provider(&self) -> Provider {
            Provider::OpenAi
        }

        async fn query(
            &self,
            prompt: &str,
            model: ModelId,
        ) -> Result<ProviderResponse, ProviderError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), model));
            match self.reply {
                Ok(text) => Ok(ProviderResponse {
                    text: text.to_string(),
                    usage: TokenUsage::exact(12),
                }),
                Err(()) => Err(ProviderError::Status {
                    provider: Provider::OpenAi,
                    status: 500,
                    body: "boom".to_string(),
                }),
            }
        }
    }

    fn classifier_with(adapter: Arc<ScriptedAdapter>) -> LlmClassifier {
        let registry = ProviderRegistry::new().with_adapter(adapter);
        LlmClassifier::new(Arc::new(registry), ModelId::Gpt4oMini)
    }

    #[test]
    fn test_parse_exact_labels() {
        assert_eq!(parse_category("code").unwrap(), Category::Code);
        assert_eq!(parse_category("creative").unwrap(), Category::Creative);
        assert_eq!(parse_category("general").unwrap(), Category::General);
    }

    #[test]
    fn test_parse_trims_and_lowercases() {
        assert_eq!(parse_category("  Code\n").unwrap(), Category::Code);
        assert_eq!(parse_category("CREATIVE").unwrap(), Category::Creative);
        assert_eq!(parse_category("\"general\"").unwrap(), Category::General);
        assert_eq!(parse_category("code.").unwrap(), Category::Code);
    }

    #[test]
    fn test_parse_rejects_verbose_answers() {
        let err = parse_category("I think this is code").unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::Unrecognized {
                response_length: 20,
                ..
            }
        ));
        assert!(parse_category("").is_err());
        assert!(parse_category("programming").is_err());
    }

    #[test]
    fn test_unrecognized_preview_is_truncated() {
        let long = "x".repeat(1000);
        match parse_category(&long).unwrap_err() {
            ClassificationError::Unrecognized {
                response,
                response_length,
            } => {
                assert_eq!(response.len(), MAX_RESPONSE_PREVIEW);
                assert_eq!(response_length, 1000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_prompt_embeds_query_and_labels() {
        let prompt = build_classification_prompt("sort a vector");
        assert!(prompt.contains(r#"Query: "sort a vector""#));
        for label in ["\"code\"", "\"creative\"", "\"general\""] {
            assert!(prompt.contains(label));
        }
    }

    #[tokio::test]
    async fn test_classify_uses_configured_model() {
        let adapter = Arc::new(ScriptedAdapter::new(Ok("creative")));
        let classifier = classifier_with(adapter.clone());

        let category = classifier.classify("a poem please").await.unwrap();
        assert_eq!(category, Category::Creative);

        let prompts = adapter.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, ModelId::Gpt4oMini);
        assert!(prompts[0].0.contains("a poem please"));
    }

    #[tokio::test]
    async fn test_classify_surfaces_provider_error() {
        let classifier = classifier_with(Arc::new(ScriptedAdapter::new(Err(()))));
        let err = classifier.classify("anything").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Provider(_)));
    }
}
