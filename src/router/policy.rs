//! Model selection policy
//!
//! Fixed priority list, no scoring:
//! 1. `code` → GPT-4o
//! 2. `creative` → Claude Sonnet
//! 3. `simple` → GPT-4o-mini
//! 4. `complex` → Claude Sonnet
//!
//! Complex general queries share the creative model on purpose: it is the
//! stronger reasoning model of the two flagships.

use super::{Category, Complexity, ModelChoice};
use crate::models::ModelId;

/// Pick the model for a classified query
pub fn select(category: Category, complexity: Complexity) -> ModelChoice {
    let model = match (category, complexity) {
        (Category::Code, _) => ModelId::Gpt4o,
        (Category::Creative, _) => ModelId::ClaudeSonnet,
        (Category::General, Complexity::Simple) => ModelId::Gpt4oMini,
        (Category::General, Complexity::Complex) => ModelId::ClaudeSonnet,
    };

    ModelChoice::from(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use proptest::prelude::*;

    #[test]
    fn test_code_routes_to_gpt4o_regardless_of_complexity() {
        for complexity in [Complexity::Simple, Complexity::Complex] {
            let choice = select(Category::Code, complexity);
            assert_eq!(choice.model, ModelId::Gpt4o);
            assert_eq!(choice.provider, Provider::OpenAi);
        }
    }

    #[test]
    fn test_creative_routes_to_sonnet_regardless_of_complexity() {
        for complexity in [Complexity::Simple, Complexity::Complex] {
            let choice = select(Category::Creative, complexity);
            assert_eq!(choice.model, ModelId::ClaudeSonnet);
            assert_eq!(choice.provider, Provider::Anthropic);
        }
    }

    #[test]
    fn test_simple_general_routes_to_lowest_cost() {
        let choice = select(Category::General, Complexity::Simple);
        assert_eq!(choice.model, ModelId::Gpt4oMini);
        assert_eq!(
            choice.model,
            crate::models::ModelCatalog::default().lowest_cost()
        );
    }

    #[test]
    fn test_complex_general_routes_to_creative_model() {
        assert_eq!(
            select(Category::General, Complexity::Complex),
            select(Category::Creative, Complexity::Complex)
        );
    }

    #[test]
    fn test_policy_only_picks_flagship_or_lowest_cost() {
        let catalog = crate::models::ModelCatalog::default();
        for category in [Category::Code, Category::Creative, Category::General] {
            for complexity in [Complexity::Simple, Complexity::Complex] {
                let model = select(category, complexity).model;
                assert!(
                    catalog.flagship().any(|m| m == model) || model == catalog.lowest_cost(),
                    "{:?}/{:?} picked {}",
                    category,
                    complexity,
                    model
                );
            }
        }
    }

    proptest! {
        #[test]
        fn general_queries_switch_model_at_word_threshold(words in 0usize..200) {
            let query = vec!["word"; words].join(" ");
            let model = select(Category::General, Complexity::of(&query)).model;
            if words < crate::router::COMPLEXITY_WORD_THRESHOLD {
                prop_assert_eq!(model, ModelId::Gpt4oMini);
            } else {
                prop_assert_eq!(model, ModelId::ClaudeSonnet);
            }
        }
    }
}
