//! Model catalog and provider adapters
//!
//! Provides the static model catalog, the provider adapter trait with its
//! OpenAI and Anthropic implementations, and the registry that resolves which
//! adapter owns a model.

pub mod anthropic;
pub mod catalog;
pub mod openai;
pub mod provider;
pub mod registry;

pub use anthropic::AnthropicAdapter;
pub use catalog::{ModelCatalog, ModelId, ModelInfo, Provider};
pub use openai::OpenAiAdapter;
pub use provider::{ProviderAdapter, ProviderError, ProviderResponse, TokenUsage};
pub use registry::ProviderRegistry;
