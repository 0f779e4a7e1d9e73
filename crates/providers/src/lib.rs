//! LLM Provider implementations for shopassist.
//!
//! All providers implement the `shopassist_core::Provider` trait.
//! The registry builds the configured backend on first use and caches it.

pub mod anthropic;
pub mod openai_compat;
pub mod registry;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use registry::{
    ConfiguredModels, ModelHandle, ModelResolver, ProviderRegistry, build_provider,
};
