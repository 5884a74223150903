//! # Gateway Providers
//!
//! Provider adapters for the LLM gateway.
//!
//! Each adapter implements the [`gateway_core::LLMProvider`] capability
//! contract against one vendor HTTP API:
//! - OpenAI chat completions
//! - Azure OpenAI deployments
//! - Anthropic messages
//!
//! Adapters are pure single-attempt executors: retry and fallback live in
//! the layers above.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod registry;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "azure")]
pub mod azure;

#[cfg(feature = "anthropic")]
pub mod anthropic;

// Re-export main types
pub use registry::create_provider;

#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAIProvider};

#[cfg(feature = "azure")]
pub use azure::{AzureOpenAIConfig, AzureOpenAIProvider};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicConfig, AnthropicProvider};
