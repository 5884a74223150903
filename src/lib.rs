//! # LLM Gateway
//!
//! Unified multi-provider chat-completion gateway with retry and fallback.
//!
//! One request shape, one response envelope, multiple providers behind a
//! capability trait. The gateway dispatches to a primary provider under an
//! exponential-backoff retry budget and, when the primary leg is exhausted,
//! re-dispatches to a configured fallback provider, translating the request
//! across API dialects when they differ.
//!
//! ## Example
//!
//! ```no_run
//! use llm_gateway::{
//!     ChatCompletionRequest, ChatMessage, Gateway, GatewayConfig, ProviderDescriptor,
//!     ProviderKind,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::new()
//!     .with_max_retries(3)
//!     .with_fallback(
//!         "claude-3-5-sonnet-latest",
//!         ProviderDescriptor::new(ProviderKind::Anthropic),
//!     );
//! let gateway = Gateway::new(&ProviderDescriptor::new(ProviderKind::OpenAi), config)?;
//!
//! let request = ChatCompletionRequest::builder()
//!     .model("gpt-4o")
//!     .message(ChatMessage::system("Be concise."))
//!     .message(ChatMessage::user("What is a monad?"))
//!     .build()?;
//!
//! let response = gateway.chat_completion(&request).await?;
//! println!("{}", response.first_text().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod gateway;

pub use config::{FallbackConfig, GatewayConfig};
pub use gateway::Gateway;

// Re-export the core vocabulary so most callers need only this crate.
pub use gateway_core::{
    ChatChunk, ChatCompletionRequest, ChatCompletionRequestBuilder, ChatMessage, Choice,
    ChunkChoice, ChunkDelta, Dialect, FinishReason, GatewayError, GatewayOutput, GatewayResponse,
    GatewayResult, LLMProvider,
    MessageContent, MessageRole, ProviderDescriptor, ProviderKind, ResponseFormat,
    ResponseMessage, ToolCallPayload, ToolChoice, ToolInvocation, ToolSpec, Usage,
};
pub use gateway_providers::create_provider;
pub use gateway_resilience::{RetryConfig, RetryPolicy};
pub use gateway_translate::translate_request;
