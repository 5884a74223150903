//! # Gateway Core
//!
//! Core types, traits, and error handling for the LLM gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - The unified chat-completion request and its building blocks
//! - The normalized completion envelope and streaming chunks
//! - The provider capability trait and descriptors
//! - The error taxonomy

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod provider;
pub mod request;
pub mod response;
pub mod streaming;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult};
pub use provider::{Dialect, LLMProvider, ProviderDescriptor, ProviderKind};
pub use request::{
    ChatCompletionRequest, ChatCompletionRequestBuilder, ChatMessage, MessageContent, MessageRole,
    ResponseFormat, ToolChoice, ToolSpec,
};
pub use response::{
    Choice, FinishReason, GatewayOutput, GatewayResponse, ResponseMessage, ToolCallPayload,
    ToolInvocation, Usage,
};
pub use streaming::{ChatChunk, ChunkChoice, ChunkDelta};
