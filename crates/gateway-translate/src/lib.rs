//! # Gateway Translate
//!
//! Stateless, bidirectional schema translation between the OpenAI-style and
//! Anthropic-style request dialects.
//!
//! This crate provides:
//! - Whole-request translation between dialects ([`translate_request`])
//! - Per-dialect wire encodings for tool definitions and tool-choice
//!   directives, consumed by the provider adapters

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anthropic;
pub mod convert;
pub mod openai;

// Re-export main entry points
pub use convert::{to_anthropic_dialect, to_openai_dialect, translate_request};
