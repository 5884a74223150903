//! # Gateway Resilience
//!
//! The retry/backoff engine for the LLM gateway: a bounded retry loop with
//! exponential backoff and jitter around a single provider call.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod retry;

// Re-export main types
pub use retry::{RetryConfig, RetryPolicy};
