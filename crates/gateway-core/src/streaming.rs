//! Streaming chunk types.

use crate::provider::ProviderKind;
use crate::request::MessageRole;
use crate::response::FinishReason;
use serde::{Deserialize, Serialize};

/// One streamed completion chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Vendor chunk identifier
    pub id: String,
    /// Model producing the stream
    pub model: String,
    /// Unix timestamp of creation
    pub created: i64,
    /// Provider the chunk came from
    pub provider: ProviderKind,
    /// Incremental choices
    pub choices: Vec<ChunkChoice>,
}

/// One incremental choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,
    /// Incremental delta
    pub delta: ChunkDelta,
    /// Set on the final chunk of a choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Incremental message content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role, present on the first chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
    /// Text fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChunkDelta {
    /// A text-only delta.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            role: None,
            content: Some(content.into()),
        }
    }
}
