//! Normalized completion types.
//!
//! Every adapter maps its vendor response into [`GatewayResponse`] and
//! attaches a [`GatewayOutput`] tag so callers see one envelope regardless of
//! which provider answered.

use crate::provider::ProviderKind;
use crate::request::MessageRole;
use serde::{Deserialize, Serialize};

/// Normalized chat completion returned by every adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Vendor response identifier
    pub id: String,
    /// Model that produced the completion
    pub model: String,
    /// Unix timestamp of creation
    pub created: i64,
    /// Provider the completion came from
    pub provider: ProviderKind,
    /// Completion choices (Anthropic responses normalize to one)
    pub choices: Vec<Choice>,
    /// Token accounting, when the vendor reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Normalized output envelope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<GatewayOutput>,
}

impl GatewayResponse {
    /// Text of the first choice, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

/// One completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Choice index
    pub index: u32,
    /// The generated message
    pub message: ResponseMessage,
    /// Why generation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Message produced by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Author role (always assistant for completions)
    pub role: MessageRole,
    /// Text content, absent for pure tool-call turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallPayload>>,
}

/// One tool call as reported by the vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallPayload {
    /// Vendor-assigned call identifier
    pub id: String,
    /// Tool name
    pub name: String,
    /// Raw JSON argument string
    pub arguments: String,
}

/// Normalized reason generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop or stop sequence
    Stop,
    /// Token limit reached
    Length,
    /// The model requested tool invocation
    ToolCalls,
    /// Vendor content filter triggered
    ContentFilter,
}

/// Token accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Sum of both
    pub total_tokens: u32,
}

/// Normalized output envelope attached to every successful completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayOutput {
    /// Plain text completion
    Text {
        /// The completion text
        content: String,
    },
    /// The model asked for tool invocation
    ToolCalls {
        /// Requested invocations
        calls: Vec<ToolInvocation>,
    },
}

/// One normalized tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name
    pub tool_name: String,
    /// Parsed arguments; kept as a raw string value when parsing fails
    pub arguments: serde_json::Value,
}

impl GatewayOutput {
    /// Compute the output tag for a choice.
    ///
    /// When the choice finished on a tool call, the envelope is built from
    /// the **last** reported call; otherwise the text content is used.
    #[must_use]
    pub fn from_choice(choice: &Choice) -> Option<Self> {
        if choice.finish_reason == Some(FinishReason::ToolCalls) {
            let call = choice
                .message
                .tool_calls
                .as_ref()
                .and_then(|calls| calls.last())?;
            let arguments = serde_json::from_str(&call.arguments)
                .unwrap_or_else(|_| serde_json::Value::String(call.arguments.clone()));
            return Some(Self::ToolCalls {
                calls: vec![ToolInvocation {
                    tool_name: call.name.clone(),
                    arguments,
                }],
            });
        }
        choice.message.content.as_ref().map(|content| Self::Text {
            content: content.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_choice(calls: Vec<ToolCallPayload>) -> Choice {
        Choice {
            index: 0,
            message: ResponseMessage {
                role: MessageRole::Assistant,
                content: None,
                tool_calls: Some(calls),
            },
            finish_reason: Some(FinishReason::ToolCalls),
        }
    }

    #[test]
    fn output_uses_last_tool_call() {
        let choice = tool_choice(vec![
            ToolCallPayload {
                id: "call_1".to_string(),
                name: "first".to_string(),
                arguments: "{}".to_string(),
            },
            ToolCallPayload {
                id: "call_2".to_string(),
                name: "second".to_string(),
                arguments: r#"{"q":"x"}"#.to_string(),
            },
        ]);

        let output = GatewayOutput::from_choice(&choice).unwrap();
        match output {
            GatewayOutput::ToolCalls { calls } => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].tool_name, "second");
                assert_eq!(calls[0].arguments, serde_json::json!({"q": "x"}));
            }
            GatewayOutput::Text { .. } => panic!("expected tool calls"),
        }
    }

    #[test]
    fn output_falls_back_to_raw_arguments_on_bad_json() {
        let choice = tool_choice(vec![ToolCallPayload {
            id: "call_1".to_string(),
            name: "lookup".to_string(),
            arguments: "not-json".to_string(),
        }]);

        let output = GatewayOutput::from_choice(&choice).unwrap();
        match output {
            GatewayOutput::ToolCalls { calls } => {
                assert_eq!(calls[0].arguments, serde_json::json!("not-json"));
            }
            GatewayOutput::Text { .. } => panic!("expected tool calls"),
        }
    }

    #[test]
    fn output_is_text_for_plain_completion() {
        let choice = Choice {
            index: 0,
            message: ResponseMessage {
                role: MessageRole::Assistant,
                content: Some("hello".to_string()),
                tool_calls: None,
            },
            finish_reason: Some(FinishReason::Stop),
        };
        assert_eq!(
            GatewayOutput::from_choice(&choice),
            Some(GatewayOutput::Text {
                content: "hello".to_string()
            })
        );
    }
}
