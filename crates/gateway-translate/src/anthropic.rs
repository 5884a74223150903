//! Anthropic-dialect wire encodings for tools and tool choice.

use gateway_core::{ToolChoice, ToolSpec};
use serde::{Deserialize, Serialize};

/// Anthropic wire form of a tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name
    pub name: String,
    /// Tool description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the tool input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

/// Anthropic wire form of a tool-choice directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolChoice {
    /// "auto", "any", or "tool"
    #[serde(rename = "type")]
    pub choice_type: String,
    /// Tool name, required when `type == "tool"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Encode a unified tool definition into the Anthropic wire form.
#[must_use]
pub fn encode_tool(tool: &ToolSpec) -> Tool {
    Tool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool.parameters.clone(),
    }
}

/// Decode an Anthropic wire tool definition into the unified form.
#[must_use]
pub fn decode_tool(tool: Tool) -> ToolSpec {
    ToolSpec {
        name: tool.name,
        description: tool.description,
        parameters: tool.input_schema,
    }
}

/// Encode a unified tool-choice directive into the Anthropic wire form.
///
/// `ToolChoice::None` has no counterpart in the mapping table and is left
/// unset.
#[must_use]
pub fn encode_tool_choice(choice: &ToolChoice) -> Option<WireToolChoice> {
    match choice {
        ToolChoice::Auto => Some(WireToolChoice {
            choice_type: "auto".to_string(),
            name: None,
        }),
        ToolChoice::Required => Some(WireToolChoice {
            choice_type: "any".to_string(),
            name: None,
        }),
        ToolChoice::Specific(name) => Some(WireToolChoice {
            choice_type: "tool".to_string(),
            name: Some(name.clone()),
        }),
        ToolChoice::None => None,
    }
}

/// Decode an Anthropic wire tool-choice directive into the unified form.
///
/// Unknown types are left unset.
#[must_use]
pub fn decode_tool_choice(choice: &WireToolChoice) -> Option<ToolChoice> {
    match choice.choice_type.as_str() {
        "auto" => Some(ToolChoice::Auto),
        "any" => Some(ToolChoice::Required),
        "tool" => choice.name.clone().map(ToolChoice::Specific),
        _ => None,
    }
}
