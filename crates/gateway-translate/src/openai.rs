//! OpenAI-dialect wire encodings for tools and tool choice.

use gateway_core::{ToolChoice, ToolSpec};
use serde::{Deserialize, Serialize};

/// OpenAI wire form of a tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Always "function"
    #[serde(rename = "type")]
    pub tool_type: String,
    /// The wrapped function definition
    pub function: Function,
}

/// OpenAI function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Function description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// OpenAI wire form of a tool-choice directive.
///
/// Either a bare mode string (`"auto"`, `"required"`, `"none"`) or a named
/// function selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireToolChoice {
    /// Bare mode string
    Mode(String),
    /// Named function selector
    Named {
        /// Always "function"
        #[serde(rename = "type")]
        choice_type: String,
        /// Function to call
        function: NamedFunction,
    },
}

/// Function selector payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFunction {
    /// Function name
    pub name: String,
}

/// Encode a unified tool definition into the OpenAI wire form.
#[must_use]
pub fn encode_tool(tool: &ToolSpec) -> Tool {
    Tool {
        tool_type: "function".to_string(),
        function: Function {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// Decode an OpenAI wire tool definition into the unified form.
#[must_use]
pub fn decode_tool(tool: Tool) -> ToolSpec {
    ToolSpec {
        name: tool.function.name,
        description: tool.function.description,
        parameters: tool.function.parameters,
    }
}

/// Encode a unified tool-choice directive into the OpenAI wire form.
#[must_use]
pub fn encode_tool_choice(choice: &ToolChoice) -> WireToolChoice {
    match choice {
        ToolChoice::Auto => WireToolChoice::Mode("auto".to_string()),
        ToolChoice::Required => WireToolChoice::Mode("required".to_string()),
        ToolChoice::None => WireToolChoice::Mode("none".to_string()),
        ToolChoice::Specific(name) => WireToolChoice::Named {
            choice_type: "function".to_string(),
            function: NamedFunction { name: name.clone() },
        },
    }
}

/// Decode an OpenAI wire tool-choice directive into the unified form.
///
/// Unknown mode strings are left unset, matching the translation table.
#[must_use]
pub fn decode_tool_choice(choice: &WireToolChoice) -> Option<ToolChoice> {
    match choice {
        WireToolChoice::Mode(mode) => match mode.as_str() {
            "auto" => Some(ToolChoice::Auto),
            "required" => Some(ToolChoice::Required),
            "none" => Some(ToolChoice::None),
            _ => None,
        },
        WireToolChoice::Named { function, .. } => {
            Some(ToolChoice::Specific(function.name.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_encodes_to_function_wrapper() {
        let tool = ToolSpec::new("lookup")
            .with_description("Find things")
            .with_parameters(serde_json::json!({"type": "object", "properties": {}}));
        let wire = encode_tool(&tool);

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "lookup");
        assert_eq!(json["function"]["parameters"]["type"], "object");

        assert_eq!(decode_tool(wire), tool);
    }

    #[test]
    fn specific_choice_encodes_to_named_function() {
        let wire = encode_tool_choice(&ToolChoice::Specific("lookup".to_string()));
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "lookup");
    }

    #[test]
    fn mode_strings_round_trip() {
        for choice in [ToolChoice::Auto, ToolChoice::Required, ToolChoice::None] {
            let wire = encode_tool_choice(&choice);
            assert_eq!(decode_tool_choice(&wire), Some(choice));
        }
    }

    #[test]
    fn unknown_mode_is_unset() {
        let wire = WireToolChoice::Mode("sometimes".to_string());
        assert_eq!(decode_tool_choice(&wire), None);
    }
}
