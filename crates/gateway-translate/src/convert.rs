//! Request translation between dialects.
//!
//! Pure functions: the input request is never mutated, a new value is
//! returned. Callers invoke translation only when the two legs speak
//! different dialects; same-dialect pairs pass the request through unchanged,
//! including metadata and sampling parameters.

use gateway_core::{ChatCompletionRequest, ChatMessage, Dialect, MessageRole};
use tracing::debug;

/// Translate a request into the given target dialect.
#[must_use]
pub fn translate_request(
    request: &ChatCompletionRequest,
    target: Dialect,
) -> ChatCompletionRequest {
    match target {
        Dialect::Anthropic => to_anthropic_dialect(request),
        Dialect::OpenAi => to_openai_dialect(request),
    }
}

/// Translate an OpenAI-dialect request into the Anthropic dialect.
///
/// The system message (if any) moves into the top-level `system` field, roles
/// outside {user, assistant} are coerced to assistant, the token limit is
/// renamed, and OpenAI-exclusive fields are dropped.
#[must_use]
pub fn to_anthropic_dialect(request: &ChatCompletionRequest) -> ChatCompletionRequest {
    let mut out = request.clone();

    if let Some(system) = request
        .messages
        .iter()
        .find(|m| m.role == MessageRole::System)
    {
        out.system = Some(system.content.flatten_text());
    }

    out.messages = request
        .messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| {
            let role = match m.role {
                MessageRole::User => MessageRole::User,
                // function/tool turns have no Anthropic counterpart
                _ => MessageRole::Assistant,
            };
            ChatMessage {
                role,
                content: m.content.clone(),
                name: m.name.clone(),
            }
        })
        .collect();

    if let Some(limit) = request.max_completion_tokens {
        out.max_tokens = Some(limit);
    }

    out.n = None;
    out.max_completion_tokens = None;
    out.response_format = None;

    debug!(messages = out.messages.len(), "translated request to anthropic dialect");
    out
}

/// Translate an Anthropic-dialect request into the OpenAI dialect.
///
/// The top-level `system` field (if any) becomes a synthetic leading system
/// message, the token limit is renamed, and Anthropic-exclusive fields are
/// dropped.
#[must_use]
pub fn to_openai_dialect(request: &ChatCompletionRequest) -> ChatCompletionRequest {
    let mut out = request.clone();

    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system {
        messages.push(ChatMessage::system(system.clone()));
    }
    messages.extend(request.messages.iter().cloned());
    out.messages = messages;

    if let Some(limit) = request.max_tokens {
        out.max_completion_tokens = Some(limit);
    }

    out.system = None;
    out.top_k = None;
    out.stop_sequences = None;
    out.max_tokens = None;

    debug!(messages = out.messages.len(), "translated request to openai dialect");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{anthropic, openai};
    use gateway_core::{MessageContent, ResponseFormat, ToolChoice, ToolSpec};

    fn openai_style_request() -> ChatCompletionRequest {
        ChatCompletionRequest::builder()
            .model("gpt-4")
            .message(ChatMessage::system("be terse"))
            .message(ChatMessage::user("hi"))
            .message(ChatMessage {
                role: MessageRole::Function,
                content: MessageContent::Text("result".to_string()),
                name: Some("lookup".to_string()),
            })
            .temperature(0.7)
            .top_p(0.9)
            .metadata(serde_json::json!({"request": "abc"}))
            .tools(vec![ToolSpec::new("lookup")])
            .tool_choice(ToolChoice::Auto)
            .n(2)
            .max_completion_tokens(512)
            .response_format(ResponseFormat {
                format_type: "json_object".to_string(),
            })
            .build()
            .unwrap()
    }

    #[test]
    fn system_message_moves_to_system_field() {
        let translated = to_anthropic_dialect(&openai_style_request());
        assert_eq!(translated.system.as_deref(), Some("be terse"));
        assert!(translated
            .messages
            .iter()
            .all(|m| m.role != MessageRole::System));
    }

    #[test]
    fn non_chat_roles_coerce_to_assistant() {
        let translated = to_anthropic_dialect(&openai_style_request());
        let roles: Vec<MessageRole> = translated.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    }

    #[test]
    fn token_limit_renamed_and_openai_fields_dropped() {
        let translated = to_anthropic_dialect(&openai_style_request());
        assert_eq!(translated.max_tokens, Some(512));
        assert!(translated.max_completion_tokens.is_none());
        assert!(translated.n.is_none());
        assert!(translated.response_format.is_none());
    }

    #[test]
    fn system_field_becomes_leading_message() {
        let request = ChatCompletionRequest::builder()
            .model("claude-3-opus")
            .system("be terse")
            .message(ChatMessage::user("hi"))
            .max_tokens(512)
            .top_k(40)
            .stop_sequences(vec!["END".to_string()])
            .build()
            .unwrap();

        let translated = to_openai_dialect(&request);
        assert_eq!(translated.messages[0].role, MessageRole::System);
        assert_eq!(
            translated.messages[0].content,
            MessageContent::Text("be terse".to_string())
        );
        assert_eq!(translated.max_completion_tokens, Some(512));
        assert!(translated.system.is_none());
        assert!(translated.top_k.is_none());
        assert!(translated.stop_sequences.is_none());
        assert!(translated.max_tokens.is_none());
    }

    #[test]
    fn translation_does_not_mutate_input() {
        let request = openai_style_request();
        let before = serde_json::to_value(&request).unwrap();
        let _ = to_anthropic_dialect(&request);
        assert_eq!(serde_json::to_value(&request).unwrap(), before);
    }

    #[test]
    fn round_trip_preserves_model_agnostic_fields() {
        let request = openai_style_request();
        let there = to_anthropic_dialect(&request);
        let back = to_openai_dialect(&there);

        assert_eq!(back.model, request.model);
        assert_eq!(back.temperature, request.temperature);
        assert_eq!(back.top_p, request.top_p);
        assert_eq!(back.metadata, request.metadata);
        assert_eq!(back.tools, request.tools);
        assert_eq!(back.tool_choice, Some(ToolChoice::Auto));
        assert_eq!(back.max_completion_tokens, Some(512));

        // message content survives, system message restored at the front
        assert_eq!(back.messages[0].role, MessageRole::System);
        assert_eq!(
            back.messages[0].content,
            MessageContent::Text("be terse".to_string())
        );
        assert_eq!(
            back.messages[1].content,
            MessageContent::Text("hi".to_string())
        );
    }

    #[test]
    fn specific_tool_choice_crosses_dialects() {
        // OpenAI wire -> unified -> Anthropic wire
        let openai_wire: openai::WireToolChoice = serde_json::from_value(serde_json::json!({
            "type": "function",
            "function": {"name": "lookup"}
        }))
        .unwrap();
        let unified = openai::decode_tool_choice(&openai_wire).unwrap();
        assert_eq!(unified, ToolChoice::Specific("lookup".to_string()));

        let anthropic_wire = anthropic::encode_tool_choice(&unified).unwrap();
        assert_eq!(
            serde_json::to_value(&anthropic_wire).unwrap(),
            serde_json::json!({"type": "tool", "name": "lookup"})
        );

        // and back
        let unified = anthropic::decode_tool_choice(&anthropic_wire).unwrap();
        let openai_wire = openai::encode_tool_choice(&unified);
        assert_eq!(
            serde_json::to_value(&openai_wire).unwrap(),
            serde_json::json!({"type": "function", "function": {"name": "lookup"}})
        );
    }

    #[test]
    fn auto_survives_a_full_round_trip() {
        let unified = ToolChoice::Auto;
        let anthropic_wire = anthropic::encode_tool_choice(&unified).unwrap();
        let back = anthropic::decode_tool_choice(&anthropic_wire).unwrap();
        let openai_wire = openai::encode_tool_choice(&back);
        assert_eq!(openai::decode_tool_choice(&openai_wire), Some(ToolChoice::Auto));
    }
}
