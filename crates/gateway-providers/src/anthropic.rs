//! Anthropic provider adapter.
//!
//! Speaks the messages API. The messages dialect differs from chat
//! completions in several ways the adapter absorbs: system prompts travel in
//! a dedicated field, `max_tokens` is mandatory, and responses carry content
//! blocks instead of choices.

use async_stream::try_stream;
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use gateway_core::{
    ChatChunk, ChatCompletionRequest, Choice, ChunkChoice, ChunkDelta, FinishReason, GatewayError,
    GatewayOutput, GatewayResponse, GatewayResult, LLMProvider, MessageContent, MessageRole,
    ProviderDescriptor, ProviderKind, ResponseMessage, ToolCallPayload, Usage,
};
use reqwest::{Client, RequestBuilder};
use reqwest_eventsource::{Event, EventSource};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default Anthropic API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// API version header value sent with every request.
pub const API_VERSION: &str = "2023-06-01";

/// Token limit used when a request sets none. The messages API rejects
/// requests without `max_tokens`.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic adapter configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key sent via the `x-api-key` header
    pub api_key: SecretString,
    /// Base URL, overridable for proxies and tests
    pub base_url: String,
    /// Per-attempt HTTP timeout
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Create a configuration with the default base URL.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: crate::registry::DEFAULT_TIMEOUT,
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a configuration from a descriptor.
    ///
    /// # Errors
    /// Fails when neither the descriptor nor `ANTHROPIC_API_KEY` supplies a
    /// key.
    pub fn from_descriptor(
        descriptor: &ProviderDescriptor,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let api_key =
            crate::registry::resolve_api_key(descriptor.api_key.clone(), "ANTHROPIC_API_KEY")?;
        Ok(Self {
            api_key,
            base_url: descriptor
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
        })
    }
}

/// Anthropic provider adapter.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Create the adapter.
    ///
    /// # Errors
    /// Returns an internal error if the HTTP client cannot be built.
    pub fn new(config: AnthropicConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn request_builder(&self, wire: &WireRequest) -> RequestBuilder {
        self.client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(wire)
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<GatewayResponse> {
        let wire = build_wire_request(request, false);
        debug!(model = %request.model, url = %self.messages_url(), "sending message request");

        let response = self
            .request_builder(&wire)
            .send()
            .await
            .map_err(|e| map_transport_error(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, &body));
        }

        let wire_response: WireResponse = response
            .json()
            .await
            .map_err(|e| map_transport_error(&e))?;

        normalize_response(wire_response)
    }

    async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>> {
        let wire = build_wire_request(request, true);
        debug!(model = %request.model, "opening message stream");

        let event_source = EventSource::new(self.request_builder(&wire)).map_err(|e| {
            GatewayError::streaming(format!("failed to open event source: {e}"))
        })?;

        Ok(chunk_stream(event_source))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<gateway_translate::anthropic::Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<gateway_translate::anthropic::WireToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: MessageContent,
}

fn build_wire_request(request: &ChatCompletionRequest, stream: bool) -> WireRequest {
    // The messages API accepts only user and assistant turns. A system
    // instruction may arrive either in the dedicated field (translated
    // requests) or as a role=system message (direct dispatch); both end up
    // in the wire system field, never in the turn list.
    let system = request.system.clone().or_else(|| {
        request
            .messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.flatten_text())
    });

    let messages = request
        .messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| WireMessage {
            role: match m.role {
                MessageRole::User => "user".to_string(),
                _ => "assistant".to_string(),
            },
            content: m.content.clone(),
        })
        .collect();

    WireRequest {
        model: request.model.clone(),
        messages,
        max_tokens: request.token_limit().unwrap_or(DEFAULT_MAX_TOKENS),
        system,
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: request.top_k,
        stop_sequences: request.stop_sequences.clone(),
        tools: request
            .tools
            .as_ref()
            .map(|tools| tools.iter().map(gateway_translate::anthropic::encode_tool).collect()),
        tool_choice: request
            .tool_choice
            .as_ref()
            .and_then(gateway_translate::anthropic::encode_tool_choice),
        metadata: request.metadata.clone(),
        stream,
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    id: String,
    model: String,
    content: Vec<WireContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

fn map_stop_reason(reason: &str) -> Option<FinishReason> {
    match reason {
        "end_turn" | "stop_sequence" => Some(FinishReason::Stop),
        "max_tokens" => Some(FinishReason::Length),
        "tool_use" => Some(FinishReason::ToolCalls),
        _ => None,
    }
}

/// Fold content blocks into a single choice and attach the output tag.
fn normalize_response(wire: WireResponse) -> GatewayResult<GatewayResponse> {
    if wire.content.is_empty() {
        return Err(GatewayError::empty_response(
            ProviderKind::Anthropic.as_str(),
        ));
    }

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();
    for block in wire.content {
        match block {
            WireContentBlock::Text { text } => text_parts.push(text),
            WireContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCallPayload {
                id,
                name,
                arguments: input.to_string(),
            }),
            WireContentBlock::Unknown => trace!("skipping unrecognized content block"),
        }
    }

    let content = if text_parts.is_empty() {
        None
    } else {
        Some(text_parts.join(""))
    };
    if content.is_none() && tool_calls.is_empty() {
        return Err(GatewayError::empty_response(
            ProviderKind::Anthropic.as_str(),
        ));
    }

    let choice = Choice {
        index: 0,
        message: ResponseMessage {
            role: MessageRole::Assistant,
            content,
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
        },
        finish_reason: wire.stop_reason.as_deref().and_then(map_stop_reason),
    };
    let output = GatewayOutput::from_choice(&choice);

    Ok(GatewayResponse {
        id: wire.id,
        model: wire.model,
        created: Utc::now().timestamp(),
        provider: ProviderKind::Anthropic,
        choices: vec![choice],
        usage: wire.usage.map(|u| Usage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        }),
        output,
    })
}

#[derive(Debug, Deserialize)]
struct WireErrorBody {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

fn map_status_error(status: u16, body: &str) -> GatewayError {
    let (message, code) = match serde_json::from_str::<WireErrorBody>(body) {
        Ok(parsed) => (parsed.error.message, Some(parsed.error.error_type)),
        Err(_) => (format!("HTTP {status}: {body}"), None),
    };
    GatewayError::provider(
        ProviderKind::Anthropic.as_str(),
        message,
        Some(status),
        code,
    )
}

fn map_transport_error(error: &reqwest::Error) -> GatewayError {
    let code = if error.is_timeout() {
        Some("timeout".to_string())
    } else if error.is_connect() {
        Some("connection_reset".to_string())
    } else {
        None
    };
    GatewayError::provider(
        ProviderKind::Anthropic.as_str(),
        format!("request failed: {error}"),
        error.status().map(|s| s.as_u16()),
        code,
    )
}

// ============================================================================
// Streaming
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamEvent {
    #[serde(rename = "message_start")]
    MessageStart { message: StreamMessageStart },
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: u32, delta: StreamDelta },
    #[serde(rename = "message_delta")]
    MessageDelta { delta: StreamMessageDelta },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamMessageStart {
    id: String,
    model: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct StreamMessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Decode a messages-API SSE stream into gateway chunks.
///
/// Text deltas become content chunks; the final `message_delta` carries the
/// stop reason and `message_stop` ends the stream.
fn chunk_stream(event_source: EventSource) -> BoxStream<'static, GatewayResult<ChatChunk>> {
    let stream = try_stream! {
        let mut es = event_source;
        let mut id = String::new();
        let mut model = String::new();
        let created = Utc::now().timestamp();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => trace!("stream opened"),
                Ok(Event::Message(msg)) => {
                    let parsed: StreamEvent = match serde_json::from_str(&msg.data) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            warn!(error = %e, data = %msg.data, "failed to parse stream event");
                            continue;
                        }
                    };
                    match parsed {
                        StreamEvent::MessageStart { message } => {
                            id = message.id;
                            model = message.model;
                            yield ChatChunk {
                                id: id.clone(),
                                model: model.clone(),
                                created,
                                provider: ProviderKind::Anthropic,
                                choices: vec![ChunkChoice {
                                    index: 0,
                                    delta: ChunkDelta {
                                        role: Some(MessageRole::Assistant),
                                        content: None,
                                    },
                                    finish_reason: None,
                                }],
                            };
                        }
                        StreamEvent::ContentBlockDelta { index, delta } => {
                            if let StreamDelta::TextDelta { text } = delta {
                                yield ChatChunk {
                                    id: id.clone(),
                                    model: model.clone(),
                                    created,
                                    provider: ProviderKind::Anthropic,
                                    choices: vec![ChunkChoice {
                                        index,
                                        delta: ChunkDelta {
                                            role: None,
                                            content: Some(text),
                                        },
                                        finish_reason: None,
                                    }],
                                };
                            }
                        }
                        StreamEvent::MessageDelta { delta } => {
                            if let Some(reason) = delta.stop_reason.as_deref() {
                                yield ChatChunk {
                                    id: id.clone(),
                                    model: model.clone(),
                                    created,
                                    provider: ProviderKind::Anthropic,
                                    choices: vec![ChunkChoice {
                                        index: 0,
                                        delta: ChunkDelta {
                                            role: None,
                                            content: None,
                                        },
                                        finish_reason: map_stop_reason(reason),
                                    }],
                                };
                            }
                        }
                        StreamEvent::MessageStop => break,
                        StreamEvent::Other => trace!("skipping stream event"),
                    }
                }
                Err(e) => {
                    Err(GatewayError::streaming(format!("stream error: {e}")))?;
                }
            }
        }
    };
    Box::pin(stream)
}
