//! Provider abstractions: kinds, dialects, descriptors, and the adapter trait.

use crate::error::GatewayResult;
use crate::request::ChatCompletionRequest;
use crate::response::GatewayResponse;
use crate::streaming::ChatChunk;
use async_trait::async_trait;
use futures::stream::BoxStream;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported provider families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI chat completions API
    OpenAi,
    /// Azure-hosted OpenAI deployments
    AzureOpenAi,
    /// Anthropic messages API
    Anthropic,
}

impl ProviderKind {
    /// The request/response dialect this provider speaks.
    ///
    /// Azure shares the OpenAI dialect; translation between two providers is
    /// only needed when their dialects differ.
    #[must_use]
    pub fn dialect(self) -> Dialect {
        match self {
            Self::OpenAi | Self::AzureOpenAi => Dialect::OpenAi,
            Self::Anthropic => Dialect::Anthropic,
        }
    }

    /// Stable string form, used in logs and error payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::AzureOpenAi => "azure_openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = crate::error::GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "azure_openai" | "azure" => Ok(Self::AzureOpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(crate::error::GatewayError::unsupported_provider(other)),
        }
    }
}

/// Request/response schema family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// OpenAI-style parameter names and tool encodings
    OpenAi,
    /// Anthropic-style parameter names and tool encodings
    Anthropic,
}

/// Identifies and authenticates one provider adapter instance.
///
/// Immutable after construction. When `api_key` is absent, the adapter falls
/// back to its environment variable (`OPENAI_API_KEY`, `AZURE_OPENAI_API_KEY`,
/// or `ANTHROPIC_API_KEY`).
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Which provider family to construct
    pub kind: ProviderKind,
    /// Explicit API key; environment default used when absent
    pub api_key: Option<SecretString>,
    /// Base URL override (OpenAI) or resource endpoint (Azure)
    pub endpoint: Option<String>,
    /// Deployment name (Azure only)
    pub deployment: Option<String>,
    /// API version query parameter (Azure only)
    pub api_version: Option<String>,
}

impl ProviderDescriptor {
    /// Create a descriptor for the given provider kind.
    #[must_use]
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            api_key: None,
            endpoint: None,
            deployment: None,
            api_version: None,
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    /// Set the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the Azure deployment name.
    #[must_use]
    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    /// Set the Azure API version.
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }
}

/// Capability contract implemented by every provider adapter.
///
/// Adapters are single-attempt: they never retry or fall back themselves, and
/// they hold no per-call mutable state so one instance may serve concurrent
/// requests.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// The provider family this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Execute one non-streaming chat completion.
    ///
    /// The adapter forces non-streaming mode regardless of the request's
    /// `stream` flag and attaches a normalized [`crate::GatewayOutput`].
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<GatewayResponse>;

    /// Open one streaming chat completion.
    ///
    /// The returned stream is lazy and pull-based; it is not restartable and
    /// ends when the provider signals end-of-stream.
    async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>>;
}
