//! Azure OpenAI provider adapter.
//!
//! Serves the OpenAI dialect from deployment-scoped URLs with `api-key`
//! header authentication. Wire encoding and decoding are shared with the
//! OpenAI adapter.

use async_trait::async_trait;
use futures::stream::BoxStream;
use gateway_core::{
    ChatChunk, ChatCompletionRequest, GatewayError, GatewayResponse, GatewayResult, LLMProvider,
    ProviderDescriptor, ProviderKind,
};
use reqwest::{Client, RequestBuilder};
use reqwest_eventsource::EventSource;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

use crate::openai::{
    build_wire_request, map_status_error, map_transport_error, normalize_response,
    openai_chunk_stream, WireRequest, WireResponse,
};

/// Default Azure OpenAI API version.
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";

/// Azure OpenAI adapter configuration.
#[derive(Debug, Clone)]
pub struct AzureOpenAIConfig {
    /// API key sent via the `api-key` header
    pub api_key: SecretString,
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    /// Deployment name the model is served under
    pub deployment: String,
    /// API version query parameter
    pub api_version: String,
    /// Per-attempt HTTP timeout
    pub timeout: Duration,
}

impl AzureOpenAIConfig {
    /// Create a configuration with the default API version.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: crate::registry::DEFAULT_TIMEOUT,
        }
    }

    /// Override the API version.
    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
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
    /// Fails when the endpoint or deployment is missing, or when neither the
    /// descriptor nor `AZURE_OPENAI_API_KEY` supplies a key.
    pub fn from_descriptor(
        descriptor: &ProviderDescriptor,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let api_key =
            crate::registry::resolve_api_key(descriptor.api_key.clone(), "AZURE_OPENAI_API_KEY")?;
        let endpoint = descriptor
            .endpoint
            .clone()
            .ok_or_else(|| GatewayError::configuration("Azure OpenAI requires an endpoint"))?;
        let deployment = descriptor.deployment.clone().ok_or_else(|| {
            GatewayError::configuration("Azure OpenAI requires a deployment name")
        })?;
        Ok(Self {
            api_key,
            endpoint,
            deployment,
            api_version: descriptor
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout,
        })
    }
}

/// Azure OpenAI provider adapter.
pub struct AzureOpenAIProvider {
    config: AzureOpenAIConfig,
    client: Client,
}

impl AzureOpenAIProvider {
    /// Create the adapter.
    ///
    /// # Errors
    /// Returns an internal error if the HTTP client cannot be built.
    pub fn new(config: AzureOpenAIConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    fn request_builder(&self, wire: &WireRequest) -> RequestBuilder {
        self.client
            .post(self.completions_url())
            .header("api-key", self.config.api_key.expose_secret())
            .json(wire)
    }
}

#[async_trait]
impl LLMProvider for AzureOpenAIProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AzureOpenAi
    }

    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<GatewayResponse> {
        let wire = build_wire_request(request, false);
        debug!(
            deployment = %self.config.deployment,
            model = %request.model,
            "sending chat completion"
        );

        let response = self
            .request_builder(&wire)
            .send()
            .await
            .map_err(|e| map_transport_error(self.kind(), &e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(self.kind(), status, &body));
        }

        let wire_response: WireResponse = response
            .json()
            .await
            .map_err(|e| map_transport_error(self.kind(), &e))?;

        normalize_response(wire_response, self.kind())
    }

    async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>> {
        let wire = build_wire_request(request, true);
        debug!(deployment = %self.config.deployment, "opening chat completion stream");

        let event_source = EventSource::new(self.request_builder(&wire)).map_err(|e| {
            GatewayError::streaming(format!("failed to open event source: {e}"))
        })?;

        Ok(openai_chunk_stream(event_source, self.kind()))
    }
}
