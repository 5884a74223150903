//! The dispatch orchestrator.
//!
//! A [`Gateway`] owns a primary provider, an optional fallback target, and a
//! retry policy. Non-streaming dispatch runs the primary leg under the retry
//! budget and, when that leg is exhausted, re-dispatches to the fallback
//! provider under its own budget. Streaming dispatch is a single attempt on
//! the primary with no retry and no fallback.

use std::sync::Arc;

use futures::stream::BoxStream;
use gateway_core::{
    ChatChunk, ChatCompletionRequest, GatewayResponse, GatewayResult, LLMProvider,
};
use gateway_providers::create_provider;
use gateway_resilience::RetryPolicy;
use gateway_translate::translate_request;
use tracing::{error, info, warn};

use crate::config::{FallbackConfig, GatewayConfig};

struct FallbackTarget {
    model: String,
    provider: Arc<dyn LLMProvider>,
}

/// Multi-provider chat-completion gateway.
pub struct Gateway {
    primary: Arc<dyn LLMProvider>,
    fallback: Option<FallbackTarget>,
    retry: RetryPolicy,
}

impl Gateway {
    /// Build a gateway from a primary provider descriptor and configuration.
    ///
    /// # Errors
    /// Fails when either the primary or the fallback provider cannot be
    /// constructed from its descriptor.
    pub fn new(
        primary: &gateway_core::ProviderDescriptor,
        config: GatewayConfig,
    ) -> GatewayResult<Self> {
        let primary = create_provider(primary, config.attempt_timeout)?;
        let fallback = match &config.fallback {
            FallbackConfig::Disabled => None,
            FallbackConfig::Enabled { model, provider } => Some(FallbackTarget {
                model: model.clone(),
                provider: create_provider(provider, config.attempt_timeout)?,
            }),
        };
        Ok(Self::assemble(primary, fallback, &config))
    }

    /// Build a gateway from already-constructed providers.
    ///
    /// Bypasses descriptor resolution; useful for wrapping custom
    /// [`LLMProvider`] implementations.
    #[must_use]
    pub fn from_parts(
        primary: Arc<dyn LLMProvider>,
        fallback: Option<(String, Arc<dyn LLMProvider>)>,
        config: &GatewayConfig,
    ) -> Self {
        let fallback = fallback.map(|(model, provider)| FallbackTarget { model, provider });
        Self::assemble(primary, fallback, config)
    }

    fn assemble(
        primary: Arc<dyn LLMProvider>,
        fallback: Option<FallbackTarget>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            retry: RetryPolicy::with_max_retries(config.max_retries),
        }
    }

    /// Dispatch a chat completion.
    ///
    /// The primary leg runs under the retry budget. When it is exhausted and
    /// a fallback is configured, the request is re-dispatched to the fallback
    /// provider (translated across dialects when they differ, model
    /// overwritten) under a fresh budget. A failed fallback leg supersedes
    /// the primary error.
    ///
    /// # Errors
    /// Returns the primary leg's error when no fallback is configured, or the
    /// fallback leg's error when both legs fail.
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<GatewayResponse> {
        request.validate()?;

        let primary_result = self
            .retry
            .execute(|| self.primary.chat_completion(request))
            .await;

        match primary_result {
            Ok(response) => Ok(response),
            Err(primary_error) => self.dispatch_fallback(request, primary_error).await,
        }
    }

    async fn dispatch_fallback(
        &self,
        request: &ChatCompletionRequest,
        primary_error: gateway_core::GatewayError,
    ) -> GatewayResult<GatewayResponse> {
        let Some(target) = &self.fallback else {
            warn!(
                provider = %self.primary.kind(),
                error = %primary_error,
                "primary dispatch failed, no fallback configured"
            );
            return Err(primary_error);
        };

        warn!(
            provider = %self.primary.kind(),
            fallback_provider = %target.provider.kind(),
            fallback_model = %target.model,
            error = %primary_error,
            "primary dispatch failed, switching to fallback"
        );

        let source_dialect = self.primary.kind().dialect();
        let target_dialect = target.provider.kind().dialect();
        let mut fallback_request = if source_dialect == target_dialect {
            request.clone()
        } else {
            translate_request(request, target_dialect)
        };
        fallback_request.model = target.model.clone();

        let result = self
            .retry
            .execute(|| target.provider.chat_completion(&fallback_request))
            .await;

        match result {
            Ok(response) => {
                info!(
                    provider = %target.provider.kind(),
                    model = %target.model,
                    "fallback dispatch succeeded"
                );
                Ok(response)
            }
            Err(fallback_error) => {
                error!(
                    provider = %target.provider.kind(),
                    error = %fallback_error,
                    "fallback dispatch failed"
                );
                Err(fallback_error)
            }
        }
    }

    /// Open a streaming chat completion on the primary provider.
    ///
    /// Streaming is a single attempt: no retries, no fallback. Errors after
    /// the stream opens surface as items on the stream itself.
    ///
    /// # Errors
    /// Returns the primary provider's error unchanged.
    pub async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> GatewayResult<BoxStream<'static, GatewayResult<ChatChunk>>> {
        request.validate()?;
        self.primary.chat_completion_stream(request).await
    }
}
