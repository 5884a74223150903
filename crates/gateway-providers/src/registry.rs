//! Provider construction from descriptors.
//!
//! The single place a [`ProviderKind`] turns into an adapter instance; call
//! sites never branch on runtime type identity.

use gateway_core::{GatewayError, GatewayResult, LLMProvider, ProviderDescriptor};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default per-attempt HTTP timeout when the gateway sets none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Construct the adapter for a descriptor.
///
/// `attempt_timeout` bounds each HTTP attempt; it is baked into the adapter's
/// client at construction so every call the adapter makes inherits it.
///
/// # Errors
/// Returns [`GatewayError::UnsupportedProvider`] when the kind is compiled
/// out, and configuration errors for missing credentials or endpoints.
pub fn create_provider(
    descriptor: &ProviderDescriptor,
    attempt_timeout: Option<Duration>,
) -> GatewayResult<Arc<dyn LLMProvider>> {
    let timeout = attempt_timeout.unwrap_or(DEFAULT_TIMEOUT);
    debug!(kind = %descriptor.kind, timeout_ms = timeout.as_millis() as u64, "constructing provider adapter");

    match descriptor.kind {
        #[cfg(feature = "openai")]
        gateway_core::ProviderKind::OpenAi => {
            let config = crate::openai::OpenAIConfig::from_descriptor(descriptor, timeout)?;
            Ok(Arc::new(crate::openai::OpenAIProvider::new(config)?))
        }
        #[cfg(feature = "azure")]
        gateway_core::ProviderKind::AzureOpenAi => {
            let config = crate::azure::AzureOpenAIConfig::from_descriptor(descriptor, timeout)?;
            Ok(Arc::new(crate::azure::AzureOpenAIProvider::new(config)?))
        }
        #[cfg(feature = "anthropic")]
        gateway_core::ProviderKind::Anthropic => {
            let config = crate::anthropic::AnthropicConfig::from_descriptor(descriptor, timeout)?;
            Ok(Arc::new(crate::anthropic::AnthropicProvider::new(config)?))
        }
        #[allow(unreachable_patterns)]
        kind => Err(GatewayError::unsupported_provider(kind.as_str())),
    }
}

/// Resolve the API key for an adapter: the explicit descriptor key wins, the
/// environment variable is consulted only when no key was supplied.
pub(crate) fn resolve_api_key(
    explicit: Option<SecretString>,
    env_var: &str,
) -> GatewayResult<SecretString> {
    if let Some(key) = explicit {
        return Ok(key);
    }
    std::env::var(env_var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::new)
        .ok_or_else(|| {
            GatewayError::configuration(format!("no API key supplied and {env_var} is not set"))
        })
}
