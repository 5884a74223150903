//! Error types for the gateway.
//!
//! A single [`GatewayError`] enum covers construction, translation, adapter,
//! and orchestration failures. Retryability is decided by the retry engine
//! from the `status_code`/`error_code` carried here, not by the error itself.

use thiserror::Error;

/// Result alias used throughout the gateway crates.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the gateway and its collaborators.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The requested provider kind is not known (or compiled out).
    #[error("unsupported provider kind: {kind}")]
    UnsupportedProvider {
        /// The offending kind string
        kind: String,
    },

    /// Invalid or incomplete configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem
        message: String,
    },

    /// Request validation failure.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the problem
        message: String,
        /// Offending field, if known
        field: Option<String>,
    },

    /// Transport or vendor failure raised by a provider adapter.
    #[error("provider '{provider}' error: {message}")]
    Provider {
        /// Provider kind the error originated from
        provider: String,
        /// Human-readable message
        message: String,
        /// HTTP status, when the vendor responded
        status_code: Option<u16>,
        /// Vendor or network error code (e.g. `connection_reset`, `timeout`)
        error_code: Option<String>,
    },

    /// The provider answered with zero completion choices.
    #[error("provider '{provider}' returned an empty completion")]
    EmptyResponse {
        /// Provider kind the response came from
        provider: String,
    },

    /// The retry budget was consumed without a successful attempt.
    #[error("retry budget exhausted after {attempts} attempts")]
    RetryExhausted {
        /// Total attempts made (first attempt + retries)
        attempts: u32,
        /// The last retryable failure observed
        #[source]
        source: Box<GatewayError>,
    },

    /// Streaming transport failure.
    #[error("streaming error: {message}")]
    Streaming {
        /// Description of the problem
        message: String,
    },

    /// Invariant violation inside the gateway itself.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the problem
        message: String,
    },
}

impl GatewayError {
    /// Create an unsupported-provider error.
    pub fn unsupported_provider(kind: impl Into<String>) -> Self {
        Self::UnsupportedProvider { kind: kind.into() }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>, field: Option<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field,
        }
    }

    /// Create a provider error.
    pub fn provider(
        provider: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
        error_code: Option<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code,
            error_code,
        }
    }

    /// Create an empty-response error.
    pub fn empty_response(provider: impl Into<String>) -> Self {
        Self::EmptyResponse {
            provider: provider.into(),
        }
    }

    /// Create a streaming error.
    pub fn streaming(message: impl Into<String>) -> Self {
        Self::Streaming {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status attached to this error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status_code, .. } => *status_code,
            Self::RetryExhausted { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// Network/vendor error code attached to this error, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Provider { error_code, .. } => error_code.as_deref(),
            Self::RetryExhausted { source, .. } => source.error_code(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_carries_status_and_code() {
        let err = GatewayError::provider(
            "openai",
            "rate limited",
            Some(429),
            Some("rate_limit_exceeded".to_string()),
        );
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.error_code(), Some("rate_limit_exceeded"));
    }

    #[test]
    fn retry_exhausted_exposes_underlying_status() {
        let inner = GatewayError::provider("openai", "unavailable", Some(503), None);
        let err = GatewayError::RetryExhausted {
            attempts: 3,
            source: Box::new(inner),
        };
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn display_includes_provider() {
        let err = GatewayError::empty_response("anthropic");
        assert!(err.to_string().contains("anthropic"));
    }
}
