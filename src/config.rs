//! Gateway configuration.

use gateway_core::ProviderDescriptor;
use std::time::Duration;

/// Configuration for a [`crate::Gateway`].
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Retry budget per dispatch leg: the number of attempts *after* the
    /// first. Zero means a single attempt.
    pub max_retries: u32,
    /// Per-attempt HTTP timeout baked into each adapter at construction.
    pub attempt_timeout: Option<Duration>,
    /// Fallback behavior when the primary leg is exhausted.
    pub fallback: FallbackConfig,
}

impl GatewayConfig {
    /// Create a configuration with defaults: no retries, no fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Enable fallback to another provider and model.
    ///
    /// Fallback is all-or-nothing: it activates only when both the model and
    /// the provider descriptor are supplied, which this signature enforces.
    #[must_use]
    pub fn with_fallback(mut self, model: impl Into<String>, provider: ProviderDescriptor) -> Self {
        self.fallback = FallbackConfig::Enabled {
            model: model.into(),
            provider,
        };
        self
    }
}

/// Fallback behavior after the primary dispatch leg fails.
#[derive(Debug, Clone, Default)]
pub enum FallbackConfig {
    /// No fallback; the primary error is surfaced as-is.
    #[default]
    Disabled,
    /// Re-dispatch to another provider under another model.
    Enabled {
        /// Model to substitute on the fallback leg
        model: String,
        /// Provider to dispatch the fallback leg to
        provider: ProviderDescriptor,
    },
}

impl FallbackConfig {
    /// Whether fallback is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }
}
