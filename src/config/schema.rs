//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::context::{CONTEXT_HEADER_BYTE_BUDGET, CONTEXT_HEADER_NAME};
use crate::resilience::retries::{DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES};

/// Root configuration for a catalog client.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Retry configuration.
    pub retry: RetryConfig,

    /// Diagnostic context header settings.
    pub context_header: ContextHeaderConfig,

    /// HTTP transport settings.
    pub transport: TransportConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each following one.
    pub initial_delay_ms: u64,

    /// Random extra delay, as a percentage of each backoff (0 disables).
    pub jitter_percent: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY.as_millis() as u64,
            jitter_percent: 0,
        }
    }
}

/// Context header configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ContextHeaderConfig {
    /// Header name the context is sent under.
    pub name: String,

    /// Encoded headers must stay below this many bytes.
    pub byte_budget: usize,
}

impl Default for ContextHeaderConfig {
    fn default() -> Self {
        Self {
            name: CONTEXT_HEADER_NAME.to_string(),
            byte_budget: CONTEXT_HEADER_BYTE_BUDGET,
        }
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("catalog-http/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9091".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.retry.max_retries, 10);
        assert_eq!(config.retry.initial_delay_ms, 100);
        assert_eq!(config.context_header.name, "Deriva-Client-Context");
        assert_eq!(config.context_header.byte_budget, 6500);
    }

    #[test]
    fn test_partial_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            [retry]
            max_retries = 3

            [context_header]
            byte_budget = 4000
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_delay_ms, 100);
        assert_eq!(config.context_header.byte_budget, 4000);
        assert_eq!(config.context_header.name, "Deriva-Client-Context");
        assert_eq!(config.transport.timeout_secs, 30);
    }
}
