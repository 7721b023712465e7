//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (delays > 0, percentages ≤ 100)
//! - Check the context header name is a legal HTTP header name
//!
//! Returns all validation errors, not just the first.

use std::fmt;

use reqwest::header::HeaderName;

use crate::config::schema::ClientConfig;

/// Smallest budget that can hold a meaningful context header.
pub const MIN_HEADER_BYTE_BUDGET: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut check = |ok: bool, field: &'static str, message: String| {
        if !ok {
            errors.push(ValidationError { field, message });
        }
    };

    check(
        config.retry.initial_delay_ms > 0,
        "retry.initial_delay_ms",
        "must be greater than zero".to_string(),
    );
    check(
        config.retry.jitter_percent <= 100,
        "retry.jitter_percent",
        format!("{} is above 100", config.retry.jitter_percent),
    );
    check(
        HeaderName::from_bytes(config.context_header.name.as_bytes()).is_ok(),
        "context_header.name",
        format!("'{}' is not a valid header name", config.context_header.name),
    );
    check(
        config.context_header.byte_budget >= MIN_HEADER_BYTE_BUDGET,
        "context_header.byte_budget",
        format!("must be at least {}", MIN_HEADER_BYTE_BUDGET),
    );
    check(
        config.transport.timeout_secs > 0,
        "transport.timeout_secs",
        "must be greater than zero".to_string(),
    );
    if config.observability.metrics_enabled {
        check(
            config
                .observability
                .metrics_address
                .parse::<std::net::SocketAddr>()
                .is_ok(),
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
