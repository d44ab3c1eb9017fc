//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, connection limits)
//! - Check that every rule and exclusion regex compiles
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use regex::Regex;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("server.port must be non-zero")]
    ZeroPort,

    #[error("server.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("upstream.host must be set when the proxy is enabled")]
    MissingUpstreamHost,

    #[error("upstream.port must be non-zero when the proxy is enabled")]
    ZeroUpstreamPort,

    #[error("web.index_document must not be empty")]
    MissingIndexDocument,

    #[error("proxy rule #{0} must set exactly one of `prefix` or `pattern`")]
    AmbiguousRule(usize),

    #[error("proxy rule #{index} prefix `{prefix}` must start with `/`")]
    RelativePrefix { index: usize, prefix: String },

    #[error("invalid regex `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.server.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    if config.upstream.enable_proxy {
        if config.upstream.host.trim().is_empty() {
            errors.push(ValidationError::MissingUpstreamHost);
        }
        if config.upstream.port == 0 {
            errors.push(ValidationError::ZeroUpstreamPort);
        }
    }

    if config.web.index_document.trim().is_empty() {
        errors.push(ValidationError::MissingIndexDocument);
    }

    for (index, rule) in config.proxy.rules.iter().enumerate() {
        match (&rule.prefix, &rule.pattern) {
            (Some(prefix), None) => {
                if !prefix.starts_with('/') {
                    errors.push(ValidationError::RelativePrefix {
                        index,
                        prefix: prefix.clone(),
                    });
                }
            }
            (None, Some(pattern)) => check_pattern(pattern, &mut errors),
            _ => errors.push(ValidationError::AmbiguousRule(index)),
        }
    }

    for pattern in &config.web.fallback_exclusions {
        check_pattern(pattern, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_pattern(pattern: &str, errors: &mut Vec<ValidationError>) {
    if let Err(e) = Regex::new(pattern) {
        errors.push(ValidationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        });
    }
}
