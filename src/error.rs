//! Gateway-level errors.

use thiserror::Error;

use crate::config::{ConfigError, ValidationError};
use crate::net::ListenerError;

/// Fatal errors. Any of these ends the process with a non-zero status.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid proxy rule: {0}")]
    Rule(#[from] ValidationError),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid upstream address: {0}")]
    UpstreamAddress(#[from] axum::http::uri::InvalidUri),

    #[error("{0}")]
    Listener(#[from] ListenerError),
}
