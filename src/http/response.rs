//! Upstream failure classification and error responses.
//!
//! # Responsibilities
//! - Classify transport failures talking to the upstream
//! - Map them to a request-scoped 500 response with a readable body
//!
//! # Design Decisions
//! - A refused connection gets its own message so operators can tell a
//!   stopped platform from a misbehaving one
//! - Failures never escape the request that hit them

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Why a request could not be relayed to the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("connection refused")]
    Refused,

    #[error("timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

impl UpstreamError {
    /// Walk the error's source chain looking for the underlying IO failure.
    pub fn classify(err: &(dyn StdError + 'static)) -> Self {
        let mut current = Some(err);
        let mut innermost = err;
        while let Some(e) = current {
            if let Some(io_err) = e.downcast_ref::<io::Error>() {
                match io_err.kind() {
                    io::ErrorKind::ConnectionRefused => return UpstreamError::Refused,
                    io::ErrorKind::TimedOut => return UpstreamError::Timeout,
                    _ => {}
                }
            }
            innermost = e;
            current = e.source();
        }
        UpstreamError::Other(innermost.to_string())
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Refused => "refused",
            UpstreamError::Timeout => "timeout",
            UpstreamError::Other(_) => "other",
        }
    }

    /// Body text shown to the caller.
    pub fn message(&self) -> String {
        match self {
            UpstreamError::Refused => "Unable to connect to upstream server.".to_string(),
            other => format!("Upstream server connection error: {}", other),
        }
    }
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message(),
        )
            .into_response()
    }
}
