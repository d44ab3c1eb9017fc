//! SPA history fallback.
//!
//! Navigation requests for paths with no file behind them get the entry
//! document so the client-side router can render the view. Paths matching
//! an exclusion pattern keep the file server's 404.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::routing::FallbackExclusions;

/// Serves the entry document for unmatched navigation paths.
#[derive(Debug, Clone)]
pub struct HistoryFallback {
    index: PathBuf,
    exclusions: Arc<FallbackExclusions>,
}

impl HistoryFallback {
    pub fn new(index: impl Into<PathBuf>, exclusions: FallbackExclusions) -> Self {
        Self {
            index: index.into(),
            exclusions: Arc::new(exclusions),
        }
    }

    pub fn index(&self) -> &Path {
        &self.index
    }

    /// Whether `request` should be answered with the entry document.
    pub fn applies_to<B>(&self, request: &Request<B>) -> bool {
        if self.exclusions.is_excluded(request.uri().path()) {
            return false;
        }
        is_navigation(request)
    }

    /// Serve the entry document, or 404 when the request is not eligible.
    pub async fn respond(&self, request: Request<()>) -> Response {
        if !self.applies_to(&request) {
            tracing::trace!(path = %request.uri().path(), "History fallback skipped");
            return StatusCode::NOT_FOUND.into_response();
        }

        let response = match ServeFile::new(&self.index).oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if response.status() == StatusCode::NOT_FOUND {
            tracing::warn!(index = %self.index.display(), "Fallback document missing");
        }
        response.map(Body::new)
    }
}

/// GET/HEAD whose `Accept` is absent or admits HTML.
fn is_navigation<B>(request: &Request<B>) -> bool {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return false;
    }
    match request.headers().get(header::ACCEPT) {
        None => true,
        Some(accept) => accept
            .to_str()
            .map(|v| v.contains("text/html") || v.contains("*/*"))
            .unwrap_or(false),
    }
}
