//! Static asset server.
//!
//! # Responsibilities
//! - Serve files from the web folder whose path matches the request path
//! - Content type, conditional and range handling via `ServeDir`
//! - Decline (rather than fail) when no file exists
//!
//! # Design Decisions
//! - Only GET and HEAD consult the file tree
//! - Traversal outside the root is rejected by `ServeDir` as not found

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
};
use std::path::{Path, PathBuf};
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// Outcome of looking a request up in the file tree.
#[derive(Debug)]
pub enum AssetLookup {
    /// The file server answered (file, redirect, 304, 416, ...).
    Served(Response),
    /// No file at that path.
    Missing,
}

/// File server rooted at the web folder.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
    serve_dir: ServeDir,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let serve_dir = ServeDir::new(&root).append_index_html_on_directories(true);
        Self { root, serve_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look the request path up under the root.
    ///
    /// Takes the request head only (see [`head_only`]); the body is never read.
    pub async fn lookup(&self, request: Request<()>) -> AssetLookup {
        if request.method() != Method::GET && request.method() != Method::HEAD {
            return AssetLookup::Missing;
        }

        let response = match self.serve_dir.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        if response.status() == StatusCode::NOT_FOUND {
            AssetLookup::Missing
        } else {
            AssetLookup::Served(response.map(Body::new))
        }
    }
}

/// Copy of the request line and headers with an empty body.
pub fn head_only<B>(request: &Request<B>) -> Request<()> {
    let mut copy = Request::new(());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    copy
}
