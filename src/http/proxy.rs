//! Plain HTTP forwarding to the upstream.
//!
//! # Responsibilities
//! - Rewrite the request URI to the single upstream target
//! - Forward method, headers and streaming body unchanged
//! - Stream status, headers and body back unchanged
//! - Turn transport failures into a request-scoped error response

use axum::{
    body::Body,
    http::{uri::Authority, Extensions, Request, Uri, Version},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::str::FromStr;
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::http::request::request_id;
use crate::http::response::UpstreamError;
use crate::observability::metrics;

/// Client bound to the one upstream target.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, axum::http::uri::InvalidUri> {
        let authority = Authority::from_str(&config.authority())?;

        let mut connector = HttpConnector::new();
        if config.connect_timeout_secs > 0 {
            connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        }
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Point an inbound URI at the upstream, keeping path and query.
    pub fn upstream_uri(&self, uri: &Uri) -> Result<Uri, UpstreamError> {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        Uri::builder()
            .scheme("http")
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| UpstreamError::Other(e.to_string()))
    }

    /// Send `request` to the upstream as-is apart from its URI.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, UpstreamError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.upstream_uri(&parts.uri)?;
        // The pool speaks HTTP/1.1 to the upstream whatever the client used.
        parts.version = Version::HTTP_11;
        parts.extensions = Extensions::new();

        self.client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| UpstreamError::classify(&e))
    }

    /// Forward a request and relay the upstream's response.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let request_id = request_id(&request);

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            upstream = %self.authority,
            "Proxying request"
        );

        match self.send(request).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    error = %e,
                    "API proxy error"
                );
                metrics::record_upstream_error(e.kind());
                e.into_response()
            }
        }
    }
}
