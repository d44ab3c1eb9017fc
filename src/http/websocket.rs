//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Detect upgrade requests
//! - Replay the handshake against the upstream
//! - Once both sides have switched protocols, relay raw bytes
//!
//! # Data Flow
//! ```text
//! Client ←──── bytes ────→ Gateway ←──── bytes ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - Forwarded at the connection level, frames are never parsed
//! - The relay keeps the client connection registered until it ends
//! - A drain closes the relay like any other connection

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    response::IntoResponse,
};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

use crate::http::proxy::UpstreamClient;
use crate::http::request::request_id;
use crate::net::ConnectionHandle;
use crate::observability::metrics;

/// True for requests asking to switch protocols (`Connection: upgrade` plus `Upgrade`).
pub fn is_upgrade_request<B>(request: &Request<B>) -> bool {
    let headers = request.headers();
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    connection_upgrade && headers.contains_key(header::UPGRADE)
}

/// Forward an upgrade request and, on `101`, relay bytes in both directions.
///
/// Any other upstream answer is passed back to the client unchanged.
pub async fn proxy_upgrade(upstream: &UpstreamClient, mut request: Request<Body>) -> Response<Body> {
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let connection = request.extensions().get::<ConnectionHandle>().cloned();
    let client_upgrade = hyper::upgrade::on(&mut request);

    let (parts, _) = request.into_parts();
    let handshake = Request::from_parts(parts, Body::empty());

    let mut response = match upstream.send(handshake).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                error = %e,
                "WebSocket proxy error"
            );
            metrics::record_upstream_error(e.kind());
            return e.into_response();
        }
    };

    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        tracing::debug!(
            request_id = %request_id,
            path = %path,
            status = %response.status(),
            "Upstream declined WebSocket upgrade"
        );
        let (parts, body) = response.into_parts();
        return Response::from_parts(parts, Body::new(body));
    }

    let upstream_upgrade = hyper::upgrade::on(&mut response);
    tokio::spawn(relay(client_upgrade, upstream_upgrade, connection, path));

    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Body::empty())
}

async fn relay(
    client: OnUpgrade,
    upstream: OnUpgrade,
    connection: Option<ConnectionHandle>,
    path: String,
) {
    let (client, upstream) = match tokio::try_join!(client, upstream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "WebSocket upgrade failed");
            return;
        }
    };
    let mut client = TokioIo::new(client);
    let mut upstream = TokioIo::new(upstream);

    metrics::record_tunnel();
    tracing::debug!(path = %path, "WebSocket tunnel established");

    let drained = async {
        match &connection {
            Some(connection) => connection.closing().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = tokio::io::copy_bidirectional(&mut client, &mut upstream) => match result {
            Ok((sent, received)) => {
                tracing::debug!(path = %path, sent, received, "WebSocket tunnel closed");
            }
            Err(e) => {
                tracing::debug!(path = %path, error = %e, "WebSocket tunnel aborted");
            }
        },
        _ = drained => {
            tracing::debug!(path = %path, "WebSocket tunnel closed by drain");
        }
    }
}
