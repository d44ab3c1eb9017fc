//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum Router with all middleware
//! - Dispatch each request through the ordered serving chain
//! - Serve accepted sockets with HTTP/1.1, HTTP/2 and upgrades
//! - Register every socket and close it when a drain asks
//!
//! # Serving Chain
//! ```text
//! WebsocketProxy → HttpProxy → StaticAsset → HistoryFallback
//! ```
//! Each stage either answers or hands the request to the next one.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tower::{util::MapRequestLayer, ServiceExt};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::config::{ForwardMode, GatewayConfig};
use crate::error::GatewayError;
use crate::http::proxy::UpstreamClient;
use crate::http::request::{assign_request_id, request_id};
use crate::http::websocket;
use crate::net::{ConnectionHandle, ConnectionPermit, ConnectionRegistry, Listener};
use crate::observability::metrics;
use crate::routing::{FallbackExclusions, RuleTable};
use crate::web::{head_only, AssetLookup, HistoryFallback, StaticAssets};

/// Application state injected into the dispatcher.
#[derive(Clone, Debug)]
pub struct AppState {
    pub rules: Arc<RuleTable>,
    pub upstream: Option<UpstreamClient>,
    pub assets: StaticAssets,
    pub fallback: HistoryFallback,
}

impl AppState {
    /// Build the serving components from configuration: static server, then
    /// proxy rules and the upstream client.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let assets = StaticAssets::new(&config.web.folder);
        let exclusions = FallbackExclusions::from_patterns(&config.web.fallback_exclusions)?;
        let fallback = HistoryFallback::new(
            config.web.folder.join(&config.web.index_document),
            exclusions,
        );

        let rules = Arc::new(RuleTable::from_config(config)?);
        let upstream = if config.upstream.enable_proxy {
            Some(UpstreamClient::new(&config.upstream)?)
        } else {
            None
        };

        Ok(Self {
            rules,
            upstream,
            assets,
            fallback,
        })
    }
}

/// One step of the serving chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    WebsocketProxy,
    HttpProxy,
    StaticAsset,
    HistoryFallback,
}

const CHAIN: [Stage; 4] = [
    Stage::WebsocketProxy,
    Stage::HttpProxy,
    Stage::StaticAsset,
    Stage::HistoryFallback,
];

enum Outcome {
    Respond(Response),
    Next(Request<Body>),
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::WebsocketProxy => "websocket",
            Stage::HttpProxy => "proxy",
            Stage::StaticAsset => "static",
            Stage::HistoryFallback => "fallback",
        }
    }

    async fn run(self, state: &AppState, request: Request<Body>) -> Outcome {
        match self {
            Stage::WebsocketProxy => {
                if !websocket::is_upgrade_request(&request) {
                    return Outcome::Next(request);
                }
                match (&state.upstream, state.rules.match_path(request.uri().path(), ForwardMode::Websocket)) {
                    (Some(upstream), Some(_)) => {
                        Outcome::Respond(websocket::proxy_upgrade(upstream, request).await)
                    }
                    _ => Outcome::Next(request),
                }
            }
            Stage::HttpProxy => {
                match (&state.upstream, state.rules.match_path(request.uri().path(), ForwardMode::Http)) {
                    (Some(upstream), Some(_)) => Outcome::Respond(upstream.forward(request).await),
                    _ => Outcome::Next(request),
                }
            }
            Stage::StaticAsset => match state.assets.lookup(head_only(&request)).await {
                AssetLookup::Served(response) => Outcome::Respond(response),
                AssetLookup::Missing => Outcome::Next(request),
            },
            Stage::HistoryFallback => {
                Outcome::Respond(state.fallback.respond(head_only(&request)).await)
            }
        }
    }
}

/// Walk the chain top to bottom; the first stage that answers wins.
async fn dispatch(State(state): State<AppState>, mut request: Request<Body>) -> Response {
    for stage in CHAIN {
        request = match stage.run(&state, request).await {
            Outcome::Respond(response) => {
                metrics::record_request(stage.name());
                return response;
            }
            Outcome::Next(request) => request,
        };
    }
    StatusCode::NOT_FOUND.into_response()
}

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// HTTP server for the gateway.
#[derive(Clone, Debug)]
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server from prepared state.
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id(request),
                )
            }))
            .layer(MapRequestLayer::new(assign_request_id::<Body>))
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Accept and serve connections until `stop` resolves.
    ///
    /// Sockets refused by the registry (drain already begun) are dropped on
    /// the spot. The listener is closed when this returns.
    pub async fn run<F>(self, listener: Listener, registry: ConnectionRegistry, stop: F)
    where
        F: Future<Output = ()>,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "HTTP server starting");
        }
        tokio::pin!(stop);

        loop {
            let (stream, peer, permit) = tokio::select! {
                biased;
                _ = &mut stop => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        // Usually fd exhaustion; back off instead of spinning.
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            let Some(connection) = registry.register(peer) else {
                tracing::debug!(peer_addr = %peer, "Refusing connection while draining");
                drop(stream);
                continue;
            };

            tokio::spawn(serve_connection(stream, connection, permit, self.router.clone()));
        }

        drop(listener);
        tracing::info!("Listener closed");
    }
}

/// Serve one socket until it finishes, upgrades away, or is drained.
async fn serve_connection(
    stream: TcpStream,
    connection: ConnectionHandle,
    _permit: ConnectionPermit,
    router: Router,
) {
    let id = connection.id();
    let tagged = connection.clone();
    let service = router.map_request(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(tagged.clone());
        request
    });

    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), TowerToHyperService::new(service));
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(e) = result {
                tracing::debug!(connection_id = %id, error = %e, "Connection error");
            }
        }
        _ = connection.closing() => {
            // Dropping the connection closes the socket mid-flight.
            tracing::debug!(connection_id = %id, "Connection force-closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn state_for(dir: &tempfile::TempDir, enable_proxy: bool) -> AppState {
        let mut config = GatewayConfig::default();
        config.web.folder = dir.path().to_path_buf();
        config.upstream.enable_proxy = enable_proxy;
        config.upstream.host = "127.0.0.1".into();
        config.upstream.port = 1;
        AppState::from_config(&config).unwrap()
    }

    fn bundle() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();
        fs::write(dir.path().join("app.js"), "console.log('app');").unwrap();
        dir
    }

    async fn call(server: &HttpServer, request: Request<Body>) -> (StatusCode, String, Response<()>) {
        let response = server.router().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        (
            parts.status,
            String::from_utf8_lossy(&bytes).into_owned(),
            Response::from_parts(parts, ()),
        )
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn chain_serves_file_then_fallback_then_not_found() {
        let dir = bundle();
        let server = HttpServer::new(state_for(&dir, false));

        let (status, body, _) = call(&server, get("/app.js")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log('app');");

        let (status, body, _) = call(&server, get("/dashboard/42")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>app</html>");

        let (status, body, _) = call(&server, get("/resources/scada-symbols/tenant/abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_ne!(body, "<html>app</html>");
    }

    #[tokio::test]
    async fn disabled_proxy_leaves_api_paths_to_the_bundle() {
        let dir = bundle();
        let server = HttpServer::new(state_for(&dir, false));

        let (status, body, _) = call(&server, get("/api/devices")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<html>app</html>");
    }

    #[tokio::test]
    async fn refused_upstream_yields_500() {
        let dir = bundle();
        let server = HttpServer::new(state_for(&dir, true));

        let (status, body, _) = call(&server, get("/api/anything")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Unable to connect to upstream server.");
    }

    #[tokio::test]
    async fn request_ids_never_reach_response_headers() {
        let dir = bundle();
        let server = HttpServer::new(state_for(&dir, false));

        let (_, _, head) = call(&server, get("/app.js")).await;
        assert!(!head.headers().contains_key("x-request-id"));

        let request = Request::get("/app.js")
            .header("x-request-id", "fixed-id")
            .body(Body::empty())
            .unwrap();
        let (_, _, head) = call(&server, request).await;
        assert!(!head.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn compression_is_negotiated() {
        let dir = bundle();
        fs::write(dir.path().join("big.js"), "x".repeat(4096)).unwrap();
        let server = HttpServer::new(state_for(&dir, false));

        let request = Request::get("/big.js")
            .header("accept-encoding", "gzip")
            .body(Body::empty())
            .unwrap();
        let (_, _, head) = call(&server, request).await;
        assert_eq!(head.headers()["content-encoding"], "gzip");
    }
}
