//! Startup orchestration and the shutdown sequence.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind the listener last (traffic only when ready)
//! - Run until the shutdown latch fires, then drain exactly once
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The drain is bounded by `server.drain_timeout_secs` (0 waits forever)

use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionRegistry, Listener};

/// A fully wired gateway with its listening socket bound.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    registry: ConnectionRegistry,
    server: HttpServer,
    listener: Listener,
}

impl Gateway {
    /// Wire the components and bind the listening socket.
    ///
    /// Order: registry, static server, proxy rules, listener.
    pub async fn bind(config: GatewayConfig) -> Result<Self, GatewayError> {
        tracing::info!(
            bind_address = %config.server.address,
            bind_port = config.server.port,
            enable_proxy = config.upstream.enable_proxy,
            upstream_host = %config.upstream.host,
            upstream_port = config.upstream.port,
            web_folder = %config.web.folder.display(),
            "Starting gateway"
        );

        let registry = ConnectionRegistry::new();
        let state = AppState::from_config(&config)?;
        tracing::debug!(proxy_rules = state.rules.len(), "Proxy rules installed");
        let server = HttpServer::new(state);

        let listener = Listener::bind(&config.bind_address(), config.server.max_connections).await?;

        Ok(Self {
            config,
            registry,
            server,
            listener,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle on the registry, for observing drain progress.
    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    /// Serve until `shutdown` fires, drain, and return the exit status.
    pub async fn run(self, shutdown: Shutdown) -> i32 {
        let Gateway {
            config,
            registry,
            server,
            listener,
        } = self;

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let accept_loop = tokio::spawn(server.run(listener, registry.clone(), async move {
            let _ = stop_rx.await;
        }));

        let request = shutdown.wait().await;
        tracing::info!(status = request.status, reason = request.reason, "Exiting with status");

        tracing::info!("Stopping HTTP server");
        let signalled = registry.drain();
        tracing::debug!(connections = signalled, "Drain signalled");

        let _ = stop_tx.send(());
        if let Err(e) = accept_loop.await {
            tracing::error!(error = %e, "Accept loop ended abnormally");
        }

        let grace = match config.server.drain_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        if !registry.wait_closed(grace).await {
            tracing::warn!(
                remaining = registry.active_count(),
                "Drain grace period elapsed with connections still open"
            );
        }
        registry.mark_stopped();

        tracing::info!("HTTP server stopped");
        request.status
    }
}
