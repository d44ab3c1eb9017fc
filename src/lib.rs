//! Front-end delivery gateway.
//!
//! Serves a compiled single-page application with history-mode fallback,
//! reverse-proxies API and WebSocket traffic to one upstream, and drains
//! every open connection on shutdown.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;
pub mod web;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
