//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, protocol detection)
//!     → request.rs (request ID extension)
//!     → websocket.rs (upgrade requests on a websocket rule)
//!     → proxy.rs (plain requests on an http rule)
//!     → [web layer: static files, then SPA fallback]
//!     → response.rs (upstream failures as 500s)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use proxy::UpstreamClient;
pub use request::{assign_request_id, request_id, MakeRequestUuid, X_REQUEST_ID};
pub use response::UpstreamError;
pub use server::{AppState, HttpServer};
