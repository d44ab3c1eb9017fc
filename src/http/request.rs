//! Request identification.
//!
//! # Responsibilities
//! - Give every inbound request an ID (UUID v4) for spans and log lines
//! - Expose the ID to handlers
//!
//! # Design Decisions
//! - The ID lives in a request extension, never in the headers, so proxied
//!   requests and responses leave the gateway byte-for-byte as they came in
//! - An `x-request-id` supplied by the client is reused as the ID and
//!   forwarded like any other header

use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header a client may use to supply its own request ID.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Attach a [`RequestId`] extension, reusing the client's header if present.
///
/// Headers are left untouched.
pub fn assign_request_id<B>(mut request: Request<B>) -> Request<B> {
    if request.extensions().get::<RequestId>().is_some() {
        return request;
    }

    let id = match request.headers().get(&X_REQUEST_ID) {
        Some(supplied) => Some(RequestId::new(supplied.clone())),
        None => MakeRequestUuid.make_request_id(&request),
    };
    if let Some(id) = id {
        request.extensions_mut().insert(id);
    }
    request
}

/// The request's ID, or "unknown" if none was assigned.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
