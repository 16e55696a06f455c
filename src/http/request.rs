//! Request identity handling.
//!
//! # Responsibilities
//! - Generate a UUID request ID for every inbound request
//! - Propagate the ID back to the caller via `X-Request-ID`
//! - Expose the ID to handlers for log correlation
//!
//! # Design Decisions
//! - IDs are minted by middleware before any handler runs, so even
//!   rejected requests are correlatable
//! - A caller-supplied `X-Request-ID` is kept as-is

use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Mints a fresh UUID for requests that arrive without an ID.
#[derive(Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Read the correlation ID set by the middleware.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
