//! Request identity middleware.
//!
//! # Responsibilities
//! - Stamp a unique request id (UUID v4) onto every inbound request
//! - Propagate the id onto the response for client-side correlation
//!
//! # Design Decisions
//! - The id is added at the outermost layer so every log line in the
//!   pipeline can carry it
//! - Ids supplied by the client are kept, not overwritten

use axum::http::{HeaderValue, Request};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 id for requests that arrive without one.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestUuid;

impl MakeRequestId for RequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer that stamps `x-request-id` onto incoming requests.
pub fn set_request_id_layer() -> SetRequestIdLayer<RequestUuid> {
    SetRequestIdLayer::x_request_id(RequestUuid)
}

/// Layer that copies the request id onto the outgoing response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
