//! Request ids.
//!
//! Every HTTP request gets an `x-request-id` (kept if the client sent one) that is
//! echoed on the response and recorded by the trace layer. It is unrelated to the
//! correlation id of the task the request submits or retrieves.

use axum::http::HeaderName;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Assigns ids to requests that arrive without one.
pub fn set_request_id() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Copies the request id onto the response.
pub fn propagate_request_id() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}
