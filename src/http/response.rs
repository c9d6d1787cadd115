//! Error responses.
//!
//! Every failure leaves as a JSON object with an `error` field; the status code
//! tells the caller whether retrying makes sense:
//!
//! | outcome                       | status |
//! |-------------------------------|--------|
//! | malformed body / invalid id   | 400    |
//! | result not ready              | 404    |
//! | caller id has a pending result| 409    |
//! | publish failed                | 500    |
//! | corrupt completion record     | 500    |
//! | store unreachable             | 503    |
//! | wait timed out                | 504    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::envelope::{CorrelationId, Status};
use crate::gateway::GatewayError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// The completion for `id` has not been recorded yet.
    pub fn not_ready(id: &CorrelationId) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: json!({
                "id": id,
                "status": Status::Processing.as_str(),
                "error": "result not ready",
            }),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Publish { id, .. } => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({ "id": id, "error": "Cannot publish message" }),
            },
            GatewayError::Store(_) => Self::new(StatusCode::SERVICE_UNAVAILABLE, "Correlation store unavailable"),
            GatewayError::Corrupt { id } => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({ "id": id, "error": "Completion record is corrupt" }),
            },
            GatewayError::Timeout { id, waited } => Self {
                status: StatusCode::GATEWAY_TIMEOUT,
                body: json!({
                    "id": id,
                    "status": "Timeout",
                    "error": format!("no result within {}ms", waited.as_millis()),
                }),
            },
            GatewayError::IdInUse { id } => Self {
                status: StatusCode::CONFLICT,
                body: json!({ "id": id, "error": "correlation id already has a pending completion" }),
            },
            GatewayError::InvalidId(e) => Self::bad_request(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
