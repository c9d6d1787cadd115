//! Polling-mode and call-mode handlers.
//!
//! ```text
//! POST /trigger          → publish, answer with the Processing envelope
//! GET  /done/{id}        → consume the completion, or 404 while pending
//! POST /call?timeout_ms  → publish and hold the request until it completes
//! ```

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::envelope::{CorrelationId, Submission};
use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Unwrap a JSON body, answering 400 for anything that is not a valid submission.
fn submission(body: Result<Json<Submission>, JsonRejection>) -> Result<Submission, ApiError> {
    match body {
        Ok(Json(submission)) => Ok(submission),
        // Oversized or unreadable bodies keep their own status (413 and friends).
        Err(JsonRejection::BytesRejection(rejection)) => {
            tracing::warn!(error = %rejection, "Unreadable request body");
            Err(ApiError::new(rejection.status(), "Cannot read request body"))
        }
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected request body");
            Err(ApiError::bad_request("Cannot parse JSON"))
        }
    }
}

pub async fn trigger(
    State(state): State<AppState>,
    body: Result<Json<Submission>, JsonRejection>,
) -> Response {
    let submission = match submission(body) {
        Ok(s) => s,
        Err(e) => return e.into_response(),
    };

    // Polling mode always mints the id.
    match state.gateway.submit(submission.msg).await {
        Ok(ticket) => (StatusCode::OK, Json(ticket)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn done(State(state): State<AppState>, Path(raw): Path<String>) -> Response {
    let id = match CorrelationId::parse(&raw) {
        Ok(id) => id,
        Err(e) => return ApiError::bad_request(e.to_string()).into_response(),
    };

    match state.gateway.retrieve(&id).await {
        Ok(Some(envelope)) => (StatusCode::OK, Json(envelope)).into_response(),
        Ok(None) => ApiError::not_ready(&id).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CallParams {
    pub timeout_ms: Option<u64>,
}

pub async fn call(
    State(state): State<AppState>,
    Query(params): Query<CallParams>,
    body: Result<Json<Submission>, JsonRejection>,
) -> Response {
    let submission = match submission(body) {
        Ok(s) => s,
        Err(e) => return e.into_response(),
    };

    let timeout = wait_budget(params.timeout_ms, state.gateway.wait_timeout());
    match state.gateway.submit_and_wait(submission.msg, Some(timeout)).await {
        Ok(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Requested wait, capped by the configured budget and never zero.
fn wait_budget(requested_ms: Option<u64>, cap: Duration) -> Duration {
    match requested_ms {
        Some(ms) => Duration::from_millis(ms.max(1)).min(cap),
        None => cap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_budget() {
        let cap = Duration::from_secs(30);
        assert_eq!(wait_budget(None, cap), cap);
        assert_eq!(wait_budget(Some(250), cap), Duration::from_millis(250));
        assert_eq!(wait_budget(Some(120_000), cap), cap);
        assert_eq!(wait_budget(Some(0), cap), Duration::from_millis(1));
    }
}
