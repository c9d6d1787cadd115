//! WebSocket wait mode.
//!
//! # Data Flow
//! ```text
//! client frame {id?, msg}
//!     → submit (client id honored when valid)
//!     → ack      {id, status: "started"}
//!     → wait for the completion (push + polling fallback, bounded)
//!     → terminal {id, msg, status}  or  {id, status: "Timeout", error}
//! ```
//!
//! # Design Decisions
//! - One submission is served at a time; frames that arrive during a wait are
//!   queued and served in order afterwards, up to `gateway.max_queued_frames`.
//!   Frames past the cap are refused with an error frame
//! - A client id that still has an unretrieved completion is refused; the
//!   connection stays open
//! - A malformed frame gets an error frame, the connection stays open
//! - A failed publish gets an error frame and the connection is closed
//! - If the client goes away mid-wait the wait is abandoned; the completion stays
//!   in the store until its TTL
//! - Ping/pong is answered by axum

use std::collections::VecDeque;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde_json::{json, Value};

use crate::envelope::Submission;
use crate::gateway::{Gateway, GatewayError};
use crate::http::server::AppState;
use crate::observability::metrics;

type Sink = SplitSink<WebSocket, Message>;
type Source = SplitStream<WebSocket>;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve(socket, state.gateway, None))
}

/// `/ws/{channel}`: the channel is a client label, only used in logs.
pub async fn upgrade_channel(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| serve(socket, state.gateway, Some(channel)))
}

enum Inbound {
    Frame(String),
    Skip,
    Gone,
}

fn classify(item: Option<Result<Message, axum::Error>>) -> Inbound {
    match item {
        Some(Ok(Message::Text(text))) => Inbound::Frame(text.as_str().to_owned()),
        Some(Ok(Message::Binary(bytes))) => Inbound::Frame(String::from_utf8_lossy(&bytes).into_owned()),
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => Inbound::Skip,
        Some(Ok(Message::Close(_))) | None => Inbound::Gone,
        Some(Err(e)) => {
            tracing::debug!(error = %e, "WebSocket read failed");
            Inbound::Gone
        }
    }
}

enum Next {
    Continue,
    Close,
}

async fn serve(socket: WebSocket, gateway: Gateway, channel: Option<String>) {
    let (mut sink, mut source) = socket.split();
    let mut queued: VecDeque<String> = VecDeque::new();
    tracing::debug!(channel = ?channel, "WebSocket connected");

    loop {
        let frame = match queued.pop_front() {
            Some(frame) => frame,
            None => match classify(source.next().await) {
                Inbound::Frame(frame) => frame,
                Inbound::Skip => continue,
                Inbound::Gone => break,
            },
        };

        match serve_frame(&frame, &gateway, &mut sink, &mut source, &mut queued).await {
            Next::Continue => {}
            Next::Close => break,
        }
    }

    let _ = sink.close().await;
    tracing::debug!(channel = ?channel, "WebSocket closed");
}

async fn serve_frame(
    frame: &str,
    gateway: &Gateway,
    sink: &mut Sink,
    source: &mut Source,
    queued: &mut VecDeque<String>,
) -> Next {
    let submission: Submission = match serde_json::from_str(frame) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed WebSocket frame");
            return reply(sink, &json!({ "error": format!("Cannot parse frame: {e}") })).await;
        }
    };

    let requested = match submission.requested_id() {
        Ok(requested) => requested,
        Err(e) => return reply(sink, &json!({ "error": e.to_string() })).await,
    };

    // Subscribe before publishing so a fast completion is not missed.
    let watch = gateway.watch();
    let submitted = match requested {
        Some(id) => gateway.submit_with_id(id, submission.msg).await,
        None => gateway.submit(submission.msg).await,
    };
    let ticket = match submitted {
        Ok(ticket) => ticket,
        Err(e @ GatewayError::IdInUse { .. }) => {
            return reply(sink, &json!({ "error": e.to_string(), "retryable": e.is_retryable() })).await;
        }
        Err(e) => {
            let _ = reply(sink, &json!({ "error": e.to_string(), "retryable": e.is_retryable() })).await;
            return Next::Close;
        }
    };

    if let Next::Close = reply(sink, &json!({ "id": ticket.id, "status": "started" })).await {
        return Next::Close;
    }

    let wait = gateway.wait_for(&ticket.id, watch, Some(gateway.wait_timeout()));
    tokio::pin!(wait);

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break Some(outcome),
            item = source.next() => match classify(item) {
                Inbound::Frame(next) if queued.len() < gateway.max_queued_frames() => queued.push_back(next),
                Inbound::Frame(_) => {
                    tracing::warn!(id = %ticket.id, queued = queued.len(), "Frame queue full; refusing frame");
                    let refusal = json!({ "error": "too many frames queued behind a pending wait" });
                    if let Next::Close = reply(sink, &refusal).await {
                        break None;
                    }
                }
                Inbound::Skip => {}
                Inbound::Gone => break None,
            },
        }
    };

    let Some(outcome) = outcome else {
        tracing::info!(id = %ticket.id, "Client disconnected mid-wait; abandoning");
        metrics::record_abandoned_wait();
        return Next::Close;
    };

    let terminal = match outcome {
        Ok(envelope) => match serde_json::to_value(&envelope) {
            Ok(value) => value,
            Err(e) => json!({ "id": ticket.id, "error": e.to_string() }),
        },
        Err(GatewayError::Timeout { id, waited }) => json!({
            "id": id,
            "status": "Timeout",
            "error": format!("no result within {}ms", waited.as_millis()),
        }),
        Err(e) => json!({ "id": ticket.id, "error": e.to_string() }),
    };
    reply(sink, &terminal).await
}

async fn reply(sink: &mut Sink, frame: &Value) -> Next {
    match sink.send(Message::Text(frame.to_string().into())).await {
        Ok(()) => Next::Continue,
        Err(e) => {
            tracing::debug!(error = %e, "WebSocket write failed");
            Next::Close
        }
    }
}
