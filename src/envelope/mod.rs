//! Task envelope: the message that travels on both topics and sits in the store.
//!
//! # Wire Format
//! ```text
//! {"id": "<correlation id>", "msg": <payload>, "status": "Processing" | "Done" | "Failed"}
//! ```
//!
//! # Lifecycle
//! ```text
//! Gateway: Envelope::new(id, msg)        status = Processing  → task topic
//! Worker:  envelope.complete(result)     status = Done        → completion topic
//!          envelope.fail(reason)         status = Failed      → completion topic
//! Relay:   store[id] = envelope bytes
//! Gateway: take(id)                      → client
//! ```

pub mod id;
pub mod payload;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub use id::{CorrelationId, InvalidId};
pub use payload::{ComputeOp, Payload, TaskKind};

/// Processing state carried inside an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Processing,
    Done,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Processing => "Processing",
            Status::Done => "Done",
            Status::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: CorrelationId,
    pub msg: Payload,
    pub status: Status,
}

/// Failure to move an envelope across a byte boundary.
#[derive(Debug, Error)]
#[error("envelope codec error: {0}")]
pub struct CodecError(#[from] serde_json::Error);

impl Envelope {
    /// A freshly submitted task.
    pub fn new(id: CorrelationId, msg: Payload) -> Self {
        Self {
            id,
            msg,
            status: Status::Processing,
        }
    }

    /// Replace the payload with the worker's result and mark it done.
    pub fn complete(self, result: Value) -> Self {
        Self {
            msg: Payload::Raw(result),
            status: Status::Done,
            ..self
        }
    }

    /// Mark the task failed, carrying the reason as the payload.
    pub fn fail(self, reason: impl Into<String>) -> Self {
        Self {
            msg: Payload::Raw(json!({ "error": reason.into() })),
            status: Status::Failed,
            ..self
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != Status::Processing
    }

    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    pub fn from_bytes(raw: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// Inbound client frame: `{"id"?: string, "msg": any}`.
///
/// `msg` is required; `id` is only honoured by the WebSocket wait mode.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub id: Option<String>,
    pub msg: Payload,
}

impl Submission {
    /// The client-chosen id, if one was supplied and non-empty.
    pub fn requested_id(&self) -> Result<Option<CorrelationId>, InvalidId> {
        match self.id.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => CorrelationId::parse(raw).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let id = CorrelationId::parse("abc").unwrap();
        let env = Envelope::new(id, Payload::Raw(json!("hello")));
        let wire: Value = serde_json::from_slice(&env.to_bytes().unwrap()).unwrap();
        assert_eq!(wire, json!({"id": "abc", "msg": "hello", "status": "Processing"}));
    }

    #[test]
    fn test_complete_and_fail_keep_id() {
        let env = Envelope::new(CorrelationId::generate(), Payload::Raw(json!(1)));
        let id = env.id.clone();

        let done = env.clone().complete(json!({"answer": 2}));
        assert_eq!(done.id, id);
        assert_eq!(done.status, Status::Done);
        assert_eq!(done.msg, Payload::Raw(json!({"answer": 2})));
        assert!(done.is_terminal());

        let failed = env.fail("boom");
        assert_eq!(failed.id, id);
        assert_eq!(failed.status, Status::Failed);
        assert_eq!(failed.msg, Payload::Raw(json!({"error": "boom"})));
    }

    #[test]
    fn test_garbage_is_codec_error() {
        assert!(Envelope::from_bytes(b"not json").is_err());
        assert!(Envelope::from_bytes(br#"{"id":"x","msg":1,"status":"Lost"}"#).is_err());
    }

    #[test]
    fn test_submission_requires_msg() {
        assert!(serde_json::from_str::<Submission>(r#"{"id":"x"}"#).is_err());

        let s: Submission = serde_json::from_str(r#"{"msg":null}"#).unwrap();
        assert_eq!(s.msg, Payload::Raw(Value::Null));
        assert_eq!(s.requested_id(), Ok(None));

        let s: Submission = serde_json::from_str(r#"{"id":"","msg":"a"}"#).unwrap();
        assert_eq!(s.requested_id(), Ok(None));

        let s: Submission = serde_json::from_str(r#"{"id":"job-7","msg":"a"}"#).unwrap();
        assert_eq!(s.requested_id().unwrap().unwrap().as_str(), "job-7");
    }
}
