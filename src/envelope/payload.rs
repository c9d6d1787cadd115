//! Work payloads.
//!
//! A payload is either a known task kind, recognised by its `"kind"` tag, or an
//! opaque JSON value the worker treats as a timed simulation that echoes its input.
//! Objects carrying an unknown `kind`, or a known `kind` with missing fields, fall
//! back to [`Payload::Raw`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Task(TaskKind),
    Raw(Value),
}

/// Tasks a worker knows how to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// Wait `millis`, then produce `value`.
    Sleep {
        millis: u64,
        #[serde(default)]
        value: Value,
    },

    /// Fold `operands` with `op`.
    Compute { op: ComputeOp, operands: Vec<f64> },

    /// GET `url` and report status and body.
    Fetch { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeOp {
    Sum,
    Product,
    Min,
    Max,
}

impl Payload {
    /// Name used in logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Task(TaskKind::Sleep { .. }) => "sleep",
            Payload::Task(TaskKind::Compute { .. }) => "compute",
            Payload::Task(TaskKind::Fetch { .. }) => "fetch",
            Payload::Raw(_) => "raw",
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Raw(value)
    }
}

impl From<TaskKind> for Payload {
    fn from(task: TaskKind) -> Self {
        Payload::Task(task)
    }
}
