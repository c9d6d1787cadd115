//! Work operations.
//!
//! The pool only knows the [`Processor`] trait. [`TaskProcessor`] is the stock
//! implementation and dispatches on the payload kind:
//!
//! | kind      | work                                     | result                     |
//! |-----------|------------------------------------------|----------------------------|
//! | `sleep`   | wait `millis`                            | `value`                    |
//! | `compute` | fold `operands` with `op`                | the number                 |
//! | `fetch`   | HTTP GET `url`                           | `{"status", "body"}`       |
//! | raw       | random delay up to the configured bound  | the payload, unchanged     |

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

use crate::config::WorkerConfig;
use crate::envelope::{ComputeOp, Payload, TaskKind};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("downstream call failed: {0}")]
    Downstream(String),
}

#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Turn a task payload into its result.
    ///
    /// May run more than once for the same task when the bus redelivers it.
    async fn process(&self, payload: Payload) -> Result<Value, ProcessError>;
}

pub struct TaskProcessor {
    http: reqwest::Client,
    simulated_delay_max: Duration,
}

impl TaskProcessor {
    pub fn new(config: &WorkerConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            simulated_delay_max: Duration::from_millis(config.simulated_delay_max_ms),
        })
    }

    async fn fetch(&self, raw_url: &str) -> Result<Value, ProcessError> {
        let url = Url::parse(raw_url).map_err(|e| ProcessError::InvalidTask(format!("bad url {raw_url:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProcessError::InvalidTask(format!("unsupported scheme {:?}", url.scheme())));
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ProcessError::Downstream(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProcessError::Downstream(e.to_string()))?;

        Ok(json!({ "status": status, "body": body }))
    }

    fn simulated_delay(&self) -> Duration {
        let max_ms = self.simulated_delay_max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(fastrand::u64(0..=max_ms))
    }
}

#[async_trait]
impl Processor for TaskProcessor {
    async fn process(&self, payload: Payload) -> Result<Value, ProcessError> {
        match payload {
            Payload::Task(TaskKind::Sleep { millis, value }) => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(value)
            }
            Payload::Task(TaskKind::Compute { op, operands }) => compute(op, &operands),
            Payload::Task(TaskKind::Fetch { url }) => self.fetch(&url).await,
            Payload::Raw(value) => {
                tokio::time::sleep(self.simulated_delay()).await;
                Ok(value)
            }
        }
    }
}

fn compute(op: ComputeOp, operands: &[f64]) -> Result<Value, ProcessError> {
    let result: f64 = match op {
        ComputeOp::Sum => operands.iter().sum(),
        ComputeOp::Product => operands.iter().product(),
        ComputeOp::Min | ComputeOp::Max if operands.is_empty() => {
            return Err(ProcessError::InvalidTask(format!("{op:?} of no operands")));
        }
        ComputeOp::Min => operands.iter().copied().fold(f64::INFINITY, f64::min),
        ComputeOp::Max => operands.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    Ok(json!(result))
}
