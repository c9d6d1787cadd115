use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub type SdkError = Box<dyn std::error::Error + Send + Sync>;

/// A task as the gateway reports it: the ticket from `/trigger`, or a completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub msg: Value,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Done {
    Ready(Envelope),
    /// Not recorded yet; ask again later.
    Pending,
}

pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a task. Returns the `Processing` ticket carrying the correlation id.
    pub async fn trigger(&self, msg: Value) -> Result<Envelope, SdkError> {
        let resp = self
            .client
            .post(format!("{}/trigger", self.base_url))
            .json(&json!({ "msg": msg }))
            .send()
            .await?;
        parse(resp).await
    }

    /// Fetch (and consume) the completion for `id`.
    pub async fn done(&self, id: &str) -> Result<Done, SdkError> {
        let resp = self
            .client
            .get(format!("{}/done/{}", self.base_url, id))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Done::Pending);
        }
        parse(resp).await.map(Done::Ready)
    }

    /// Poll `done` every `interval` until the result is ready or `attempts` run out.
    pub async fn poll(&self, id: &str, interval: Duration, attempts: u32) -> Result<Done, SdkError> {
        for _ in 0..attempts {
            if let Done::Ready(envelope) = self.done(id).await? {
                return Ok(Done::Ready(envelope));
            }
            tokio::time::sleep(interval).await;
        }
        Ok(Done::Pending)
    }

    /// Submit and wait on one request.
    pub async fn call(&self, msg: Value, timeout: Option<Duration>) -> Result<Envelope, SdkError> {
        let mut request = self
            .client
            .post(format!("{}/call", self.base_url))
            .json(&json!({ "msg": msg }));
        if let Some(timeout) = timeout {
            request = request.query(&[("timeout_ms", timeout.as_millis() as u64)]);
        }
        parse(request.send().await?).await
    }
}

async fn parse(resp: reqwest::Response) -> Result<Envelope, SdkError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(format!("Gateway returned error status {}: {}", status, text).into());
    }

    Ok(serde_json::from_str::<Envelope>(&text)?)
}
