//! End-to-end tests of polling and call mode over HTTP.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use taskgate::worker::TaskProcessor;
use taskgate_sdk::{Done, GatewayClient};

mod common;

#[tokio::test]
async fn test_trigger_then_done_returns_completion() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::from_millis(20))).await;
    let client = GatewayClient::new(&gw.http_url());

    let ticket = client.trigger(json!("hello")).await.unwrap();
    assert_eq!(ticket.status, "Processing");
    assert_eq!(ticket.msg, json!("hello"));
    assert!(!ticket.id.is_empty());

    let done = client.poll(&ticket.id, Duration::from_millis(20), 100).await.unwrap();
    let Done::Ready(completion) = done else {
        panic!("completion never arrived");
    };
    assert_eq!(completion.id, ticket.id);
    assert_eq!(completion.status, "Done");
    assert_eq!(completion.msg, json!("hello"));

    // Retrieval consumes the record.
    assert_eq!(client.done(&ticket.id).await.unwrap(), Done::Pending);

    gw.stop().await;
}

#[tokio::test]
async fn test_pending_result_is_404_with_processing_status() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::from_secs(5))).await;
    let client = GatewayClient::new(&gw.http_url());
    let ticket = client.trigger(json!({"slow": true})).await.unwrap();

    let res = reqwest::get(format!("{}/done/{}", gw.http_url(), ticket.id)).await.unwrap();
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], json!(ticket.id));
    assert_eq!(body["status"], "Processing");
    assert_eq!(body["error"], "result not ready");

    gw.stop().await;
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::ZERO)).await;
    let client = GatewayClient::new(&gw.http_url());

    assert_eq!(client.done("never-issued").await.unwrap(), Done::Pending);

    gw.stop().await;
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::ZERO)).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/trigger", gw.http_url()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Cannot parse JSON");

    // Valid JSON without `msg` is just as malformed.
    let res = client
        .post(format!("{}/trigger", gw.http_url()))
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    gw.stop().await;
}

#[tokio::test]
async fn test_invalid_id_is_rejected() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::ZERO)).await;

    let res = reqwest::get(format!("{}/done/bad$id", gw.http_url())).await.unwrap();
    assert_eq!(res.status(), 400);

    gw.stop().await;
}

#[tokio::test]
async fn test_call_holds_request_until_done() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::from_millis(50))).await;
    let client = GatewayClient::new(&gw.http_url());

    let completion = client.call(json!({"n": 7}), None).await.unwrap();
    assert_eq!(completion.status, "Done");
    assert_eq!(completion.msg, json!({"n": 7}));

    gw.stop().await;
}

#[tokio::test]
async fn test_call_times_out_before_slow_worker() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::from_secs(5))).await;

    let started = Instant::now();
    let res = reqwest::Client::new()
        .post(format!("{}/call?timeout_ms=100", gw.http_url()))
        .json(&json!({"msg": "slow"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 504);
    assert!(started.elapsed() < Duration::from_secs(2));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "Timeout");
    assert!(body["id"].is_string());

    gw.stop().await;
}

#[tokio::test]
async fn test_stock_processor_runs_typed_tasks() {
    let config = common::test_config();
    let processor = Arc::new(TaskProcessor::new(&config.worker).unwrap());
    let gw = common::start_gateway(config, processor).await;
    let client = GatewayClient::new(&gw.http_url());

    let sum = client
        .call(json!({"kind": "compute", "op": "sum", "operands": [1.5, 2.5, 4]}), None)
        .await
        .unwrap();
    assert_eq!(sum.status, "Done");
    assert_eq!(sum.msg, json!(8.0));

    let bad = client
        .call(json!({"kind": "fetch", "url": "ftp://example.com/file"}), None)
        .await
        .unwrap();
    assert_eq!(bad.status, "Failed");
    assert!(bad.msg["error"].as_str().unwrap().contains("unsupported scheme"));

    gw.stop().await;
}

#[tokio::test]
async fn test_healthz_and_request_id() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::ZERO)).await;

    let res = reqwest::get(format!("{}/healthz", gw.http_url())).await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "ok");

    let res = reqwest::Client::new()
        .get(format!("{}/healthz", gw.http_url()))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    gw.stop().await;
}

#[tokio::test]
async fn test_shutdown_lets_held_call_finish() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::from_millis(300))).await;
    let client = GatewayClient::new(&gw.http_url());

    let call = tokio::spawn(async move { client.call(json!("in flight"), None).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    gw.stop().await;

    let completion = call.await.unwrap().unwrap();
    assert_eq!(completion.status, "Done");
    assert_eq!(completion.msg, json!("in flight"));
}
