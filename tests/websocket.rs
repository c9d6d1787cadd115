//! WebSocket wait mode.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

mod common;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn send(socket: &mut Socket, frame: Value) {
    socket.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Next text frame as JSON, or `None` once the server closes.
async fn recv(socket: &mut Socket) -> Option<Value> {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("frame within 5s")?;
        match message {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

#[tokio::test]
async fn test_ack_then_terminal_frame_with_same_id() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::from_millis(50))).await;
    let (mut socket, _) = connect_async(gw.ws_url()).await.unwrap();

    send(&mut socket, json!({"msg": "hello"})).await;

    let ack = recv(&mut socket).await.unwrap();
    assert_eq!(ack["status"], "started");
    let id = ack["id"].as_str().unwrap().to_string();

    let done = recv(&mut socket).await.unwrap();
    assert_eq!(done["id"], json!(id));
    assert_eq!(done["status"], "Done");
    assert_eq!(done["msg"], json!("hello"));

    gw.stop().await;
}

#[tokio::test]
async fn test_client_id_is_honored_on_channel_route() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::ZERO)).await;
    let (mut socket, _) = connect_async(format!("{}/client-7", gw.ws_url())).await.unwrap();

    send(&mut socket, json!({"id": "client-7:req-1", "msg": {"a": 1}})).await;

    let ack = recv(&mut socket).await.unwrap();
    assert_eq!(ack["id"], "client-7:req-1");
    let done = recv(&mut socket).await.unwrap();
    assert_eq!(done["id"], "client-7:req-1");
    assert_eq!(done["msg"], json!({"a": 1}));

    gw.stop().await;
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::ZERO)).await;
    let (mut socket, _) = connect_async(gw.ws_url()).await.unwrap();

    socket.send(Message::Text("{oops".into())).await.unwrap();
    let error = recv(&mut socket).await.unwrap();
    assert!(error["error"].as_str().unwrap().starts_with("Cannot parse frame"));

    send(&mut socket, json!({"id": "has spaces", "msg": 1})).await;
    let error = recv(&mut socket).await.unwrap();
    assert!(error["error"].is_string());

    send(&mut socket, json!({"msg": "after"})).await;
    assert_eq!(recv(&mut socket).await.unwrap()["status"], "started");
    assert_eq!(recv(&mut socket).await.unwrap()["msg"], "after");

    gw.stop().await;
}

#[tokio::test]
async fn test_timeout_frame() {
    let mut config = common::test_config();
    config.gateway.wait_timeout_ms = 150;
    let gw = common::start_gateway(config, common::EchoProcessor::new(Duration::from_secs(5))).await;
    let (mut socket, _) = connect_async(gw.ws_url()).await.unwrap();

    send(&mut socket, json!({"msg": "slow"})).await;
    let ack = recv(&mut socket).await.unwrap();

    let timeout = recv(&mut socket).await.unwrap();
    assert_eq!(timeout["id"], ack["id"]);
    assert_eq!(timeout["status"], "Timeout");
    assert!(timeout["error"].is_string());

    gw.stop().await;
}

#[tokio::test]
async fn test_frames_sent_during_wait_are_served_in_order() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::from_millis(100))).await;
    let (mut socket, _) = connect_async(gw.ws_url()).await.unwrap();

    send(&mut socket, json!({"msg": "first"})).await;
    send(&mut socket, json!({"msg": "second"})).await;

    let mut terminal = Vec::new();
    while terminal.len() < 2 {
        let frame = recv(&mut socket).await.unwrap();
        if frame["status"] != "started" {
            terminal.push(frame["msg"].clone());
        }
    }
    assert_eq!(terminal, vec![json!("first"), json!("second")]);

    gw.stop().await;
}

#[tokio::test]
async fn test_publish_failure_closes_connection() {
    let gw = common::start_gateway(common::test_config(), common::EchoProcessor::new(Duration::ZERO)).await;
    let (mut socket, _) = connect_async(gw.ws_url()).await.unwrap();
    gw.bus.set_available(false);

    send(&mut socket, json!({"msg": "lost"})).await;
    let error = recv(&mut socket).await.unwrap();
    assert!(error["error"].is_string());
    assert!(recv(&mut socket).await.is_none());

    gw.stop().await;
}

#[tokio::test]
async fn test_reused_id_with_unretrieved_completion_is_refused() {
    let mut config = common::test_config();
    config.gateway.wait_timeout_ms = 100;
    let gw = common::start_gateway(config, common::EchoProcessor::new(Duration::from_millis(300))).await;
    let (mut socket, _) = connect_async(gw.ws_url()).await.unwrap();

    send(&mut socket, json!({"id": "job-1", "msg": "old"})).await;
    assert_eq!(recv(&mut socket).await.unwrap()["status"], "started");
    assert_eq!(recv(&mut socket).await.unwrap()["status"], "Timeout");

    // The late completion lands in the store.
    let store = gw.store.clone();
    assert!(common::eventually(Duration::from_secs(2), || !store.is_empty()).await);

    send(&mut socket, json!({"id": "job-1", "msg": "new"})).await;
    let refused = recv(&mut socket).await.unwrap();
    assert!(refused["error"].as_str().unwrap().contains("pending completion"));
    assert_eq!(refused["retryable"], false);

    // The old result is still there for whoever owns it, and the id frees up after.
    let res = reqwest::get(format!("{}/done/job-1", gw.http_url())).await.unwrap();
    assert_eq!(res.status(), 200);
    let old: Value = res.json().await.unwrap();
    assert_eq!(old["msg"], "old");

    send(&mut socket, json!({"id": "job-1", "msg": "new"})).await;
    let ack = recv(&mut socket).await.unwrap();
    assert_eq!(ack["id"], "job-1");
    assert_eq!(ack["status"], "started");

    gw.stop().await;
}

#[tokio::test]
async fn test_frames_past_queue_cap_are_refused() {
    let mut config = common::test_config();
    config.gateway.max_queued_frames = 2;
    let gw = common::start_gateway(config, common::EchoProcessor::new(Duration::from_millis(400))).await;
    let (mut socket, _) = connect_async(gw.ws_url()).await.unwrap();

    send(&mut socket, json!({"msg": 0})).await;
    assert_eq!(recv(&mut socket).await.unwrap()["status"], "started");
    for n in 1..=4 {
        send(&mut socket, json!({"msg": n})).await;
    }

    let mut refusals = 0;
    let mut served = Vec::new();
    while served.len() < 3 {
        let frame = recv(&mut socket).await.unwrap();
        if frame["error"].is_string() {
            refusals += 1;
        } else if frame["status"] == "Done" {
            served.push(frame["msg"].clone());
        }
    }
    assert_eq!(refusals, 2);
    assert_eq!(served, vec![json!(0), json!(1), json!(2)]);

    gw.stop().await;
}

#[tokio::test]
async fn test_disconnect_mid_wait_stops_waiting() {
    let mut config = common::test_config();
    config.gateway.wait_timeout_ms = 10_000;
    let gw = common::start_gateway(config, common::EchoProcessor::new(Duration::from_secs(5))).await;
    let (mut socket, _) = connect_async(gw.ws_url()).await.unwrap();

    send(&mut socket, json!({"msg": "abandoned"})).await;
    assert_eq!(recv(&mut socket).await.unwrap()["status"], "started");
    assert_eq!(gw.gateway.waiting(), 1);

    drop(socket);

    let gateway = gw.gateway.clone();
    assert!(common::eventually(Duration::from_secs(1), || gateway.waiting() == 0).await);

    gw.stop().await;
}
