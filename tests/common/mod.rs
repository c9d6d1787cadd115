//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use taskgate::bus::MemoryBus;
use taskgate::config::TaskgateConfig;
use taskgate::envelope::Payload;
use taskgate::store::MemoryStore;
use taskgate::worker::{ProcessError, Processor};
use taskgate::{Gateway, HttpServer, Runtime, Shutdown};

/// Echoes the payload back after a fixed delay, counting invocations.
pub struct EchoProcessor {
    delay: Duration,
    calls: AtomicUsize,
}

impl EchoProcessor {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Processor for EchoProcessor {
    async fn process(&self, payload: Payload) -> Result<Value, ProcessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        serde_json::to_value(&payload).map_err(|e| ProcessError::InvalidTask(e.to_string()))
    }
}

/// Config tuned for tests: ephemeral port, fast polling, short waits.
pub fn test_config() -> TaskgateConfig {
    let mut config = TaskgateConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.gateway.wait_timeout_ms = 3_000;
    config.gateway.poll_base_delay_ms = 10;
    config.gateway.poll_max_delay_ms = 100;
    config.timeouts.shutdown_grace_secs = 1;
    config
}

/// A running gateway with handles on its in-process infrastructure.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub bus: Arc<MemoryBus>,
    pub store: Arc<MemoryStore>,
    pub config: TaskgateConfig,
    pub gateway: Gateway,
    runtime: Runtime,
    listener: Shutdown,
    server: JoinHandle<()>,
}

impl TestGateway {
    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Stop accepting, let in-flight requests finish, then drain the core.
    pub async fn stop(self) {
        self.listener.trigger();
        let _ = self.server.await;
        self.runtime.stop().await;
    }
}

/// Boot relay, workers and the HTTP server on an ephemeral port.
pub async fn start_gateway(config: TaskgateConfig, processor: Arc<dyn Processor>) -> TestGateway {
    let bus = Arc::new(MemoryBus::new());
    let store = Arc::new(MemoryStore::new(None));

    let runtime = Runtime::start_with(&config, bus.clone(), store.clone(), processor)
        .await
        .expect("runtime starts");

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&config, runtime.gateway());
    let listener_shutdown = Shutdown::new();
    let server_shutdown = listener_shutdown.subscribe();
    let server = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        bus,
        store,
        config,
        gateway: runtime.gateway(),
        runtime,
        listener: listener_shutdown,
        server,
    }
}

/// Poll `check` until it returns true or `limit` passes.
pub async fn eventually<F>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
