//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the submission, retrieval and wait handlers
//! - Wire up middleware (tracing, request ID, timeout, body and concurrency limits)
//! - Bind server to listener
//! - Stop accepting when the runtime shuts down

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TaskgateConfig;
use crate::gateway::Gateway;
use crate::http::{request, ticket, websocket};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

/// HTTP and WebSocket front of the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &TaskgateConfig, gateway: Gateway) -> Self {
        let state = AppState { gateway };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &TaskgateConfig, state: AppState) -> Router {
        Router::new()
            .route("/trigger", post(ticket::trigger))
            .route("/done/{id}", get(ticket::done))
            .route("/call", post(ticket::call))
            .route("/ws", get(websocket::upgrade))
            .route("/ws/{channel}", get(websocket::upgrade_channel))
            .route("/healthz", get(healthz))
            .with_state(state)
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(request::propagate_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(request::set_request_id())
    }

    /// Run the server until `shutdown` fires, then finish in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn healthz() -> &'static str {
    "ok"
}
