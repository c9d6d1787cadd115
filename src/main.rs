//! taskgate: asynchronous request-correlation gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   client ──POST /trigger──▶ ┌─────────┐  task topic   ┌─────────────┐
//!          ──WS /ws ────────▶ │ gateway │ ────────────▶ │ worker pool │
//!                             └────┬────┘               └──────┬──────┘
//!                                  │ GET /done/{id}            │ completion topic
//!                                  │ or wait                   ▼
//!                             ┌────┴──────────────┐      ┌───────────┐
//!                             │ correlation store │ ◀─── │   relay   │
//!                             └───────────────────┘      └───────────┘
//! ```
//!
//! Startup order: config → logging/metrics → core (relay, workers, sweeper)
//! → listener. Shutdown runs the other way round: the listener stops accepting and
//! finishes in-flight requests while the core still relays completions, then the
//! core is drained.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use taskgate::config::{load_config, TaskgateConfig};
use taskgate::lifecycle::{shutdown_signal, Runtime, Shutdown};
use taskgate::observability::{logging, metrics};
use taskgate::HttpServer;

#[derive(Parser)]
#[command(name = "taskgate", version, about = "Asynchronous request-correlation gateway")]
struct Args {
    /// TOML config file. Falls back to $TASKGATE_CONFIG, then built-in defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match args.config.or_else(|| std::env::var_os("TASKGATE_CONFIG").map(PathBuf::from)) {
        Some(path) => load_config(&path)?,
        None => TaskgateConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("taskgate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        wait_timeout_ms = config.gateway.wait_timeout_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Address was checked by validation.
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let runtime = Runtime::start(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let listener_shutdown = Shutdown::new();
    let server = HttpServer::new(&config, runtime.gateway());
    let server = tokio::spawn(server.run(listener, listener_shutdown.subscribe()));

    shutdown_signal().await;

    listener_shutdown.trigger();
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }

    runtime.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
