//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files, and every
//! section has defaults so a minimal (or missing) file is valid.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TaskgateConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Topic and consumer group names.
    pub bus: BusConfig,

    /// Completion record retention.
    pub store: StoreConfig,

    /// Wait-mode behaviour.
    pub gateway: GatewayConfig,

    /// Worker pool sizing and work simulation.
    pub worker: WorkerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum concurrently handled requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Bus topology.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BusConfig {
    /// Topic the gateway publishes submitted tasks to.
    pub task_topic: String,

    /// Topic workers publish finished tasks to.
    pub completion_topic: String,

    /// Consumer group shared by all workers.
    pub worker_group: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            task_topic: "cli.demo".to_string(),
            completion_topic: "cli.done".to_string(),
            worker_group: "workers".to_string(),
        }
    }
}

/// Completion store retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Seconds a completion record lives after it is written. 0 disables expiry.
    pub ttl_secs: u64,

    /// Seconds between sweeps of expired records.
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

/// Gateway wait-mode settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Longest a held connection waits for its completion, in milliseconds.
    pub wait_timeout_ms: u64,

    /// First poll delay in milliseconds.
    pub poll_base_delay_ms: u64,

    /// Poll delay ceiling in milliseconds.
    pub poll_max_delay_ms: u64,

    /// Frames a WebSocket client may queue while one of its submissions is waiting.
    pub max_queued_frames: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 30_000,
            poll_base_delay_ms: 50,
            poll_max_delay_ms: 2_000,
            max_queued_frames: 16,
        }
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker instances in the consumer group.
    pub instances: usize,

    /// Deliveries a single worker processes at once.
    pub max_in_flight: usize,

    /// Upper bound of the random delay applied to raw payloads, in milliseconds.
    pub simulated_delay_max_ms: u64,

    /// Timeout for `fetch` tasks, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            instances: 2,
            max_in_flight: 64,
            simulated_delay_max_ms: 1_000,
            fetch_timeout_secs: 10,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Seconds background tasks get to drain on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            shutdown_grace_secs: 10,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
