//! Configuration validation.
//!
//! Serde handles syntax; this checks values. Validation is a pure function that
//! reports every problem at once rather than stopping at the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::TaskgateConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a socket address")]
    BadAddress { field: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("bus.task_topic and bus.completion_topic must differ")]
    SameTopic,

    #[error("{0} must be at least 1")]
    Zero(&'static str),

    #[error("gateway.poll_base_delay_ms must not exceed gateway.poll_max_delay_ms")]
    PollDelayOrder,

    #[error("timeouts.request_secs ({request_secs}s) must exceed gateway.wait_timeout_ms ({wait_timeout_ms}ms)")]
    RequestShorterThanWait { request_secs: u64, wait_timeout_ms: u64 },
}

pub fn validate_config(config: &TaskgateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }

    let bus = &config.bus;
    for (field, value) in [
        ("bus.task_topic", &bus.task_topic),
        ("bus.completion_topic", &bus.completion_topic),
        ("bus.worker_group", &bus.worker_group),
    ] {
        if value.trim().is_empty() {
            errors.push(ValidationError::Empty(field));
        }
    }
    if !bus.task_topic.is_empty() && bus.task_topic == bus.completion_topic {
        errors.push(ValidationError::SameTopic);
    }

    if config.store.ttl_secs > 0 && config.store.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero("store.sweep_interval_secs"));
    }

    let gateway = &config.gateway;
    if gateway.wait_timeout_ms == 0 {
        errors.push(ValidationError::Zero("gateway.wait_timeout_ms"));
    }
    if gateway.poll_base_delay_ms == 0 {
        errors.push(ValidationError::Zero("gateway.poll_base_delay_ms"));
    }
    if gateway.max_queued_frames == 0 {
        errors.push(ValidationError::Zero("gateway.max_queued_frames"));
    }
    if gateway.poll_base_delay_ms > gateway.poll_max_delay_ms {
        errors.push(ValidationError::PollDelayOrder);
    }
    if config.timeouts.request_secs.saturating_mul(1000) <= gateway.wait_timeout_ms {
        errors.push(ValidationError::RequestShorterThanWait {
            request_secs: config.timeouts.request_secs,
            wait_timeout_ms: gateway.wait_timeout_ms,
        });
    }

    if config.worker.instances == 0 {
        errors.push(ValidationError::Zero("worker.instances"));
    }
    if config.worker.max_in_flight == 0 {
        errors.push(ValidationError::Zero("worker.max_in_flight"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field,
            value: value.to_string(),
        });
    }
}
