//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, correlation id as a field)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every log line about a task carries `id` so one task can be followed end to end
//! - HTTP requests additionally carry `x-request-id`
//! - Metrics are cheap (atomic increments) and off unless enabled

pub mod logging;
pub mod metrics;
