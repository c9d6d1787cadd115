//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway wait loop:
//!     → store lookup misses (or store unreachable)
//!     → backoff.rs (next delay, exponential + jitter)
//!     → sleep, unless the completion notifier fires first
//! ```
//!
//! # Design Decisions
//! - Every wait has a deadline; the backoff only shapes the polling inside it
//! - Publishes are never retried here; retry belongs to the caller

pub mod backoff;

pub use backoff::{calculate_backoff, Backoff};
