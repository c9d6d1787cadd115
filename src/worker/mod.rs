//! Worker pool subsystem.
//!
//! # Data Flow
//! ```text
//! task topic (group "workers")
//!     → pool.rs Worker (decode, drop garbage)
//!     → processor.rs Processor::process(payload)
//!     → envelope.complete(result) | envelope.fail(reason)
//!     → completion topic
//! ```
//!
//! # Design Decisions
//! - The bus picks the worker; workers do no dedup of their own
//! - One spawned task per delivery, bounded by `max_in_flight` permits per worker
//! - Processing errors still produce a terminal envelope so waiters are released
//! - Completion publish failures are logged, not retried; redelivery is the bus's job

pub mod pool;
pub mod processor;

pub use pool::{handle_task, Worker, WorkerPool};
pub use processor::{ProcessError, Processor, TaskProcessor};
