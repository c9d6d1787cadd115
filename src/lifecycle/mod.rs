//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Start relay, workers, sweeper → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Broadcast stop → Drain tracked tasks → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Any subscribe failure during startup is fatal
//! - Shutdown has a deadline: tasks still running after it are aborted

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{Runtime, StartupError};
