//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TaskgateConfig (validated, immutable)
//!     → sections handed to the subsystems that need them at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BusConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, SecurityConfig, StoreConfig,
    TaskgateConfig, TimeoutConfig, WorkerConfig,
};
pub use validation::ValidationError;
