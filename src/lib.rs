//! Asynchronous request-correlation gateway.
//!
//! Clients submit work over HTTP or WebSocket. The gateway publishes it on the
//! task topic, a worker pool processes it and publishes the completion, the relay
//! records completions in the correlation store, and clients retrieve them by id
//! either by polling or by holding a connection open.

pub mod bus;
pub mod config;
pub mod envelope;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;
pub mod store;
pub mod worker;

pub use config::schema::TaskgateConfig;
pub use gateway::Gateway;
pub use http::HttpServer;
pub use lifecycle::{Runtime, Shutdown};
