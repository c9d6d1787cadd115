//! HTTP and WebSocket transports.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, limits, tracing)
//!     → ticket.rs (POST /trigger, GET /done/{id}, POST /call)
//!     → websocket.rs (GET /ws, GET /ws/{channel})
//!     → Gateway
//!     → response.rs (GatewayError → status + JSON)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod ticket;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{AppState, HttpServer};
