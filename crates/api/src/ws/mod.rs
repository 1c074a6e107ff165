//! WebSocket feed of job lifecycle events.
//!
//! Provides connection management, heartbeat pings, the event forwarder
//! and the HTTP upgrade handler used by Axum routes.

mod forwarder;
mod handler;
mod heartbeat;
pub mod manager;

pub use forwarder::{event_message, start_forwarder};
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
