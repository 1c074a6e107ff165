//! Persona API server library.
//!
//! Exposes config, state, error handling, routes and the WebSocket feed so
//! integration tests and the binary entrypoint share the same building
//! blocks.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;
pub mod ws;
