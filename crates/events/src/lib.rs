//! In-process event bus for generation job lifecycle events.
//!
//! - [`EventBus`]: publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope.

pub mod bus;

pub use bus::{EventBus, PlatformEvent};
