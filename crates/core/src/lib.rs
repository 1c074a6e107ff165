//! Domain model and pure logic for tracking asynchronous generation jobs.
//!
//! Nothing in this crate performs I/O. The ledger, the provider gateway
//! and the polling timers live in `persona-tracker`; this crate only
//! decides what a tick *means* (which items are new, how far along a job
//! is, whether it is finished).

pub mod content;
pub mod context;
pub mod detection;
pub mod error;
pub mod event_log;
pub mod job;
pub mod job_events;
pub mod polling;
pub mod progress;
pub mod types;
