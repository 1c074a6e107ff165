use std::sync::Arc;

use persona_events::EventBus;
use persona_tracker::{ContentLedger, JobRegistry};

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Content ledger (Postgres in production, in-memory in tests).
    pub ledger: Arc<dyn ContentLedger>,
    /// Generation jobs, one per context id.
    pub registry: Arc<JobRegistry>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Job lifecycle events, forwarded to WebSocket clients.
    pub event_bus: Arc<EventBus>,
}
