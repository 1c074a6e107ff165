use std::sync::Arc;

use axum::extract::ws::Message;
use persona_core::job_events::ws_message_type;
use persona_events::PlatformEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::ws::manager::WsManager;

/// Render a lifecycle event as a feed message.
///
/// Returns `None` for events the feed does not carry.
pub fn event_message(event: &PlatformEvent) -> Option<serde_json::Value> {
    let msg_type = ws_message_type(&event.event_type)?;
    Some(serde_json::json!({
        "type": msg_type,
        "context_id": event.context_id,
        "owner_id": event.owner_id,
        "job": event.payload,
        "timestamp": event.timestamp,
    }))
}

/// Spawn a task that forwards bus events to WebSocket clients.
///
/// Ends when the event bus is dropped.
pub fn start_forwarder(
    mut rx: broadcast::Receiver<PlatformEvent>,
    ws_manager: Arc<WsManager>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "WebSocket forwarder lagged, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let Some(message) = event_message(&event) else {
                continue;
            };
            let sent = ws_manager
                .deliver(event.owner_id, Message::Text(message.to_string().into()))
                .await;
            tracing::trace!(event_type = %event.event_type, sent, "Event forwarded");
        }
        tracing::debug!("WebSocket forwarder stopped");
    })
}
