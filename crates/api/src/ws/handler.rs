use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use persona_core::types::DbId;
use serde::Deserialize;

use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Query parameters accepted on upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    /// Restrict the feed to one owner's jobs.
    pub owner_id: Option<DbId>,
}

/// GET /api/v1/ws -- upgrade to the job event feed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<FeedParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, params.owner_id))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Registers the connection, forwards outbound messages from the manager
/// channel on a spawned task and drains inbound frames until the client
/// disconnects.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, owner_id: Option<DbId>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, owner_id, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone(), owner_id).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // The feed is server-push only; inbound frames other than Close are
    // ignored.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
