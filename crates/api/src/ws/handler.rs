//! Websocket endpoint

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;

use super::connection::Connection;
use super::events::{ClientEvent, ServerEvent};

/// GET /ws/chat
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let conn_id = Uuid::new_v4();
    let connection = Arc::new(Connection::new(conn_id, tx));
    state.registry.register(Arc::clone(&connection)).await;
    tracing::debug!(%conn_id, "Websocket connected");

    connection.send(ServerEvent::Connected {
        connection_id: conn_id,
    });

    // Writer task: everything the hub pushes at this connection goes out
    // through here.
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to serialize server event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_rx.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => state.hub.handle_event(conn_id, event).await,
                // Malformed frames are dropped; the connection stays up.
                Err(err) => {
                    tracing::warn!(%conn_id, error = %err, "Dropping malformed frame");
                }
            },
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    state.hub.handle_disconnect(conn_id).await;
    send_task.abort();
    tracing::debug!(%conn_id, "Websocket disconnected");
}
