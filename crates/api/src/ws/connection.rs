//! A single websocket connection

use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::ServerEvent;

/// Handle to one connected websocket. Events pushed here are serialized
/// and written to the socket by the connection's send task.
#[derive(Debug)]
pub struct Connection {
    pub conn_id: Uuid,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    pub fn new(conn_id: Uuid, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { conn_id, sender }
    }

    /// Queue an event for delivery. Returns false when the socket's send
    /// task has already shut down.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}
