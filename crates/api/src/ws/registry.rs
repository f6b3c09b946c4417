//! Connection registry
//!
//! Tracks live connections, their session bindings, and a per-session
//! index used for broadcast fan-out. All three maps live under one lock
//! so the index can never disagree with the bindings.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::Connection;
use super::events::ParticipantKind;

/// What a connection is bound to after joining a session
#[derive(Debug, Clone)]
pub struct Binding {
    /// Caller-supplied participant identifier, if any.
    pub participant_id: Option<String>,
    pub kind: ParticipantKind,
    pub session_code: String,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<Uuid, Arc<Connection>>,
    bindings: HashMap<Uuid, Binding>,
    session_index: HashMap<String, HashSet<Uuid>>,
}

impl Inner {
    fn drop_from_index(&mut self, session_code: &str, conn_id: Uuid) {
        if let Some(members) = self.session_index.get_mut(session_code) {
            members.remove(&conn_id);
            if members.is_empty() {
                self.session_index.remove(session_code);
            }
        }
    }
}

/// Registry of live websocket connections
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly accepted connection. Not yet bound to any session.
    pub async fn register(&self, connection: Arc<Connection>) {
        let mut inner = self.inner.write().await;
        inner.connections.insert(connection.conn_id, connection);
    }

    /// Bind a connection to a session. A rebinding connection is first
    /// removed from its previous session's index.
    pub async fn bind(&self, conn_id: Uuid, binding: Binding) {
        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.bindings.remove(&conn_id) {
            inner.drop_from_index(&previous.session_code, conn_id);
        }
        inner
            .session_index
            .entry(binding.session_code.clone())
            .or_default()
            .insert(conn_id);
        inner.bindings.insert(conn_id, binding);
    }

    /// Detach a connection from its session without closing it.
    pub async fn unbind(&self, conn_id: Uuid) -> Option<Binding> {
        let mut inner = self.inner.write().await;
        let binding = inner.bindings.remove(&conn_id)?;
        inner.drop_from_index(&binding.session_code, conn_id);
        Some(binding)
    }

    /// Remove a connection entirely, returning its binding if it had one.
    pub async fn unregister(&self, conn_id: Uuid) -> Option<Binding> {
        let mut inner = self.inner.write().await;
        inner.connections.remove(&conn_id);
        let binding = inner.bindings.remove(&conn_id)?;
        inner.drop_from_index(&binding.session_code, conn_id);
        Some(binding)
    }

    pub async fn connection(&self, conn_id: Uuid) -> Option<Arc<Connection>> {
        self.inner.read().await.connections.get(&conn_id).cloned()
    }

    pub async fn binding(&self, conn_id: Uuid) -> Option<Binding> {
        self.inner.read().await.bindings.get(&conn_id).cloned()
    }

    /// Connections currently bound to a session.
    pub async fn connections_for_session(&self, session_code: &str) -> Vec<Arc<Connection>> {
        let inner = self.inner.read().await;
        match inner.session_index.get(session_code) {
            Some(members) => members
                .iter()
                .filter_map(|id| inner.connections.get(id).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn connection() -> Arc<Connection> {
        let (tx, _rx) = mpsc::unbounded_channel();
        Arc::new(Connection::new(Uuid::new_v4(), tx))
    }

    fn binding(session_code: &str, kind: ParticipantKind) -> Binding {
        Binding {
            participant_id: None,
            kind,
            session_code: session_code.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_bind_and_fan_out() {
        let registry = ConnectionRegistry::new();
        let a = connection();
        let b = connection();
        registry.register(Arc::clone(&a)).await;
        registry.register(Arc::clone(&b)).await;

        registry
            .bind(a.conn_id, binding("CS-1", ParticipantKind::Customer))
            .await;
        registry
            .bind(b.conn_id, binding("CS-1", ParticipantKind::Agent))
            .await;

        let members = registry.connections_for_session("CS-1").await;
        assert_eq!(members.len(), 2);
        assert_eq!(registry.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_rebind_moves_connection_between_sessions() {
        let registry = ConnectionRegistry::new();
        let conn = connection();
        registry.register(Arc::clone(&conn)).await;

        registry
            .bind(conn.conn_id, binding("CS-1", ParticipantKind::Agent))
            .await;
        registry
            .bind(conn.conn_id, binding("CS-2", ParticipantKind::Agent))
            .await;

        assert!(registry.connections_for_session("CS-1").await.is_empty());
        assert_eq!(registry.connections_for_session("CS-2").await.len(), 1);
        let bound = registry.binding(conn.conn_id).await.unwrap();
        assert_eq!(bound.session_code, "CS-2");
    }

    #[tokio::test]
    async fn test_unregister_cleans_the_index() {
        let registry = ConnectionRegistry::new();
        let conn = connection();
        registry.register(Arc::clone(&conn)).await;
        registry
            .bind(conn.conn_id, binding("CS-1", ParticipantKind::Customer))
            .await;

        let removed = registry.unregister(conn.conn_id).await.unwrap();
        assert_eq!(removed.session_code, "CS-1");
        assert!(registry.connections_for_session("CS-1").await.is_empty());
        assert_eq!(registry.connection_count().await, 0);
        assert!(registry.binding(conn.conn_id).await.is_none());
    }

    #[tokio::test]
    async fn test_unbind_keeps_the_connection_registered() {
        let registry = ConnectionRegistry::new();
        let conn = connection();
        registry.register(Arc::clone(&conn)).await;
        registry
            .bind(conn.conn_id, binding("CS-1", ParticipantKind::Customer))
            .await;

        registry.unbind(conn.conn_id).await.unwrap();
        assert!(registry.connections_for_session("CS-1").await.is_empty());
        assert_eq!(registry.connection_count().await, 1);
        assert!(registry.connection(conn.conn_id).await.is_some());
    }

    #[tokio::test]
    async fn test_unregister_without_binding() {
        let registry = ConnectionRegistry::new();
        let conn = connection();
        registry.register(Arc::clone(&conn)).await;
        assert!(registry.unregister(conn.conn_id).await.is_none());
        assert_eq!(registry.connection_count().await, 0);
    }
}
