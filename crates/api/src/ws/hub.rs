//! Session hub
//!
//! Routes client events to store writes and fan-out broadcasts. Mutations
//! of one session are serialized by a per-session lock held across the
//! read-validate-write-broadcast sequence, so participants observe every
//! session in a single order. The lock never spans more than one session.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use chatdesk_shared::{ChatSession, NewMessage, SenderKind, Store};

use crate::lifecycle::{LifecycleError, SessionLifecycle, TransferOutcome};

use super::events::{
    ChatMessageData, ClientEvent, MessageEvent, ParticipantKind, PresenceData, ServerEvent,
    SessionEndedData, TransferNotice,
};
use super::registry::{Binding, ConnectionRegistry};

pub struct SessionHub {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn Store>,
    lifecycle: Arc<SessionLifecycle>,
    // One entry per session code; the entry is dropped when the session
    // ends with no connections left bound to it.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionHub {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn Store>,
        lifecycle: Arc<SessionLifecycle>,
    ) -> Self {
        Self {
            registry,
            store,
            lifecycle,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Dispatch one parsed client frame.
    pub async fn handle_event(&self, conn_id: Uuid, event: ClientEvent) {
        match event {
            ClientEvent::JoinSession {
                session_id,
                user_id,
                user_type,
            } => self.join(conn_id, session_id, user_id, user_type).await,
            ClientEvent::ChatMessage { session_id, data } => {
                self.chat(conn_id, session_id, data).await
            }
            ClientEvent::AgentTyping { session_id } => {
                self.typing(conn_id, session_id, ParticipantKind::Agent)
                    .await
            }
            ClientEvent::CustomerTyping { session_id } => {
                self.typing(conn_id, session_id, ParticipantKind::Customer)
                    .await
            }
            ClientEvent::SessionTransfer { session_id, data } => {
                if let Err(err) = self
                    .transfer_session(&session_id, data.new_agent_id, &data.reason)
                    .await
                {
                    self.error_to(conn_id, err.to_string()).await;
                }
            }
            ClientEvent::SessionEnded { session_id, data } => {
                let ended_by = data.and_then(|d| d.ended_by);
                if let Err(err) = self.end_session(&session_id, ended_by).await {
                    self.error_to(conn_id, err.to_string()).await;
                }
            }
            ClientEvent::LeaveSession { session_id } => self.leave(conn_id, session_id).await,
        }
    }

    /// Called when a socket closes for any reason. The departure is
    /// announced to the remaining participants of its session.
    pub async fn handle_disconnect(&self, conn_id: Uuid) {
        if let Some(binding) = self.registry.unregister(conn_id).await {
            tracing::debug!(%conn_id, session_code = %binding.session_code, "Connection left session");
            self.broadcast(
                &binding.session_code,
                ServerEvent::AgentStatus {
                    session_id: binding.session_code.clone(),
                    data: PresenceData {
                        status: "left".into(),
                        user_id: binding.participant_id,
                        user_type: binding.kind,
                    },
                },
                None,
            )
            .await;
        }
    }

    /// Reassign a session's agent and notify its participants. Used by
    /// both the websocket path and the REST endpoint.
    pub async fn transfer_session(
        &self,
        session_code: &str,
        new_agent_id: Uuid,
        reason: &str,
    ) -> Result<TransferOutcome, LifecycleError> {
        let lock = self.session_lock(session_code).await;
        let _guard = lock.lock().await;

        let outcome = self
            .lifecycle
            .transfer_session(session_code, new_agent_id, reason)
            .await?;

        // Broadcasts happen only after the store committed.
        self.broadcast(
            session_code,
            ServerEvent::SessionTransfer {
                session_id: session_code.to_string(),
                data: TransferNotice {
                    new_agent_id: outcome.new_agent.id,
                    new_agent_name: outcome.new_agent.display_name.clone(),
                    reason: reason.to_string(),
                },
            },
            None,
        )
        .await;
        self.broadcast(
            session_code,
            ServerEvent::ChatMessage {
                session_id: session_code.to_string(),
                data: MessageEvent {
                    id: outcome.system_message.id,
                    sender_id: None,
                    sender_name: "System".into(),
                    sender_kind: SenderKind::System,
                    content: outcome.system_message.content.clone(),
                    message_kind: outcome.system_message.message_kind,
                    sent_at: outcome.system_message.sent_at,
                },
            },
            None,
        )
        .await;

        Ok(outcome)
    }

    /// Close a session and notify its participants. Used by both the
    /// websocket path and the REST endpoint.
    pub async fn end_session(
        &self,
        session_code: &str,
        ended_by: Option<String>,
    ) -> Result<ChatSession, LifecycleError> {
        let lock = self.session_lock(session_code).await;
        let _guard = lock.lock().await;

        let session = self.lifecycle.end_session(session_code).await?;

        self.broadcast(
            session_code,
            ServerEvent::SessionEnded {
                session_id: session_code.to_string(),
                data: SessionEndedData { ended_by },
            },
            None,
        )
        .await;

        // Closed session, nobody connected: the lock entry has no future
        // user. Stragglers holding a clone of the Arc are unaffected.
        if self
            .registry
            .connections_for_session(session_code)
            .await
            .is_empty()
        {
            self.locks.lock().await.remove(session_code);
        }

        Ok(session)
    }

    async fn join(
        &self,
        conn_id: Uuid,
        session_code: String,
        user_id: Option<String>,
        user_type: ParticipantKind,
    ) {
        let lock = self.session_lock(&session_code).await;
        let _guard = lock.lock().await;

        match self.store.session_by_code(&session_code).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.error_to(conn_id, format!("Unknown session: {}", session_code))
                    .await;
                return;
            }
            Err(err) => {
                tracing::error!(error = %err, "Session lookup failed");
                self.error_to(conn_id, "Session lookup failed").await;
                return;
            }
        }

        self.registry
            .bind(
                conn_id,
                Binding {
                    participant_id: user_id.clone(),
                    kind: user_type,
                    session_code: session_code.clone(),
                },
            )
            .await;

        // The joiner is included in its own join announcement.
        self.broadcast(
            &session_code,
            ServerEvent::AgentStatus {
                session_id: session_code.clone(),
                data: PresenceData {
                    status: "joined".into(),
                    user_id,
                    user_type,
                },
            },
            None,
        )
        .await;
    }

    async fn chat(&self, conn_id: Uuid, session_code: String, data: ChatMessageData) {
        let Some(binding) = self.registry.binding(conn_id).await else {
            self.error_to(conn_id, "Join a session before sending messages")
                .await;
            return;
        };
        if binding.session_code != session_code {
            self.error_to(conn_id, "Not joined to this session").await;
            return;
        }
        if data.content.trim().is_empty() {
            self.error_to(conn_id, "Message content must not be empty")
                .await;
            return;
        }

        let lock = self.session_lock(&session_code).await;
        let _guard = lock.lock().await;

        let session = match self.store.session_by_code(&session_code).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                self.error_to(conn_id, format!("Unknown session: {}", session_code))
                    .await;
                return;
            }
            Err(err) => {
                tracing::error!(error = %err, "Session lookup failed");
                self.error_to(conn_id, "Session lookup failed").await;
                return;
            }
        };
        if session.status.is_closed() {
            self.error_to(conn_id, "Session is closed").await;
            return;
        }

        let sender_kind = binding.kind.sender_kind();
        let sender_id = binding
            .participant_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok());

        let message = match self
            .store
            .create_message(NewMessage {
                session_id: session.id,
                sender_id,
                sender_kind,
                content: data.content,
                message_kind: Default::default(),
            })
            .await
        {
            Ok(message) => message,
            Err(err) => {
                // The store is the source of truth: nothing is broadcast
                // for a message that was not persisted.
                tracing::error!(error = %err, session_code = %session_code, "Failed to persist message");
                self.error_to(conn_id, "Failed to persist message").await;
                return;
            }
        };

        let sender_name = match data.sender_name {
            Some(name) => name,
            None => self.resolve_sender_name(sender_id, sender_kind).await,
        };

        self.broadcast(
            &session_code,
            ServerEvent::ChatMessage {
                session_id: session_code.clone(),
                data: MessageEvent {
                    id: message.id,
                    sender_id: binding.participant_id,
                    sender_name,
                    sender_kind: message.sender_kind,
                    content: message.content,
                    message_kind: message.message_kind,
                    sent_at: message.sent_at,
                },
            },
            None,
        )
        .await;
    }

    /// Typing indicators are ephemeral: never persisted, never echoed to
    /// the typist, dropped when the connection is not bound.
    async fn typing(&self, conn_id: Uuid, session_code: String, kind: ParticipantKind) {
        let Some(binding) = self.registry.binding(conn_id).await else {
            return;
        };
        if binding.session_code != session_code {
            return;
        }
        let event = match kind {
            ParticipantKind::Agent => ServerEvent::AgentTyping {
                session_id: session_code.clone(),
            },
            ParticipantKind::Customer => ServerEvent::CustomerTyping {
                session_id: session_code.clone(),
            },
        };
        self.broadcast(&session_code, event, Some(conn_id)).await;
    }

    async fn leave(&self, conn_id: Uuid, session_code: String) {
        let Some(binding) = self.registry.unbind(conn_id).await else {
            return;
        };
        if binding.session_code != session_code {
            tracing::debug!(%conn_id, "Leave for a session the connection was not in");
        }
        self.broadcast(
            &binding.session_code,
            ServerEvent::AgentStatus {
                session_id: binding.session_code.clone(),
                data: PresenceData {
                    status: "left".into(),
                    user_id: binding.participant_id,
                    user_type: binding.kind,
                },
            },
            None,
        )
        .await;
    }

    async fn resolve_sender_name(&self, sender_id: Option<Uuid>, kind: SenderKind) -> String {
        if let Some(id) = sender_id {
            if let Ok(user) = self.store.user(id).await {
                return user.display_name;
            }
        }
        match kind {
            SenderKind::Customer => "Customer".to_string(),
            SenderKind::Agent => "Agent".to_string(),
            SenderKind::System => "System".to_string(),
        }
    }

    async fn broadcast(&self, session_code: &str, event: ServerEvent, exclude: Option<Uuid>) {
        for conn in self.registry.connections_for_session(session_code).await {
            if Some(conn.conn_id) == exclude {
                continue;
            }
            if !conn.send(event.clone()) {
                tracing::debug!(conn_id = %conn.conn_id, "Dropping event for closed connection");
            }
        }
    }

    async fn error_to(&self, conn_id: Uuid, message: impl Into<String>) {
        if let Some(conn) = self.registry.connection(conn_id).await {
            conn.send(ServerEvent::Error {
                message: message.into(),
            });
        }
    }

    async fn session_lock(&self, session_code: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(session_code.to_string()).or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use chatdesk_shared::store::NewUser;
    use chatdesk_shared::{MemoryStore, SessionStatus, UserRole};
    use tokio::sync::mpsc;

    use crate::ws::connection::Connection;

    struct TestClient {
        conn_id: Uuid,
        rx: mpsc::UnboundedReceiver<ServerEvent>,
    }

    impl TestClient {
        fn drain(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    struct Harness {
        hub: Arc<SessionHub>,
        registry: Arc<ConnectionRegistry>,
        store: Arc<MemoryStore>,
        lifecycle: Arc<SessionLifecycle>,
    }

    async fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let lifecycle = Arc::new(SessionLifecycle::new(
            Arc::clone(&store) as Arc<dyn Store>
        ));
        let hub = Arc::new(SessionHub::new(
            Arc::clone(&registry),
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&lifecycle),
        ));
        Harness {
            hub,
            registry,
            store,
            lifecycle,
        }
    }

    impl Harness {
        async fn online_agent(&self, username: &str, display_name: &str, role: UserRole) -> Uuid {
            let agent = self
                .store
                .create_user(NewUser {
                    username: username.into(),
                    password_hash: "x".into(),
                    role,
                    display_name: display_name.into(),
                    email: format!("{}@x.com", username),
                })
                .await
                .unwrap();
            self.store.set_user_online(agent.id, true).await.unwrap();
            agent.id
        }

        async fn session(&self, customer: &str, email: &str) -> String {
            self.lifecycle
                .start_session(customer, email)
                .await
                .unwrap()
                .session
                .session_code
        }

        async fn connect(&self) -> TestClient {
            let (tx, rx) = mpsc::unbounded_channel();
            let conn_id = Uuid::new_v4();
            self.registry
                .register(Arc::new(Connection::new(conn_id, tx)))
                .await;
            TestClient { conn_id, rx }
        }

        async fn join(&self, client: &mut TestClient, code: &str, kind: ParticipantKind) {
            self.hub
                .handle_event(
                    client.conn_id,
                    ClientEvent::JoinSession {
                        session_id: code.to_string(),
                        user_id: None,
                        user_type: kind,
                    },
                )
                .await;
            client.drain();
        }

        async fn say(&self, client: &TestClient, code: &str, content: &str, name: &str) {
            self.hub
                .handle_event(
                    client.conn_id,
                    ClientEvent::ChatMessage {
                        session_id: code.to_string(),
                        data: ChatMessageData {
                            content: content.to_string(),
                            sender_name: Some(name.to_string()),
                        },
                    },
                )
                .await;
        }
    }

    #[tokio::test]
    async fn test_join_is_announced_to_everyone_including_joiner() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        h.hub
            .handle_event(
                jane.conn_id,
                ClientEvent::JoinSession {
                    session_id: code.clone(),
                    user_id: Some("jane".into()),
                    user_type: ParticipantKind::Customer,
                },
            )
            .await;

        let events = jane.drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::AgentStatus { session_id, data } => {
                assert_eq!(session_id, &code);
                assert_eq!(data.status, "joined");
                assert_eq!(data.user_id.as_deref(), Some("jane"));
                assert_eq!(data.user_type, ParticipantKind::Customer);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_join_unknown_session_errors() {
        let h = harness().await;
        let mut client = h.connect().await;
        h.hub
            .handle_event(
                client.conn_id,
                ClientEvent::JoinSession {
                    session_id: "CS-nope".into(),
                    user_id: None,
                    user_type: ParticipantKind::Customer,
                },
            )
            .await;
        let events = client.drain();
        assert!(matches!(events.as_slice(), [ServerEvent::Error { .. }]));
        assert!(h.registry.binding(client.conn_id).await.is_none());
    }

    #[tokio::test]
    async fn test_chat_reaches_all_participants_and_persists() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        let mut mike = h.connect().await;
        h.join(&mut jane, &code, ParticipantKind::Customer).await;
        h.join(&mut mike, &code, ParticipantKind::Agent).await;
        jane.drain();

        h.say(&jane, &code, "My order never arrived", "Jane").await;

        for client in [&mut jane, &mut mike] {
            let events = client.drain();
            assert_eq!(events.len(), 1);
            match &events[0] {
                ServerEvent::ChatMessage { session_id, data } => {
                    assert_eq!(session_id, &code);
                    assert_eq!(data.content, "My order never arrived");
                    assert_eq!(data.sender_name, "Jane");
                    assert_eq!(data.sender_kind, SenderKind::Customer);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }

        let session = h.store.session_by_code(&code).await.unwrap().unwrap();
        let messages = h.store.messages_for_session(session.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "My order never arrived");
    }

    #[tokio::test]
    async fn test_chat_does_not_leak_across_sessions() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code_a = h.session("Jane", "jane@x.com").await;
        let code_b = h.session("Bob", "bob@x.com").await;

        let mut jane = h.connect().await;
        let mut anna = h.connect().await;
        h.join(&mut jane, &code_a, ParticipantKind::Customer).await;
        h.join(&mut anna, &code_b, ParticipantKind::Agent).await;

        h.say(&jane, &code_a, "hello?", "Jane").await;

        assert_eq!(jane.drain().len(), 1);
        assert!(anna.drain().is_empty());
    }

    #[tokio::test]
    async fn test_chat_without_join_is_rejected() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut stranger = h.connect().await;
        h.say(&stranger, &code, "hello", "Stranger").await;

        let events = stranger.drain();
        assert!(matches!(events.as_slice(), [ServerEvent::Error { .. }]));

        let session = h.store.session_by_code(&code).await.unwrap().unwrap();
        assert!(h
            .store
            .messages_for_session(session.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_empty_chat_message_is_rejected() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        h.join(&mut jane, &code, ParticipantKind::Customer).await;
        h.say(&jane, &code, "   ", "Jane").await;

        let events = jane.drain();
        assert!(matches!(events.as_slice(), [ServerEvent::Error { .. }]));
    }

    #[tokio::test]
    async fn test_chat_after_session_end_is_rejected() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        let mut mike = h.connect().await;
        h.join(&mut jane, &code, ParticipantKind::Customer).await;
        h.join(&mut mike, &code, ParticipantKind::Agent).await;
        jane.drain();

        h.hub.end_session(&code, None).await.unwrap();
        jane.drain();
        mike.drain();

        h.say(&jane, &code, "one more thing", "Jane").await;

        let events = jane.drain();
        assert!(matches!(events.as_slice(), [ServerEvent::Error { .. }]));
        assert!(mike.drain().is_empty());

        let session = h.store.session_by_code(&code).await.unwrap().unwrap();
        assert!(h
            .store
            .messages_for_session(session.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_typing_is_not_echoed_to_the_typist() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        let mut mike = h.connect().await;
        h.join(&mut jane, &code, ParticipantKind::Customer).await;
        h.join(&mut mike, &code, ParticipantKind::Agent).await;
        jane.drain();

        h.hub
            .handle_event(
                jane.conn_id,
                ClientEvent::CustomerTyping {
                    session_id: code.clone(),
                },
            )
            .await;

        assert!(jane.drain().is_empty());
        let events = mike.drain();
        assert!(matches!(
            events.as_slice(),
            [ServerEvent::CustomerTyping { .. }]
        ));
    }

    #[tokio::test]
    async fn test_transfer_broadcasts_notice_and_system_message() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let anna = h
            .online_agent("anna", "Anna", UserRole::SeniorAgent)
            .await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        h.join(&mut jane, &code, ParticipantKind::Customer).await;

        let outcome = h
            .hub
            .transfer_session(&code, anna, "needs escalation")
            .await
            .unwrap();
        assert_eq!(outcome.new_agent.id, anna);

        let events = jane.drain();
        assert_eq!(events.len(), 2);
        match &events[0] {
            ServerEvent::SessionTransfer { data, .. } => {
                assert_eq!(data.new_agent_id, anna);
                assert_eq!(data.new_agent_name, "Anna");
                assert_eq!(data.reason, "needs escalation");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match &events[1] {
            ServerEvent::ChatMessage { data, .. } => {
                assert_eq!(data.sender_kind, SenderKind::System);
                assert!(data.content.contains("Anna"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_end_session_broadcasts_to_participants() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        h.join(&mut jane, &code, ParticipantKind::Customer).await;

        let ended = h
            .hub
            .end_session(&code, Some("agent".into()))
            .await
            .unwrap();
        assert_eq!(ended.status, SessionStatus::Resolved);

        let events = jane.drain();
        match events.as_slice() {
            [ServerEvent::SessionEnded { session_id, data }] => {
                assert_eq!(session_id, &code);
                assert_eq!(data.ended_by.as_deref(), Some("agent"));
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_end_session_releases_lock_entry_when_unattended() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        h.hub.end_session(&code, None).await.unwrap();

        assert!(!h.hub.locks.lock().await.contains_key(&code));
    }

    #[tokio::test]
    async fn test_end_session_keeps_lock_entry_while_connections_remain() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        h.join(&mut jane, &code, ParticipantKind::Customer).await;

        h.hub.end_session(&code, None).await.unwrap();

        assert!(h.hub.locks.lock().await.contains_key(&code));
        assert!(matches!(
            jane.drain().as_slice(),
            [ServerEvent::SessionEnded { .. }]
        ));
    }

    #[tokio::test]
    async fn test_disconnect_announces_departure_to_remaining() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        let mut mike = h.connect().await;
        h.join(&mut jane, &code, ParticipantKind::Customer).await;
        h.hub
            .handle_event(
                mike.conn_id,
                ClientEvent::JoinSession {
                    session_id: code.clone(),
                    user_id: Some("mike".into()),
                    user_type: ParticipantKind::Agent,
                },
            )
            .await;
        jane.drain();
        mike.drain();

        h.hub.handle_disconnect(mike.conn_id).await;

        let events = jane.drain();
        match events.as_slice() {
            [ServerEvent::AgentStatus { data, .. }] => {
                assert_eq!(data.status, "left");
                assert_eq!(data.user_id.as_deref(), Some("mike"));
                assert_eq!(data.user_type, ParticipantKind::Agent);
            }
            other => panic!("unexpected events: {:?}", other),
        }
        assert_eq!(h.registry.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_leave_session_keeps_connection_open() {
        let h = harness().await;
        h.online_agent("mike", "Mike", UserRole::Agent).await;
        let code = h.session("Jane", "jane@x.com").await;

        let mut jane = h.connect().await;
        let mut mike = h.connect().await;
        h.join(&mut jane, &code, ParticipantKind::Customer).await;
        h.join(&mut mike, &code, ParticipantKind::Agent).await;
        jane.drain();

        h.hub
            .handle_event(
                jane.conn_id,
                ClientEvent::LeaveSession {
                    session_id: code.clone(),
                },
            )
            .await;

        let events = mike.drain();
        assert!(matches!(
            events.as_slice(),
            [ServerEvent::AgentStatus { .. }]
        ));
        // Still registered, no longer bound.
        assert!(h.registry.connection(jane.conn_id).await.is_some());
        assert!(h.registry.binding(jane.conn_id).await.is_none());
    }
}
