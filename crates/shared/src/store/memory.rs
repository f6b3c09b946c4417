//! In-memory store implementation
//!
//! Backs tests and DATABASE_URL-less deployments. All state lives in
//! plain maps behind a single RwLock; messages keep insertion order so
//! timestamp ties resolve deterministically.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::types::{ChatSession, Customer, Message, QuickReply, SopDocument, User, UserRole};

use super::{NewCustomer, NewMessage, NewQuickReply, NewSession, NewSop, NewUser, SopUpdate, Store};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    customers: HashMap<Uuid, Customer>,
    sessions: HashMap<Uuid, ChatSession>,
    /// session_code -> session id
    session_codes: HashMap<String, Uuid>,
    /// Insertion order preserved; never reordered after append.
    messages: Vec<Message>,
    sops: HashMap<Uuid, SopDocument>,
    quick_replies: HashMap<Uuid, QuickReply>,
}

/// In-memory [`Store`]
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict(format!(
                "username already taken: {}",
                new.username
            )));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            password_hash: new.password_hash,
            role: new.role,
            display_name: new.display_name,
            email: new.email,
            online: false,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user(&self, id: Uuid) -> StoreResult<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    async fn set_user_online(&self, id: Uuid, online: bool) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.online = online;
        Ok(())
    }

    async fn online_agents(&self) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|u| u.online && u.role == UserRole::Agent)
            .cloned()
            .collect())
    }

    async fn create_customer(&self, new: NewCustomer) -> StoreResult<Customer> {
        let mut inner = self.inner.write().await;
        if inner
            .customers
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(StoreError::Conflict(format!(
                "customer email already exists: {}",
                new.email
            )));
        }
        let customer = Customer {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            customer_code: new.customer_code,
            member_since: OffsetDateTime::now_utc(),
            total_orders: new.total_orders,
            status: new.status,
        };
        inner.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn customer(&self, id: Uuid) -> StoreResult<Customer> {
        let inner = self.inner.read().await;
        inner
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("customer {}", id)))
    }

    async fn customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>> {
        let inner = self.inner.read().await;
        Ok(inner
            .customers
            .values()
            .find(|c| c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_session(&self, new: NewSession) -> StoreResult<ChatSession> {
        let mut inner = self.inner.write().await;
        if inner.session_codes.contains_key(&new.session_code) {
            return Err(StoreError::Conflict(format!(
                "session code already exists: {}",
                new.session_code
            )));
        }
        let session = ChatSession {
            id: Uuid::new_v4(),
            session_code: new.session_code.clone(),
            customer_id: new.customer_id,
            agent_id: new.agent_id,
            status: new.status,
            started_at: OffsetDateTime::now_utc(),
            ended_at: None,
            transfer_history: Vec::new(),
            rating: None,
        };
        inner.session_codes.insert(new.session_code, session.id);
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn session_by_code(&self, code: &str) -> StoreResult<Option<ChatSession>> {
        let inner = self.inner.read().await;
        Ok(inner
            .session_codes
            .get(code)
            .and_then(|id| inner.sessions.get(id))
            .cloned())
    }

    async fn update_session(&self, session: &ChatSession) -> StoreResult<ChatSession> {
        let mut inner = self.inner.write().await;
        if !inner.sessions.contains_key(&session.id) {
            return Err(StoreError::NotFound(format!("session {}", session.id)));
        }
        inner.sessions.insert(session.id, session.clone());
        Ok(session.clone())
    }

    async fn active_sessions(&self) -> StoreResult<Vec<ChatSession>> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<ChatSession> = inner
            .sessions
            .values()
            .filter(|s| !s.status.is_closed())
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        Ok(sessions)
    }

    async fn all_sessions(&self) -> StoreResult<Vec<ChatSession>> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<ChatSession> = inner.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.started_at);
        Ok(sessions)
    }

    async fn sessions_for_customer(&self, customer_id: Uuid) -> StoreResult<Vec<ChatSession>> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<ChatSession> = inner
            .sessions
            .values()
            .filter(|s| s.customer_id == Some(customer_id))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        Ok(sessions)
    }

    async fn sessions_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<ChatSession>> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<ChatSession> = inner
            .sessions
            .values()
            .filter(|s| s.agent_id == Some(agent_id))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        Ok(sessions)
    }

    async fn create_message(&self, new: NewMessage) -> StoreResult<Message> {
        let mut inner = self.inner.write().await;
        if !inner.sessions.contains_key(&new.session_id) {
            return Err(StoreError::NotFound(format!("session {}", new.session_id)));
        }
        let message = Message {
            id: Uuid::new_v4(),
            session_id: new.session_id,
            sender_id: new.sender_id,
            sender_kind: new.sender_kind,
            content: new.content,
            message_kind: new.message_kind,
            sent_at: OffsetDateTime::now_utc(),
            read_by: Vec::new(),
        };
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn messages_for_session(&self, session_id: Uuid) -> StoreResult<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut messages: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        // Stable sort: equal timestamps keep insertion order.
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }

    async fn mark_read(&self, message_id: Uuid, reader: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let message = inner
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| StoreError::NotFound(format!("message {}", message_id)))?;
        if !message.read_by.contains(&reader) {
            message.read_by.push(reader);
        }
        Ok(())
    }

    async fn create_sop(&self, new: NewSop) -> StoreResult<SopDocument> {
        let mut inner = self.inner.write().await;
        let sop = SopDocument {
            id: Uuid::new_v4(),
            title: new.title,
            category: new.category,
            content: new.content,
            keywords: new.keywords,
            version: 1,
            updated_at: OffsetDateTime::now_utc(),
            uploaded_by: new.uploaded_by,
        };
        inner.sops.insert(sop.id, sop.clone());
        Ok(sop)
    }

    async fn sop(&self, id: Uuid) -> StoreResult<SopDocument> {
        let inner = self.inner.read().await;
        inner
            .sops
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("sop {}", id)))
    }

    async fn list_sops(&self) -> StoreResult<Vec<SopDocument>> {
        let inner = self.inner.read().await;
        let mut sops: Vec<SopDocument> = inner.sops.values().cloned().collect();
        sops.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(sops)
    }

    async fn sops_by_category(&self, category: &str) -> StoreResult<Vec<SopDocument>> {
        let inner = self.inner.read().await;
        let mut sops: Vec<SopDocument> = inner
            .sops
            .values()
            .filter(|s| s.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect();
        sops.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(sops)
    }

    async fn search_sops(&self, query: &str) -> StoreResult<Vec<SopDocument>> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().await;
        let mut sops: Vec<SopDocument> = inner
            .sops
            .values()
            .filter(|s| {
                s.title.to_lowercase().contains(&needle)
                    || s.content.to_lowercase().contains(&needle)
                    || s.keywords.iter().any(|k| k.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        sops.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(sops)
    }

    async fn update_sop(&self, id: Uuid, update: SopUpdate) -> StoreResult<SopDocument> {
        let mut inner = self.inner.write().await;
        let sop = inner
            .sops
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("sop {}", id)))?;
        if let Some(title) = update.title {
            sop.title = title;
        }
        if let Some(category) = update.category {
            sop.category = category;
        }
        if let Some(content) = update.content {
            sop.content = content;
        }
        if let Some(keywords) = update.keywords {
            sop.keywords = keywords;
        }
        sop.version += 1;
        sop.updated_at = OffsetDateTime::now_utc();
        Ok(sop.clone())
    }

    async fn delete_sop(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .sops
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("sop {}", id)))
    }

    async fn create_quick_reply(&self, new: NewQuickReply) -> StoreResult<QuickReply> {
        let mut inner = self.inner.write().await;
        let reply = QuickReply {
            id: Uuid::new_v4(),
            title: new.title,
            content: new.content,
            category: new.category,
            created_by: new.created_by,
        };
        inner.quick_replies.insert(reply.id, reply.clone());
        Ok(reply)
    }

    async fn list_quick_replies(&self) -> StoreResult<Vec<QuickReply>> {
        let inner = self.inner.read().await;
        let mut replies: Vec<QuickReply> = inner.quick_replies.values().cloned().collect();
        replies.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(replies)
    }

    async fn quick_replies_by_category(&self, category: &str) -> StoreResult<Vec<QuickReply>> {
        let inner = self.inner.read().await;
        let mut replies: Vec<QuickReply> = inner
            .quick_replies
            .values()
            .filter(|r| r.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect();
        replies.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(replies)
    }

    async fn delete_quick_reply(&self, id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .quick_replies
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("quick reply {}", id)))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use crate::types::{CustomerStatus, MessageKind, SenderKind, SessionStatus};

    fn new_customer(email: &str) -> NewCustomer {
        NewCustomer {
            name: "Jane Doe".into(),
            email: email.into(),
            customer_code: "CUST-0001".into(),
            total_orders: 0,
            status: CustomerStatus::Regular,
        }
    }

    #[tokio::test]
    async fn test_duplicate_customer_email_conflicts() {
        let store = MemoryStore::new();
        store.create_customer(new_customer("jane@x.com")).await.unwrap();

        let err = store
            .create_customer(new_customer("JANE@X.COM"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let found = store.customer_by_email("jane@x.com").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_session_code_conflicts() {
        let store = MemoryStore::new();
        let new = NewSession {
            session_code: "CS-1".into(),
            customer_id: None,
            agent_id: None,
            status: SessionStatus::Active,
        };
        store.create_session(new.clone()).await.unwrap();
        let err = store.create_session(new).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_messages_ordered_and_ties_keep_insertion_order() {
        let store = MemoryStore::new();
        let session = store
            .create_session(NewSession {
                session_code: "CS-2".into(),
                customer_id: None,
                agent_id: None,
                status: SessionStatus::Active,
            })
            .await
            .unwrap();

        for i in 0..5 {
            store
                .create_message(NewMessage {
                    session_id: session.id,
                    sender_id: None,
                    sender_kind: SenderKind::Customer,
                    content: format!("msg {}", i),
                    message_kind: MessageKind::Text,
                })
                .await
                .unwrap();
        }

        let messages = store.messages_for_session(session.id).await.unwrap();
        assert_eq!(messages.len(), 5);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.content, format!("msg {}", i));
        }
        for pair in messages.windows(2) {
            assert!(pair[0].sent_at <= pair[1].sent_at);
        }
    }

    #[tokio::test]
    async fn test_online_agents_filters_role_and_presence() {
        let store = MemoryStore::new();
        let agent = store
            .create_user(NewUser {
                username: "mike".into(),
                password_hash: "x".into(),
                role: UserRole::Agent,
                display_name: "Mike".into(),
                email: "mike@x.com".into(),
            })
            .await
            .unwrap();
        let senior = store
            .create_user(NewUser {
                username: "anna".into(),
                password_hash: "x".into(),
                role: UserRole::SeniorAgent,
                display_name: "Anna".into(),
                email: "anna@x.com".into(),
            })
            .await
            .unwrap();

        // Nobody online yet
        assert!(store.online_agents().await.unwrap().is_empty());

        store.set_user_online(agent.id, true).await.unwrap();
        store.set_user_online(senior.id, true).await.unwrap();

        let online = store.online_agents().await.unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].id, agent.id);
    }

    #[tokio::test]
    async fn test_sop_update_bumps_version() {
        let store = MemoryStore::new();
        let sop = store
            .create_sop(NewSop {
                title: "Refund policy".into(),
                category: "billing".into(),
                content: "Refunds within 30 days".into(),
                keywords: vec!["refund".into()],
                uploaded_by: None,
            })
            .await
            .unwrap();
        assert_eq!(sop.version, 1);

        let updated = store
            .update_sop(
                sop.id,
                SopUpdate {
                    content: Some("Refunds within 14 days".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.content, "Refunds within 14 days");
        assert!(updated.updated_at >= sop.updated_at);
    }

    #[tokio::test]
    async fn test_sop_search_matches_keywords() {
        let store = MemoryStore::new();
        store
            .create_sop(NewSop {
                title: "Shipping delays".into(),
                category: "logistics".into(),
                content: "What to tell customers".into(),
                keywords: vec!["delivery".into(), "late".into()],
                uploaded_by: None,
            })
            .await
            .unwrap();

        assert_eq!(store.search_sops("DELIVERY").await.unwrap().len(), 1);
        assert_eq!(store.search_sops("shipping").await.unwrap().len(), 1);
        assert!(store.search_sops("billing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let store = MemoryStore::new();
        let session = store
            .create_session(NewSession {
                session_code: "CS-3".into(),
                customer_id: None,
                agent_id: None,
                status: SessionStatus::Active,
            })
            .await
            .unwrap();
        let msg = store
            .create_message(NewMessage {
                session_id: session.id,
                sender_id: None,
                sender_kind: SenderKind::Customer,
                content: "hello".into(),
                message_kind: MessageKind::Text,
            })
            .await
            .unwrap();

        let reader = Uuid::new_v4();
        store.mark_read(msg.id, reader).await.unwrap();
        store.mark_read(msg.id, reader).await.unwrap();

        let messages = store.messages_for_session(session.id).await.unwrap();
        assert_eq!(messages[0].read_by, vec![reader]);
    }
}
