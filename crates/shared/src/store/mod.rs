//! Store contract for Chatdesk's durable entities
//!
//! The hub and lifecycle manager only ever talk to [`Store`]; the backing
//! implementation (in-memory or Postgres) is selected at process start.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::types::{
    ChatSession, Customer, CustomerStatus, Message, MessageKind, QuickReply, SenderKind,
    SessionStatus, SopDocument, User, UserRole,
};

/// Input for creating a support user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub display_name: String,
    pub email: String,
}

/// Input for creating a customer record
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub customer_code: String,
    pub total_orders: i32,
    pub status: CustomerStatus,
}

/// Input for creating a chat session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_code: String,
    pub customer_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub status: SessionStatus,
}

/// Input for creating a message. The store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub sender_kind: SenderKind,
    pub content: String,
    pub message_kind: MessageKind,
}

/// Input for creating an SOP document
#[derive(Debug, Clone)]
pub struct NewSop {
    pub title: String,
    pub category: String,
    pub content: String,
    pub keywords: Vec<String>,
    pub uploaded_by: Option<Uuid>,
}

/// Partial update of an SOP document; every edit bumps version and
/// last-updated timestamp.
#[derive(Debug, Clone, Default)]
pub struct SopUpdate {
    pub title: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
    pub keywords: Option<Vec<String>>,
}

/// Input for creating a quick reply
#[derive(Debug, Clone)]
pub struct NewQuickReply {
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_by: Option<Uuid>,
}

/// The persistence contract.
///
/// Every write is atomic per entity: readers never observe a partially
/// applied update. Create operations return the persisted entity with
/// server-assigned id and timestamps.
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, new: NewUser) -> StoreResult<User>;
    async fn user(&self, id: Uuid) -> StoreResult<User>;
    async fn set_user_online(&self, id: Uuid, online: bool) -> StoreResult<()>;
    /// Users with role `agent` that are currently online.
    async fn online_agents(&self) -> StoreResult<Vec<User>>;

    // Customers
    async fn create_customer(&self, new: NewCustomer) -> StoreResult<Customer>;
    async fn customer(&self, id: Uuid) -> StoreResult<Customer>;
    async fn customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>>;

    // Sessions
    async fn create_session(&self, new: NewSession) -> StoreResult<ChatSession>;
    async fn session_by_code(&self, code: &str) -> StoreResult<Option<ChatSession>>;
    /// Whole-entity write keyed by `session.id`.
    async fn update_session(&self, session: &ChatSession) -> StoreResult<ChatSession>;
    async fn active_sessions(&self) -> StoreResult<Vec<ChatSession>>;
    async fn all_sessions(&self) -> StoreResult<Vec<ChatSession>>;
    async fn sessions_for_customer(&self, customer_id: Uuid) -> StoreResult<Vec<ChatSession>>;
    async fn sessions_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<ChatSession>>;

    // Messages
    async fn create_message(&self, new: NewMessage) -> StoreResult<Message>;
    /// Ordered by timestamp ascending; ties broken by insertion order.
    async fn messages_for_session(&self, session_id: Uuid) -> StoreResult<Vec<Message>>;
    async fn mark_read(&self, message_id: Uuid, reader: Uuid) -> StoreResult<()>;

    // SOP documents
    async fn create_sop(&self, new: NewSop) -> StoreResult<SopDocument>;
    async fn sop(&self, id: Uuid) -> StoreResult<SopDocument>;
    async fn list_sops(&self) -> StoreResult<Vec<SopDocument>>;
    async fn sops_by_category(&self, category: &str) -> StoreResult<Vec<SopDocument>>;
    /// Case-insensitive match against title, content and keywords.
    async fn search_sops(&self, query: &str) -> StoreResult<Vec<SopDocument>>;
    async fn update_sop(&self, id: Uuid, update: SopUpdate) -> StoreResult<SopDocument>;
    async fn delete_sop(&self, id: Uuid) -> StoreResult<()>;

    // Quick replies
    async fn create_quick_reply(&self, new: NewQuickReply) -> StoreResult<QuickReply>;
    async fn list_quick_replies(&self) -> StoreResult<Vec<QuickReply>>;
    async fn quick_replies_by_category(&self, category: &str) -> StoreResult<Vec<QuickReply>>;
    async fn delete_quick_reply(&self, id: Uuid) -> StoreResult<()>;

    /// Cheap connectivity probe for health checks.
    async fn ping(&self) -> StoreResult<()>;
}
