//! Postgres-backed store implementation
//!
//! Non-macro sqlx queries against the schema in `migrations/`. Enum
//! columns are stored as text and parsed on read; transfer history is
//! a JSONB array on the session row so the whole session updates
//! atomically.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::types::{ChatSession, Customer, Message, QuickReply, SopDocument, User};

use super::{NewCustomer, NewMessage, NewQuickReply, NewSession, NewSop, NewUser, SopUpdate, Store};

/// Postgres [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    role: String,
    display_name: String,
    email: String,
    online: bool,
    created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(StoreError::Database)?,
            display_name: row.display_name,
            email: row.email,
            online: row.online,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    email: String,
    customer_code: String,
    member_since: OffsetDateTime,
    total_orders: i32,
    status: String,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = StoreError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        Ok(Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            customer_code: row.customer_code,
            member_since: row.member_since,
            total_orders: row.total_orders,
            status: row.status.parse().map_err(StoreError::Database)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    session_code: String,
    customer_id: Option<Uuid>,
    agent_id: Option<Uuid>,
    status: String,
    started_at: OffsetDateTime,
    ended_at: Option<OffsetDateTime>,
    transfer_history: serde_json::Value,
    rating: Option<i16>,
}

impl TryFrom<SessionRow> for ChatSession {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(ChatSession {
            id: row.id,
            session_code: row.session_code,
            customer_id: row.customer_id,
            agent_id: row.agent_id,
            status: row.status.parse().map_err(StoreError::Database)?,
            started_at: row.started_at,
            ended_at: row.ended_at,
            transfer_history: serde_json::from_value(row.transfer_history)
                .map_err(|e| StoreError::Database(e.to_string()))?,
            rating: row.rating,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    session_id: Uuid,
    sender_id: Option<Uuid>,
    sender_kind: String,
    content: String,
    message_kind: String,
    sent_at: OffsetDateTime,
    read_by: Vec<Uuid>,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Message {
            id: row.id,
            session_id: row.session_id,
            sender_id: row.sender_id,
            sender_kind: row.sender_kind.parse().map_err(StoreError::Database)?,
            content: row.content,
            message_kind: row.message_kind.parse().map_err(StoreError::Database)?,
            sent_at: row.sent_at,
            read_by: row.read_by,
        })
    }
}

#[derive(Debug, FromRow)]
struct SopRow {
    id: Uuid,
    title: String,
    category: String,
    content: String,
    keywords: Vec<String>,
    version: i32,
    updated_at: OffsetDateTime,
    uploaded_by: Option<Uuid>,
}

impl From<SopRow> for SopDocument {
    fn from(row: SopRow) -> Self {
        SopDocument {
            id: row.id,
            title: row.title,
            category: row.category,
            content: row.content,
            keywords: row.keywords,
            version: row.version,
            updated_at: row.updated_at,
            uploaded_by: row.uploaded_by,
        }
    }
}

#[derive(Debug, FromRow)]
struct QuickReplyRow {
    id: Uuid,
    title: String,
    content: String,
    category: String,
    created_by: Option<Uuid>,
}

impl From<QuickReplyRow> for QuickReply {
    fn from(row: QuickReplyRow) -> Self {
        QuickReply {
            id: row.id,
            title: row.title,
            content: row.content,
            category: row.category,
            created_by: row.created_by,
        }
    }
}

const SESSION_COLUMNS: &str = "id, session_code, customer_id, agent_id, status, started_at, \
                               ended_at, transfer_history, rating";

fn sessions_from_rows(rows: Vec<SessionRow>) -> StoreResult<Vec<ChatSession>> {
    rows.into_iter().map(ChatSession::try_from).collect()
}

// =============================================================================
// Store Implementation
// =============================================================================

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (username, password_hash, role, display_name, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, password_hash, role, display_name, email, online, created_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(new.role.to_string())
        .bind(&new.display_name)
        .bind(&new.email)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn user(&self, id: Uuid) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, role, display_name, email, online, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?
            .try_into()
    }

    async fn set_user_online(&self, id: Uuid, online: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET online = $2 WHERE id = $1")
            .bind(id)
            .bind(online)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn online_agents(&self) -> StoreResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, role, display_name, email, online, created_at \
             FROM users WHERE role = 'agent' AND online = TRUE",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn create_customer(&self, new: NewCustomer) -> StoreResult<Customer> {
        let row: CustomerRow = sqlx::query_as(
            r#"
            INSERT INTO customers (name, email, customer_code, total_orders, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, customer_code, member_since, total_orders, status
            "#,
        )
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.customer_code)
        .bind(new.total_orders)
        .bind(new.status.to_string())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn customer(&self, id: Uuid) -> StoreResult<Customer> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, email, customer_code, member_since, total_orders, status \
             FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("customer {}", id)))?
            .try_into()
    }

    async fn customer_by_email(&self, email: &str) -> StoreResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, name, email, customer_code, member_since, total_orders, status \
             FROM customers WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Customer::try_from).transpose()
    }

    async fn create_session(&self, new: NewSession) -> StoreResult<ChatSession> {
        let row: SessionRow = sqlx::query_as(&format!(
            "INSERT INTO chat_sessions (session_code, customer_id, agent_id, status) \
             VALUES ($1, $2, $3, $4) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(&new.session_code)
        .bind(new.customer_id)
        .bind(new.agent_id)
        .bind(new.status.to_string())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn session_by_code(&self, code: &str) -> StoreResult<Option<ChatSession>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ChatSession::try_from).transpose()
    }

    async fn update_session(&self, session: &ChatSession) -> StoreResult<ChatSession> {
        let history = serde_json::to_value(&session.transfer_history)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "UPDATE chat_sessions \
             SET customer_id = $2, agent_id = $3, status = $4, ended_at = $5, \
                 transfer_history = $6, rating = $7 \
             WHERE id = $1 RETURNING {SESSION_COLUMNS}"
        ))
        .bind(session.id)
        .bind(session.customer_id)
        .bind(session.agent_id)
        .bind(session.status.to_string())
        .bind(session.ended_at)
        .bind(history)
        .bind(session.rating)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("session {}", session.id)))?
            .try_into()
    }

    async fn active_sessions(&self) -> StoreResult<Vec<ChatSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE status IN ('active', 'waiting') ORDER BY started_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        sessions_from_rows(rows)
    }

    async fn all_sessions(&self) -> StoreResult<Vec<ChatSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions ORDER BY started_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        sessions_from_rows(rows)
    }

    async fn sessions_for_customer(&self, customer_id: Uuid) -> StoreResult<Vec<ChatSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE customer_id = $1 ORDER BY started_at"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        sessions_from_rows(rows)
    }

    async fn sessions_for_agent(&self, agent_id: Uuid) -> StoreResult<Vec<ChatSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE agent_id = $1 ORDER BY started_at"
        ))
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        sessions_from_rows(rows)
    }

    async fn create_message(&self, new: NewMessage) -> StoreResult<Message> {
        let row: MessageRow = sqlx::query_as(
            r#"
            INSERT INTO messages (session_id, sender_id, sender_kind, content, message_kind)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, session_id, sender_id, sender_kind, content, message_kind,
                      sent_at, read_by
            "#,
        )
        .bind(new.session_id)
        .bind(new.sender_id)
        .bind(new.sender_kind.to_string())
        .bind(&new.content)
        .bind(new.message_kind.to_string())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn messages_for_session(&self, session_id: Uuid) -> StoreResult<Vec<Message>> {
        // seq is a serial column; it breaks ties between equal timestamps
        // by insertion order.
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, session_id, sender_id, sender_kind, content, message_kind, \
                    sent_at, read_by \
             FROM messages WHERE session_id = $1 ORDER BY sent_at, seq",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn mark_read(&self, message_id: Uuid, reader: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE messages SET read_by = array_append(read_by, $2) \
             WHERE id = $1 AND NOT ($2 = ANY(read_by))",
        )
        .bind(message_id)
        .bind(reader)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either already read (fine) or missing (error).
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM messages WHERE id = $1)")
                    .bind(message_id)
                    .fetch_one(&self.pool)
                    .await?;
            if !exists {
                return Err(StoreError::NotFound(format!("message {}", message_id)));
            }
        }
        Ok(())
    }

    async fn create_sop(&self, new: NewSop) -> StoreResult<SopDocument> {
        let row: SopRow = sqlx::query_as(
            r#"
            INSERT INTO sop_documents (title, category, content, keywords, uploaded_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, category, content, keywords, version, updated_at, uploaded_by
            "#,
        )
        .bind(&new.title)
        .bind(&new.category)
        .bind(&new.content)
        .bind(&new.keywords)
        .bind(new.uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn sop(&self, id: Uuid) -> StoreResult<SopDocument> {
        let row: Option<SopRow> = sqlx::query_as(
            "SELECT id, title, category, content, keywords, version, updated_at, uploaded_by \
             FROM sop_documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SopDocument::from)
            .ok_or_else(|| StoreError::NotFound(format!("sop {}", id)))
    }

    async fn list_sops(&self) -> StoreResult<Vec<SopDocument>> {
        let rows: Vec<SopRow> = sqlx::query_as(
            "SELECT id, title, category, content, keywords, version, updated_at, uploaded_by \
             FROM sop_documents ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SopDocument::from).collect())
    }

    async fn sops_by_category(&self, category: &str) -> StoreResult<Vec<SopDocument>> {
        let rows: Vec<SopRow> = sqlx::query_as(
            "SELECT id, title, category, content, keywords, version, updated_at, uploaded_by \
             FROM sop_documents WHERE LOWER(category) = LOWER($1) ORDER BY title",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SopDocument::from).collect())
    }

    async fn search_sops(&self, query: &str) -> StoreResult<Vec<SopDocument>> {
        let pattern = format!("%{}%", query);
        let rows: Vec<SopRow> = sqlx::query_as(
            r#"
            SELECT id, title, category, content, keywords, version, updated_at, uploaded_by
            FROM sop_documents
            WHERE title ILIKE $1
               OR content ILIKE $1
               OR EXISTS (SELECT 1 FROM unnest(keywords) AS kw WHERE kw ILIKE $1)
            ORDER BY title
            "#,
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SopDocument::from).collect())
    }

    async fn update_sop(&self, id: Uuid, update: SopUpdate) -> StoreResult<SopDocument> {
        let row: Option<SopRow> = sqlx::query_as(
            r#"
            UPDATE sop_documents
            SET title = COALESCE($2, title),
                category = COALESCE($3, category),
                content = COALESCE($4, content),
                keywords = COALESCE($5, keywords),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, category, content, keywords, version, updated_at, uploaded_by
            "#,
        )
        .bind(id)
        .bind(update.title)
        .bind(update.category)
        .bind(update.content)
        .bind(update.keywords)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SopDocument::from)
            .ok_or_else(|| StoreError::NotFound(format!("sop {}", id)))
    }

    async fn delete_sop(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM sop_documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("sop {}", id)));
        }
        Ok(())
    }

    async fn create_quick_reply(&self, new: NewQuickReply) -> StoreResult<QuickReply> {
        let row: QuickReplyRow = sqlx::query_as(
            r#"
            INSERT INTO quick_replies (title, content, category, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, content, category, created_by
            "#,
        )
        .bind(&new.title)
        .bind(&new.content)
        .bind(&new.category)
        .bind(new.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_quick_replies(&self) -> StoreResult<Vec<QuickReply>> {
        let rows: Vec<QuickReplyRow> = sqlx::query_as(
            "SELECT id, title, content, category, created_by FROM quick_replies ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(QuickReply::from).collect())
    }

    async fn quick_replies_by_category(&self, category: &str) -> StoreResult<Vec<QuickReply>> {
        let rows: Vec<QuickReplyRow> = sqlx::query_as(
            "SELECT id, title, content, category, created_by FROM quick_replies \
             WHERE LOWER(category) = LOWER($1) ORDER BY title",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(QuickReply::from).collect())
    }

    async fn delete_quick_reply(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM quick_replies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("quick reply {}", id)));
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
