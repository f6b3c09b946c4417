//! Session lifecycle manager
//!
//! Business rules for session creation, agent assignment, transfer and
//! termination. Shared by the websocket hub and the REST layer so the
//! two entry points cannot diverge.

use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use time::OffsetDateTime;
use uuid::Uuid;

use chatdesk_shared::{
    ChatSession, Customer, CustomerStatus, Message, MessageKind, NewMessage, SenderKind,
    SessionStatus, Store, StoreError, TransferRecord, User,
};
use chatdesk_shared::store::{NewCustomer, NewSession};

/// Retries for session-code collisions before giving up.
const CODE_ATTEMPTS: usize = 8;

/// Lifecycle failures
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(Uuid),

    /// Business condition, not a system fault: the caller should surface
    /// this as retryable.
    #[error("No agents available")]
    NoAgentAvailable,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of starting a session
#[derive(Debug, Clone)]
pub struct StartedSession {
    pub session: ChatSession,
    pub customer: Customer,
    pub agent: User,
}

/// Result of transferring a session
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub session: ChatSession,
    pub new_agent: User,
    /// Transcript audit entry describing the transfer.
    pub system_message: Message,
}

/// Session lifecycle manager
pub struct SessionLifecycle {
    store: Arc<dyn Store>,
}

impl SessionLifecycle {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Start a new chat session for a customer.
    ///
    /// Reuses the customer record matching `customer_email` if one exists,
    /// creates it otherwise. Picks any online base-tier agent; fails with
    /// [`LifecycleError::NoAgentAvailable`] when none are online, creating
    /// no session.
    pub async fn start_session(
        &self,
        customer_name: &str,
        customer_email: &str,
    ) -> Result<StartedSession, LifecycleError> {
        if customer_name.trim().is_empty() {
            return Err(LifecycleError::Validation("Customer name is required".into()));
        }
        if customer_email.trim().is_empty() {
            return Err(LifecycleError::Validation("Customer email is required".into()));
        }

        let customer = match self.store.customer_by_email(customer_email).await? {
            Some(existing) => existing,
            None => {
                self.store
                    .create_customer(NewCustomer {
                        name: customer_name.to_string(),
                        email: customer_email.to_string(),
                        customer_code: generate_customer_code(),
                        total_orders: 0,
                        status: CustomerStatus::Regular,
                    })
                    .await?
            }
        };

        // Availability, not ordering, is the constraint: any online base-tier
        // agent will do.
        let agent = self
            .store
            .online_agents()
            .await?
            .into_iter()
            .next()
            .ok_or(LifecycleError::NoAgentAvailable)?;

        // Uniqueness is verified by the store, not assumed from entropy.
        let mut last_err = None;
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_session_code();
            match self
                .store
                .create_session(NewSession {
                    session_code: code,
                    customer_id: Some(customer.id),
                    agent_id: Some(agent.id),
                    status: SessionStatus::Active,
                })
                .await
            {
                Ok(session) => {
                    tracing::info!(
                        session_code = %session.session_code,
                        customer_id = %customer.id,
                        agent_id = %agent.id,
                        "Chat session started"
                    );
                    return Ok(StartedSession {
                        session,
                        customer,
                        agent,
                    });
                }
                Err(StoreError::Conflict(_)) => {
                    last_err = Some(StoreError::Conflict("session code collision".into()));
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(LifecycleError::Store(last_err.unwrap_or_else(|| {
            StoreError::Conflict("session code collision".into())
        })))
    }

    /// Reassign a session to another agent, recording the transfer and
    /// leaving a system message in the transcript for audit visibility.
    pub async fn transfer_session(
        &self,
        session_code: &str,
        new_agent_id: Uuid,
        reason: &str,
    ) -> Result<TransferOutcome, LifecycleError> {
        let mut session = self
            .store
            .session_by_code(session_code)
            .await?
            .ok_or_else(|| LifecycleError::SessionNotFound(session_code.to_string()))?;

        let new_agent = match self.store.user(new_agent_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                return Err(LifecycleError::AgentNotFound(new_agent_id))
            }
            Err(err) => return Err(err.into()),
        };

        // Read the previous agent before mutating.
        let from_agent = session.agent_id;

        session.transfer_history.push(TransferRecord {
            from_agent,
            to_agent: new_agent.id,
            transferred_at: OffsetDateTime::now_utc(),
            reason: reason.to_string(),
        });
        session.agent_id = Some(new_agent.id);

        let session = self.store.update_session(&session).await?;

        let system_message = self
            .store
            .create_message(NewMessage {
                session_id: session.id,
                sender_id: None,
                sender_kind: SenderKind::System,
                content: format!(
                    "Session transferred to {} ({})",
                    new_agent.display_name, new_agent.role
                ),
                message_kind: MessageKind::System,
            })
            .await?;

        tracing::info!(
            session_code = %session.session_code,
            from_agent = ?from_agent,
            to_agent = %new_agent.id,
            reason = %reason,
            "Session transferred"
        );

        Ok(TransferOutcome {
            session,
            new_agent,
            system_message,
        })
    }

    /// Resolve a session, setting its end time.
    ///
    /// Ending an already-closed session keeps the closed status (no status
    /// regression); the end time is overwritten with "now", which is the
    /// same field set again.
    pub async fn end_session(&self, session_code: &str) -> Result<ChatSession, LifecycleError> {
        let mut session = self
            .store
            .session_by_code(session_code)
            .await?
            .ok_or_else(|| LifecycleError::SessionNotFound(session_code.to_string()))?;

        if !session.status.is_closed() {
            session.status = SessionStatus::Resolved;
        }
        session.ended_at = Some(OffsetDateTime::now_utc());

        let session = self.store.update_session(&session).await?;

        tracing::info!(session_code = %session.session_code, "Chat session ended");

        Ok(session)
    }
}

/// `CS-<base36 unix time>-<4 random alphanumerics>`
fn generate_session_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect();
    format!(
        "CS-{}-{}",
        to_base36(OffsetDateTime::now_utc().unix_timestamp()),
        suffix.to_uppercase()
    )
}

fn generate_customer_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("CUST-{}", suffix.to_uppercase())
}

fn to_base36(mut value: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
