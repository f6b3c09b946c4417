//! Common types used across Chatdesk

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Role of a support user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Agent,
    SeniorAgent,
    TeamLead,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Agent
    }
}

impl UserRole {
    /// Whether new sessions may be auto-assigned to this role.
    /// Only the base agent tier takes incoming chats; senior agents,
    /// team leads and admins receive sessions via transfer only.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Self::Agent)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agent => write!(f, "agent"),
            Self::SeniorAgent => write!(f, "senior_agent"),
            Self::TeamLead => write!(f, "team_lead"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "agent" => Ok(Self::Agent),
            "senior_agent" => Ok(Self::SeniorAgent),
            "team_lead" => Ok(Self::TeamLead),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("Invalid user role: {}", s)),
        }
    }
}

/// Customer account tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    Regular,
    Premium,
    Vip,
}

impl Default for CustomerStatus {
    fn default() -> Self {
        Self::Regular
    }
}

impl std::fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regular => write!(f, "regular"),
            Self::Premium => write!(f, "premium"),
            Self::Vip => write!(f, "vip"),
        }
    }
}

impl std::str::FromStr for CustomerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" => Ok(Self::Regular),
            "premium" => Ok(Self::Premium),
            "vip" => Ok(Self::Vip),
            _ => Err(format!("Invalid customer status: {}", s)),
        }
    }
}

/// Chat session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Waiting,
    Resolved,
    Terminated,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl SessionStatus {
    /// Closed sessions have an end time and accept no further chat messages.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Resolved | Self::Terminated)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Waiting => write!(f, "waiting"),
            Self::Resolved => write!(f, "resolved"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "waiting" => Ok(Self::Waiting),
            "resolved" => Ok(Self::Resolved),
            "terminated" => Ok(Self::Terminated),
            _ => Err(format!("Invalid session status: {}", s)),
        }
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    Customer,
    Agent,
    System,
}

impl std::fmt::Display for SenderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Agent => write!(f, "agent"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for SenderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "agent" => Ok(Self::Agent),
            "system" => Ok(Self::System),
            _ => Err(format!("Invalid sender kind: {}", s)),
        }
    }
}

/// Payload kind of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
    System,
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::File => write!(f, "file"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "file" => Ok(Self::File),
            "system" => Ok(Self::System),
            _ => Err(format!("Invalid message kind: {}", s)),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// Support user (agent or above)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Opaque credential; authentication itself lives outside this service.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub display_name: String,
    pub email: String,
    pub online: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Customer record, created lazily on first chat start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// External customer code, e.g. from the order system.
    pub customer_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub member_since: OffsetDateTime,
    pub total_orders: i32,
    pub status: CustomerStatus,
}

/// One reassignment of a session's responsible agent. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from_agent: Option<Uuid>,
    pub to_agent: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub transferred_at: OffsetDateTime,
    pub reason: String,
}

/// Chat session between a customer and an agent.
///
/// `session_code` is the only identifier exposed over the wire; the
/// internal `id` stays a storage key. Invariant: `ended_at` is set if
/// and only if `status.is_closed()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub session_code: String,
    pub customer_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub status: SessionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    pub transfer_history: Vec<TransferRecord>,
    pub rating: Option<i16>,
}

/// Chat message. Immutable after creation except for `read_by`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: Uuid,
    /// None for system-generated messages.
    pub sender_id: Option<Uuid>,
    pub sender_kind: SenderKind,
    pub content: String,
    pub message_kind: MessageKind,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
    pub read_by: Vec<Uuid>,
}

/// Standard-operating-procedure document for the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SopDocument {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub content: String,
    pub keywords: Vec<String>,
    pub version: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub uploaded_by: Option<Uuid>,
}

/// Canned response usable by agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickReply {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_by: Option<Uuid>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;

    #[test]
    fn test_user_role_assignability() {
        assert!(UserRole::Agent.is_assignable());
        assert!(!UserRole::SeniorAgent.is_assignable());
        assert!(!UserRole::TeamLead.is_assignable());
        assert!(!UserRole::Admin.is_assignable());
    }

    #[test]
    fn test_user_role_display_and_parse() {
        assert_eq!(format!("{}", UserRole::SeniorAgent), "senior_agent");
        assert_eq!("team_lead".parse::<UserRole>().unwrap(), UserRole::TeamLead);
        assert_eq!("AGENT".parse::<UserRole>().unwrap(), UserRole::Agent);
        assert!("manager".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_session_status_closed() {
        assert!(!SessionStatus::Active.is_closed());
        assert!(!SessionStatus::Waiting.is_closed());
        assert!(SessionStatus::Resolved.is_closed());
        assert!(SessionStatus::Terminated.is_closed());
    }

    #[test]
    fn test_customer_status_default() {
        assert_eq!(CustomerStatus::default(), CustomerStatus::Regular);
    }

    #[test]
    fn test_sender_kind_roundtrip() {
        for kind in [SenderKind::Customer, SenderKind::Agent, SenderKind::System] {
            assert_eq!(kind.to_string().parse::<SenderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "mike".into(),
            password_hash: "secret".into(),
            role: UserRole::Agent,
            display_name: "Mike".into(),
            email: "mike@example.com".into(),
            online: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }
}
