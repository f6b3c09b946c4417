//! Wire protocol for the chat websocket
//!
//! Every frame is a JSON object with a `type` discriminator. Field names
//! on the wire are camelCase; event names are snake_case.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use chatdesk_shared::{MessageKind, SenderKind};

/// Which side of the conversation a connection speaks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantKind {
    Customer,
    Agent,
}

impl Default for ParticipantKind {
    fn default() -> Self {
        Self::Customer
    }
}

impl ParticipantKind {
    pub fn sender_kind(&self) -> SenderKind {
        match self {
            Self::Customer => SenderKind::Customer,
            Self::Agent => SenderKind::Agent,
        }
    }
}

/// Chat message payload sent by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageData {
    pub content: String,
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// Transfer request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferData {
    pub new_agent_id: Uuid,
    #[serde(default)]
    pub reason: String,
}

/// Session-end payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndedData {
    #[serde(default)]
    pub ended_by: Option<String>,
}

/// Frames accepted from clients
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinSession {
        session_id: String,
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        user_type: ParticipantKind,
    },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        session_id: String,
        data: ChatMessageData,
    },
    #[serde(rename_all = "camelCase")]
    AgentTyping { session_id: String },
    #[serde(rename_all = "camelCase")]
    CustomerTyping { session_id: String },
    #[serde(rename_all = "camelCase")]
    SessionTransfer {
        session_id: String,
        data: TransferData,
    },
    #[serde(rename_all = "camelCase")]
    SessionEnded {
        session_id: String,
        #[serde(default)]
        data: Option<SessionEndedData>,
    },
    #[serde(rename_all = "camelCase")]
    LeaveSession { session_id: String },
}

/// Chat message as broadcast to session participants, enriched with the
/// sender's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub id: Uuid,
    pub sender_id: Option<String>,
    pub sender_name: String,
    pub sender_kind: SenderKind,
    pub content: String,
    pub message_kind: MessageKind,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

/// Join/leave notification payload. `status` is `joined` or `left`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceData {
    pub status: String,
    pub user_id: Option<String>,
    pub user_type: ParticipantKind,
}

/// Transfer notification payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferNotice {
    pub new_agent_id: Uuid,
    pub new_agent_name: String,
    pub reason: String,
}

/// Frames sent to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        session_id: String,
        data: MessageEvent,
    },
    #[serde(rename_all = "camelCase")]
    AgentStatus {
        session_id: String,
        data: PresenceData,
    },
    #[serde(rename_all = "camelCase")]
    AgentTyping { session_id: String },
    #[serde(rename_all = "camelCase")]
    CustomerTyping { session_id: String },
    #[serde(rename_all = "camelCase")]
    SessionTransfer {
        session_id: String,
        data: TransferNotice,
    },
    #[serde(rename_all = "camelCase")]
    SessionEnded {
        session_id: String,
        data: SessionEndedData,
    },
    Error { message: String },
}
