//! Conversation export
//!
//! Dumps session transcripts as JSON or CSV for offline review. Scope
//! narrows the dump to one customer's or one agent's sessions.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use chatdesk_shared::{ChatSession, Message};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    All,
    Customer,
    Agent,
}

impl Default for ExportScope {
    fn default() -> Self {
        Self::All
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self::Json
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub scope: ExportScope,
    pub id: Option<Uuid>,
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationExport {
    pub session: ChatSession,
    pub messages: Vec<Message>,
}

/// GET /api/v1/export/conversations?scope=all|customer|agent&id=&format=json|csv
pub async fn export_conversations(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    let sessions = match params.scope {
        ExportScope::All => state.store.all_sessions().await?,
        ExportScope::Customer => {
            let id = params
                .id
                .ok_or_else(|| ApiError::BadRequest("Customer scope requires id".into()))?;
            state.store.sessions_for_customer(id).await?
        }
        ExportScope::Agent => {
            let id = params
                .id
                .ok_or_else(|| ApiError::BadRequest("Agent scope requires id".into()))?;
            state.store.sessions_for_agent(id).await?
        }
    };

    let mut conversations = Vec::with_capacity(sessions.len());
    for session in sessions {
        let messages = state.store.messages_for_session(session.id).await?;
        conversations.push(ConversationExport { session, messages });
    }

    match params.format {
        ExportFormat::Json => Ok(Json(conversations).into_response()),
        ExportFormat::Csv => {
            let body = conversations_to_csv(&conversations);
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                body,
            )
                .into_response())
        }
    }
}

fn conversations_to_csv(conversations: &[ConversationExport]) -> String {
    let mut out =
        String::from("session_code,message_id,sent_at,sender_kind,sender_id,content\n");
    for conversation in conversations {
        for message in &conversation.messages {
            let sent_at = message.sent_at.format(&Rfc3339).unwrap_or_default();
            let sender_id = message
                .sender_id
                .map(|id| id.to_string())
                .unwrap_or_default();
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                csv_escape(&conversation.session.session_code),
                message.id,
                sent_at,
                message.sender_kind,
                sender_id,
                csv_escape(&message.content),
            ));
        }
    }
    out
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Allow unwrap() in tests for cleaner test code
mod tests {
    use super::*;
    use chatdesk_shared::{MessageKind, SenderKind, SessionStatus};
    use time::OffsetDateTime;

    fn session(code: &str) -> ChatSession {
        ChatSession {
            id: Uuid::new_v4(),
            session_code: code.to_string(),
            customer_id: None,
            agent_id: None,
            status: SessionStatus::Resolved,
            started_at: OffsetDateTime::UNIX_EPOCH,
            ended_at: Some(OffsetDateTime::UNIX_EPOCH),
            transfer_history: Vec::new(),
            rating: None,
        }
    }

    fn message(session_id: Uuid, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            session_id,
            sender_id: None,
            sender_kind: SenderKind::Customer,
            content: content.to_string(),
            message_kind: MessageKind::Text,
            sent_at: OffsetDateTime::UNIX_EPOCH,
            read_by: Vec::new(),
        }
    }

    #[test]
    fn test_csv_escape_plain_field_unchanged() {
        assert_eq!(csv_escape("hello"), "hello");
    }

    #[test]
    fn test_csv_escape_quotes_delimiters_and_newlines() {
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_csv_body_has_header_and_one_row_per_message() {
        let s = session("CS-abc-1234");
        let messages = vec![
            message(s.id, "first"),
            message(s.id, "second, with comma"),
        ];
        let csv = conversations_to_csv(&[ConversationExport {
            session: s,
            messages,
        }]);

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("session_code,message_id"));
        assert!(lines[1].contains("first"));
        assert!(lines[2].ends_with("\"second, with comma\""));
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let csv = conversations_to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }
}
