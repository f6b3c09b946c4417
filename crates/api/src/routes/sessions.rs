//! Session command and query endpoints
//!
//! Mutations (transfer, end) go through the hub so connected websocket
//! participants see the same broadcasts regardless of which surface
//! triggered the change.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatdesk_shared::{ChatSession, Customer, Message, User};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub customer_name: String,
    pub customer_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session: ChatSession,
    pub customer: Customer,
    pub agent: User,
}

/// POST /api/v1/sessions
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> ApiResult<(StatusCode, Json<StartSessionResponse>)> {
    let started = state
        .lifecycle
        .start_session(&req.customer_name, &req.customer_email)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session: started.session,
            customer: started.customer,
            agent: started.agent,
        }),
    ))
}

/// Active session enriched for the agent dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionView {
    pub session: ChatSession,
    pub customer: Option<Customer>,
    pub agent: Option<User>,
    pub last_message: Option<Message>,
}

/// GET /api/v1/sessions/active
pub async fn active_sessions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ActiveSessionView>>> {
    let sessions = state.store.active_sessions().await?;

    let mut views = Vec::with_capacity(sessions.len());
    for session in sessions {
        let customer = match session.customer_id {
            Some(id) => state.store.customer(id).await.ok(),
            None => None,
        };
        let agent = match session.agent_id {
            Some(id) => state.store.user(id).await.ok(),
            None => None,
        };
        let last_message = state
            .store
            .messages_for_session(session.id)
            .await?
            .pop();

        views.push(ActiveSessionView {
            session,
            customer,
            agent,
            last_message,
        });
    }

    Ok(Json(views))
}

/// GET /api/v1/sessions/:code/messages
pub async fn session_messages(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let session = state
        .store
        .session_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("session {}", code)))?;

    let messages = state.store.messages_for_session(session.id).await?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub new_agent_id: Uuid,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub session: ChatSession,
    pub system_message: Message,
}

/// POST /api/v1/sessions/:code/transfer
pub async fn transfer_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<Json<TransferResponse>> {
    let outcome = state
        .hub
        .transfer_session(&code, req.new_agent_id, &req.reason)
        .await?;

    Ok(Json(TransferResponse {
        session: outcome.session,
        system_message: outcome.system_message,
    }))
}

/// POST /api/v1/sessions/:code/end
pub async fn end_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<ChatSession>> {
    let session = state.hub.end_session(&code, None).await?;
    Ok(Json(session))
}
