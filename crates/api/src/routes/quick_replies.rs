//! Quick-reply endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use chatdesk_shared::store::NewQuickReply;
use chatdesk_shared::QuickReply;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuickReplyRequest {
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_by: Option<Uuid>,
}

/// POST /api/v1/quick-replies
pub async fn create_quick_reply(
    State(state): State<AppState>,
    Json(req): Json<CreateQuickReplyRequest>,
) -> ApiResult<(StatusCode, Json<QuickReply>)> {
    if req.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Content is required".into()));
    }

    let reply = state
        .store
        .create_quick_reply(NewQuickReply {
            title: req.title,
            content: req.content,
            category: req.category,
            created_by: req.created_by,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(reply)))
}

/// GET /api/v1/quick-replies
pub async fn list_quick_replies(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<QuickReply>>> {
    Ok(Json(state.store.list_quick_replies().await?))
}

/// GET /api/v1/quick-replies/category/:category
pub async fn quick_replies_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Vec<QuickReply>>> {
    Ok(Json(state.store.quick_replies_by_category(&category).await?))
}

/// DELETE /api/v1/quick-replies/:id
pub async fn delete_quick_reply(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_quick_reply(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
