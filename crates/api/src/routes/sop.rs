//! SOP knowledge-base endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use chatdesk_shared::store::{NewSop, SopUpdate};
use chatdesk_shared::SopDocument;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSopRequest {
    pub title: String,
    pub category: String,
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub uploaded_by: Option<Uuid>,
}

/// POST /api/v1/sop
pub async fn create_sop(
    State(state): State<AppState>,
    Json(req): Json<CreateSopRequest>,
) -> ApiResult<(StatusCode, Json<SopDocument>)> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".into()));
    }

    let sop = state
        .store
        .create_sop(NewSop {
            title: req.title,
            category: req.category,
            content: req.content,
            keywords: req.keywords,
            uploaded_by: req.uploaded_by,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(sop)))
}

/// GET /api/v1/sop
pub async fn list_sops(State(state): State<AppState>) -> ApiResult<Json<Vec<SopDocument>>> {
    Ok(Json(state.store.list_sops().await?))
}

/// GET /api/v1/sop/category/:category
pub async fn sops_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Json<Vec<SopDocument>>> {
    Ok(Json(state.store.sops_by_category(&category).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
}

/// GET /api/v1/sop/search?q=
pub async fn search_sops(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<SopDocument>>> {
    if params.q.trim().is_empty() {
        return Err(ApiError::BadRequest("Search query is required".into()));
    }
    Ok(Json(state.store.search_sops(&params.q).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSopRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub content: Option<String>,
    pub keywords: Option<Vec<String>>,
}

/// PUT /api/v1/sop/:id
pub async fn update_sop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSopRequest>,
) -> ApiResult<Json<SopDocument>> {
    let sop = state
        .store
        .update_sop(
            id,
            SopUpdate {
                title: req.title,
                category: req.category,
                content: req.content,
                keywords: req.keywords,
            },
        )
        .await?;
    Ok(Json(sop))
}

/// DELETE /api/v1/sop/:id
pub async fn delete_sop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_sop(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
