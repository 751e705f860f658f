use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;
use tracing::info;

use super::{deleted, require_object, ApiJson};
use crate::errors::{ApiError, ApiResult};
use crate::models::Proposal;
use crate::server::app::AppState;

pub async fn list_proposals(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Vec<Proposal>>> {
    Ok(Json(state.store.list_proposals(&project_id).await?))
}

/// New proposal for the project; the body, if any, is ignored since the
/// version is always assigned here.
pub async fn create_proposal(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Proposal>)> {
    let proposal = state.store.create_proposal(&project_id).await?;

    info!(
        "Created proposal {} (v{}) for project {}",
        proposal.id, proposal.version, project_id
    );
    Ok((StatusCode::CREATED, Json(proposal)))
}

pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Proposal>> {
    state
        .store
        .get_proposal(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("proposal"))
}

pub async fn delete_proposal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.store.delete_proposal(&id).await? {
        return Err(ApiError::not_found("proposal"));
    }

    info!("Deleted proposal {}", id);
    Ok(Json(deleted()))
}

pub async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .store
        .get_content(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("proposal"))
}

pub async fn put_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(content): ApiJson<Value>,
) -> ApiResult<Json<Value>> {
    require_object(&content)?;
    let saved = state
        .store
        .put_content(&id, content)
        .await?
        .ok_or_else(|| ApiError::not_found("proposal"))?;

    info!("Saved content of proposal {}", id);
    Ok(Json(saved))
}
