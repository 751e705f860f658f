use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;
use tracing::info;

use super::{deleted, is_blank, require_object, ApiJson};
use crate::errors::{ApiError, ApiResult};
use crate::models::{Client, NewClient};
use crate::server::app::AppState;

pub async fn list_clients(State(state): State<AppState>) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(state.store.list_clients().await?))
}

pub async fn create_client(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    if is_blank(&payload.company) {
        return Err(ApiError::validation("company required"));
    }

    let client = state.store.create_client(payload).await?;
    info!("Created client {} ({})", client.id, client.company);
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Client>> {
    state
        .store
        .get_client(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("client"))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<Value>,
) -> ApiResult<Json<Client>> {
    require_object(&patch)?;
    let client = state
        .store
        .update_client(&id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("client"))?;

    info!("Updated client {}", id);
    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.store.delete_client(&id).await? {
        return Err(ApiError::not_found("client"));
    }

    info!("Deleted client {} with its projects and proposals", id);
    Ok(Json(deleted()))
}
