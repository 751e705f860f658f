use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{deleted, is_blank, require_object, ApiJson};
use crate::errors::{ApiError, ApiResult, StoreError};
use crate::models::{NewProject, Project};
use crate::server::app::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilter {
    pub client_id: Option<String>,
}

/// An unknown `clientId` in a request body is a bad request, not a missing route.
fn client_reference(err: StoreError) -> ApiError {
    match err {
        StoreError::MissingReference {
            entity: "client", ..
        } => ApiError::validation("client not found"),
        other => other.into(),
    }
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(filter): Query<ProjectFilter>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = state
        .store
        .list_projects(filter.client_id.as_deref())
        .await?;
    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    if is_blank(&payload.client_id) || is_blank(&payload.name) {
        return Err(ApiError::validation("clientId and name required"));
    }

    let project = state
        .store
        .create_project(payload)
        .await
        .map_err(client_reference)?;

    info!("Created project {} for client {}", project.id, project.client_id);
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    state
        .store
        .get_project(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("project"))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<Value>,
) -> ApiResult<Json<Project>> {
    require_object(&patch)?;
    let project = state
        .store
        .update_project(&id, &patch)
        .await
        .map_err(client_reference)?
        .ok_or_else(|| ApiError::not_found("project"))?;

    info!("Updated project {}", id);
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.store.delete_project(&id).await? {
        return Err(ApiError::not_found("project"));
    }

    info!("Deleted project {} with its proposals", id);
    Ok(Json(deleted()))
}
