use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::Value;

use super::ApiJson;
use crate::errors::{ApiError, ApiResult};
use crate::server::app::AppState;
use crate::services::{AuthService, LoginRequest, RegisterRequest};

type AuthReply = ApiResult<(StatusCode, Json<Value>)>;

async fn forward(auth: &AuthService, path: &str, body: &Value) -> AuthReply {
    let reply = auth.proxy(path, body).await?;
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(reply.body)))
}

fn parse<T: serde::de::DeserializeOwned>(body: Value) -> ApiResult<T> {
    serde_json::from_value(body).map_err(|e| ApiError::validation(e.to_string()))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> AuthReply {
    if state.auth.backend_url().is_some() {
        return forward(&state.auth, "login", &body).await;
    }

    let reply = state.auth.login(parse::<LoginRequest>(body)?).await?;
    Ok((StatusCode::OK, Json(reply)))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> AuthReply {
    if state.auth.backend_url().is_some() {
        return forward(&state.auth, "register", &body).await;
    }

    let reply = state.auth.register(parse::<RegisterRequest>(body)?).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}
