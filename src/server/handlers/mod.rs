pub mod auth;
pub mod clients;
pub mod health;
pub mod main_modules;
pub mod projects;
pub mod proposals;
pub mod template;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde_json::{json, Value};

use crate::errors::{ApiError, ApiResult};

/// `Json` body extractor that answers malformed bodies with 400 `{error}`
/// instead of axum's plain-text 415/422.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Body of every successful DELETE.
pub(crate) fn deleted() -> Value {
    json!({ "success": true })
}

/// PUT bodies are merged key by key, so anything but an object is refused.
pub(crate) fn require_object(body: &Value) -> ApiResult<()> {
    if body.is_object() {
        Ok(())
    } else {
        Err(ApiError::validation("request body must be a JSON object"))
    }
}

pub(crate) fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
