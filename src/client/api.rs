use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{ApiClient, CallOptions, Session};
use crate::builder::{MainModule, ProposalTemplate};
use crate::errors::{ClientError, ClientResult};
use crate::models::{Client, NewClient, NewProject, Project, Proposal};

/// Envelope returned by `/api/login` and `/api/register`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<AuthData>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthData {
    #[serde(default)]
    pub user: Value,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoginResult {
    pub user: Value,
    pub token: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jabatan: Option<String>,
}

/// Pull a human readable message out of an error body: `error`, then
/// `message`, then a generic fallback.
pub fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
}

impl ApiClient {
    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: CallOptions,
    ) -> ClientResult<T> {
        let response = self.api_call(endpoint, &options, 0).await?;
        let status = response.status();
        let body = response.bytes().await.map_err(ClientError::Network)?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn remember(&self, response: AuthResponse) -> ClientResult<Option<LoginResult>> {
        let Some(data) = response.data else {
            return Ok(None);
        };
        let Some(token) = data.token else {
            return Ok(None);
        };

        self.session().save(Session {
            token: token.clone(),
            token_type: data.token_type.unwrap_or_else(|| "Bearer".to_string()),
            user: data.user.clone(),
        })?;
        Ok(Some(LoginResult {
            user: data.user,
            token,
        }))
    }

    /// Log in and keep the returned token in the session.
    pub async fn login_user(&self, email: &str, password: &str) -> ClientResult<LoginResult> {
        let response: AuthResponse = self
            .request(
                "/api/login",
                CallOptions::post(json!({"email": email, "password": password})),
            )
            .await?;

        let message = response.message.clone();
        match self.remember(response)? {
            Some(login) => {
                info!("Logged in as {}", email);
                Ok(login)
            }
            None => Err(ClientError::Decode(
                message.unwrap_or_else(|| "login response carried no token".to_string()),
            )),
        }
    }

    /// Register a user. When the backend answers with a token the new user is
    /// logged in right away.
    pub async fn register_user(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        let body = serde_json::to_value(request).map_err(|e| ClientError::Decode(e.to_string()))?;
        let response: AuthResponse = self.request("/api/register", CallOptions::post(body)).await?;

        if self.remember(response.clone())?.is_some() {
            info!("Registered and logged in as {}", request.email);
        }
        Ok(response)
    }

    pub fn logout(&self) -> ClientResult<()> {
        self.session().clear()
    }

    pub async fn get_clients(&self) -> ClientResult<Vec<Client>> {
        self.request("/api/clients", CallOptions::get()).await
    }

    pub async fn get_client(&self, id: &str) -> ClientResult<Client> {
        self.request(&format!("/api/clients/{}", id), CallOptions::get())
            .await
    }

    pub async fn create_client(&self, client: &NewClient) -> ClientResult<Client> {
        let body = serde_json::to_value(client).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.request("/api/clients", CallOptions::post(body)).await
    }

    pub async fn update_client(&self, id: &str, patch: &Value) -> ClientResult<Client> {
        self.request(
            &format!("/api/clients/{}", id),
            CallOptions::put(patch.clone()),
        )
        .await
    }

    pub async fn delete_client(&self, id: &str) -> ClientResult<()> {
        let _: Value = self
            .request(&format!("/api/clients/{}", id), CallOptions::delete())
            .await?;
        Ok(())
    }

    pub async fn get_projects(&self, client_id: Option<&str>) -> ClientResult<Vec<Project>> {
        let mut options = CallOptions::get();
        if let Some(client_id) = client_id {
            options = options.query("clientId", client_id);
        }
        self.request("/api/projects", options).await
    }

    pub async fn get_project(&self, id: &str) -> ClientResult<Project> {
        self.request(&format!("/api/projects/{}", id), CallOptions::get())
            .await
    }

    pub async fn create_project(&self, project: &NewProject) -> ClientResult<Project> {
        let body = serde_json::to_value(project).map_err(|e| ClientError::Decode(e.to_string()))?;
        self.request("/api/projects", CallOptions::post(body)).await
    }

    pub async fn update_project(&self, id: &str, patch: &Value) -> ClientResult<Project> {
        self.request(
            &format!("/api/projects/{}", id),
            CallOptions::put(patch.clone()),
        )
        .await
    }

    pub async fn delete_project(&self, id: &str) -> ClientResult<()> {
        let _: Value = self
            .request(&format!("/api/projects/{}", id), CallOptions::delete())
            .await?;
        Ok(())
    }

    pub async fn get_proposals(&self, project_id: &str) -> ClientResult<Vec<Proposal>> {
        self.request(
            &format!("/api/projects/{}/proposals", project_id),
            CallOptions::get(),
        )
        .await
    }

    pub async fn create_proposal(&self, project_id: &str) -> ClientResult<Proposal> {
        self.request(
            &format!("/api/projects/{}/proposals", project_id),
            CallOptions::post(json!({})),
        )
        .await
    }

    pub async fn get_proposal(&self, id: &str) -> ClientResult<Proposal> {
        self.request(&format!("/api/proposals/{}", id), CallOptions::get())
            .await
    }

    pub async fn delete_proposal(&self, id: &str) -> ClientResult<()> {
        let _: Value = self
            .request(&format!("/api/proposals/{}", id), CallOptions::delete())
            .await?;
        Ok(())
    }

    pub async fn get_proposal_content(&self, id: &str) -> ClientResult<Value> {
        self.request(
            &format!("/api/proposals/{}/content", id),
            CallOptions::get(),
        )
        .await
    }

    pub async fn save_proposal_content(&self, id: &str, content: &Value) -> ClientResult<Value> {
        self.request(
            &format!("/api/proposals/{}/content", id),
            CallOptions::put(content.clone()),
        )
        .await
    }

    pub async fn get_proposal_template(&self) -> ClientResult<ProposalTemplate> {
        self.request("/api/proposal-template", CallOptions::get())
            .await
    }

    pub async fn search_main_modules(&self, query: Option<&str>) -> ClientResult<Vec<MainModule>> {
        let mut options = CallOptions::get();
        if let Some(q) = query {
            options = options.query("q", q);
        }
        self.request("/api/main-modules", options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_error_key() {
        let body = br#"{"error": "company required", "message": "ignored"}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "company required"
        );
    }

    #[test]
    fn error_message_falls_back_to_message_key() {
        let body = br#"{"success": false, "message": "Invalid credentials"}"#;
        assert_eq!(
            error_message(StatusCode::UNAUTHORIZED, body),
            "Invalid credentials"
        );
    }

    #[test]
    fn error_message_for_non_json_body() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>"),
            "Request failed with status 502"
        );
    }

    #[test]
    fn register_request_omits_missing_jabatan() {
        let body = serde_json::to_value(RegisterRequest {
            name: "Dewi".to_string(),
            email: "dewi@example.com".to_string(),
            password: "rahasia123".to_string(),
            jabatan: None,
        })
        .unwrap();
        assert!(body.get("jabatan").is_none());
        assert_eq!(body["name"], "Dewi");
    }
}
