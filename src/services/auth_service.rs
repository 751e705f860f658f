use bcrypt::{hash, verify, DEFAULT_COST};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::common::{now_iso, uid};
use crate::errors::{ApiError, StoreError};
use crate::models::{StoredUser, User};
use crate::store::ProposalStore;

/// Authentication-related errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailExists,

    #[error("{0}")]
    ValidationError(String),

    #[error("Auth backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::EmailExists => ApiError::Conflict(err.to_string()),
            AuthError::ValidationError(message) => ApiError::Validation(message),
            AuthError::BackendUnavailable(_) => ApiError::BadGateway(err.to_string()),
            AuthError::Hashing(_) => ApiError::internal(err.to_string()),
            AuthError::Store(StoreError::Duplicate(_)) => {
                ApiError::Conflict(AuthError::EmailExists.to_string())
            }
            AuthError::Store(store) => store.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, alias = "nama")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub jabatan: Option<String>,
}

/// Reply of a proxied auth call: the backend's status and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxiedReply {
    pub status: u16,
    pub body: Value,
}

/// Login and registration.
///
/// With a backend URL both calls are forwarded there untouched. Without one
/// users live in the proposal store with bcrypt hashes and every successful
/// call hands out a fresh random bearer token.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn ProposalStore>,
    backend_url: Option<String>,
    http: reqwest::Client,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AuthService {
    pub fn new(store: Arc<dyn ProposalStore>, backend_url: Option<String>) -> Self {
        Self {
            store,
            backend_url: backend_url.map(|url| url.trim_end_matches('/').to_string()),
            http: reqwest::Client::new(),
        }
    }

    pub fn backend_url(&self) -> Option<&str> {
        self.backend_url.as_deref()
    }

    /// Hash a password using bcrypt
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        if password.len() < 8 {
            return Err(AuthError::ValidationError(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        hash(password, DEFAULT_COST).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        verify(password, hash).map_err(|e| AuthError::Hashing(e.to_string()))
    }

    pub fn generate_token() -> String {
        Uuid::new_v4().to_string()
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<(), AuthError> {
        let invalid = |reason: &str| Err(AuthError::ValidationError(format!("Invalid email: {}", reason)));

        let Some((local_part, domain_part)) = email.split_once('@') else {
            return invalid("must contain @");
        };
        if local_part.is_empty() {
            return invalid("local part cannot be empty");
        }
        if domain_part.contains('@') {
            return invalid("must contain exactly one @");
        }
        if !domain_part.contains('.') || domain_part.starts_with('.') || domain_part.ends_with('.') {
            return invalid("domain must contain a dot");
        }
        if email.len() > 254 {
            return invalid("too long");
        }
        Ok(())
    }

    fn envelope(message: &str, user: &User, token: String) -> Value {
        json!({
            "success": true,
            "message": message,
            "data": {
                "user": user,
                "token": token,
                "token_type": "Bearer"
            }
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<Value, AuthError> {
        let (Some(email), Some(password)) = (present(request.email), request.password) else {
            return Err(AuthError::ValidationError(
                "email and password required".to_string(),
            ));
        };

        let Some(stored) = self.store.find_user_by_email(&email).await? else {
            warn!("Login for unknown email {}", email);
            return Err(AuthError::InvalidCredentials);
        };

        let hash = stored.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || Self::verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))??;
        if !matches {
            warn!("Wrong password for {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        info!("User {} logged in", stored.user.id);
        Ok(Self::envelope("Login successful", &stored.user, Self::generate_token()))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Value, AuthError> {
        let (Some(name), Some(email), Some(password)) = (
            present(request.name),
            present(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::ValidationError(
                "name, email and password required".to_string(),
            ));
        };
        Self::validate_email(&email)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailExists);
        }

        let password_hash = tokio::task::spawn_blocking(move || Self::hash_password(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))??;

        let stored = self
            .store
            .create_user(StoredUser {
                user: User {
                    id: uid("user"),
                    name,
                    email,
                    jabatan: present(request.jabatan),
                    created_at: now_iso(),
                },
                password_hash,
            })
            .await?;

        info!("Registered user {}", stored.user.id);
        Ok(Self::envelope(
            "Registration successful",
            &stored.user,
            Self::generate_token(),
        ))
    }

    /// Forward `body` to `<backend>/api/<path>` and hand back whatever it says.
    pub async fn proxy(&self, path: &str, body: &Value) -> Result<ProxiedReply, AuthError> {
        let Some(base) = &self.backend_url else {
            return Err(AuthError::BackendUnavailable(
                "no auth backend configured".to_string(),
            ));
        };
        let url = format!("{}/api/{}", base, path);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::BackendUnavailable(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AuthError::BackendUnavailable(format!("invalid JSON from {}: {}", url, e)))?;

        info!("Proxied {} to {} ({})", path, url, status);
        Ok(ProxiedReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> AuthService {
        let store = JsonFileStore::new(dir.path().join("db.json"));
        AuthService::new(Arc::new(store), None)
    }

    #[test]
    fn test_password_hashing() {
        let hash = AuthService::hash_password("rahasia123").unwrap();
        assert!(AuthService::verify_password("rahasia123", &hash).unwrap());
        assert!(!AuthService::verify_password("salah12345", &hash).unwrap());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            AuthService::hash_password("short"),
            Err(AuthError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_email() {
        assert!(AuthService::validate_email("dewi@example.com").is_ok());
        assert!(AuthService::validate_email("dewi.example.com").is_err());
        assert!(AuthService::validate_email("@example.com").is_err());
        assert!(AuthService::validate_email("dewi@localhost").is_err());
        assert!(AuthService::validate_email("a@b@example.com").is_err());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let dir = TempDir::new().unwrap();
        let auth = service(&dir);

        let registered = auth
            .register(RegisterRequest {
                name: Some("Dewi".to_string()),
                email: Some("dewi@example.com".to_string()),
                password: Some("rahasia123".to_string()),
                jabatan: Some("Analyst".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(registered["data"]["user"]["name"], "Dewi");
        assert!(registered["data"]["user"].get("passwordHash").is_none());

        let login = auth
            .login(LoginRequest {
                email: Some("dewi@example.com".to_string()),
                password: Some("rahasia123".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(login["success"], true);
        assert_eq!(login["data"]["token_type"], "Bearer");
        assert!(login["data"]["token"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let dir = TempDir::new().unwrap();
        let auth = service(&dir);

        let missing = auth.login(LoginRequest::default()).await.unwrap_err();
        assert!(matches!(missing, AuthError::ValidationError(_)));

        let unknown = auth
            .login(LoginRequest {
                email: Some("nobody@example.com".to_string()),
                password: Some("whatever1".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(ApiError::from(unknown).status_code(), 401);
    }

    #[tokio::test]
    async fn test_proxy_without_backend_is_bad_gateway() {
        let dir = TempDir::new().unwrap();
        let err = service(&dir).proxy("login", &json!({})).await.unwrap_err();
        assert_eq!(ApiError::from(err).status_code(), 502);
    }
}
