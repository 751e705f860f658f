use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use crate::errors::{ClientError, ClientResult};

/// What a successful login leaves behind: the bearer token and the user
/// object the server returned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub user: Value,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Session {
    pub fn user_label(&self) -> String {
        let name = ["name", "nama"]
            .iter()
            .find_map(|key| self.user.get(*key).and_then(Value::as_str));
        let email = self.user.get("email").and_then(Value::as_str);
        match (name, email) {
            (Some(name), Some(email)) => format!("{} <{}>", name, email),
            (Some(name), None) => name.to_string(),
            (None, Some(email)) => email.to_string(),
            (None, None) => "unknown user".to_string(),
        }
    }
}

/// Session holder handed to the API client.
///
/// With a path the session is mirrored to a JSON file so separate CLI
/// invocations share one login; without a path it lives in memory only.
#[derive(Debug, Default)]
pub struct SessionStore {
    path: Option<PathBuf>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the session file at `path`; a missing file means logged out.
    pub fn open(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let path = path.into();
        let current = match std::fs::read(&path) {
            Ok(bytes) => Some(
                serde_json::from_slice(&bytes)
                    .map_err(|e| ClientError::Session(format!("{}: {}", path.display(), e)))?,
            ),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(ClientError::Session(format!("{}: {}", path.display(), err)))
            }
        };

        Ok(Self {
            path: Some(path),
            current: RwLock::new(current),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    pub fn save(&self, session: Session) -> ClientResult<()> {
        if let Some(path) = &self.path {
            let body = serde_json::to_vec_pretty(&session)
                .map_err(|e| ClientError::Session(e.to_string()))?;
            std::fs::write(path, body)
                .map_err(|e| ClientError::Session(format!("{}: {}", path.display(), e)))?;
            debug!("Saved session to {}", path.display());
        }
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session);
        Ok(())
    }

    pub fn clear(&self) -> ClientResult<()> {
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(ClientError::Session(format!("{}: {}", path.display(), err)))
                }
            }
        }
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}
