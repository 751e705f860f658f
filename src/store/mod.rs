//! Persistence behind the route handlers.
//!
//! Two backends implement [`ProposalStore`]: [`JsonFileStore`] keeps the whole
//! database in one JSON document, [`SqlStore`] keeps it in SQLite tables via
//! sea-orm. Handlers only see `Arc<dyn ProposalStore>`.

pub mod json_file;
#[cfg(feature = "server")]
pub mod sql;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::common::shallow_merge;
use crate::errors::{StoreError, StoreResult};
use crate::models::{Client, NewClient, NewProject, Project, Proposal, StoredUser, IMMUTABLE_KEYS};

pub use json_file::JsonFileStore;
#[cfg(feature = "server")]
pub use sql::SqlStore;

#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Short backend name reported by `/health`
    fn backend_name(&self) -> &'static str;

    async fn list_clients(&self) -> StoreResult<Vec<Client>>;
    async fn get_client(&self, id: &str) -> StoreResult<Option<Client>>;
    /// `input.company` has already been validated by the caller.
    async fn create_client(&self, input: NewClient) -> StoreResult<Client>;
    async fn update_client(&self, id: &str, patch: &Value) -> StoreResult<Option<Client>>;
    /// Deletes the client's projects, their proposals and contents as well.
    async fn delete_client(&self, id: &str) -> StoreResult<bool>;

    async fn list_projects(&self, client_id: Option<&str>) -> StoreResult<Vec<Project>>;
    async fn get_project(&self, id: &str) -> StoreResult<Option<Project>>;
    /// Fails with [`StoreError::MissingReference`] when the client does not exist.
    async fn create_project(&self, input: NewProject) -> StoreResult<Project>;
    async fn update_project(&self, id: &str, patch: &Value) -> StoreResult<Option<Project>>;
    async fn delete_project(&self, id: &str) -> StoreResult<bool>;

    /// Proposals of one project, highest version first.
    async fn list_proposals(&self, project_id: &str) -> StoreResult<Vec<Proposal>>;
    async fn get_proposal(&self, id: &str) -> StoreResult<Option<Proposal>>;
    /// Assigns `version = max existing + 1` for the project.
    async fn create_proposal(&self, project_id: &str) -> StoreResult<Proposal>;
    async fn delete_proposal(&self, id: &str) -> StoreResult<bool>;

    /// `None` when the proposal does not exist, `{}` when nothing was saved yet.
    async fn get_content(&self, proposal_id: &str) -> StoreResult<Option<Value>>;
    /// Stores `content` verbatim; `None` when the proposal does not exist.
    async fn put_content(&self, proposal_id: &str, content: Value) -> StoreResult<Option<Value>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>>;
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn create_user(&self, user: StoredUser) -> StoreResult<StoredUser>;
}

/// Shallow-merge `patch` over `record`, keeping `id` and `createdAt`.
pub fn apply_patch<T>(record: &T, patch: &Value) -> StoreResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(record)?;
    shallow_merge(&mut value, patch, IMMUTABLE_KEYS);
    serde_json::from_value(value).map_err(|e| StoreError::InvalidUpdate(e.to_string()))
}

/// Which backend `serve` should open.
#[derive(Clone, Debug, PartialEq)]
pub enum StorageConfig {
    JsonFile(PathBuf),
    Sqlite(String),
}

pub async fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ProposalStore>> {
    match config {
        StorageConfig::JsonFile(path) => {
            let store = JsonFileStore::new(path.clone());
            // create the file up front so a bad path fails at startup
            store.read_db().await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "server")]
        StorageConfig::Sqlite(path) => {
            let store = SqlStore::open(path).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "server"))]
        StorageConfig::Sqlite(_) => {
            anyhow::bail!("SQLite storage requires the `server` feature")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Grade;
    use chrono::Utc;
    use serde_json::json;

    fn sample_project() -> Project {
        Project {
            id: "project-abc123".to_string(),
            client_id: "client-abc123".to_string(),
            name: "Mobile banking".to_string(),
            analyst: Some("Dewi".to_string()),
            grade: Some(Grade::A),
            roles: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn apply_patch_merges_and_protects_identity() {
        let project = sample_project();
        let updated = apply_patch(
            &project,
            &json!({"id": "project-other", "name": "Mobile banking v2", "grade": "C"}),
        )
        .unwrap();

        assert_eq!(updated.id, project.id);
        assert_eq!(updated.created_at, project.created_at);
        assert_eq!(updated.name, "Mobile banking v2");
        assert_eq!(updated.grade, Some(Grade::C));
        assert_eq!(updated.analyst.as_deref(), Some("Dewi"));
    }

    #[test]
    fn apply_patch_rejects_values_that_break_the_schema() {
        let err = apply_patch(&sample_project(), &json!({"grade": "Z"})).unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdate(_)));
    }
}
