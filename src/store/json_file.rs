use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{apply_patch, ProposalStore};
use crate::common::{empty_object, now_iso, uid};
use crate::errors::{StoreError, StoreResult};
use crate::models::{
    Client, Database, NewClient, NewProject, Project, Proposal, StoredUser,
};

/// Whole-document JSON store.
///
/// Every mutation reads the document, applies the change in memory and writes
/// the full document back through a temporary file that is renamed over the
/// original. The mutex spans the whole read-modify-write cycle so two requests
/// in the same process cannot overwrite each other's change. Separate
/// processes sharing one file are not coordinated.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed document; writes an empty one first if the file is missing.
    pub async fn read_db(&self) -> StoreResult<Database> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Replace the whole document.
    pub async fn write_db(&self, db: &Database) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        self.save(db).await
    }

    async fn load(&self) -> StoreResult<Database> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!("Creating data file {}", self.path.display());
                let db = Database::default();
                self.save(&db).await?;
                Ok(db)
            }
            Err(err) => Err(StoreError::io(&self.path, err)),
        }
    }

    async fn save(&self, db: &Database) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let body = serde_json::to_vec_pretty(db)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        debug!("Wrote data file {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "db.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&Database) -> R,
    {
        let db = self.read_db().await?;
        Ok(f(&db))
    }

    /// Run `f` on the loaded document and persist it when `f` reports a change.
    async fn mutate<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Database) -> StoreResult<(R, bool)>,
    {
        let _guard = self.lock.lock().await;
        let mut db = self.load().await?;
        let (result, changed) = f(&mut db)?;
        if changed {
            self.save(&db).await?;
        }
        Ok(result)
    }
}

fn fresh_id<F>(prefix: &str, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    loop {
        let id = uid(prefix);
        if !taken(&id) {
            return id;
        }
    }
}

#[async_trait]
impl ProposalStore for JsonFileStore {
    fn backend_name(&self) -> &'static str {
        "json-file"
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        self.read(|db| db.clients.clone()).await
    }

    async fn get_client(&self, id: &str) -> StoreResult<Option<Client>> {
        self.read(|db| db.clients.iter().find(|c| c.id == id).cloned())
            .await
    }

    async fn create_client(&self, input: NewClient) -> StoreResult<Client> {
        self.mutate(|db| {
            let id = fresh_id("client", |id| db.clients.iter().any(|c| c.id == id));
            let client = Client {
                id,
                company: input.company.unwrap_or_default(),
                location: input.location,
                badan_usaha: input.badan_usaha,
                pic_name: input.pic_name,
                position: input.position,
                created_at: now_iso(),
            };
            db.clients.push(client.clone());
            Ok((client, true))
        })
        .await
    }

    async fn update_client(&self, id: &str, patch: &Value) -> StoreResult<Option<Client>> {
        self.mutate(|db| {
            let Some(existing) = db.clients.iter_mut().find(|c| c.id == id) else {
                return Ok((None, false));
            };
            *existing = apply_patch(existing, patch)?;
            Ok((Some(existing.clone()), true))
        })
        .await
    }

    async fn delete_client(&self, id: &str) -> StoreResult<bool> {
        self.mutate(|db| {
            let removed = db.remove_client_cascade(id);
            Ok((removed, removed))
        })
        .await
    }

    async fn list_projects(&self, client_id: Option<&str>) -> StoreResult<Vec<Project>> {
        self.read(|db| {
            db.projects
                .iter()
                .filter(|p| client_id.map_or(true, |cid| p.client_id == cid))
                .cloned()
                .collect()
        })
        .await
    }

    async fn get_project(&self, id: &str) -> StoreResult<Option<Project>> {
        self.read(|db| db.projects.iter().find(|p| p.id == id).cloned())
            .await
    }

    async fn create_project(&self, input: NewProject) -> StoreResult<Project> {
        self.mutate(|db| {
            let client_id = input.client_id.unwrap_or_default();
            if !db.clients.iter().any(|c| c.id == client_id) {
                return Err(StoreError::MissingReference {
                    entity: "client",
                    id: client_id,
                });
            }

            let id = fresh_id("project", |id| db.projects.iter().any(|p| p.id == id));
            let project = Project {
                id,
                client_id,
                name: input.name.unwrap_or_default(),
                analyst: input.analyst,
                grade: input.grade,
                roles: input.roles,
                created_at: now_iso(),
            };
            db.projects.push(project.clone());
            Ok((project, true))
        })
        .await
    }

    async fn update_project(&self, id: &str, patch: &Value) -> StoreResult<Option<Project>> {
        self.mutate(|db| {
            let Some(index) = db.projects.iter().position(|p| p.id == id) else {
                return Ok((None, false));
            };
            let updated = apply_patch(&db.projects[index], patch)?;
            if !db.clients.iter().any(|c| c.id == updated.client_id) {
                return Err(StoreError::MissingReference {
                    entity: "client",
                    id: updated.client_id,
                });
            }
            db.projects[index] = updated.clone();
            Ok((Some(updated), true))
        })
        .await
    }

    async fn delete_project(&self, id: &str) -> StoreResult<bool> {
        self.mutate(|db| {
            let removed = db.remove_project_cascade(id);
            Ok((removed, removed))
        })
        .await
    }

    async fn list_proposals(&self, project_id: &str) -> StoreResult<Vec<Proposal>> {
        self.read(|db| {
            let mut proposals: Vec<Proposal> = db
                .proposals
                .iter()
                .filter(|p| p.project_id == project_id)
                .cloned()
                .collect();
            proposals.sort_by(|a, b| b.version.cmp(&a.version));
            proposals
        })
        .await
    }

    async fn get_proposal(&self, id: &str) -> StoreResult<Option<Proposal>> {
        self.read(|db| db.proposals.iter().find(|p| p.id == id).cloned())
            .await
    }

    async fn create_proposal(&self, project_id: &str) -> StoreResult<Proposal> {
        self.mutate(|db| {
            if !db.projects.iter().any(|p| p.id == project_id) {
                return Err(StoreError::MissingReference {
                    entity: "project",
                    id: project_id.to_string(),
                });
            }

            let id = fresh_id("proposal", |id| db.proposals.iter().any(|p| p.id == id));
            let proposal = Proposal {
                id,
                project_id: project_id.to_string(),
                version: db.next_version(project_id),
                created_at: now_iso(),
            };
            db.proposals.push(proposal.clone());
            Ok((proposal, true))
        })
        .await
    }

    async fn delete_proposal(&self, id: &str) -> StoreResult<bool> {
        self.mutate(|db| {
            let before = db.proposals.len();
            db.remove_proposals_where(|p| p.id == id);
            let removed = db.proposals.len() != before;
            Ok((removed, removed))
        })
        .await
    }

    async fn get_content(&self, proposal_id: &str) -> StoreResult<Option<Value>> {
        self.read(|db| {
            if !db.proposals.iter().any(|p| p.id == proposal_id) {
                return None;
            }
            Some(
                db.proposal_contents
                    .get(proposal_id)
                    .cloned()
                    .unwrap_or_else(empty_object),
            )
        })
        .await
    }

    async fn put_content(&self, proposal_id: &str, content: Value) -> StoreResult<Option<Value>> {
        self.mutate(|db| {
            if !db.proposals.iter().any(|p| p.id == proposal_id) {
                return Ok((None, false));
            }
            db.proposal_contents
                .insert(proposal_id.to_string(), content.clone());
            Ok((Some(content), true))
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        self.read(|db| {
            db.users
                .iter()
                .find(|u| u.user.email.eq_ignore_ascii_case(email))
                .cloned()
        })
        .await
    }

    async fn create_user(&self, mut user: StoredUser) -> StoreResult<StoredUser> {
        self.mutate(|db| {
            if db
                .users
                .iter()
                .any(|u| u.user.email.eq_ignore_ascii_case(&user.user.email))
            {
                return Err(StoreError::Duplicate("email".to_string()));
            }
            if db.users.iter().any(|u| u.user.id == user.user.id) {
                user.user.id = fresh_id("user", |id| db.users.iter().any(|u| u.user.id == id));
            }
            db.users.push(user.clone());
            Ok((user, true))
        })
        .await
    }
}
