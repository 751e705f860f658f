use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PrimaryKeyTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::{apply_patch, ProposalStore};
use crate::common::{empty_object, now_iso, uid};
use crate::database::connection::{establish_connection, get_database_url, setup_database};
use crate::database::entities::{
    clients, projects, proposal_contents, proposals, users, Clients, Projects, ProposalContents,
    Proposals, Users,
};
use crate::errors::{StoreError, StoreResult};
use crate::models::{
    next_version, Client, Grade, NewClient, NewProject, Project, Proposal, Role, StoredUser, User,
};

/// SQLite-backed store. Cascading deletes and version assignment each run in
/// one transaction.
///
/// Writers take `writes` first. SQLite fails a deferred transaction that reads
/// before it writes with SQLITE_BUSY, without waiting, once another pooled
/// connection holds the write lock.
#[derive(Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
    writes: Arc<Mutex<()>>,
}

impl SqlStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Connect to the SQLite file at `path` and run pending migrations.
    pub async fn open(path: &str) -> StoreResult<Self> {
        let database_url = get_database_url(Some(path));
        let db = establish_connection(&database_url).await?;
        setup_database(&db).await?;
        info!("Database migrations completed");
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

async fn unused_id<E, C>(conn: &C, prefix: &str) -> StoreResult<String>
where
    E: EntityTrait,
    String: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    C: ConnectionTrait,
{
    loop {
        let id = uid(prefix);
        if E::find_by_id(id.clone()).one(conn).await?.is_none() {
            return Ok(id);
        }
    }
}

fn client_from_model(model: clients::Model) -> Client {
    Client {
        id: model.id,
        company: model.company,
        location: model.location,
        badan_usaha: model.badan_usaha,
        pic_name: model.pic_name,
        position: model.position,
        created_at: model.created_at,
    }
}

fn client_to_active(client: &Client) -> clients::ActiveModel {
    clients::ActiveModel {
        id: Set(client.id.clone()),
        company: Set(client.company.clone()),
        location: Set(client.location.clone()),
        badan_usaha: Set(client.badan_usaha.clone()),
        pic_name: Set(client.pic_name.clone()),
        position: Set(client.position.clone()),
        created_at: Set(client.created_at),
    }
}

fn project_from_model(model: projects::Model) -> StoreResult<Project> {
    let grade = match model.grade.as_deref() {
        Some(raw) => Some(
            raw.parse::<Grade>()
                .map_err(StoreError::InvalidUpdate)?,
        ),
        None => None,
    };
    let roles: Vec<Role> = serde_json::from_str(&model.roles)?;

    Ok(Project {
        id: model.id,
        client_id: model.client_id,
        name: model.name,
        analyst: model.analyst,
        grade,
        roles,
        created_at: model.created_at,
    })
}

fn project_to_active(project: &Project) -> StoreResult<projects::ActiveModel> {
    Ok(projects::ActiveModel {
        id: Set(project.id.clone()),
        client_id: Set(project.client_id.clone()),
        name: Set(project.name.clone()),
        analyst: Set(project.analyst.clone()),
        grade: Set(project.grade.map(|g| g.to_string())),
        roles: Set(serde_json::to_string(&project.roles)?),
        created_at: Set(project.created_at),
    })
}

fn proposal_from_model(model: proposals::Model) -> Proposal {
    Proposal {
        id: model.id,
        project_id: model.project_id,
        version: model.version,
        created_at: model.created_at,
    }
}

fn user_from_model(model: users::Model) -> StoredUser {
    StoredUser {
        user: User {
            id: model.id,
            name: model.name,
            email: model.email,
            jabatan: model.jabatan,
            created_at: model.created_at,
        },
        password_hash: model.password_hash,
    }
}

/// Delete the proposals matching `project_ids` and their contents.
async fn delete_proposals_of<C>(conn: &C, project_ids: Vec<String>) -> StoreResult<()>
where
    C: ConnectionTrait,
{
    if project_ids.is_empty() {
        return Ok(());
    }

    let proposal_ids: Vec<String> = Proposals::find()
        .filter(proposals::Column::ProjectId.is_in(project_ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    if !proposal_ids.is_empty() {
        ProposalContents::delete_many()
            .filter(proposal_contents::Column::ProposalId.is_in(proposal_ids))
            .exec(conn)
            .await?;
    }

    Proposals::delete_many()
        .filter(proposals::Column::ProjectId.is_in(project_ids))
        .exec(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl ProposalStore for SqlStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        let models = Clients::find()
            .order_by_asc(clients::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(client_from_model).collect())
    }

    async fn get_client(&self, id: &str) -> StoreResult<Option<Client>> {
        let model = Clients::find_by_id(id.to_string()).one(&self.db).await?;
        Ok(model.map(client_from_model))
    }

    async fn create_client(&self, input: NewClient) -> StoreResult<Client> {
        let _guard = self.writes.lock().await;
        let client = Client {
            id: unused_id::<Clients, _>(&self.db, "client").await?,
            company: input.company.unwrap_or_default(),
            location: input.location,
            badan_usaha: input.badan_usaha,
            pic_name: input.pic_name,
            position: input.position,
            created_at: now_iso(),
        };
        let model = client_to_active(&client).insert(&self.db).await?;
        Ok(client_from_model(model))
    }

    async fn update_client(&self, id: &str, patch: &Value) -> StoreResult<Option<Client>> {
        let _guard = self.writes.lock().await;
        let Some(existing) = self.get_client(id).await? else {
            return Ok(None);
        };
        let updated = apply_patch(&existing, patch)?;
        let model = client_to_active(&updated).update(&self.db).await?;
        Ok(Some(client_from_model(model)))
    }

    async fn delete_client(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.writes.lock().await;
        let txn = self.db.begin().await?;

        if Clients::find_by_id(id.to_string()).one(&txn).await?.is_none() {
            return Ok(false);
        }

        let project_ids: Vec<String> = Projects::find()
            .filter(projects::Column::ClientId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        delete_proposals_of(&txn, project_ids).await?;
        Projects::delete_many()
            .filter(projects::Column::ClientId.eq(id))
            .exec(&txn)
            .await?;
        Clients::delete_by_id(id.to_string()).exec(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn list_projects(&self, client_id: Option<&str>) -> StoreResult<Vec<Project>> {
        let mut query = Projects::find().order_by_asc(projects::Column::CreatedAt);
        if let Some(client_id) = client_id {
            query = query.filter(projects::Column::ClientId.eq(client_id));
        }
        query
            .all(&self.db)
            .await?
            .into_iter()
            .map(project_from_model)
            .collect()
    }

    async fn get_project(&self, id: &str) -> StoreResult<Option<Project>> {
        Projects::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(project_from_model)
            .transpose()
    }

    async fn create_project(&self, input: NewProject) -> StoreResult<Project> {
        let _guard = self.writes.lock().await;
        let client_id = input.client_id.unwrap_or_default();
        if self.get_client(&client_id).await?.is_none() {
            return Err(StoreError::MissingReference {
                entity: "client",
                id: client_id,
            });
        }

        let project = Project {
            id: unused_id::<Projects, _>(&self.db, "project").await?,
            client_id,
            name: input.name.unwrap_or_default(),
            analyst: input.analyst,
            grade: input.grade,
            roles: input.roles,
            created_at: now_iso(),
        };
        let model = project_to_active(&project)?.insert(&self.db).await?;
        project_from_model(model)
    }

    async fn update_project(&self, id: &str, patch: &Value) -> StoreResult<Option<Project>> {
        let _guard = self.writes.lock().await;
        let Some(existing) = self.get_project(id).await? else {
            return Ok(None);
        };
        let updated = apply_patch(&existing, patch)?;
        if self.get_client(&updated.client_id).await?.is_none() {
            return Err(StoreError::MissingReference {
                entity: "client",
                id: updated.client_id,
            });
        }
        let model = project_to_active(&updated)?.update(&self.db).await?;
        Ok(Some(project_from_model(model)?))
    }

    async fn delete_project(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.writes.lock().await;
        let txn = self.db.begin().await?;

        if Projects::find_by_id(id.to_string()).one(&txn).await?.is_none() {
            return Ok(false);
        }

        delete_proposals_of(&txn, vec![id.to_string()]).await?;
        Projects::delete_by_id(id.to_string()).exec(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn list_proposals(&self, project_id: &str) -> StoreResult<Vec<Proposal>> {
        let models = Proposals::find()
            .filter(proposals::Column::ProjectId.eq(project_id))
            .order_by_desc(proposals::Column::Version)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(proposal_from_model).collect())
    }

    async fn get_proposal(&self, id: &str) -> StoreResult<Option<Proposal>> {
        let model = Proposals::find_by_id(id.to_string()).one(&self.db).await?;
        Ok(model.map(proposal_from_model))
    }

    async fn create_proposal(&self, project_id: &str) -> StoreResult<Proposal> {
        let _guard = self.writes.lock().await;
        let txn = self.db.begin().await?;

        if Projects::find_by_id(project_id.to_string())
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(StoreError::MissingReference {
                entity: "project",
                id: project_id.to_string(),
            });
        }

        let versions = Proposals::find()
            .filter(proposals::Column::ProjectId.eq(project_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|p| p.version);

        let model = proposals::ActiveModel {
            id: Set(unused_id::<Proposals, _>(&txn, "proposal").await?),
            project_id: Set(project_id.to_string()),
            version: Set(next_version(versions)),
            created_at: Set(now_iso()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(proposal_from_model(model))
    }

    async fn delete_proposal(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.writes.lock().await;
        let txn = self.db.begin().await?;

        ProposalContents::delete_by_id(id.to_string())
            .exec(&txn)
            .await?;
        let result = Proposals::delete_by_id(id.to_string()).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn get_content(&self, proposal_id: &str) -> StoreResult<Option<Value>> {
        if self.get_proposal(proposal_id).await?.is_none() {
            return Ok(None);
        }

        match ProposalContents::find_by_id(proposal_id.to_string())
            .one(&self.db)
            .await?
        {
            Some(model) => Ok(Some(serde_json::from_str(&model.content)?)),
            None => Ok(Some(empty_object())),
        }
    }

    async fn put_content(&self, proposal_id: &str, content: Value) -> StoreResult<Option<Value>> {
        let _guard = self.writes.lock().await;
        let txn = self.db.begin().await?;

        if Proposals::find_by_id(proposal_id.to_string())
            .one(&txn)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let active = proposal_contents::ActiveModel {
            proposal_id: Set(proposal_id.to_string()),
            content: Set(serde_json::to_string(&content)?),
            updated_at: Set(now_iso()),
        };

        let exists = ProposalContents::find_by_id(proposal_id.to_string())
            .one(&txn)
            .await?
            .is_some();
        if exists {
            active.update(&txn).await?;
        } else {
            active.insert(&txn).await?;
        }

        txn.commit().await?;
        Ok(Some(content))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        let model = Users::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(&self.db)
            .await?;
        Ok(model.map(user_from_model))
    }

    async fn create_user(&self, user: StoredUser) -> StoreResult<StoredUser> {
        let _guard = self.writes.lock().await;
        let email = user.user.email.to_lowercase();
        if self.find_user_by_email(&email).await?.is_some() {
            return Err(StoreError::Duplicate("email".to_string()));
        }

        let id = if Users::find_by_id(user.user.id.clone())
            .one(&self.db)
            .await?
            .is_some()
        {
            unused_id::<Users, _>(&self.db, "user").await?
        } else {
            user.user.id.clone()
        };

        let model = users::ActiveModel {
            id: Set(id),
            name: Set(user.user.name),
            email: Set(email),
            jabatan: Set(user.user.jabatan),
            password_hash: Set(user.password_hash),
            created_at: Set(user.user.created_at),
        }
        .insert(&self.db)
        .await?;
        Ok(user_from_model(model))
    }
}
