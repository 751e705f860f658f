//! Records exchanged over the REST surface and persisted by the stores.
//!
//! Every record serialises with camelCase keys so that the JSON data file and
//! the API bodies share one shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Keys a shallow-merge update may never overwrite.
pub const IMMUTABLE_KEYS: &[&str] = &["id", "createdAt"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(alias = "nama")]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub jabatan: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A user together with the credential the local auth mode checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(flatten)]
    pub user: User,
    pub password_hash: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub badan_usaha: Option<String>,
    #[serde(default)]
    pub pic_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub badan_usaha: Option<String>,
    #[serde(default)]
    pub pic_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grade = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        };
        f.write_str(grade)
    }
}

impl std::str::FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            other => Err(format!("unknown grade '{}', expected A, B or C", other)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub client_id: String,
    pub name: String,
    #[serde(default)]
    pub analyst: Option<String>,
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub analyst: Option<String>,
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: String,
    pub project_id: String,
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

/// Shape of the flat data file. Missing collections deserialise as empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Database {
    pub users: Vec<StoredUser>,
    pub clients: Vec<Client>,
    pub projects: Vec<Project>,
    pub proposals: Vec<Proposal>,
    pub proposal_contents: BTreeMap<String, Value>,
}

impl Database {
    /// Next version number for `project_id`: highest existing version + 1.
    pub fn next_version(&self, project_id: &str) -> i32 {
        next_version(
            self.proposals
                .iter()
                .filter(|p| p.project_id == project_id)
                .map(|p| p.version),
        )
    }

    /// Remove a project with its proposals and their contents.
    /// Returns false when no project had that id.
    pub fn remove_project_cascade(&mut self, project_id: &str) -> bool {
        let before = self.projects.len();
        self.projects.retain(|p| p.id != project_id);
        if self.projects.len() == before {
            return false;
        }
        self.remove_proposals_where(|p| p.project_id == project_id);
        true
    }

    /// Remove a client with its projects, their proposals and contents.
    pub fn remove_client_cascade(&mut self, client_id: &str) -> bool {
        let before = self.clients.len();
        self.clients.retain(|c| c.id != client_id);
        if self.clients.len() == before {
            return false;
        }

        let project_ids: Vec<String> = self
            .projects
            .iter()
            .filter(|p| p.client_id == client_id)
            .map(|p| p.id.clone())
            .collect();
        self.projects.retain(|p| p.client_id != client_id);
        self.remove_proposals_where(|p| project_ids.contains(&p.project_id));
        true
    }

    pub fn remove_proposals_where<F>(&mut self, predicate: F)
    where
        F: Fn(&Proposal) -> bool,
    {
        let (removed, kept): (Vec<Proposal>, Vec<Proposal>) =
            std::mem::take(&mut self.proposals)
                .into_iter()
                .partition(|p| predicate(p));
        self.proposals = kept;
        for proposal in removed {
            self.proposal_contents.remove(&proposal.id);
        }
    }
}

pub fn next_version<I>(versions: I) -> i32
where
    I: IntoIterator<Item = i32>,
{
    versions.into_iter().max().unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(id: &str) -> Client {
        Client {
            id: id.to_string(),
            company: format!("{} Corp", id),
            location: None,
            badan_usaha: Some("PT".to_string()),
            pic_name: None,
            position: None,
            created_at: Utc::now(),
        }
    }

    fn project(id: &str, client_id: &str) -> Project {
        Project {
            id: id.to_string(),
            client_id: client_id.to_string(),
            name: id.to_string(),
            analyst: None,
            grade: Some(Grade::B),
            roles: vec![],
            created_at: Utc::now(),
        }
    }

    fn proposal(id: &str, project_id: &str, version: i32) -> Proposal {
        Proposal {
            id: id.to_string(),
            project_id: project_id.to_string(),
            version,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn next_version_starts_at_one() {
        let db = Database::default();
        assert_eq!(db.next_version("project-a"), 1);
    }

    #[test]
    fn next_version_uses_max_not_count() {
        let mut db = Database::default();
        db.proposals.push(proposal("proposal-1", "project-a", 1));
        db.proposals.push(proposal("proposal-4", "project-a", 4));
        db.proposals.push(proposal("proposal-9", "project-b", 9));
        assert_eq!(db.next_version("project-a"), 5);
    }

    #[test]
    fn client_cascade_removes_projects_proposals_and_contents() {
        let mut db = Database::default();
        db.clients.push(client("client-a"));
        db.clients.push(client("client-b"));
        db.projects.push(project("project-a", "client-a"));
        db.projects.push(project("project-b", "client-b"));
        db.proposals.push(proposal("proposal-a", "project-a", 1));
        db.proposals.push(proposal("proposal-b", "project-b", 1));
        db.proposal_contents
            .insert("proposal-a".to_string(), json!({"termsAndConditions": []}));

        assert!(db.remove_client_cascade("client-a"));

        assert_eq!(db.clients.len(), 1);
        assert_eq!(db.projects.len(), 1);
        assert_eq!(db.projects[0].id, "project-b");
        assert_eq!(db.proposals.len(), 1);
        assert_eq!(db.proposals[0].id, "proposal-b");
        assert!(db.proposal_contents.is_empty());
    }

    #[test]
    fn cascade_on_unknown_id_reports_false() {
        let mut db = Database::default();
        assert!(!db.remove_client_cascade("client-missing"));
        assert!(!db.remove_project_cascade("project-missing"));
    }

    #[test]
    fn user_accepts_nama_alias() {
        let user: User = serde_json::from_value(json!({
            "id": "user-abc123",
            "nama": "Sari",
            "email": "sari@example.com",
            "createdAt": "2024-05-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(user.name, "Sari");
        assert_eq!(user.jabatan, None);
    }

    #[test]
    fn grade_parses_case_insensitively() {
        assert_eq!("b".parse::<Grade>().unwrap(), Grade::B);
        assert!("Z".parse::<Grade>().is_err());
    }
}
