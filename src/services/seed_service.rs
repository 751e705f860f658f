use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::builder::{FinancialSection, LineItem, ProposalContent, ProposalTemplate};
use crate::catalog;
use crate::models::{Grade, NewClient, NewProject, Role};
use crate::store::ProposalStore;

const EXAMPLE_COMPANY: &str = "PT Contoh Sejahtera";

/// Create one example client with a project and a first proposal.
/// Does nothing when the example client already exists.
pub async fn create_example_data(store: &dyn ProposalStore) -> Result<()> {
    let existing = store.list_clients().await?;
    if existing.iter().any(|c| c.company == EXAMPLE_COMPANY) {
        info!("Example client already exists, skipping seed data creation");
        return Ok(());
    }

    info!("Creating example client: {}", EXAMPLE_COMPANY);
    let client = store
        .create_client(NewClient {
            company: Some(EXAMPLE_COMPANY.to_string()),
            location: Some("Jakarta".to_string()),
            badan_usaha: Some("PT".to_string()),
            pic_name: Some("Budi Santoso".to_string()),
            position: Some("IT Manager".to_string()),
        })
        .await?;

    let roles = vec![
        Role {
            name: "Sales".to_string(),
            platforms: vec!["Android".to_string(), "iOS".to_string()],
        },
        Role {
            name: "Admin".to_string(),
            platforms: vec!["Web".to_string()],
        },
    ];
    let project = store
        .create_project(NewProject {
            client_id: Some(client.id.clone()),
            name: Some("Sales Force Automation".to_string()),
            analyst: Some("Dewi".to_string()),
            grade: Some(Grade::B),
            roles: roles.clone(),
        })
        .await?;

    let proposal = store.create_proposal(&project.id).await?;

    let mut content = ProposalContent::default_for(&roles, &ProposalTemplate::builtin());
    if let Some(sales) = content.features_by_role.get_mut("Sales") {
        sales.extend(catalog::search_modules(Some("account")));
        sales.extend(catalog::search_modules(Some("orders")));
    }
    if let Some(admin) = content.features_by_role.get_mut("Admin") {
        admin.extend(catalog::search_modules(Some("reports")));
    }
    content.financial_breakdown = vec![FinancialSection {
        title: "Development".to_string(),
        items: vec![
            LineItem {
                description: "Mobile application".to_string(),
                quantity: 1.0,
                price: 150_000_000.0,
            },
            LineItem {
                description: "Admin dashboard".to_string(),
                quantity: 1.0,
                price: 75_000_000.0,
            },
        ],
    }];
    content.apply_payment_totals();
    content
        .extra
        .insert("notes".to_string(), json!("Example proposal created by seed"));

    store.put_content(&proposal.id, content.to_value()).await?;

    info!(
        "Created example project {} with proposal {} (v{})",
        project.id, proposal.id, proposal.version
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("db.json"));

        create_example_data(&store).await.unwrap();
        create_example_data(&store).await.unwrap();

        let db = store.read_db().await.unwrap();
        assert_eq!(db.clients.len(), 1);
        assert_eq!(db.projects.len(), 1);
        assert_eq!(db.proposals.len(), 1);
        let content = &db.proposal_contents[&db.proposals[0].id];
        assert_eq!(content["featuresByRole"]["Sales"][0]["name"], "Account");
    }
}
