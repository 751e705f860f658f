//! Client-side subcommands: each one drives the API client and prints the
//! result as pretty JSON or a short summary.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::builder::{has_legacy_features, load_content, open_draft, ProposalContent};
use crate::client::{ApiClient, RegisterRequest};
use crate::models::{Grade, NewClient, NewProject, Role};

#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    List,
    Show {
        id: String,
    },
    Create {
        #[clap(long)]
        company: String,
        #[clap(long)]
        location: Option<String>,
        #[clap(long)]
        badan_usaha: Option<String>,
        #[clap(long)]
        pic_name: Option<String>,
        #[clap(long)]
        position: Option<String>,
    },
    /// Shallow-merge `key=value` pairs into a client
    Update {
        id: String,
        #[clap(long = "set", value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    List {
        #[clap(long)]
        client_id: Option<String>,
    },
    Show {
        id: String,
    },
    Create {
        #[clap(long)]
        client_id: String,
        #[clap(long)]
        name: String,
        #[clap(long)]
        analyst: Option<String>,
        #[clap(long)]
        grade: Option<Grade>,
        /// Role as `Name` or `Name:Platform,Platform`; repeatable
        #[clap(long = "role", value_name = "ROLE")]
        roles: Vec<String>,
    },
    Update {
        id: String,
        #[clap(long = "set", value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProposalCommands {
    List { project_id: String },
    Create { project_id: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ContentCommands {
    /// Print the merged content with mandays and price totals
    Show {
        proposal_id: String,
        /// Print the stored blob without merging
        #[clap(long)]
        raw: bool,
    },
    /// Rewrite legacy featureSales/featureAdmin keys into featuresByRole
    Migrate { proposal_id: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Turn `key=value` arguments into a patch object. Values that parse as JSON
/// keep their type; anything else is a string.
pub fn parse_assignments(assignments: &[String]) -> Result<Value> {
    let mut patch = Map::new();
    for assignment in assignments {
        let Some((key, raw)) = assignment.split_once('=') else {
            bail!("expected KEY=VALUE, got '{}'", assignment);
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        patch.insert(key.trim().to_string(), value);
    }
    Ok(Value::Object(patch))
}

/// `Sales:Android,iOS` → role Sales on two platforms.
pub fn parse_role(raw: &str) -> Role {
    let (name, platforms) = raw.split_once(':').unwrap_or((raw, ""));
    Role {
        name: name.trim().to_string(),
        platforms: platforms
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<()> {
    let login = api.login_user(email, password).await?;
    let label = api
        .session()
        .current()
        .map(|s| s.user_label())
        .unwrap_or_else(|| email.to_string());
    println!("Logged in as {}", label);
    info!("Token stored ({} chars)", login.token.len());
    Ok(())
}

pub async fn register(api: &ApiClient, request: RegisterRequest) -> Result<()> {
    let response = api.register_user(&request).await?;
    println!(
        "{}",
        response
            .message
            .unwrap_or_else(|| format!("Registered {}", request.email))
    );
    Ok(())
}

pub fn logout(api: &ApiClient) -> Result<()> {
    api.logout()?;
    println!("Logged out");
    Ok(())
}

pub fn whoami(api: &ApiClient) -> Result<()> {
    match api.session().current() {
        Some(session) => println!("{}", session.user_label()),
        None => println!("Not logged in"),
    }
    Ok(())
}

pub async fn clients(api: &ApiClient, command: ClientCommands) -> Result<()> {
    match command {
        ClientCommands::List => print_json(&api.get_clients().await?),
        ClientCommands::Show { id } => print_json(&api.get_client(&id).await?),
        ClientCommands::Create {
            company,
            location,
            badan_usaha,
            pic_name,
            position,
        } => {
            let client = api
                .create_client(&NewClient {
                    company: Some(company),
                    location,
                    badan_usaha,
                    pic_name,
                    position,
                })
                .await?;
            print_json(&client)
        }
        ClientCommands::Update { id, set } => {
            print_json(&api.update_client(&id, &parse_assignments(&set)?).await?)
        }
        ClientCommands::Delete { id } => {
            api.delete_client(&id).await?;
            println!("Deleted client {}", id);
            Ok(())
        }
    }
}

pub async fn projects(api: &ApiClient, command: ProjectCommands) -> Result<()> {
    match command {
        ProjectCommands::List { client_id } => {
            print_json(&api.get_projects(client_id.as_deref()).await?)
        }
        ProjectCommands::Show { id } => print_json(&api.get_project(&id).await?),
        ProjectCommands::Create {
            client_id,
            name,
            analyst,
            grade,
            roles,
        } => {
            let project = api
                .create_project(&NewProject {
                    client_id: Some(client_id),
                    name: Some(name),
                    analyst,
                    grade,
                    roles: roles.iter().map(|r| parse_role(r)).collect(),
                })
                .await?;
            print_json(&project)
        }
        ProjectCommands::Update { id, set } => {
            print_json(&api.update_project(&id, &parse_assignments(&set)?).await?)
        }
        ProjectCommands::Delete { id } => {
            api.delete_project(&id).await?;
            println!("Deleted project {}", id);
            Ok(())
        }
    }
}

pub async fn proposals(api: &ApiClient, command: ProposalCommands) -> Result<()> {
    match command {
        ProposalCommands::List { project_id } => print_json(&api.get_proposals(&project_id).await?),
        ProposalCommands::Create { project_id } => {
            let proposal = api.create_proposal(&project_id).await?;
            println!("Created {} (version {})", proposal.id, proposal.version);
            Ok(())
        }
        ProposalCommands::Delete { id } => {
            api.delete_proposal(&id).await?;
            println!("Deleted proposal {}", id);
            Ok(())
        }
    }
}

fn print_summary(content: &ProposalContent) {
    println!("Roles:");
    for role in content.features_by_role.keys() {
        println!("  {:<20} {:>8} mandays", role, content.role_mandays(role));
    }
    println!("  {:<20} {:>8} mandays", "Total", content.total_mandays());

    println!("Financial breakdown:");
    for section in &content.financial_breakdown {
        println!("  {:<20} {:>16.2}", section.title, section.total());
    }
    println!("  {:<20} {:>16.2}", "Grand total", content.financial_total());

    println!("Terms of payment:");
    for term in &content.terms_of_payment {
        println!(
            "  {:>5}%  {:<30} {:>16.2}",
            term.percentage, term.description, term.total
        );
    }
}

pub async fn content(api: &ApiClient, command: ContentCommands) -> Result<()> {
    match command {
        ContentCommands::Show { proposal_id, raw: true } => {
            print_json(&api.get_proposal_content(&proposal_id).await?)
        }
        ContentCommands::Show { proposal_id, raw: false } => {
            let mut draft = open_draft(api, &proposal_id).await?;
            draft.content_mut().apply_payment_totals();
            print_json(draft.content())?;
            print_summary(draft.content());
            Ok(())
        }
        ContentCommands::Migrate { proposal_id } => {
            let saved = api.get_proposal_content(&proposal_id).await?;
            if !has_legacy_features(&saved) {
                println!("Proposal {} has no legacy feature lists", proposal_id);
                return Ok(());
            }

            let proposal = api.get_proposal(&proposal_id).await?;
            let project = api.get_project(&proposal.project_id).await?;
            let template = api.get_proposal_template().await?;
            let content = load_content(saved, &template, &project.roles)
                .with_context(|| format!("migrating proposal {}", proposal_id))?;

            api.save_proposal_content(&proposal_id, &content.to_value())
                .await?;
            println!("Migrated proposal {}", proposal_id);
            Ok(())
        }
    }
}

pub async fn modules(api: &ApiClient, query: Option<&str>) -> Result<()> {
    for module in api.search_main_modules(query).await? {
        println!("{} ({} mandays)", module.name, module.mandays());
        for sub in &module.sub_modules {
            println!("  {}", sub.name);
            for feature in &sub.features {
                println!("    - {} ({})", feature.name, feature.mandays);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: ProjectCommands,
    }

    #[test]
    fn grade_flag_parses_case_insensitively() {
        let cli = TestCli::try_parse_from([
            "test", "create", "--client-id", "client-abc123", "--name", "Sales App", "--grade", "b",
        ])
        .unwrap();
        match cli.command {
            ProjectCommands::Create { grade, .. } => assert_eq!(grade, Some(Grade::B)),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(TestCli::try_parse_from([
            "test", "create", "--client-id", "client-abc123", "--name", "Sales App", "--grade", "Z",
        ])
        .is_err());
    }

    #[test]
    fn assignments_keep_json_types() {
        let patch = parse_assignments(&[
            "name=Mobile banking v2".to_string(),
            "grade=\"A\"".to_string(),
            "roles=[]".to_string(),
        ])
        .unwrap();
        assert_eq!(
            patch,
            json!({"name": "Mobile banking v2", "grade": "A", "roles": []})
        );
    }

    #[test]
    fn assignment_without_equals_is_rejected() {
        assert!(parse_assignments(&["name".to_string()]).is_err());
    }

    #[test]
    fn role_with_and_without_platforms() {
        assert_eq!(
            parse_role("Sales:Android, iOS"),
            Role {
                name: "Sales".to_string(),
                platforms: vec!["Android".to_string(), "iOS".to_string()],
            }
        );
        assert!(parse_role("Admin").platforms.is_empty());
    }
}
