//! Command-line and environment configuration for the server and the client.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::builder::ProposalTemplate;
use crate::client::{ApiClient, ClientConfig, SessionStore, DEFAULT_API_URL};
use crate::store::StorageConfig;

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    #[arg(short, long, env = "PROPOSAL_PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long, env = "PROPOSAL_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// JSON data file, used unless --database is given
    #[arg(long, env = "PROPOSAL_DATA_FILE", default_value = "data/db.json")]
    pub data_file: PathBuf,

    /// SQLite database path; selects the SQL store
    #[arg(long, env = "PROPOSAL_DATABASE")]
    pub database: Option<String>,

    #[arg(long, env = "PROPOSAL_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Forward /api/login and /api/register to this backend
    #[arg(long = "auth-backend", env = "PROPOSAL_AUTH_BACKEND_URL")]
    pub auth_backend: Option<String>,

    /// JSON file replacing the built-in proposal template
    #[arg(long = "template", env = "PROPOSAL_TEMPLATE_FILE")]
    pub template_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn storage(&self) -> StorageConfig {
        match &self.database {
            Some(path) => StorageConfig::Sqlite(path.clone()),
            None => StorageConfig::JsonFile(self.data_file.clone()),
        }
    }

    pub fn load_template(&self) -> Result<ProposalTemplate> {
        let Some(path) = &self.template_file else {
            return Ok(ProposalTemplate::builtin());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading template {}", path.display()))?;
        let template = serde_json::from_str(&raw)
            .with_context(|| format!("parsing template {}", path.display()))?;
        info!("Loaded proposal template from {}", path.display());
        Ok(template)
    }

    #[cfg(feature = "server")]
    pub fn app_settings(&self) -> Result<crate::server::app::AppSettings> {
        Ok(crate::server::app::AppSettings {
            cors_origin: self.cors_origin.clone(),
            auth_backend: self.auth_backend.clone(),
            template: self.load_template()?,
        })
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ClientArgs {
    /// Base URL of the proposal API
    #[arg(long, env = "PROPOSAL_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Where the login session is kept between invocations
    #[arg(
        long,
        env = "PROPOSAL_SESSION_FILE",
        default_value = ".proposal-session.json",
        global = true
    )]
    pub session_file: PathBuf,
}

impl ClientArgs {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::with_base_url(self.api_url.clone())
    }

    pub fn open_client(&self) -> Result<ApiClient> {
        let session = SessionStore::open(&self.session_file)?;
        Ok(ApiClient::new(self.client_config(), session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        server: ServerConfig,
    }

    #[test]
    fn database_flag_selects_sqlite() {
        let cli = TestCli::parse_from(["test", "--database", "proposals.db"]);
        assert_eq!(
            cli.server.storage(),
            StorageConfig::Sqlite("proposals.db".to_string())
        );
    }

    #[test]
    fn data_file_flag_selects_json() {
        let cli = TestCli::parse_from(["test", "--data-file", "/tmp/db.json", "--port", "4000"]);
        assert_eq!(cli.server.port, 4000);
        assert_eq!(
            cli.server.storage(),
            StorageConfig::JsonFile(PathBuf::from("/tmp/db.json"))
        );
    }

    #[test]
    fn template_file_replaces_builtin() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"platforms": ["Web"], "pairRows": [{{"engine": "Laravel", "language": "PHP"}}]}}"#
        )
        .unwrap();

        let cli = TestCli::parse_from([
            "test".to_string(),
            "--template".to_string(),
            file.path().display().to_string(),
        ]);
        let template = cli.server.load_template().unwrap();
        assert_eq!(template.platforms, vec!["Web"]);
        assert_eq!(template.pairs().len(), 1);
        assert!(template.terms_of_payment.is_empty());
    }

    #[test]
    fn missing_template_file_is_an_error() {
        let cli = TestCli::parse_from(["test", "--template", "/nonexistent/template.json"]);
        assert!(cli.server.load_template().is_err());
    }
}
