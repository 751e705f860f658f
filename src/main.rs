use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use proposal_manager::client::RegisterRequest;
use proposal_manager::commands::{
    self, ClientCommands, ContentCommands, ProjectCommands, ProposalCommands,
};
use proposal_manager::config::{ClientArgs, ServerConfig};
use proposal_manager::server;
use proposal_manager::services::create_example_data;
use proposal_manager::store::open_store;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(flatten)]
    client: ClientArgs,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[clap(flatten)]
        config: ServerConfig,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    Login {
        #[clap(long)]
        email: String,
        #[clap(long, env = "PROPOSAL_PASSWORD")]
        password: String,
    },
    Register {
        #[clap(long, alias = "nama")]
        name: String,
        #[clap(long)]
        email: String,
        #[clap(long, env = "PROPOSAL_PASSWORD")]
        password: String,
        #[clap(long)]
        jabatan: Option<String>,
    },
    Logout,
    Whoami,
    Clients {
        #[clap(subcommand)]
        command: ClientCommands,
    },
    Projects {
        #[clap(subcommand)]
        command: ProjectCommands,
    },
    Proposals {
        #[clap(subcommand)]
        command: ProposalCommands,
    },
    Content {
        #[clap(subcommand)]
        command: ContentCommands,
    },
    /// Search the main-module catalog
    Modules { query: Option<String> },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        #[clap(short, long, default_value = "proposals.db")]
        database: String,
    },
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long, default_value = "proposals.db")]
        database: String,
    },
    /// Insert an example client, project and proposal
    Seed {
        #[clap(flatten)]
        config: ServerConfig,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Commands::Serve { config } => {
            info!("Starting server on {}:{}", config.host, config.port);
            server::start_server(&config).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init { database } => {
                info!("Initializing database: {}", database);
                server::migrate_database(&database, server::MigrateDirection::Up).await?;
            }
            DbCommands::Migrate {
                direction,
                database,
            } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(&database, direction).await?;
            }
            DbCommands::Seed { config } => {
                let store = open_store(&config.storage()).await?;
                create_example_data(store.as_ref()).await?;
            }
        },
        command => run_client_command(&args.client, command).await?,
    }

    Ok(())
}

async fn run_client_command(client: &ClientArgs, command: Commands) -> Result<()> {
    let api = client.open_client()?;

    match command {
        Commands::Login { email, password } => commands::login(&api, &email, &password).await,
        Commands::Register {
            name,
            email,
            password,
            jabatan,
        } => {
            commands::register(
                &api,
                RegisterRequest {
                    name,
                    email,
                    password,
                    jabatan,
                },
            )
            .await
        }
        Commands::Logout => commands::logout(&api),
        Commands::Whoami => commands::whoami(&api),
        Commands::Clients { command } => commands::clients(&api, command).await,
        Commands::Projects { command } => commands::projects(&api, command).await,
        Commands::Proposals { command } => commands::proposals(&api, command).await,
        Commands::Content { command } => commands::content(&api, command).await,
        Commands::Modules { query } => commands::modules(&api, query.as_deref()).await,
        Commands::Serve { .. } | Commands::Db { .. } => Ok(()),
    }
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlx=warn,{}", log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
