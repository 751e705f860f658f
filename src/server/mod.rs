pub mod app;
pub mod handlers;

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::config::ServerConfig;
use crate::database::{connection::*, migrations::Migrator};
use crate::store::open_store;
use anyhow::Result;
use sea_orm_migration::prelude::*;
use tracing::info;

pub async fn start_server(config: &ServerConfig) -> Result<()> {
    let store = open_store(&config.storage()).await?;
    info!("Using {} storage", store.backend_name());

    let settings = config.app_settings()?;
    if let Some(backend) = &settings.auth_backend {
        info!("Proxying login and register to {}", backend);
    }
    let app = app::create_app(store, &settings).await?;

    // Log all HTTP routes
    log_routes();

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                          - Health check");
    info!("  /api/clients[/:id]               - Clients");
    info!("  /api/projects[/:id]              - Projects (?clientId= filter)");
    info!("  /api/projects/:id/proposals      - Proposal versions of a project");
    info!("  /api/proposals/:id[/content]     - Proposals and their content");
    info!("  /api/proposal-template           - Builder template");
    info!("  /api/main-modules?q=             - Module catalog search");
    info!("  /api/login, /api/register        - Authentication");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
