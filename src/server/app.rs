use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{auth, clients, health, main_modules, projects, proposals, template};
use crate::builder::ProposalTemplate;
use crate::services::AuthService;
use crate::store::ProposalStore;

/// Everything `create_app` needs besides the store.
#[derive(Clone, Debug)]
pub struct AppSettings {
    pub cors_origin: Option<String>,
    pub auth_backend: Option<String>,
    pub template: ProposalTemplate,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            cors_origin: None,
            auth_backend: None,
            template: ProposalTemplate::builtin(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProposalStore>,
    pub template: Arc<ProposalTemplate>,
    pub auth: AuthService,
}

pub async fn create_app(store: Arc<dyn ProposalStore>, settings: &AppSettings) -> Result<Router> {
    let state = AppState {
        auth: AuthService::new(store.clone(), settings.auth_backend.clone()),
        template: Arc::new(settings.template.clone()),
        store,
    };

    let cors = match settings.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("invalid CORS origin: {}", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        // Health check endpoint
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Client routes
        .route("/clients", get(clients::list_clients).post(clients::create_client))
        .route(
            "/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        // Project routes
        .route("/projects", get(projects::list_projects).post(projects::create_project))
        .route(
            "/projects/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        // Proposal routes
        .route(
            "/projects/:id/proposals",
            get(proposals::list_proposals).post(proposals::create_proposal),
        )
        .route(
            "/proposals/:id",
            get(proposals::get_proposal).delete(proposals::delete_proposal),
        )
        .route(
            "/proposals/:id/content",
            get(proposals::get_content).put(proposals::put_content),
        )
        // Builder support
        .route("/proposal-template", get(template::get_template))
        .route("/main-modules", get(main_modules::search_main_modules))
        // Auth
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
}
