//! API client tests
//!
//! Retry, timeout and error handling against small in-process axum servers,
//! plus a full round trip through the real router.

use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use proposal_manager::builder::open_draft;
use proposal_manager::client::{ApiClient, ClientConfig, SessionStore};
use proposal_manager::errors::ClientError;
use proposal_manager::models::{NewClient, NewProject, Role};
use proposal_manager::server::app::{create_app, AppSettings};
use proposal_manager::store::{JsonFileStore, ProposalStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Serve `app` on an ephemeral port and return its base URL
async fn spawn_server(app: Router) -> Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}", address))
}

fn fast_client(base_url: String) -> ApiClient {
    ApiClient::new(
        ClientConfig {
            base_url,
            timeout: Duration::from_millis(500),
            max_retries: 3,
            retry_delay: Duration::from_millis(10),
        },
        SessionStore::in_memory(),
    )
}

/// Router whose `/api/clients` fails with 500 for the first `failures` calls
fn flaky_router(hits: Arc<AtomicUsize>, failures: usize) -> Router {
    Router::new()
        .route(
            "/api/clients",
            get(
                move |State(hits): State<Arc<AtomicUsize>>| async move {
                    let attempt = hits.fetch_add(1, Ordering::SeqCst);
                    if attempt < failures {
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({"error": "database unavailable"})),
                        )
                    } else {
                        (StatusCode::OK, Json(json!([])))
                    }
                },
            ),
        )
        .with_state(hits)
}

#[tokio::test]
async fn test_retries_server_errors_until_success() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let base_url = spawn_server(flaky_router(hits.clone(), 2)).await?;

    let clients = fast_client(base_url).get_clients().await?;

    assert!(clients.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn test_gives_up_after_three_retries() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let base_url = spawn_server(flaky_router(hits.clone(), usize::MAX)).await?;

    let err = fast_client(base_url).get_clients().await.unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 4);
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected an API error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_retry_delay_grows_with_each_attempt() -> Result<()> {
    let arrivals: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/api/clients",
            get(|State(arrivals): State<Arc<Mutex<Vec<Instant>>>>| async move {
                if let Ok(mut arrivals) = arrivals.lock() {
                    arrivals.push(Instant::now());
                }
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"error": "try later"})),
                )
            }),
        )
        .with_state(arrivals.clone());
    let base_url = spawn_server(app).await?;

    let retry_delay = Duration::from_millis(50);
    let api = ApiClient::new(
        ClientConfig {
            base_url,
            timeout: Duration::from_millis(500),
            max_retries: 3,
            retry_delay,
        },
        SessionStore::in_memory(),
    );
    let err = api.get_clients().await.unwrap_err();
    assert_eq!(err.status(), Some(503));

    let arrivals = arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 4);
    for (attempt, pair) in arrivals.windows(2).enumerate() {
        let gap = pair[1] - pair[0];
        let expected = retry_delay * (attempt as u32 + 1);
        assert!(gap >= expected, "retry {} came after {:?}", attempt + 1, gap);
    }
    Ok(())
}

#[tokio::test]
async fn test_client_errors_are_not_retried() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/api/clients/:id",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                (StatusCode::NOT_FOUND, Json(json!({"error": "client not found"})))
            }),
        )
        .with_state(hits.clone());
    let base_url = spawn_server(app).await?;

    let err = fast_client(base_url)
        .get_client("client-nope00")
        .await
        .unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "client not found");
    Ok(())
}

#[tokio::test]
async fn test_timeout_is_not_retried() -> Result<()> {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/api/clients",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!([]))
            }),
        )
        .with_state(hits.clone());
    let base_url = spawn_server(app).await?;

    let err = fast_client(base_url).get_clients().await.unwrap_err();

    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(err.to_string().starts_with("Request timeout"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_network_errors_surface_after_retries() -> Result<()> {
    // bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    drop(listener);

    let err = fast_client(format!("http://{}", address))
        .get_clients()
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Network(_)));
    Ok(())
}

fn auth_router() -> Router {
    Router::new()
        .route(
            "/api/login",
            post(|Json(body): Json<Value>| async move {
                if body["password"] == "rahasia123" {
                    (
                        StatusCode::OK,
                        Json(json!({
                            "success": true,
                            "message": "Login successful",
                            "data": {
                                "user": {"id": 7, "nama": "Dewi", "email": body["email"]},
                                "token": "token-abc",
                                "token_type": "Bearer"
                            }
                        })),
                    )
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"success": false, "message": "Invalid credentials"})),
                    )
                }
            }),
        )
        .route(
            "/api/clients",
            get(|headers: HeaderMap| async move {
                let authorization = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if authorization == "Bearer token-abc" {
                    (StatusCode::OK, Json(json!([])))
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({"error": "missing token"})))
                }
            }),
        )
}

#[tokio::test]
async fn test_login_stores_token_for_later_calls() -> Result<()> {
    let base_url = spawn_server(auth_router()).await?;
    let dir = TempDir::new()?;
    let session_path = dir.path().join("session.json");
    let api = ApiClient::new(
        ClientConfig::with_base_url(base_url.clone()),
        SessionStore::open(&session_path)?,
    );

    let login = api.login_user("dewi@example.com", "rahasia123").await?;
    assert_eq!(login.token, "token-abc");
    assert_eq!(login.user["nama"], "Dewi");

    // the token is read at call time
    assert!(api.get_clients().await?.is_empty());

    // and a second client sharing the session file is logged in too
    let other = ApiClient::new(
        ClientConfig::with_base_url(base_url),
        SessionStore::open(&session_path)?,
    );
    assert_eq!(other.session().current().unwrap().user_label(), "Dewi <dewi@example.com>");

    api.logout()?;
    let err = api.get_clients().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "missing token");
    Ok(())
}

#[tokio::test]
async fn test_login_failure_carries_server_message() -> Result<()> {
    let base_url = spawn_server(auth_router()).await?;
    let api = fast_client(base_url);

    let err = api
        .login_user("dewi@example.com", "wrong")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(err.status(), Some(401));
    assert!(api.session().token().is_none());
    Ok(())
}

#[tokio::test]
async fn test_round_trip_through_the_real_router() -> Result<()> {
    let dir = TempDir::new()?;
    let store: Arc<dyn ProposalStore> = Arc::new(JsonFileStore::new(dir.path().join("db.json")));
    let base_url = spawn_server(create_app(store, &AppSettings::default()).await?).await?;
    let api = fast_client(base_url);

    let client = api
        .create_client(&NewClient {
            company: Some("PT Maju Jaya".to_string()),
            ..Default::default()
        })
        .await?;
    let project = api
        .create_project(&NewProject {
            client_id: Some(client.id.clone()),
            name: Some("Sales App".to_string()),
            roles: vec![
                Role {
                    name: "Sales".to_string(),
                    platforms: vec!["Android".to_string()],
                },
                Role {
                    name: "Admin".to_string(),
                    platforms: vec!["Web".to_string()],
                },
            ],
            ..Default::default()
        })
        .await?;
    assert_eq!(api.get_projects(Some(client.id.as_str())).await?.len(), 1);

    let proposal = api.create_proposal(&project.id).await?;
    assert_eq!(proposal.version, 1);

    // legacy content saved by an old client
    api.save_proposal_content(
        &proposal.id,
        &json!({
            "featureSales": [
                {"mainModule": "Account", "subModule": "Auth", "feature": "Login", "mandays": 2}
            ]
        }),
    )
    .await?;

    let mut draft = open_draft(&api, &proposal.id).await?;
    assert_eq!(draft.content().role_mandays("Sales"), 2.0);
    assert!(!draft.is_dirty());

    let catalog = api.search_main_modules(Some("reports")).await?;
    draft.add_catalog_module("Admin", catalog[0].clone())?;
    assert!(draft.is_dirty());

    let saved = draft.save(&api).await?;
    assert!(!draft.is_dirty());
    assert!(saved.get("featureSales").is_none());
    assert_eq!(saved["featuresByRole"]["Admin"][0]["name"], "Reports");

    let stored = api.get_proposal_content(&proposal.id).await?;
    assert_eq!(stored, saved);
    assert_eq!(stored["termsOfPayment"].as_array().unwrap().len(), 3);

    let err = api
        .create_project(&NewProject {
            name: Some("No client".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "clientId and name required");

    api.delete_client(&client.id).await?;
    assert!(api.get_proposals(&project.id).await?.is_empty());
    Ok(())
}
