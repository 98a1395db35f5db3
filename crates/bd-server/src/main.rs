//! BizDev CRM RS Server
//!
//! HTTP server binary. Wires the Postgres store (or the in-memory fallback
//! when the database is unreachable) into the API router and serves it with
//! graceful shutdown.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bd_api::AppState;
use bd_core::config::AppConfig;
use bd_db::{CrmStore, Database, MemoryCatalog, MemoryStore, PgCatalog, PgStore, TemplateCatalog};

mod health;

use health::ServerHealth;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    dotenvy::dotenv().ok();
    let config = Arc::new(AppConfig::from_env());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting BizDev CRM RS"
    );

    let database = match Database::connect(&config.database).await {
        Ok(db) => {
            info!("Connected to database");
            Some(db)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to database. Running on the in-memory store."
            );
            None
        }
    };

    let (store, catalog): (Arc<dyn CrmStore>, Arc<dyn TemplateCatalog>) = match &database {
        Some(db) => (
            Arc::new(PgStore::new(db.pool().clone())),
            Arc::new(PgCatalog::new(db.pool().clone())),
        ),
        None => (
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryCatalog::new()),
        ),
    };

    let app_state = AppState::new(store, catalog, config.clone());
    let server_health = Arc::new(ServerHealth::new(database));

    let app = build_router(app_state, server_health);

    let addr = config.server_addr();
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,bd_server=debug,bd_api=debug,tower_http=debug".into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

fn build_router(app_state: AppState, server_health: Arc<ServerHealth>) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(server_health);

    let api_routes = bd_api::router().with_state(app_state);

    Router::new()
        .merge(health_routes)
        .merge(api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let store = Arc::new(MemoryStore::new());
        store.add_contact(1);
        let mut config = AppConfig::default();
        config.auth.require_authentication = false;
        let state = AppState::new(
            store,
            Arc::new(MemoryCatalog::new()),
            Arc::new(config),
        );
        build_router(state, Arc::new(ServerHealth::new(None)))
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_memory_backed_server_is_degraded_but_up() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["storage"], "memory");
        assert_eq!(json["status"], "degraded");
    }

    #[tokio::test]
    async fn test_api_root() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_assemble_round_trip_over_http() {
        let app = test_app();
        let body = serde_json::json!({
            "mode": "csv",
            "contactId": 1,
            "title": "CSV engagement",
            "effectiveStartDate": "2024-01-01",
            "rows": [
                {
                    "phaseName": "Discovery",
                    "deliverableType": "audit",
                    "deliverableLabel": "Site audit"
                }
            ]
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/work_packages/assemble")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["phases"][0]["name"], "Discovery");
        assert_eq!(json["phases"][0]["estimatedEndDate"], "2024-01-02");
    }

    #[tokio::test]
    async fn test_unknown_assembly_mode_is_422() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/work_packages/assemble")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"mode":"import"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_missing_bearer_token_is_401_when_required() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            store,
            Arc::new(MemoryCatalog::new()),
            Arc::new(AppConfig::default()),
        );
        let app = build_router(state, Arc::new(ServerHealth::new(None)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/work_packages/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
