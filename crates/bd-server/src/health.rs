//! Health check endpoints
//!
//! `/health/live` answers as long as the process runs; `/health/ready` and
//! `/health` additionally ping the database when one is attached. A server
//! running on the in-memory store reports degraded, not unhealthy.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bd_db::Database;
use serde::Serialize;

/// Health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Overall health report
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// State shared by the health routes
pub struct ServerHealth {
    start_time: Instant,
    database: Option<Database>,
}

impl ServerHealth {
    pub fn new(database: Option<Database>) -> Self {
        Self {
            start_time: Instant::now(),
            database,
        }
    }

    pub async fn check(&self) -> HealthReport {
        let (status, storage) = match &self.database {
            Some(db) => match db.ping().await {
                Ok(()) => (HealthStatus::Healthy, "postgres"),
                Err(e) => {
                    tracing::warn!(error = %e, "database ping failed");
                    (HealthStatus::Unhealthy, "postgres")
                }
            },
            None => (HealthStatus::Degraded, "memory"),
        };

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            storage,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// GET /health
pub async fn health(State(state): State<Arc<ServerHealth>>) -> (StatusCode, Json<HealthReport>) {
    let report = state.check().await;
    (report.http_status(), Json(report))
}

/// GET /health/live
pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /health/ready
pub async fn readiness(
    State(state): State<Arc<ServerHealth>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let report = state.check().await;
    (
        report.http_status(),
        Json(serde_json::json!({ "status": report.status, "storage": report.storage })),
    )
}
