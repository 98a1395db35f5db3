//! API routes

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use serde::Serialize;

use crate::extractors::AppState;
use crate::handlers::{collateral, work_packages};

/// Create the complete API router
pub fn router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_router())
}

fn api_v1_router() -> Router<AppState> {
    Router::new()
        .route("/", get(api_root))
        .nest("/work_packages", work_packages_router())
        .nest("/collateral", collateral_router())
}

fn work_packages_router() -> Router<AppState> {
    Router::new()
        .route("/assemble", post(work_packages::assemble_work_package))
        .route("/:id", get(work_packages::get_work_package))
        .route("/:id", delete(work_packages::delete_work_package))
        .route(
            "/:id/effective_start_date",
            put(work_packages::set_effective_start_date),
        )
        .route(
            "/:id/phases/:phase_id/status",
            patch(work_packages::transition_phase_status),
        )
}

fn collateral_router() -> Router<AppState> {
    Router::new().route("/:id/status", post(collateral::record_collateral_status))
}

async fn api_root() -> axum::Json<ApiRoot> {
    axum::Json(ApiRoot {
        type_name: "Root".into(),
        instance_name: "BizDev CRM RS".into(),
    })
}

#[derive(Serialize)]
struct ApiRoot {
    #[serde(rename = "_type")]
    type_name: String,
    #[serde(rename = "instanceName")]
    instance_name: String,
}
