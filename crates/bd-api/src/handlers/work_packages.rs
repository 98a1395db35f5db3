//! Work Package API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bd_core::{CrmError, Id, ValidationErrors};
use bd_db::CrmStore;
use bd_models::PhaseStatus;
use bd_services::AssemblyRequest;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, AuthenticatedUser, HalResponse};

/// POST /api/v1/work_packages/assemble
///
/// The body is decoded by hand so a bad or missing `mode` tag surfaces as a
/// 422 validation error rather than a generic body rejection.
pub async fn assemble_work_package(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<impl IntoResponse> {
    let request: AssemblyRequest = serde_json::from_value(body).map_err(|e| {
        let mut errors = ValidationErrors::new();
        errors.add_base(format!("invalid assembly request: {}", e));
        ApiError::Validation(errors)
    })?;

    let tree = state.hydration().assemble(request).await?;
    Ok((StatusCode::CREATED, HalResponse(tree)))
}

/// GET /api/v1/work_packages/:id
pub async fn get_work_package(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let tree = state
        .store
        .load_tree(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(CrmError::not_found("WorkPackage", "id", id)))?;
    Ok(HalResponse(tree))
}

/// DELETE /api/v1/work_packages/:id
pub async fn delete_work_package(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let _guard = state.locks.acquire(id).await;
    state.store.delete_work_package(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorDto {
    pub effective_start_date: Option<NaiveDate>,
}

/// PUT /api/v1/work_packages/:id/effective_start_date
pub async fn set_effective_start_date(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
    Json(dto): Json<AnchorDto>,
) -> ApiResult<impl IntoResponse> {
    let tree = state
        .schedule()
        .set_effective_start_date(id, dto.effective_start_date)
        .await?;
    Ok(HalResponse(tree))
}

#[derive(Debug, Deserialize)]
pub struct PhaseStatusDto {
    pub status: String,
}

/// PATCH /api/v1/work_packages/:id/phases/:phase_id/status
pub async fn transition_phase_status(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, phase_id)): Path<(Id, Id)>,
    Json(dto): Json<PhaseStatusDto>,
) -> ApiResult<impl IntoResponse> {
    let next: PhaseStatus = dto.status.parse().map_err(|message: String| {
        let mut errors = ValidationErrors::new();
        errors.add("status", message);
        ApiError::Validation(errors)
    })?;

    let tree = state
        .schedule()
        .transition_phase_status(id, phase_id, next)
        .await?;
    Ok(HalResponse(tree))
}
