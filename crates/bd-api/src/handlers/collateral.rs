//! Collateral API handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use bd_core::{Id, ValidationErrors};
use bd_models::ItemStatus;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, AuthenticatedUser, HalResponse};

#[derive(Debug, Deserialize)]
pub struct CollateralStatusDto {
    pub status: String,
}

/// POST /api/v1/collateral/:id/status
///
/// Records the collateral status and returns the owning item with its
/// propagated status.
pub async fn record_collateral_status(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Id>,
    Json(dto): Json<CollateralStatusDto>,
) -> ApiResult<impl IntoResponse> {
    let status: ItemStatus = dto.status.parse().map_err(|message: String| {
        let mut errors = ValidationErrors::new();
        errors.add("status", message);
        ApiError::Validation(errors)
    })?;

    let item = state.collateral().record_status(id, status).await?;
    Ok(HalResponse(item))
}
