//! API error handling
//!
//! Provides HTTP error types with HAL+JSON responses. Service-layer errors
//! convert via `From<CrmError>`, so handlers can use `?` end to end.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bd_core::{CrmError, ValidationErrors};
use serde::Serialize;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound { resource: String, detail: String },
    Validation(ValidationErrors),
    Conflict(String),
    InvalidState(String),
    Unauthorized(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_identifier(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "urn:bizdev:api:v1:errors:NotFound",
            ApiError::Validation(_) => "urn:bizdev:api:v1:errors:PropertyConstraintViolation",
            ApiError::Conflict(_) => "urn:bizdev:api:v1:errors:UpdateConflict",
            ApiError::InvalidState(_) => "urn:bizdev:api:v1:errors:InvalidState",
            ApiError::Unauthorized(_) => "urn:bizdev:api:v1:errors:Unauthenticated",
            ApiError::BadRequest(_) => "urn:bizdev:api:v1:errors:InvalidRequestBody",
            ApiError::Internal(_) => "urn:bizdev:api:v1:errors:InternalError",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::NotFound { resource, detail } => {
                format!("{} not found: {}", resource, detail)
            }
            ApiError::Validation(errors) => errors.full_messages().join(", "),
            ApiError::Conflict(msg)
            | ApiError::InvalidState(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Internal(msg) => msg.clone(),
        }
    }
}

impl From<CrmError> for ApiError {
    fn from(err: CrmError) -> Self {
        match err {
            CrmError::NotFound {
                entity,
                field,
                value,
            } => ApiError::NotFound {
                resource: entity.to_string(),
                detail: format!("{}={}", field, value),
            },
            CrmError::Validation(errors) => ApiError::Validation(errors),
            CrmError::Conflict { message } => ApiError::Conflict(message),
            CrmError::State { message } => ApiError::InvalidState(message),
            CrmError::Database(msg) | CrmError::Internal(msg) | CrmError::Config(msg) => {
                tracing::error!(error = %msg, "internal error reached the API boundary");
                ApiError::Internal("An internal error occurred".into())
            }
        }
    }
}

#[derive(Serialize)]
struct HalError {
    #[serde(rename = "_type")]
    type_name: &'static str,
    #[serde(rename = "errorIdentifier")]
    error_identifier: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = HalError {
            type_name: "Error",
            error_identifier: self.error_identifier(),
            message: self.message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
