//! # bd-api
//!
//! REST API v1 handlers for BizDev CRM RS.
//!
//! HAL+JSON error shape, bearer-token gate, and the engagement routes. All
//! business semantics live in `bd-services`; handlers translate between HTTP
//! and the service layer.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use extractors::AppState;
pub use routes::router;
