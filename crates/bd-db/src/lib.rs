//! # bd-db
//!
//! Storage layer for BizDev CRM RS.
//!
//! The services crate talks to storage through the `CrmStore` and
//! `TemplateCatalog` traits. Two implementations live here: `PgStore`
//! (PostgreSQL via sqlx, one transaction per multi-row mutation) and
//! `MemoryStore` (tests and degraded startup). `WorkPackageLocks` serializes
//! writers per work package id.

pub mod locks;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod store;

pub use locks::WorkPackageLocks;
pub use memory::{MemoryCatalog, MemoryStore};
pub use pool::Database;
pub use postgres::{PgCatalog, PgStore};
pub use store::{CrmStore, TemplateCatalog};
