//! # bd-services
//!
//! Business logic for the engagement subsystem:
//!
//! - `HydrationService` builds or merges a work package tree from one of
//!   four assembly modes, with idempotent upsert identity for CSV re-imports.
//! - `ScheduleService` owns the anchor-change and recompute paths.
//! - `CollateralService` keeps item status consistent with the aggregate
//!   approval state of attached collateral.
//!
//! Every service takes an injected store handle and holds the owning work
//! package's writer lock for the whole read-modify-write.

pub mod collateral;
pub mod hydration;
pub mod schedule;

pub use collateral::CollateralService;
pub use hydration::{
    AssemblyRequest, BlankAssembly, CloneAssembly, CsvAssembly, HydrationService,
    TemplateAssembly, TemplatePhaseRef,
};
pub use schedule::ScheduleService;
