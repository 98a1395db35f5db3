//! # bd-models
//!
//! Domain models for BizDev CRM RS.
//!
//! The engagement subsystem is a three-level tree: a `WorkPackage` owns
//! ordered `Phase`s, each phase owns `WorkItem` deliverables, and review
//! `WorkCollateral` artifacts hang off items. Template snapshot types and the
//! CSV import row live here too.

pub use bd_core::traits::{Id, Identifiable, Timestamped};

pub mod collateral;
pub mod csv;
pub mod status;
pub mod template;
pub mod work_package;

pub use collateral::WorkCollateral;
pub use csv::CsvRow;
pub use status::{ItemStatus, PhaseStatus, UnitOfMeasure};
pub use template::{DeliverableTemplate, PhaseTemplate};
pub use work_package::{Phase, PhaseNode, WorkItem, WorkPackage, WorkPackageTree};
