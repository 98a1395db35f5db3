//! # bd-scheduling
//!
//! Pure scheduling logic for work package phases: business-day calendar
//! math, normalization of heterogeneous effort inputs into canonical hours,
//! and the cascading due-date computation seeded from the engagement anchor.
//!
//! Everything here is synchronous and store-free; the services crate owns
//! persistence.

pub mod calendar;
pub mod due_dates;
pub mod duration;

pub use calendar::add_business_days;
pub use due_dates::PhaseDueDateService;
pub use duration::{DataQualityWarning, DurationNormalizationService, PhaseEffort};
