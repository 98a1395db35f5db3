//! CSV import row
//!
//! The wire shape of one flat import row. Rows group into phases by
//! `phaseName`; the first row alone may carry engagement-level fields.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One flat row of a CSV hydration batch
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct CsvRow {
    #[validate(length(min = 1, message = "is required"))]
    pub phase_name: String,

    /// 1-based; when absent, phases keep first-seen order
    #[validate(range(min = 1, message = "must be >= 1"))]
    pub phase_position: Option<i32>,

    #[validate(length(min = 1, message = "is required"))]
    pub deliverable_type: String,

    #[validate(length(min = 1, message = "is required"))]
    pub deliverable_label: String,

    pub deliverable_description: Option<String>,

    /// Non-positive quantities are accepted but contribute zero effort
    #[serde(default = "default_quantity")]
    pub quantity: i64,

    /// One of `day`/`hour`/`week`; anything else falls back to `day`
    pub unit_of_measure: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "must be >= 0"))]
    pub estimated_hours_each: f64,

    /// Review status; defaults to the legacy `todo` spelling of the initial
    /// state
    #[serde(default = "default_status")]
    pub status: String,

    /// First row only: applied to the work package itself
    pub proposal_description: Option<String>,

    /// First row only: applied to the work package itself
    pub proposal_total_cost: Option<f64>,
}

fn default_quantity() -> i64 {
    1
}

fn default_status() -> String {
    "todo".to_string()
}
