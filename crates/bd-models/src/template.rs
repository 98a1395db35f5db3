//! Phase and deliverable template catalog records
//!
//! The catalog is read-only from this subsystem's point of view. Assembly
//! resolves template references into value copies; a template edited after
//! assembly never alters an already-assembled work package.

use bd_core::traits::Id;
use serde::{Deserialize, Serialize};

use crate::status::UnitOfMeasure;

/// Catalog entry describing a reusable phase
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTemplate {
    pub id: Option<Id>,
    pub name: String,
    pub description: Option<String>,
    /// Default ordering when the assembly request gives no position
    pub default_position: i32,
}

impl PhaseTemplate {
    pub fn new(name: impl Into<String>, default_position: i32) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            default_position,
        }
    }
}

/// Catalog entry describing a reusable deliverable with effort defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableTemplate {
    pub id: Option<Id>,
    pub deliverable_type: String,
    pub deliverable_label: String,
    pub description: Option<String>,
    pub default_quantity: i64,
    pub default_unit_of_measure: UnitOfMeasure,
    pub default_estimated_hours_each: f64,
}

impl DeliverableTemplate {
    pub fn new(label: impl Into<String>, deliverable_type: impl Into<String>) -> Self {
        Self {
            id: None,
            deliverable_type: deliverable_type.into(),
            deliverable_label: label.into(),
            description: None,
            default_quantity: 1,
            default_unit_of_measure: UnitOfMeasure::Day,
            default_estimated_hours_each: 8.0,
        }
    }
}
