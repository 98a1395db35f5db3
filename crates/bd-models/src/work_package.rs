//! Work Package tree: engagement root, phases, deliverable items

use bd_core::traits::{Id, Identifiable, Timestamped};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{ItemStatus, PhaseStatus, UnitOfMeasure};

/// Root engagement record grouping phases and items for one client.
///
/// `effective_start_date` is the single scheduling anchor: when set, it is
/// the sole source of truth for every descendant estimated date. When unset
/// the package is unscheduled.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkPackage {
    pub id: Option<Id>,
    pub contact_id: Id,
    pub company_id: Option<Id>,
    pub title: String,
    pub description: Option<String>,
    pub total_cost: Option<f64>,
    pub effective_start_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkPackage {
    pub fn new(title: impl Into<String>, contact_id: Id) -> Self {
        Self {
            title: title.into(),
            contact_id,
            ..Default::default()
        }
    }
}

impl Identifiable for WorkPackage {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Timestamped for WorkPackage {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

/// An ordered stage of a work package with its own computed schedule window.
///
/// Estimated dates are derived by the cascade and overwritten on every
/// recompute. Actual dates are facts stamped once by status transitions and
/// never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: Option<Id>,
    pub work_package_id: Option<Id>,
    pub name: String,
    /// 1-based, unique per work package, total order
    pub position: i32,
    pub description: Option<String>,
    /// Derived: sum of child item contributions
    pub total_estimated_hours: f64,
    pub estimated_start_date: Option<NaiveDate>,
    pub estimated_end_date: Option<NaiveDate>,
    pub actual_start_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
    pub status: PhaseStatus,
}

impl Phase {
    pub fn new(name: impl Into<String>, position: i32) -> Self {
        Self {
            name: name.into(),
            position,
            ..Default::default()
        }
    }
}

impl Identifiable for Phase {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

/// A trackable deliverable inside a phase.
///
/// `deliverable_label` is the identity key, unique within its phase;
/// `deliverable_type` is immutable once the identity exists.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: Option<Id>,
    pub work_package_id: Option<Id>,
    pub phase_id: Option<Id>,
    pub deliverable_type: String,
    pub deliverable_label: String,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_of_measure: UnitOfMeasure,
    pub estimated_hours_each: f64,
    pub status: ItemStatus,
}

impl WorkItem {
    pub fn new(label: impl Into<String>, deliverable_type: impl Into<String>) -> Self {
        Self {
            deliverable_label: label.into(),
            deliverable_type: deliverable_type.into(),
            quantity: 1,
            ..Default::default()
        }
    }
}

impl Identifiable for WorkItem {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

/// A phase together with its items
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PhaseNode {
    #[serde(flatten)]
    pub phase: Phase,
    pub items: Vec<WorkItem>,
}

impl PhaseNode {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            items: Vec::new(),
        }
    }
}

/// The fully hydrated engagement tree: the aggregate every assembly mode
/// builds and every recompute persists as one unit.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkPackageTree {
    #[serde(flatten)]
    pub work_package: WorkPackage,
    pub phases: Vec<PhaseNode>,
}

impl WorkPackageTree {
    pub fn new(work_package: WorkPackage) -> Self {
        Self {
            work_package,
            phases: Vec::new(),
        }
    }

    /// Phases in ascending `position` order (the cascade walk order).
    pub fn sort_phases(&mut self) {
        self.phases.sort_by_key(|node| node.phase.position);
    }

    pub fn find_phase_mut(&mut self, phase_id: Id) -> Option<&mut PhaseNode> {
        self.phases
            .iter_mut()
            .find(|node| node.phase.id == Some(phase_id))
    }

    pub fn item_count(&self) -> usize {
        self.phases.iter().map(|node| node.items.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_phases_orders_by_position() {
        let mut tree = WorkPackageTree::new(WorkPackage::new("Engagement", 1));
        tree.phases.push(PhaseNode::new(Phase::new("Build", 2)));
        tree.phases.push(PhaseNode::new(Phase::new("Discovery", 1)));
        tree.sort_phases();
        assert_eq!(tree.phases[0].phase.name, "Discovery");
        assert_eq!(tree.phases[1].phase.name, "Build");
    }

    #[test]
    fn test_new_item_defaults() {
        let item = WorkItem::new("Landing page", "design");
        assert_eq!(item.quantity, 1);
        assert_eq!(item.status, ItemStatus::NotStarted);
        assert_eq!(item.unit_of_measure, UnitOfMeasure::Day);
    }
}
