//! Hydration service: assembly and idempotent merge
//!
//! Four input modes, selected by the request's `mode` tag. Whatever the
//! mode, the finished tree goes through exactly one post-assembly pass:
//! recompute phase totals, run the cascade once, persist everything in a
//! single transaction.

mod clone;
mod csv;
mod templates;

use std::collections::HashSet;
use std::sync::Arc;

use bd_core::config::NullAnchorPolicy;
use bd_core::{CrmError, CrmResult, Id, ValidationErrors};
use bd_db::{CrmStore, TemplateCatalog, WorkPackageLocks};
use bd_models::{CsvRow, WorkPackageTree};
use bd_scheduling::PhaseDueDateService;
use chrono::NaiveDate;
use serde::Deserialize;

/// Discriminated assembly request
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AssemblyRequest {
    Templates(TemplateAssembly),
    Csv(CsvAssembly),
    Clone(CloneAssembly),
    Blank(BlankAssembly),
}

/// Assemble from the phase/deliverable template catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateAssembly {
    pub contact_id: Id,
    pub company_id: Option<Id>,
    pub title: String,
    pub description: Option<String>,
    pub total_cost: Option<f64>,
    pub effective_start_date: Option<NaiveDate>,
    pub phases: Vec<TemplatePhaseRef>,
}

/// One phase reference inside a template assembly
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePhaseRef {
    pub phase_template_id: Id,
    pub position: Option<i32>,
    #[serde(default)]
    pub deliverables: Vec<Id>,
}

/// Assemble from flat CSV rows, or merge rows into an existing package
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvAssembly {
    /// Merge target; absent means create a new work package
    pub work_package_id: Option<Id>,
    pub contact_id: Option<Id>,
    pub company_id: Option<Id>,
    pub title: Option<String>,
    pub effective_start_date: Option<NaiveDate>,
    pub rows: Vec<CsvRow>,
}

/// Deep-copy an existing work package's structure
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneAssembly {
    pub source_work_package_id: Id,
    pub contact_id: Option<Id>,
    pub title: Option<String>,
    pub effective_start_date: Option<NaiveDate>,
}

/// Caller supplies the full tree; structural validation only
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlankAssembly {
    pub tree: WorkPackageTree,
}

/// Builds or merges an engagement's phase/item tree
pub struct HydrationService {
    store: Arc<dyn CrmStore>,
    catalog: Arc<dyn TemplateCatalog>,
    locks: Arc<WorkPackageLocks>,
    null_anchor_policy: NullAnchorPolicy,
}

impl HydrationService {
    pub fn new(
        store: Arc<dyn CrmStore>,
        catalog: Arc<dyn TemplateCatalog>,
        locks: Arc<WorkPackageLocks>,
        null_anchor_policy: NullAnchorPolicy,
    ) -> Self {
        Self {
            store,
            catalog,
            locks,
            null_anchor_policy,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn CrmStore> {
        &self.store
    }

    pub(crate) fn catalog(&self) -> &Arc<dyn TemplateCatalog> {
        &self.catalog
    }

    /// Assemble or merge a work package tree and persist it once.
    pub async fn assemble(&self, request: AssemblyRequest) -> CrmResult<WorkPackageTree> {
        match request {
            AssemblyRequest::Templates(req) => {
                let tree = self.build_from_templates(req).await?;
                self.finalize_new(tree).await
            }
            AssemblyRequest::Csv(req) => match req.work_package_id {
                Some(work_package_id) => {
                    // Merge path: hold the writer lock across load + merge + save
                    let _guard = self.locks.acquire(work_package_id).await;
                    let existing = self
                        .store
                        .load_tree(work_package_id)
                        .await?
                        .ok_or_else(|| {
                            CrmError::not_found("WorkPackage", "id", work_package_id)
                        })?;
                    let tree = self.merge_csv(existing, req)?;
                    self.finalize_existing(tree).await
                }
                None => {
                    let tree = self.build_from_csv(req)?;
                    self.finalize_new(tree).await
                }
            },
            AssemblyRequest::Clone(req) => {
                let tree = self.build_from_clone(req).await?;
                self.finalize_new(tree).await
            }
            AssemblyRequest::Blank(req) => {
                validate_blank_tree(&req.tree)?;
                self.finalize_new(req.tree).await
            }
        }
    }

    /// Post-assembly pass for a brand-new tree: totals, cascade, one insert.
    async fn finalize_new(&self, mut tree: WorkPackageTree) -> CrmResult<WorkPackageTree> {
        if !self.store.contact_exists(tree.work_package.contact_id).await? {
            return Err(CrmError::not_found(
                "Contact",
                "id",
                tree.work_package.contact_id,
            ));
        }
        PhaseDueDateService::recompute_phase_totals(&mut tree);
        PhaseDueDateService::reschedule(&mut tree, self.null_anchor_policy)?;
        let tree = self.store.insert_tree(tree).await?;
        tracing::info!(
            work_package_id = ?tree.work_package.id,
            phases = tree.phases.len(),
            items = tree.item_count(),
            "assembled work package"
        );
        Ok(tree)
    }

    /// Post-assembly pass for a merged tree: totals, cascade, one upsert.
    async fn finalize_existing(&self, mut tree: WorkPackageTree) -> CrmResult<WorkPackageTree> {
        PhaseDueDateService::recompute_phase_totals(&mut tree);
        PhaseDueDateService::reschedule(&mut tree, self.null_anchor_policy)?;
        let tree = self.store.save_tree(tree).await?;
        tracing::info!(
            work_package_id = ?tree.work_package.id,
            phases = tree.phases.len(),
            items = tree.item_count(),
            "merged work package"
        );
        Ok(tree)
    }
}

/// Structural validation for caller-supplied trees.
fn validate_blank_tree(tree: &WorkPackageTree) -> CrmResult<()> {
    let mut errors = ValidationErrors::new();

    if tree.work_package.title.trim().is_empty() {
        errors.add("title", "is required");
    }

    let mut positions = HashSet::new();
    for (phase_index, node) in tree.phases.iter().enumerate() {
        if node.phase.name.trim().is_empty() {
            errors.add(format!("phases[{}].name", phase_index), "is required");
        }
        if node.phase.position < 1 {
            errors.add(format!("phases[{}].position", phase_index), "must be >= 1");
        } else if !positions.insert(node.phase.position) {
            errors.add(
                format!("phases[{}].position", phase_index),
                "duplicates another phase's position",
            );
        }

        let mut labels = HashSet::new();
        for (item_index, item) in node.items.iter().enumerate() {
            if item.deliverable_label.trim().is_empty() {
                errors.add(
                    format!("phases[{}].items[{}].deliverableLabel", phase_index, item_index),
                    "is required",
                );
            } else if !labels.insert(item.deliverable_label.clone()) {
                errors.add(
                    format!("phases[{}].items[{}].deliverableLabel", phase_index, item_index),
                    "duplicates another label in the same phase",
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CrmError::Validation(errors))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use bd_db::{MemoryCatalog, MemoryStore};

    pub(crate) struct Fixture {
        pub store: Arc<MemoryStore>,
        pub catalog: Arc<MemoryCatalog>,
        pub locks: Arc<WorkPackageLocks>,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            store.add_contact(1);
            Self {
                store,
                catalog: Arc::new(MemoryCatalog::new()),
                locks: Arc::new(WorkPackageLocks::new()),
            }
        }

        pub(crate) fn hydration(&self) -> HydrationService {
            HydrationService::new(
                self.store.clone(),
                self.catalog.clone(),
                self.locks.clone(),
                NullAnchorPolicy::Unscheduled,
            )
        }
    }
}
