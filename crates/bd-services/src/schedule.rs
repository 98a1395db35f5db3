//! Schedule service
//!
//! Owns every write path that touches the computed schedule: anchor changes,
//! explicit recomputes, and phase status transitions. Each operation holds
//! the owning work package's writer lock for the whole read-modify-write and
//! persists the tree in one transaction.

use std::sync::Arc;

use bd_core::config::NullAnchorPolicy;
use bd_core::{CrmError, CrmResult, Id};
use bd_db::{CrmStore, WorkPackageLocks};
use bd_models::{PhaseStatus, WorkPackageTree};
use bd_scheduling::PhaseDueDateService;
use chrono::{NaiveDate, Utc};

pub struct ScheduleService {
    store: Arc<dyn CrmStore>,
    locks: Arc<WorkPackageLocks>,
    null_anchor_policy: NullAnchorPolicy,
}

impl ScheduleService {
    pub fn new(
        store: Arc<dyn CrmStore>,
        locks: Arc<WorkPackageLocks>,
        null_anchor_policy: NullAnchorPolicy,
    ) -> Self {
        Self {
            store,
            locks,
            null_anchor_policy,
        }
    }

    /// Set or clear the scheduling anchor and rerun the cascade.
    pub async fn set_effective_start_date(
        &self,
        work_package_id: Id,
        effective_start_date: Option<NaiveDate>,
    ) -> CrmResult<WorkPackageTree> {
        let _guard = self.locks.acquire(work_package_id).await;
        let mut tree = self.load(work_package_id).await?;

        tree.work_package.effective_start_date = effective_start_date;
        PhaseDueDateService::reschedule(&mut tree, self.null_anchor_policy)?;

        let tree = self.store.save_tree(tree).await?;
        tracing::info!(
            work_package_id,
            anchor = ?effective_start_date,
            "anchor changed, schedule recomputed"
        );
        Ok(tree)
    }

    /// Recompute totals and the cascade without changing any input.
    pub async fn recompute(&self, work_package_id: Id) -> CrmResult<WorkPackageTree> {
        let _guard = self.locks.acquire(work_package_id).await;
        let mut tree = self.load(work_package_id).await?;

        PhaseDueDateService::recompute_phase_totals(&mut tree);
        PhaseDueDateService::reschedule(&mut tree, self.null_anchor_policy)?;

        self.store.save_tree(tree).await
    }

    /// Transition one phase's lifecycle status, stamping actual dates on the
    /// first entry into `in_progress` and `completed`.
    pub async fn transition_phase_status(
        &self,
        work_package_id: Id,
        phase_id: Id,
        next: PhaseStatus,
    ) -> CrmResult<WorkPackageTree> {
        let _guard = self.locks.acquire(work_package_id).await;
        let mut tree = self.load(work_package_id).await?;

        let node = tree
            .find_phase_mut(phase_id)
            .ok_or_else(|| CrmError::not_found("Phase", "id", phase_id))?;
        let today = Utc::now().date_naive();
        PhaseDueDateService::transition_status(&mut node.phase, next, today);
        tracing::info!(
            work_package_id,
            phase_id,
            status = %next,
            "phase status transition"
        );

        self.store.save_tree(tree).await
    }

    async fn load(&self, work_package_id: Id) -> CrmResult<WorkPackageTree> {
        self.store
            .load_tree(work_package_id)
            .await?
            .ok_or_else(|| CrmError::not_found("WorkPackage", "id", work_package_id))
    }
}
