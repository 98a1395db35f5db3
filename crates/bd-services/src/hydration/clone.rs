//! Clone assembly
//!
//! Deep-copies the structure of an existing work package: phases, items,
//! estimates. Lifecycle facts never travel: statuses reset to the initial
//! state, actual dates clear, collateral stays behind. The clone's anchor
//! comes from the request alone, so an omitted anchor yields an unscheduled
//! copy regardless of the source.

use bd_core::{CrmError, CrmResult};
use bd_db::CrmStore;
use bd_models::{ItemStatus, PhaseStatus, WorkPackageTree};

use super::{CloneAssembly, HydrationService};

impl HydrationService {
    pub(super) async fn build_from_clone(
        &self,
        request: CloneAssembly,
    ) -> CrmResult<WorkPackageTree> {
        let source = self
            .store()
            .load_tree(request.source_work_package_id)
            .await?
            .ok_or_else(|| {
                CrmError::not_found("WorkPackage", "id", request.source_work_package_id)
            })?;

        let mut tree = source;
        tree.work_package.id = None;
        tree.work_package.created_at = None;
        tree.work_package.updated_at = None;
        if let Some(contact_id) = request.contact_id {
            tree.work_package.contact_id = contact_id;
        }
        tree.work_package.title = request
            .title
            .unwrap_or_else(|| format!("{} (copy)", tree.work_package.title));
        tree.work_package.effective_start_date = request.effective_start_date;

        for node in &mut tree.phases {
            node.phase.id = None;
            node.phase.work_package_id = None;
            node.phase.status = PhaseStatus::NotStarted;
            node.phase.actual_start_date = None;
            node.phase.actual_end_date = None;
            for item in &mut node.items {
                item.id = None;
                item.work_package_id = None;
                item.phase_id = None;
                item.status = ItemStatus::NotStarted;
            }
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use super::super::{AssemblyRequest, BlankAssembly, CloneAssembly};
    use super::*;
    use bd_db::CrmStore;
    use bd_models::{Phase, PhaseNode, WorkCollateral, WorkItem, WorkPackage};
    use chrono::NaiveDate;

    async fn seeded_source(fixture: &Fixture) -> WorkPackageTree {
        let mut wp = WorkPackage::new("Original engagement", 1);
        wp.effective_start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        wp.total_cost = Some(18_000.0);
        let mut tree = WorkPackageTree::new(wp);
        let mut node = PhaseNode::new(Phase::new("Discovery", 1));
        let mut item = WorkItem::new("Site audit", "audit");
        item.status = ItemStatus::Approved;
        node.items.push(item);
        tree.phases.push(node);

        let mut saved = fixture
            .hydration()
            .assemble(AssemblyRequest::Blank(BlankAssembly { tree }))
            .await
            .unwrap();

        // Advance the source's lifecycle so the clone has something to reset
        saved.phases[0].phase.status = PhaseStatus::InProgress;
        saved.phases[0].phase.actual_start_date = NaiveDate::from_ymd_opt(2024, 1, 3);
        fixture.store.save_tree(saved).await.unwrap()
    }

    #[tokio::test]
    async fn test_clone_copies_structure_and_resets_lifecycle() {
        let fixture = Fixture::new();
        let source = seeded_source(&fixture).await;
        let source_id = source.work_package.id.unwrap();

        let clone = fixture
            .hydration()
            .assemble(AssemblyRequest::Clone(CloneAssembly {
                source_work_package_id: source_id,
                contact_id: None,
                title: None,
                effective_start_date: NaiveDate::from_ymd_opt(2024, 3, 4),
            }))
            .await
            .unwrap();

        assert_ne!(clone.work_package.id, source.work_package.id);
        assert_eq!(clone.work_package.title, "Original engagement (copy)");
        assert_eq!(clone.work_package.total_cost, Some(18_000.0));

        let phase = &clone.phases[0].phase;
        assert_eq!(phase.name, "Discovery");
        assert_eq!(phase.status, PhaseStatus::NotStarted);
        assert_eq!(phase.actual_start_date, None);
        assert_eq!(phase.actual_end_date, None);
        // Rescheduled against the clone's own anchor
        assert_eq!(
            phase.estimated_start_date,
            NaiveDate::from_ymd_opt(2024, 3, 4)
        );
        assert_eq!(clone.phases[0].items[0].status, ItemStatus::NotStarted);
    }

    #[tokio::test]
    async fn test_clone_without_anchor_is_unscheduled() {
        let fixture = Fixture::new();
        let source = seeded_source(&fixture).await;

        let clone = fixture
            .hydration()
            .assemble(AssemblyRequest::Clone(CloneAssembly {
                source_work_package_id: source.work_package.id.unwrap(),
                contact_id: None,
                title: Some("Fresh run".into()),
                effective_start_date: None,
            }))
            .await
            .unwrap();

        assert_eq!(clone.work_package.title, "Fresh run");
        assert_eq!(clone.phases[0].phase.estimated_start_date, None);
        assert_eq!(clone.phases[0].phase.estimated_end_date, None);
    }

    #[tokio::test]
    async fn test_clone_leaves_source_untouched() {
        let fixture = Fixture::new();
        let source = seeded_source(&fixture).await;
        let source_id = source.work_package.id.unwrap();

        fixture
            .hydration()
            .assemble(AssemblyRequest::Clone(CloneAssembly {
                source_work_package_id: source_id,
                contact_id: None,
                title: None,
                effective_start_date: None,
            }))
            .await
            .unwrap();

        let reloaded = fixture.store.load_tree(source_id).await.unwrap().unwrap();
        assert_eq!(reloaded.phases[0].phase.status, PhaseStatus::InProgress);
        assert_eq!(
            reloaded.phases[0].phase.actual_start_date,
            NaiveDate::from_ymd_opt(2024, 1, 3)
        );
    }

    #[tokio::test]
    async fn test_clone_does_not_carry_collateral() {
        let fixture = Fixture::new();
        let source = seeded_source(&fixture).await;
        let source_id = source.work_package.id.unwrap();
        let item_id = source.phases[0].items[0].id.unwrap();
        fixture
            .store
            .insert_collateral(WorkCollateral::new(item_id, source_id, "Audit draft"))
            .await
            .unwrap();

        let clone = fixture
            .hydration()
            .assemble(AssemblyRequest::Clone(CloneAssembly {
                source_work_package_id: source_id,
                contact_id: None,
                title: None,
                effective_start_date: None,
            }))
            .await
            .unwrap();

        let cloned_item_id = clone.phases[0].items[0].id.unwrap();
        assert!(fixture
            .store
            .list_collateral_for_item(cloned_item_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_clone_missing_source_is_not_found() {
        let fixture = Fixture::new();
        let err = fixture
            .hydration()
            .assemble(AssemblyRequest::Clone(CloneAssembly {
                source_work_package_id: 404,
                contact_id: None,
                title: None,
                effective_start_date: None,
            }))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "not_found");
    }
}
