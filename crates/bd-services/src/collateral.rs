//! Collateral status propagation
//!
//! A collateral status change propagates to its owning item under one rule:
//! any non-approved status mirrors straight onto the item, while an approval
//! promotes the item only once every sibling collateral of that item is
//! approved. Sibling state is queried fresh inside the writer lock, with the
//! triggering collateral's new value substituted, so a concurrently deleted
//! or added sibling can never leave a stale aggregate behind.

use std::sync::Arc;

use bd_core::{CrmError, CrmResult, Id};
use bd_db::{CrmStore, WorkPackageLocks};
use bd_models::{ItemStatus, WorkCollateral, WorkItem};

pub struct CollateralService {
    store: Arc<dyn CrmStore>,
    locks: Arc<WorkPackageLocks>,
}

impl CollateralService {
    pub fn new(store: Arc<dyn CrmStore>, locks: Arc<WorkPackageLocks>) -> Self {
        Self { store, locks }
    }

    /// Record a collateral status and propagate it to the owning item.
    /// Both writes land in one transaction.
    pub async fn record_status(
        &self,
        collateral_id: Id,
        status: ItemStatus,
    ) -> CrmResult<WorkItem> {
        let collateral = self
            .store
            .find_collateral(collateral_id)
            .await?
            .ok_or_else(|| CrmError::not_found("WorkCollateral", "id", collateral_id))?;

        let _guard = self.locks.acquire(collateral.work_package_id).await;

        let item = self
            .store
            .find_item(collateral.item_id)
            .await?
            .ok_or_else(|| CrmError::not_found("WorkItem", "id", collateral.item_id))?;

        let item_status = self
            .propagated_item_status(&item, collateral_id, status)
            .await?;

        let item = self
            .store
            .save_collateral_and_item_status(collateral_id, status, collateral.item_id, item_status)
            .await?;
        tracing::info!(
            collateral_id,
            item_id = ?item.id,
            collateral_status = %status,
            item_status = %item.status,
            "collateral status recorded"
        );
        Ok(item)
    }

    /// Attach a new collateral to an item, propagating its initial status.
    pub async fn create_collateral(
        &self,
        item_id: Id,
        title: impl Into<String>,
        status: ItemStatus,
    ) -> CrmResult<WorkCollateral> {
        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or_else(|| CrmError::not_found("WorkItem", "id", item_id))?;
        let work_package_id = item
            .work_package_id
            .ok_or_else(|| CrmError::Internal("item has no owning work package".into()))?;

        let _guard = self.locks.acquire(work_package_id).await;

        let mut collateral = WorkCollateral::new(item_id, work_package_id, title);
        collateral.status = status;
        let collateral = self.store.insert_collateral(collateral).await?;

        let collateral_id = collateral
            .id
            .ok_or_else(|| CrmError::Internal("collateral inserted without an id".into()))?;
        let item_status = self.propagated_item_status(&item, collateral_id, status).await?;
        self.store
            .save_collateral_and_item_status(collateral_id, status, item_id, item_status)
            .await?;

        Ok(collateral)
    }

    /// Decide the owning item's status under the propagation rule. Siblings
    /// are re-read here, under the lock, with the triggering collateral's new
    /// value substituted for its stored one.
    async fn propagated_item_status(
        &self,
        item: &WorkItem,
        triggering_id: Id,
        triggering_status: ItemStatus,
    ) -> CrmResult<ItemStatus> {
        if !triggering_status.is_approved() {
            return Ok(triggering_status);
        }

        let item_id = item
            .id
            .ok_or_else(|| CrmError::Internal("item has no id".into()))?;
        let siblings = self.store.list_collateral_for_item(item_id).await?;
        let all_approved = siblings.iter().all(|sibling| {
            if sibling.id == Some(triggering_id) {
                triggering_status.is_approved()
            } else {
                sibling.status.is_approved()
            }
        });

        if all_approved {
            Ok(ItemStatus::Approved)
        } else {
            Ok(item.status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydration::test_support::Fixture;
    use crate::hydration::{AssemblyRequest, BlankAssembly};
    use bd_models::{Phase, PhaseNode, WorkPackage, WorkPackageTree};

    impl Fixture {
        fn collateral(&self) -> CollateralService {
            CollateralService::new(self.store.clone(), self.locks.clone())
        }
    }

    /// One work package, one phase, one item; returns the item id.
    async fn seeded_item(fixture: &Fixture) -> Id {
        let mut tree = WorkPackageTree::new(WorkPackage::new("Engagement", 1));
        let mut node = PhaseNode::new(Phase::new("Discovery", 1));
        node.items.push(bd_models::WorkItem::new("Site audit", "audit"));
        tree.phases.push(node);

        let saved = fixture
            .hydration()
            .assemble(AssemblyRequest::Blank(BlankAssembly { tree }))
            .await
            .unwrap();
        saved.phases[0].items[0].id.unwrap()
    }

    #[tokio::test]
    async fn test_non_approved_status_mirrors_onto_item() {
        let fixture = Fixture::new();
        let item_id = seeded_item(&fixture).await;
        let service = fixture.collateral();

        let collateral = service
            .create_collateral(item_id, "Audit report", ItemStatus::NotStarted)
            .await
            .unwrap();

        let item = service
            .record_status(collateral.id.unwrap(), ItemStatus::InReview)
            .await
            .unwrap();
        assert_eq!(item.status, ItemStatus::InReview);

        let item = service
            .record_status(collateral.id.unwrap(), ItemStatus::ChangesNeeded)
            .await
            .unwrap();
        assert_eq!(item.status, ItemStatus::ChangesNeeded);
    }

    #[tokio::test]
    async fn test_item_promotes_only_on_last_approval() {
        let fixture = Fixture::new();
        let item_id = seeded_item(&fixture).await;
        let service = fixture.collateral();

        let mut ids = Vec::new();
        for title in ["Draft", "Final", "Handoff"] {
            let collateral = service
                .create_collateral(item_id, title, ItemStatus::InProgress)
                .await
                .unwrap();
            ids.push(collateral.id.unwrap());
        }

        let item = service
            .record_status(ids[0], ItemStatus::Approved)
            .await
            .unwrap();
        assert_ne!(item.status, ItemStatus::Approved);

        let item = service
            .record_status(ids[1], ItemStatus::Approved)
            .await
            .unwrap();
        assert_ne!(item.status, ItemStatus::Approved);

        let item = service
            .record_status(ids[2], ItemStatus::Approved)
            .await
            .unwrap();
        assert_eq!(item.status, ItemStatus::Approved);
    }

    #[tokio::test]
    async fn test_blocked_approval_leaves_item_status_unchanged() {
        let fixture = Fixture::new();
        let item_id = seeded_item(&fixture).await;
        let service = fixture.collateral();

        let first = service
            .create_collateral(item_id, "Draft", ItemStatus::InProgress)
            .await
            .unwrap();
        service
            .create_collateral(item_id, "Final", ItemStatus::NotStarted)
            .await
            .unwrap();

        // Item was last mirrored to NOT_STARTED by the second creation;
        // a blocked approval must not move it
        let item = service
            .record_status(first.id.unwrap(), ItemStatus::Approved)
            .await
            .unwrap();
        assert_eq!(item.status, ItemStatus::NotStarted);
    }

    #[tokio::test]
    async fn test_new_collateral_demotes_approved_item() {
        let fixture = Fixture::new();
        let item_id = seeded_item(&fixture).await;
        let service = fixture.collateral();

        let only = service
            .create_collateral(item_id, "Draft", ItemStatus::InProgress)
            .await
            .unwrap();
        let item = service
            .record_status(only.id.unwrap(), ItemStatus::Approved)
            .await
            .unwrap();
        assert_eq!(item.status, ItemStatus::Approved);

        // Attaching fresh work reopens the item
        service
            .create_collateral(item_id, "Revision", ItemStatus::InProgress)
            .await
            .unwrap();
        let item = fixture.store.find_item(item_id).await.unwrap().unwrap();
        assert_eq!(item.status, ItemStatus::InProgress);
    }

    #[tokio::test]
    async fn test_missing_collateral_is_not_found() {
        let fixture = Fixture::new();
        seeded_item(&fixture).await;

        let err = fixture
            .collateral()
            .record_status(404, ItemStatus::Approved)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "not_found");
    }

    #[tokio::test]
    async fn test_collateral_on_missing_item_is_not_found() {
        let fixture = Fixture::new();
        let err = fixture
            .collateral()
            .create_collateral(404, "Orphan", ItemStatus::NotStarted)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "not_found");
    }
}
