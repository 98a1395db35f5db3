//! Store traits
//!
//! Services take injected trait objects so the Postgres store can be swapped
//! for the in-memory one in tests. Methods are coarse on purpose: every
//! multi-row mutation is one call and one transaction, so callers never
//! observe a half-updated schedule.

use async_trait::async_trait;
use bd_core::{CrmResult, Id};
use bd_models::{
    DeliverableTemplate, ItemStatus, PhaseTemplate, WorkCollateral, WorkItem, WorkPackageTree,
};

/// Storage operations for the engagement subsystem
#[async_trait]
pub trait CrmStore: Send + Sync {
    /// Whether the owning contact exists. Contacts themselves are managed by
    /// the surrounding CRM.
    async fn contact_exists(&self, contact_id: Id) -> CrmResult<bool>;

    /// Load the fully hydrated tree, phases in position order.
    async fn load_tree(&self, work_package_id: Id) -> CrmResult<Option<WorkPackageTree>>;

    /// Insert a brand-new tree, assigning ids throughout. One transaction.
    async fn insert_tree(&self, tree: WorkPackageTree) -> CrmResult<WorkPackageTree>;

    /// Upsert an existing tree: entities with ids update in place, entities
    /// without ids are inserted. Never deletes. One transaction.
    async fn save_tree(&self, tree: WorkPackageTree) -> CrmResult<WorkPackageTree>;

    /// Delete a work package, cascading through phases, items, collateral.
    async fn delete_work_package(&self, work_package_id: Id) -> CrmResult<()>;

    async fn find_item(&self, item_id: Id) -> CrmResult<Option<WorkItem>>;

    async fn find_collateral(&self, collateral_id: Id) -> CrmResult<Option<WorkCollateral>>;

    /// The full current sibling set for an item. Status propagation always
    /// re-reads this; it never keeps counters.
    async fn list_collateral_for_item(&self, item_id: Id) -> CrmResult<Vec<WorkCollateral>>;

    async fn insert_collateral(&self, collateral: WorkCollateral) -> CrmResult<WorkCollateral>;

    /// Write a collateral status and the owning item status together, in one
    /// transaction, so a crash between the two cannot leave the item stale.
    async fn save_collateral_and_item_status(
        &self,
        collateral_id: Id,
        collateral_status: ItemStatus,
        item_id: Id,
        item_status: ItemStatus,
    ) -> CrmResult<WorkItem>;
}

/// Read-only phase/deliverable template catalog
#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn phase_template(&self, id: Id) -> CrmResult<Option<PhaseTemplate>>;

    async fn deliverable_template(&self, id: Id) -> CrmResult<Option<DeliverableTemplate>>;
}
