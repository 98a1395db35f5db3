//! In-memory store
//!
//! Backs the service tests and keeps the server bootable when Postgres is
//! unreachable. Mutations take the write lock for their whole duration, so
//! each call is atomic exactly like the Postgres transactions.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bd_core::{CrmError, CrmResult, Id};
use bd_models::{
    DeliverableTemplate, ItemStatus, Phase, PhaseNode, PhaseTemplate, WorkCollateral, WorkItem,
    WorkPackage, WorkPackageTree,
};
use parking_lot::RwLock;

use crate::store::{CrmStore, TemplateCatalog};

#[derive(Default)]
struct Inner {
    next_id: Id,
    contacts: HashSet<Id>,
    work_packages: HashMap<Id, WorkPackage>,
    phases: HashMap<Id, Phase>,
    items: HashMap<Id, WorkItem>,
    collateral: HashMap<Id, WorkCollateral>,
}

impl Inner {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    fn assemble_tree(&self, work_package_id: Id) -> Option<WorkPackageTree> {
        let wp = self.work_packages.get(&work_package_id)?.clone();

        let mut phases: Vec<PhaseNode> = self
            .phases
            .values()
            .filter(|phase| phase.work_package_id == Some(work_package_id))
            .cloned()
            .map(|phase| {
                let mut items: Vec<WorkItem> = self
                    .items
                    .values()
                    .filter(|item| item.phase_id == phase.id)
                    .cloned()
                    .collect();
                items.sort_by_key(|item| item.id);
                PhaseNode { phase, items }
            })
            .collect();
        phases.sort_by_key(|node| node.phase.position);

        Some(WorkPackageTree {
            work_package: wp,
            phases,
        })
    }

    fn store_tree(&mut self, mut tree: WorkPackageTree) -> CrmResult<Id> {
        let wp_id = match tree.work_package.id {
            Some(id) => {
                if !self.work_packages.contains_key(&id) {
                    return Err(CrmError::not_found("WorkPackage", "id", id));
                }
                id
            }
            None => {
                let id = self.next_id();
                tree.work_package.id = Some(id);
                id
            }
        };
        self.work_packages.insert(wp_id, tree.work_package.clone());

        for node in &mut tree.phases {
            let mut phase = node.phase.clone();
            phase.work_package_id = Some(wp_id);
            let phase_id = match phase.id {
                Some(id) => {
                    if !self.phases.contains_key(&id) {
                        return Err(CrmError::not_found("Phase", "id", id));
                    }
                    id
                }
                None => {
                    let id = self.next_id();
                    phase.id = Some(id);
                    id
                }
            };
            self.phases.insert(phase_id, phase);

            for item in &mut node.items {
                let mut item = item.clone();
                item.work_package_id = Some(wp_id);
                item.phase_id = Some(phase_id);
                let item_id = match item.id {
                    Some(id) => {
                        if !self.items.contains_key(&id) {
                            return Err(CrmError::not_found("WorkItem", "id", id));
                        }
                        id
                    }
                    None => {
                        let id = self.next_id();
                        item.id = Some(id);
                        id
                    }
                };
                self.items.insert(item_id, item);
            }
        }

        Ok(wp_id)
    }
}

/// In-memory implementation of `CrmStore`
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contact id so `contact_exists` passes.
    pub fn add_contact(&self, contact_id: Id) {
        self.inner.write().contacts.insert(contact_id);
    }
}

#[async_trait]
impl CrmStore for MemoryStore {
    async fn contact_exists(&self, contact_id: Id) -> CrmResult<bool> {
        Ok(self.inner.read().contacts.contains(&contact_id))
    }

    async fn load_tree(&self, work_package_id: Id) -> CrmResult<Option<WorkPackageTree>> {
        Ok(self.inner.read().assemble_tree(work_package_id))
    }

    async fn insert_tree(&self, mut tree: WorkPackageTree) -> CrmResult<WorkPackageTree> {
        tree.work_package.id = None;
        for node in &mut tree.phases {
            node.phase.id = None;
            for item in &mut node.items {
                item.id = None;
            }
        }
        self.save_tree(tree).await
    }

    async fn save_tree(&self, tree: WorkPackageTree) -> CrmResult<WorkPackageTree> {
        let mut inner = self.inner.write();
        let wp_id = inner.store_tree(tree)?;
        inner
            .assemble_tree(wp_id)
            .ok_or_else(|| CrmError::Internal("tree vanished during save".into()))
    }

    async fn delete_work_package(&self, work_package_id: Id) -> CrmResult<()> {
        let mut inner = self.inner.write();
        if inner.work_packages.remove(&work_package_id).is_none() {
            return Err(CrmError::not_found("WorkPackage", "id", work_package_id));
        }
        inner
            .phases
            .retain(|_, phase| phase.work_package_id != Some(work_package_id));
        inner
            .items
            .retain(|_, item| item.work_package_id != Some(work_package_id));
        inner
            .collateral
            .retain(|_, collateral| collateral.work_package_id != work_package_id);
        Ok(())
    }

    async fn find_item(&self, item_id: Id) -> CrmResult<Option<WorkItem>> {
        Ok(self.inner.read().items.get(&item_id).cloned())
    }

    async fn find_collateral(&self, collateral_id: Id) -> CrmResult<Option<WorkCollateral>> {
        Ok(self.inner.read().collateral.get(&collateral_id).cloned())
    }

    async fn list_collateral_for_item(&self, item_id: Id) -> CrmResult<Vec<WorkCollateral>> {
        let inner = self.inner.read();
        let mut siblings: Vec<WorkCollateral> = inner
            .collateral
            .values()
            .filter(|collateral| collateral.item_id == item_id)
            .cloned()
            .collect();
        siblings.sort_by_key(|collateral| collateral.id);
        Ok(siblings)
    }

    async fn insert_collateral(&self, mut collateral: WorkCollateral) -> CrmResult<WorkCollateral> {
        let mut inner = self.inner.write();
        if !inner.items.contains_key(&collateral.item_id) {
            return Err(CrmError::not_found("WorkItem", "id", collateral.item_id));
        }
        let id = inner.next_id();
        collateral.id = Some(id);
        inner.collateral.insert(id, collateral.clone());
        Ok(collateral)
    }

    async fn save_collateral_and_item_status(
        &self,
        collateral_id: Id,
        collateral_status: ItemStatus,
        item_id: Id,
        item_status: ItemStatus,
    ) -> CrmResult<WorkItem> {
        let mut inner = self.inner.write();

        let collateral = inner
            .collateral
            .get_mut(&collateral_id)
            .ok_or_else(|| CrmError::not_found("WorkCollateral", "id", collateral_id))?;
        collateral.status = collateral_status;

        let item = inner
            .items
            .get_mut(&item_id)
            .ok_or_else(|| CrmError::not_found("WorkItem", "id", item_id))?;
        item.status = item_status;
        Ok(item.clone())
    }
}

/// In-memory implementation of the read-only template catalog
#[derive(Default)]
pub struct MemoryCatalog {
    phase_templates: RwLock<HashMap<Id, PhaseTemplate>>,
    deliverable_templates: RwLock<HashMap<Id, DeliverableTemplate>>,
    next_id: RwLock<Id>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> Id {
        let mut next = self.next_id.write();
        *next += 1;
        *next
    }

    /// Register (or overwrite) a phase template; templates seeded with an
    /// explicit id keep it.
    pub fn add_phase_template(&self, mut template: PhaseTemplate) -> Id {
        let id = template.id.unwrap_or_else(|| self.next_id());
        template.id = Some(id);
        self.phase_templates.write().insert(id, template);
        id
    }

    pub fn add_deliverable_template(&self, mut template: DeliverableTemplate) -> Id {
        let id = template.id.unwrap_or_else(|| self.next_id());
        template.id = Some(id);
        self.deliverable_templates.write().insert(id, template);
        id
    }
}

#[async_trait]
impl TemplateCatalog for MemoryCatalog {
    async fn phase_template(&self, id: Id) -> CrmResult<Option<PhaseTemplate>> {
        Ok(self.phase_templates.read().get(&id).cloned())
    }

    async fn deliverable_template(&self, id: Id) -> CrmResult<Option<DeliverableTemplate>> {
        Ok(self.deliverable_templates.read().get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> WorkPackageTree {
        let mut tree = WorkPackageTree::new(WorkPackage::new("Engagement", 1));
        let mut node = PhaseNode::new(Phase::new("Discovery", 1));
        node.items.push(WorkItem::new("Site audit", "audit"));
        tree.phases.push(node);
        tree
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_throughout() {
        let store = MemoryStore::new();
        let tree = store.insert_tree(sample_tree()).await.unwrap();

        assert!(tree.work_package.id.is_some());
        let phase = &tree.phases[0];
        assert!(phase.phase.id.is_some());
        assert_eq!(phase.phase.work_package_id, tree.work_package.id);
        assert_eq!(phase.items[0].phase_id, phase.phase.id);
    }

    #[tokio::test]
    async fn test_save_tree_updates_in_place() {
        let store = MemoryStore::new();
        let mut tree = store.insert_tree(sample_tree()).await.unwrap();
        let wp_id = tree.work_package.id.unwrap();

        tree.phases[0].phase.total_estimated_hours = 16.0;
        store.save_tree(tree).await.unwrap();

        let reloaded = store.load_tree(wp_id).await.unwrap().unwrap();
        assert_eq!(reloaded.phases.len(), 1);
        assert_eq!(reloaded.phases[0].phase.total_estimated_hours, 16.0);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = MemoryStore::new();
        let tree = store.insert_tree(sample_tree()).await.unwrap();
        let wp_id = tree.work_package.id.unwrap();
        let item_id = tree.phases[0].items[0].id.unwrap();

        store
            .insert_collateral(WorkCollateral::new(item_id, wp_id, "Draft"))
            .await
            .unwrap();

        store.delete_work_package(wp_id).await.unwrap();
        assert!(store.load_tree(wp_id).await.unwrap().is_none());
        assert!(store.find_item(item_id).await.unwrap().is_none());
        assert!(store
            .list_collateral_for_item(item_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete_work_package(99).await.unwrap_err();
        assert_eq!(err.error_code(), "not_found");
    }
}
