//! Work collateral: review artifacts attached to items

use bd_core::traits::{Id, Identifiable};
use serde::{Deserialize, Serialize};

use crate::status::ItemStatus;

/// A content artifact with its own independent review-state lifecycle,
/// many-to-one to a `WorkItem`. In scope here only for the status
/// propagation rule; content itself lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkCollateral {
    pub id: Option<Id>,
    pub item_id: Id,
    pub work_package_id: Id,
    pub title: String,
    pub status: ItemStatus,
}

impl WorkCollateral {
    pub fn new(item_id: Id, work_package_id: Id, title: impl Into<String>) -> Self {
        Self {
            id: None,
            item_id,
            work_package_id,
            title: title.into(),
            status: ItemStatus::NotStarted,
        }
    }
}

impl Identifiable for WorkCollateral {
    fn id(&self) -> Option<Id> {
        self.id
    }
}
