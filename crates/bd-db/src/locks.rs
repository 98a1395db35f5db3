//! Per-work-package writer locks
//!
//! Every mutation path (assembly merge, anchor change, collateral
//! propagation, phase status transition, delete) holds the owning work
//! package's lock across its whole read-modify-write, so two concurrent
//! writers can never interleave a half-applied schedule.

use std::sync::Arc;

use bd_core::Id;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-work-package writer locks
#[derive(Default)]
pub struct WorkPackageLocks {
    locks: DashMap<Id, Arc<Mutex<()>>>,
}

impl WorkPackageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the writer lock for a work package, waiting if another writer
    /// holds it. The guard is owned so it can cross await points.
    pub async fn acquire(&self, work_package_id: Id) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(work_package_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_same_id_serializes() {
        let locks = Arc::new(WorkPackageLocks::new());
        let concurrent = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let concurrent = concurrent.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(42).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst);
                assert_eq!(now, 0, "another writer held the same lock");
                tokio::task::yield_now().await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_ids_do_not_block() {
        let locks = WorkPackageLocks::new();
        let _a = locks.acquire(1).await;
        // Would deadlock if ids shared a lock
        let _b = locks.acquire(2).await;
    }
}
