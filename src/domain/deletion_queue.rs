// Deletion queue and the manager that commits it as one batch

use super::{MediaId, MediaItem};
use crate::catalog::AssetCatalog;
use crate::error::{Result, SweepError};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Ordered set of items marked for deletion, unique by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionQueue {
    items: Vec<MediaItem>,
    queued_bytes: u64,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the item unless an item with the same id is already queued.
    /// Returns whether the item was inserted.
    pub fn enqueue(&mut self, item: MediaItem) -> bool {
        if self.contains(&item.id) {
            return false;
        }
        self.queued_bytes = self.queued_bytes.saturating_add(item.estimated_size_bytes);
        self.items.push(item);
        true
    }

    /// Removes the item with the given id, if queued
    pub fn dequeue(&mut self, id: &MediaId) -> Option<MediaItem> {
        let position = self.items.iter().position(|item| &item.id == id)?;
        let removed = self.items.remove(position);
        self.queued_bytes = self.queued_bytes.saturating_sub(removed.estimated_size_bytes);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.queued_bytes = 0;
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }

    /// Sum of the estimated sizes of everything currently queued
    pub fn queued_bytes(&self) -> u64 {
        self.queued_bytes
    }

    fn remove_all(&mut self, ids: &[MediaId]) {
        for id in ids {
            self.dequeue(id);
        }
    }
}

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The queue was empty, the catalog was not called
    NothingToDo,
    Deleted { count: usize, bytes: u64 },
}

/// Owns the deletion queue and commits it to the catalog as one batch.
///
/// Every queue mutation takes the lock once and never holds it across an
/// `.await`, so `enqueue`, `dequeue` and `clear` stay usable while a commit
/// is waiting on the catalog.
#[derive(Debug)]
pub struct DeletionQueueManager<C: ?Sized> {
    catalog: Arc<C>,
    queue: Mutex<DeletionQueue>,
    committing: AtomicBool,
}

impl<C: AssetCatalog + ?Sized> DeletionQueueManager<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            queue: Mutex::new(DeletionQueue::new()),
            committing: AtomicBool::new(false),
        }
    }

    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    /// Queues the item, asking the catalog for its size when it is unknown
    pub fn enqueue(&self, mut item: MediaItem) -> bool {
        if item.estimated_size_bytes == 0 {
            item.estimated_size_bytes = self.catalog.estimated_size(&item);
        }
        let id = item.id.clone();
        let inserted = self.lock().enqueue(item);
        if inserted {
            debug!(%id, "Queued for deletion");
        }
        inserted
    }

    pub fn dequeue(&self, id: &MediaId) -> Option<MediaItem> {
        let removed = self.lock().dequeue(id);
        if removed.is_some() {
            debug!(%id, "Removed from deletion queue");
        }
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
        debug!("Deletion queue cleared");
    }

    /// Ordered copy of the queued items
    pub fn items(&self) -> Vec<MediaItem> {
        self.lock().items().to_vec()
    }

    /// Copy of the whole queue, items and byte total taken under one lock
    pub fn snapshot(&self) -> DeletionQueue {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.lock().contains(id)
    }

    pub fn queued_bytes(&self) -> u64 {
        self.lock().queued_bytes()
    }

    pub fn is_committing(&self) -> bool {
        self.committing.load(Ordering::Acquire)
    }

    /// Deletes every queued item through the catalog in a single call
    pub async fn commit(&self) -> Result<CommitOutcome> {
        let catalog = Arc::clone(&self.catalog);
        self.commit_with(|items| async move { catalog.batch_delete(&items).await })
            .await
    }

    /// Commits the queue through `delete_fn`, which is called exactly once
    /// with the full ordered list of queued items.
    ///
    /// A second commit while one is outstanding fails with
    /// [`SweepError::CommitBusy`] before reaching any await point. On failure
    /// the queue is left untouched. On success the committed items are
    /// removed; items queued while the delete was in flight stay queued.
    pub async fn commit_with<F, Fut>(&self, delete_fn: F) -> Result<CommitOutcome>
    where
        F: FnOnce(Vec<MediaItem>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let _guard = CommitGuard::acquire(&self.committing)?;

        let items = self.items();
        if items.is_empty() {
            return Ok(CommitOutcome::NothingToDo);
        }

        let count = items.len();
        let bytes = items.iter().map(|item| item.estimated_size_bytes).sum();
        let ids: Vec<MediaId> = items.iter().map(|item| item.id.clone()).collect();

        info!(count, bytes, "Committing deletion queue");

        match delete_fn(items).await {
            Ok(()) => {
                self.lock().remove_all(&ids);
                info!(count, bytes, "Deletion queue committed");
                Ok(CommitOutcome::Deleted { count, bytes })
            }
            Err(e) => {
                warn!(error = %e, count, "Batch delete failed, queue left intact");
                Err(match e {
                    SweepError::DeleteFailed(reason) => SweepError::DeleteFailed(reason),
                    other => SweepError::DeleteFailed(other.to_string()),
                })
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeletionQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the commit flag for the lifetime of one commit, including when the
/// commit future is dropped mid-flight
struct CommitGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CommitGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SweepError::CommitBusy)?;
        Ok(Self { flag })
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::domain::test_support::item;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    fn manager() -> DeletionQueueManager<MemoryCatalog> {
        DeletionQueueManager::new(Arc::new(MemoryCatalog::new()))
    }

    mod queue_tests {
        use super::*;

        #[test]
        fn test_queue_new_is_empty() {
            let queue = DeletionQueue::new();
            assert!(queue.is_empty());
            assert_eq!(queue.queued_bytes(), 0);
        }

        #[test]
        fn test_enqueue_is_idempotent() {
            let mut once = DeletionQueue::new();
            once.enqueue(item("a", 100, 0));

            let mut twice = DeletionQueue::new();
            assert!(twice.enqueue(item("a", 100, 0)));
            assert!(!twice.enqueue(item("a", 100, 0)));

            assert_eq!(once, twice);
            assert_eq!(twice.len(), 1);
            assert_eq!(twice.queued_bytes(), 100);
        }

        #[test]
        fn test_enqueue_preserves_insertion_order() {
            let mut queue = DeletionQueue::new();
            queue.enqueue(item("c", 1, 0));
            queue.enqueue(item("a", 1, 0));
            queue.enqueue(item("b", 1, 0));

            let ids: Vec<_> = queue.items().iter().map(|i| i.id.as_str()).collect();
            assert_eq!(ids, vec!["c", "a", "b"]);
        }

        #[test]
        fn test_dequeue_missing_is_noop() {
            let mut queue = DeletionQueue::new();
            queue.enqueue(item("a", 100, 0));

            assert!(queue.dequeue(&MediaId::new("zzz")).is_none());
            assert_eq!(queue.len(), 1);
            assert_eq!(queue.queued_bytes(), 100);
        }

        #[test]
        fn test_dequeue_updates_bytes() {
            let mut queue = DeletionQueue::new();
            queue.enqueue(item("a", 100, 0));
            queue.enqueue(item("c", 50, 0));

            let removed = queue.dequeue(&MediaId::new("a")).unwrap();
            assert_eq!(removed.id.as_str(), "a");
            assert_eq!(queue.len(), 1);
            assert_eq!(queue.queued_bytes(), 50);
        }

        #[test]
        fn test_zero_sized_items_are_counted() {
            let mut queue = DeletionQueue::new();
            queue.enqueue(item("unknown", 0, 0));
            assert_eq!(queue.len(), 1);
            assert_eq!(queue.queued_bytes(), 0);
        }

        #[test]
        fn test_bytes_conserved_over_mixed_operations() {
            let mut queue = DeletionQueue::new();
            let pool = [
                item("a", 100, 0),
                item("b", 200, 1),
                item("c", 50, 2),
                item("d", 7, 3),
            ];

            // Deterministic walk over enqueue/dequeue combinations
            for step in 0..40usize {
                let target = &pool[(step * 7) % pool.len()];
                if step % 3 == 0 {
                    queue.dequeue(&target.id);
                } else {
                    queue.enqueue(target.clone());
                }

                let expected: u64 = queue.items().iter().map(|i| i.estimated_size_bytes).sum();
                assert_eq!(queue.queued_bytes(), expected, "step {}", step);
            }
        }

        #[test]
        fn test_clear() {
            let mut queue = DeletionQueue::new();
            queue.enqueue(item("a", 100, 0));
            queue.enqueue(item("b", 200, 0));

            queue.clear();
            assert!(queue.is_empty());
            assert_eq!(queue.queued_bytes(), 0);
        }
    }

    mod manager_tests {
        use super::*;

        #[tokio::test]
        async fn test_commit_empty_queue_is_nothing_to_do() {
            let manager = manager();
            let calls = AtomicUsize::new(0);

            let outcome = manager
                .commit_with(|_items| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                })
                .await
                .unwrap();

            assert_eq!(outcome, CommitOutcome::NothingToDo);
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }

        #[tokio::test]
        async fn test_commit_success_clears_queue() {
            let manager = manager();
            manager.enqueue(item("a", 100, 0));
            manager.enqueue(item("c", 50, 1));

            let calls = AtomicUsize::new(0);
            let mut seen = Vec::new();
            let outcome = manager
                .commit_with(|items| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    seen = items.iter().map(|i| i.id.clone()).collect();
                    async { Ok(()) }
                })
                .await
                .unwrap();

            assert_eq!(
                outcome,
                CommitOutcome::Deleted {
                    count: 2,
                    bytes: 150
                }
            );
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(seen, vec![MediaId::new("a"), MediaId::new("c")]);
            assert!(manager.is_empty());
            assert_eq!(manager.queued_bytes(), 0);
            assert!(!manager.is_committing());
        }

        #[tokio::test]
        async fn test_commit_failure_leaves_queue_intact() {
            let manager = manager();
            manager.enqueue(item("a", 100, 0));
            manager.enqueue(item("c", 50, 1));
            let before = manager.snapshot();

            let result = manager
                .commit_with(|_items| async {
                    Err(SweepError::DeleteFailed("user declined".to_string()))
                })
                .await;

            match result {
                Err(SweepError::DeleteFailed(reason)) => assert_eq!(reason, "user declined"),
                other => panic!("Expected DeleteFailed, got {:?}", other),
            }
            assert_eq!(manager.snapshot(), before);
            assert!(!manager.is_committing());
        }

        #[tokio::test]
        async fn test_commit_failure_other_errors_become_delete_failed() {
            let manager = manager();
            manager.enqueue(item("a", 100, 0));

            let result = manager
                .commit_with(|_items| async {
                    Err(SweepError::AdapterUnavailable("revoked".to_string()))
                })
                .await;

            assert!(matches!(result, Err(SweepError::DeleteFailed(_))));
            assert_eq!(manager.len(), 1);
        }

        #[tokio::test]
        async fn test_concurrent_commit_is_busy() {
            let manager = Arc::new(manager());
            manager.enqueue(item("a", 100, 0));

            let (release_tx, release_rx) = oneshot::channel::<()>();
            let first = {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move {
                    manager
                        .commit_with(|_items| async move {
                            let _ = release_rx.await;
                            Ok(())
                        })
                        .await
                })
            };

            while !manager.is_committing() {
                tokio::task::yield_now().await;
            }

            let second = manager.commit_with(|_items| async { Ok(()) }).await;
            assert!(matches!(second, Err(SweepError::CommitBusy)));

            // Mutations stay available while the commit is suspended
            manager.enqueue(item("late", 30, 2));
            assert_eq!(manager.queued_bytes(), 130);

            release_tx.send(()).unwrap();
            let outcome = first.await.unwrap().unwrap();

            assert_eq!(
                outcome,
                CommitOutcome::Deleted {
                    count: 1,
                    bytes: 100
                }
            );
            // Only the committed item is gone
            assert_eq!(manager.items(), vec![item("late", 30, 2)]);
            assert_eq!(manager.queued_bytes(), 30);
            assert!(!manager.is_committing());
        }

        #[test]
        fn test_enqueue_fills_unknown_size_from_catalog() {
            let catalog = Arc::new(MemoryCatalog::with_items(vec![item("a", 123, 0)]));
            let manager = DeletionQueueManager::new(catalog);

            manager.enqueue(item("a", 0, 0));
            assert_eq!(manager.queued_bytes(), 123);
            assert_eq!(manager.items()[0].estimated_size_bytes, 123);

            // Still unknown to the catalog: counted, zero bytes
            manager.enqueue(item("ghost", 0, 1));
            assert_eq!(manager.len(), 2);
            assert_eq!(manager.queued_bytes(), 123);
        }

        #[test]
        fn test_enqueue_keeps_known_size() {
            let catalog = Arc::new(MemoryCatalog::with_items(vec![item("a", 123, 0)]));
            let manager = DeletionQueueManager::new(catalog);

            manager.enqueue(item("a", 50, 0));
            assert_eq!(manager.queued_bytes(), 50);
        }

        #[tokio::test]
        async fn test_commit_uses_catalog_batch_delete() {
            let catalog = Arc::new(MemoryCatalog::with_items(vec![
                item("a", 100, 0),
                item("b", 200, 1),
            ]));
            let manager = DeletionQueueManager::new(Arc::clone(&catalog));
            manager.enqueue(item("a", 100, 0));
            manager.enqueue(item("b", 200, 1));

            manager.commit().await.unwrap();

            let calls = catalog.delete_calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0], vec![MediaId::new("a"), MediaId::new("b")]);
            assert!(catalog.items().is_empty());
        }

        #[tokio::test]
        async fn test_commit_surfaces_catalog_failure() {
            let catalog = Arc::new(MemoryCatalog::with_items(vec![item("a", 100, 0)]));
            catalog.fail_deletes("confirmation dismissed");
            let manager = DeletionQueueManager::new(Arc::clone(&catalog));
            manager.enqueue(item("a", 100, 0));

            let result = manager.commit().await;

            assert!(matches!(result, Err(SweepError::DeleteFailed(_))));
            assert_eq!(manager.len(), 1);
            assert_eq!(catalog.items().len(), 1);
        }
    }
}
