// ============================================================================
// State Snapshot
// ============================================================================
//
// The orchestrator owns the only `StateStore` (write handle). Observers get a
// `StateSubscription`, which can read and wait for changes but never write.
//
// Every publish builds a brand new `StateSnapshot` and swaps the `Arc` inside
// the watch channel (Copy-on-Write), so a reader holding an older snapshot
// never sees a half-applied update. The filtered view is recomputed by the
// projection on each publish and cannot be set directly.
//
// ============================================================================

use crate::filter::{FilterCriteria, FilterProjection};
use crate::model::CustomList;
use im::Vector;
use std::sync::Arc;
use tokio::sync::watch;

/// Immutable view of the list collection and its filtered projection
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    lists: Vector<CustomList>,
    filtered_lists: Vector<CustomList>,
    criteria: FilterCriteria,
    is_loading: bool,
    error: Option<String>,
    version: u64,
}

impl StateSnapshot {
    fn empty() -> Self {
        Self {
            lists: Vector::new(),
            filtered_lists: Vector::new(),
            criteria: FilterCriteria::default(),
            is_loading: false,
            error: None,
            version: 0,
        }
    }

    pub fn lists(&self) -> &Vector<CustomList> {
        &self.lists
    }

    pub fn filtered_lists(&self) -> &Vector<CustomList> {
        &self.filtered_lists
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Monotonic publish counter
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn find_list(&self, id: &str) -> Option<&CustomList> {
        self.lists.iter().find(|list| list.id == id)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.lists.iter().position(|list| list.id == id)
    }
}

/// Mutable draft handed to `StateStore::publish`.
///
/// The filtered view is deliberately absent: it is always derived.
#[derive(Debug, Clone)]
pub struct StateDraft {
    pub lists: Vector<CustomList>,
    pub criteria: FilterCriteria,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl StateDraft {
    /// Replace the list with the same id, or append when absent.
    pub fn upsert_list(&mut self, list: CustomList) {
        match self.lists.iter().position(|existing| existing.id == list.id) {
            Some(index) => {
                self.lists.set(index, list);
            }
            None => self.lists.push_back(list),
        }
    }

    /// Insert at `index`, clamped to the collection length. Replaces an
    /// existing entry with the same id instead of duplicating it.
    pub fn insert_list_at(&mut self, index: usize, list: CustomList) {
        if let Some(existing) = self.lists.iter().position(|entry| entry.id == list.id) {
            self.lists.set(existing, list);
            return;
        }
        let index = index.min(self.lists.len());
        self.lists.insert(index, list);
    }

    pub fn remove_list(&mut self, id: &str) -> Option<CustomList> {
        let index = self.lists.iter().position(|list| list.id == id)?;
        Some(self.lists.remove(index))
    }

    /// Apply `f` to the list with `id`; returns `false` when it is absent.
    pub fn modify_list(&mut self, id: &str, f: impl FnOnce(&mut CustomList)) -> bool {
        let Some(index) = self.lists.iter().position(|list| list.id == id) else {
            return false;
        };
        let mut list = self.lists[index].clone();
        f(&mut list);
        self.lists.set(index, list);
        true
    }
}

/// Single writer over the published snapshot
pub struct StateStore {
    sender: watch::Sender<Arc<StateSnapshot>>,
    projection: Arc<dyn FilterProjection>,
}

impl StateStore {
    pub fn new(projection: Arc<dyn FilterProjection>) -> Self {
        let (sender, _) = watch::channel(Arc::new(StateSnapshot::empty()));
        Self { sender, projection }
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub fn current(&self) -> Arc<StateSnapshot> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> StateSubscription {
        StateSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Atomically derive and publish the next snapshot.
    ///
    /// `f` edits a draft of the current state; the filtered view is then
    /// recomputed from the draft and the result replaces the snapshot.
    /// Returns the published snapshot.
    pub fn publish<F>(&self, f: F) -> Arc<StateSnapshot>
    where
        F: FnOnce(&mut StateDraft),
    {
        let mut published = None;
        self.sender.send_modify(|current| {
            let mut draft = StateDraft {
                lists: current.lists.clone(),
                criteria: current.criteria.clone(),
                is_loading: current.is_loading,
                error: current.error.clone(),
            };
            f(&mut draft);

            let filtered_lists = self.projection.apply(&draft.lists, &draft.criteria);
            let next = Arc::new(StateSnapshot {
                lists: draft.lists,
                filtered_lists,
                criteria: draft.criteria,
                is_loading: draft.is_loading,
                error: draft.error,
                version: current.version + 1,
            });
            published = Some(next.clone());
            *current = next;
        });
        // send_modify always runs the closure
        published.unwrap_or_else(|| self.current())
    }

    /// Drop every list and status flag, keeping the active criteria.
    pub fn reset(&self) -> Arc<StateSnapshot> {
        self.publish(|draft| {
            draft.lists = Vector::new();
            draft.is_loading = false;
            draft.error = None;
        })
    }
}

/// Read-only observer handle
#[derive(Clone)]
pub struct StateSubscription {
    receiver: watch::Receiver<Arc<StateSnapshot>>,
}

impl StateSubscription {
    /// Latest snapshot, marking it as seen.
    pub fn latest(&mut self) -> Arc<StateSnapshot> {
        self.receiver.borrow_and_update().clone()
    }

    /// Wait until a snapshot newer than the last one seen is published.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<StateSnapshot>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DefaultFilterProjection;

    fn store() -> StateStore {
        StateStore::new(Arc::new(DefaultFilterProjection::new()))
    }

    #[test]
    fn test_publish_reprojects_and_bumps_version() {
        let store = store();
        let before = store.current();
        assert_eq!(before.version(), 0);

        let after = store.publish(|draft| draft.upsert_list(CustomList::new("L1", "Groceries")));
        assert_eq!(after.version(), 1);
        assert_eq!(after.lists().len(), 1);
        assert_eq!(after.filtered_lists().len(), 1);

        // Old reference is untouched
        assert!(before.lists().is_empty());
    }

    #[test]
    fn test_criteria_change_recomputes_view() {
        let store = store();
        store.publish(|draft| {
            draft.upsert_list(CustomList::new("L1", "Groceries"));
            draft.upsert_list(CustomList::new("L2", "Books"));
        });
        let snapshot = store.publish(|draft| draft.criteria.search_query = Some("groc".into()));
        assert_eq!(snapshot.lists().len(), 2);
        assert_eq!(snapshot.filtered_lists().len(), 1);
        assert_eq!(snapshot.filtered_lists()[0].id, "L1");
    }

    #[test]
    fn test_insert_at_restores_position() {
        let store = store();
        store.publish(|draft| {
            draft.upsert_list(CustomList::new("a", "A"));
            draft.upsert_list(CustomList::new("b", "B"));
            draft.upsert_list(CustomList::new("c", "C"));
        });
        let removed = store.current().find_list("b").cloned().unwrap();
        store.publish(|draft| {
            draft.remove_list("b");
        });
        let snapshot = store.publish(|draft| draft.insert_list_at(1, removed));
        let ids: Vec<_> = snapshot.lists().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reset_keeps_criteria() {
        let store = store();
        store.publish(|draft| {
            draft.upsert_list(CustomList::new("L1", "Groceries"));
            draft.criteria.show_completed = false;
            draft.error = Some("boom".into());
        });
        let snapshot = store.reset();
        assert!(snapshot.lists().is_empty());
        assert!(snapshot.error().is_none());
        assert!(!snapshot.criteria().show_completed);
    }

    #[tokio::test]
    async fn test_subscription_observes_publish() {
        let store = store();
        let mut subscription = store.subscribe();
        assert_eq!(subscription.latest().version(), 0);

        store.publish(|draft| draft.is_loading = true);
        let next = subscription.changed().await.unwrap();
        assert!(next.is_loading());
        assert_eq!(next.version(), 1);
    }
}
