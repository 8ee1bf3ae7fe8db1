//! Terminal-wide caches, one per entity type.
//!
//! Each store publishes the complete current collection on a watch channel:
//! a new subscriber immediately sees the latest snapshot, then every
//! replacement after it. Snapshots are immutable `Arc<Vec<_>>` values.

mod doctors;
mod patients;

pub use doctors::*;
pub use patients::*;

use std::sync::Arc;

use tokio::sync::watch;

/// An immutable, shareable collection snapshot.
pub type Snapshot<T> = Arc<Vec<T>>;

/// Holds the latest snapshot and replays it to subscribers.
pub struct SnapshotCell<T> {
    tx: watch::Sender<Snapshot<T>>,
}

impl<T> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotCell<T> {
    /// Start with an empty collection.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(Vec::new()));
        Self { tx }
    }

    /// Latest snapshot.
    pub fn current(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    /// Subscribe; the receiver starts at the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.tx.subscribe()
    }

    /// Publish a new collection.
    pub(crate) fn replace(&self, next: Vec<T>) {
        self.tx.send_replace(Arc::new(next));
    }
}

impl<T: Clone> SnapshotCell<T> {
    /// Copy the current collection, edit it, and publish if `edit` reports a change.
    pub(crate) fn update(&self, edit: impl FnOnce(&mut Vec<T>) -> bool) -> bool {
        let mut next = self.current().as_ref().clone();
        let changed = edit(&mut next);
        if changed {
            self.replace(next);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_latest_to_late_subscriber() {
        let cell = SnapshotCell::new();
        cell.replace(vec![1, 2]);
        cell.replace(vec![3]);

        let rx = cell.subscribe();
        assert_eq!(rx.borrow().as_ref(), &vec![3]);
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let cell = SnapshotCell::new();
        cell.replace(vec![1]);
        let before = cell.current();

        cell.update(|v| {
            v.push(2);
            true
        });

        assert_eq!(before.as_ref(), &vec![1]);
        assert_eq!(cell.current().as_ref(), &vec![1, 2]);
    }

    #[test]
    fn test_unchanged_update_not_published() {
        let cell: SnapshotCell<u8> = SnapshotCell::new();
        let mut rx = cell.subscribe();
        rx.borrow_and_update();

        assert!(!cell.update(|_| false));
        assert!(!rx.has_changed().unwrap());
    }
}
