//! Latest order book snapshot.
//!
//! The session is the only writer. Readers hold a [`BookReader`] and always
//! see either `None` (nothing received yet for the current instrument) or a
//! complete snapshot, because each update swaps a whole `Arc`.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::models::BookSnapshot;

/// Read-only view of the current snapshot.
pub type BookReader = watch::Receiver<Option<Arc<BookSnapshot>>>;

/// Single-writer holder of the most recent book snapshot.
#[derive(Debug)]
pub struct BookSnapshotStore {
    tx: watch::Sender<Option<Arc<BookSnapshot>>>,
    /// Poll results numbered below this belong to an earlier activation.
    floor_seq: u64,
    last_applied_seq: Option<u64>,
}

impl BookSnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            floor_seq: 0,
            last_applied_seq: None,
        }
    }

    /// Replaces the visible snapshot with the result of poll number `seq`.
    ///
    /// Returns the snapshot's last traded price when it was applied, and
    /// `None` when the result was older than what the store already shows
    /// or predates the current activation.
    pub fn update(&mut self, seq: u64, snapshot: BookSnapshot) -> Option<Option<f64>> {
        if seq < self.floor_seq || self.last_applied_seq.is_some_and(|last| seq <= last) {
            debug!(
                seq,
                floor = self.floor_seq,
                last_applied = ?self.last_applied_seq,
                "Discarding out-of-order book snapshot"
            );
            return None;
        }

        let ltp = snapshot.ltp();
        self.last_applied_seq = Some(seq);
        self.tx.send_replace(Some(Arc::new(snapshot)));
        Some(ltp)
    }

    /// The latest snapshot, or `None` before the first successful poll.
    #[must_use]
    pub fn current(&self) -> Option<Arc<BookSnapshot>> {
        self.tx.borrow().clone()
    }

    /// Clears the snapshot and ignores any result numbered below `floor_seq`.
    pub fn reset(&mut self, floor_seq: u64) {
        self.floor_seq = floor_seq;
        self.last_applied_seq = None;
        self.tx.send_replace(None);
    }

    /// Hands out a receiver that observes every replacement.
    #[must_use]
    pub fn subscribe(&self) -> BookReader {
        self.tx.subscribe()
    }
}

impl Default for BookSnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookLevel;

    fn book(ltp: f64) -> BookSnapshot {
        BookSnapshot::new(
            vec![BookLevel::new(ltp - 0.5, 1.0)],
            vec![BookLevel::new(ltp + 0.5, 1.0)],
            Some(ltp),
        )
    }

    #[test]
    fn starts_empty() {
        let store = BookSnapshotStore::new();
        assert!(store.current().is_none());
        assert!(store.subscribe().borrow().is_none());
    }

    #[test]
    fn update_replaces_and_forwards_ltp() {
        let mut store = BookSnapshotStore::new();
        let reader = store.subscribe();

        assert_eq!(store.update(1, book(100.0)), Some(Some(100.0)));
        assert_eq!(store.update(2, book(101.0)), Some(Some(101.0)));

        assert_eq!(store.current().and_then(|b| b.ltp()), Some(101.0));
        assert_eq!(reader.borrow().as_ref().and_then(|b| b.ltp()), Some(101.0));
    }

    #[test]
    fn snapshot_without_ltp_is_still_applied() {
        let mut store = BookSnapshotStore::new();
        let snapshot = BookSnapshot::new(vec![], vec![BookLevel::new(5.0, 1.0)], None);
        assert_eq!(store.update(1, snapshot), Some(None));
        assert!(store.current().is_some());
    }

    #[test]
    fn older_completion_does_not_overwrite_newer() {
        let mut store = BookSnapshotStore::new();
        assert!(store.update(5, book(105.0)).is_some());
        assert!(store.update(4, book(104.0)).is_none());
        assert!(store.update(5, book(999.0)).is_none());
        assert_eq!(store.current().and_then(|b| b.ltp()), Some(105.0));
    }

    #[test]
    fn reset_clears_and_rejects_earlier_activations() {
        let mut store = BookSnapshotStore::new();
        store.update(3, book(3.0));

        store.reset(10);
        assert!(store.current().is_none());
        assert!(store.update(7, book(7.0)).is_none());
        assert!(store.current().is_none());

        assert!(store.update(10, book(10.0)).is_some());
        assert_eq!(store.current().and_then(|b| b.ltp()), Some(10.0));
    }
}
