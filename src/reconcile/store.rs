use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::model::Record;

/// Handle returned by [`FeedStore::subscribe`], used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Handler<T> = Box<dyn FnMut(Arc<Vec<T>>) -> Result<()> + Send>;

/// Single-writer store for one record type.
///
/// Incoming updates merge by identity: an id already present is replaced in
/// place (same positional index), a new id is appended. Subscribers receive
/// the full collection as an `Arc` snapshot on every publish — never a
/// diff, never a half-updated state, because the swap to the new collection
/// completes before any handler runs.
pub struct FeedStore<T: Record> {
    records: Arc<Vec<T>>,
    subscribers: Vec<(SubscriberId, Handler<T>)>,
    next_id: u64,
}

impl<T: Record + Clone> FeedStore<T> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Vec::new()),
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Merges one record by identity and publishes the new collection.
    ///
    /// Never removes entries and never reorders existing entries. A record
    /// with an empty id is a programming error upstream — the adapter
    /// boundary validates identity — so this fails fast.
    pub fn apply_single(&mut self, record: T) {
        assert!(
            !record.id().is_empty(),
            "record reached the reconciler without an identity"
        );

        let mut next: Vec<T> = self.records.as_ref().clone();
        match next.iter().position(|r| r.id() == record.id()) {
            Some(idx) => next[idx] = record,
            None => next.push(record),
        }

        self.records = Arc::new(next);
        self.publish();
    }

    /// Replaces the entire collection with `records` (order as given) and
    /// publishes. Used when a feed delivers full authoritative state.
    ///
    /// Duplicate ids within the batch collapse to the last occurrence, at
    /// the position of the first, so the at-most-one-per-identity
    /// guarantee holds for any input.
    pub fn apply_bulk(&mut self, records: Vec<T>) {
        let mut next: Vec<T> = Vec::with_capacity(records.len());
        for record in records {
            assert!(
                !record.id().is_empty(),
                "record reached the reconciler without an identity"
            );
            match next.iter().position(|r| r.id() == record.id()) {
                Some(idx) => next[idx] = record,
                None => next.push(record),
            }
        }

        self.records = Arc::new(next);
        self.publish();
    }

    /// Registers a handler that receives the full current collection on
    /// every publish. Handlers run in registration order; one handler
    /// failing does not stop the others.
    pub fn subscribe(&mut self, handler: Handler<T>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, handler));
        id
    }

    /// Deregisters a handler. Takes effect synchronously: no publish after
    /// this call reaches the handler. Returns false for an unknown id.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Current collection as a read-only snapshot.
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn publish(&mut self) {
        let snapshot = Arc::clone(&self.records);
        for (id, handler) in &mut self.subscribers {
            if let Err(e) = handler(Arc::clone(&snapshot)) {
                warn!(subscriber = id.0, error = %e, "subscriber handler failed");
            }
        }
    }
}

impl<T: Record + Clone> Default for FeedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        value: u32,
    }

    impl Record for Row {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn row(id: &str, value: u32) -> Row {
        Row {
            id: id.to_string(),
            value,
        }
    }

    fn ids(store: &FeedStore<Row>) -> Vec<String> {
        store.snapshot().iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_apply_single_last_writer_wins() {
        let mut store = FeedStore::new();
        store.apply_single(row("a", 1));
        store.apply_single(row("a", 2));
        store.apply_single(row("a", 3));

        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].value, 3);
    }

    #[test]
    fn test_apply_single_preserves_order() {
        let mut store = FeedStore::new();
        store.apply_single(row("a", 1));
        store.apply_single(row("b", 1));
        store.apply_single(row("c", 1));

        // Replacing the middle entry must not move it
        store.apply_single(row("b", 9));
        assert_eq!(ids(&store), vec!["a", "b", "c"]);
        assert_eq!(store.snapshot()[1].value, 9);

        // A new id appends at the end
        store.apply_single(row("d", 1));
        assert_eq!(ids(&store), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_apply_bulk_replaces_membership() {
        let mut store = FeedStore::new();
        store.apply_bulk(vec![row("a", 1), row("b", 1)]);
        store.apply_bulk(vec![row("c", 1)]);

        assert_eq!(ids(&store), vec!["c"]);
    }

    #[test]
    fn test_apply_bulk_collapses_duplicate_ids() {
        let mut store = FeedStore::new();
        store.apply_bulk(vec![row("a", 1), row("b", 1), row("a", 7)]);

        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.snapshot()[0].value, 7);
    }

    #[test]
    fn test_bulk_then_single_keeps_index() {
        let mut store = FeedStore::new();
        store.apply_bulk(vec![row("a", 1), row("b", 1), row("c", 1)]);
        store.apply_single(row("b", 5));

        assert_eq!(ids(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_subscribers_run_in_order_and_see_snapshot() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut store: FeedStore<Row> = FeedStore::new();

        let o1 = Arc::clone(&order);
        store.subscribe(Box::new(move |snap| {
            o1.lock().unwrap().push(("first", snap.len()));
            Ok(())
        }));
        let o2 = Arc::clone(&order);
        store.subscribe(Box::new(move |snap| {
            o2.lock().unwrap().push(("second", snap.len()));
            Ok(())
        }));

        store.apply_single(row("a", 1));

        let seen = order.lock().unwrap();
        assert_eq!(*seen, vec![("first", 1), ("second", 1)]);
    }

    #[test]
    fn test_failing_handler_does_not_block_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store: FeedStore<Row> = FeedStore::new();

        store.subscribe(Box::new(|_| anyhow::bail!("handler exploded")));
        let c = Arc::clone(&calls);
        store.subscribe(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        store.apply_single(row("a", 1));
        store.apply_single(row("b", 1));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // Store state stays intact despite the failing handler
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_callbacks_synchronously() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store: FeedStore<Row> = FeedStore::new();

        let c = Arc::clone(&calls);
        let id = store.subscribe(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        store.apply_single(row("a", 1));
        assert!(store.unsubscribe(id));
        store.apply_single(row("b", 1));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!store.unsubscribe(id));
    }

    #[test]
    #[should_panic(expected = "without an identity")]
    fn test_empty_id_is_rejected_loudly() {
        let mut store = FeedStore::new();
        store.apply_single(row("", 1));
    }
}
