//! Outbox drainer: background mirroring with retry and backoff.
//!
//! The drainer wakes when the interceptor enqueues a marker and on a fixed
//! interval, and attempts every due marker. It consults the connectivity
//! monitor first — while the backend is unreachable, markers stay put and
//! nothing is attempted, which is what turns a transient push failure from a
//! silent loss into a deferred mirror.
//!
//! For upserts the drainer reads the record's *current* image at push time,
//! so the remote always receives a complete record and a burst of edits
//! collapses into one push.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use veranda_cloud::CloudBridge;
use veranda_store::{OutboxEntry, PendingOp, Store};

/// Drains pending-sync markers to the cloud bridge.
#[derive(Clone)]
pub struct OutboxDrainer {
    store: Arc<dyn Store>,
    bridge: Arc<dyn CloudBridge>,
    notify: Arc<Notify>,
    connectivity: watch::Receiver<bool>,
    interval: Duration,
}

impl OutboxDrainer {
    /// Create a drainer.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        bridge: Arc<dyn CloudBridge>,
        notify: Arc<Notify>,
        connectivity: watch::Receiver<bool>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            bridge,
            notify,
            connectivity,
            interval,
        }
    }

    /// Attempt every due marker once. Returns how many were completed.
    ///
    /// Skips entirely while the backend is unreachable; markers are retained
    /// and retried on a later pass.
    pub async fn drain_once(&self) -> usize {
        if !*self.connectivity.borrow() {
            tracing::debug!("backend unreachable, keeping pending markers");
            return 0;
        }

        let entries = match self.store.outbox_list() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read outbox");
                return 0;
            }
        };

        let now = Utc::now();
        let mut completed = 0;
        for entry in entries {
            if !entry.is_due(now) {
                continue;
            }
            if self.attempt(&entry).await {
                completed += 1;
            }
        }
        completed
    }

    /// Attempt one marker; reschedules it with backoff on failure.
    async fn attempt(&self, entry: &OutboxEntry) -> bool {
        let succeeded = match entry.op {
            PendingOp::Upsert => match self.store.get(entry.collection, &entry.record_id) {
                // The record vanished after the marker was written; a delete
                // marker would have replaced this one, so it is just stale.
                Ok(None) => true,
                Ok(Some(record)) => {
                    self.bridge
                        .push_records(entry.collection, std::slice::from_ref(&record))
                        .await
                }
                Err(e) => {
                    tracing::warn!(
                        collection = %entry.collection,
                        id = %entry.record_id,
                        error = %e,
                        "failed to read record for push"
                    );
                    false
                }
            },
            PendingOp::Delete => {
                self.bridge
                    .remove_record(entry.collection, &entry.record_id)
                    .await
            }
        };

        if succeeded {
            self.complete(entry);
        } else {
            let mut failed = entry.clone();
            failed.record_failure(Utc::now());
            tracing::debug!(
                collection = %entry.collection,
                id = %entry.record_id,
                attempts = failed.attempts,
                "mirror attempt failed, backing off"
            );
            if let Err(e) = self.store.outbox_put(&failed) {
                tracing::warn!(error = %e, "failed to reschedule marker");
            }
        }
        succeeded
    }

    /// Remove a completed marker — unless a newer one replaced it while the
    /// push was in flight, in which case that write still needs mirroring.
    fn complete(&self, entry: &OutboxEntry) {
        match self.store.outbox_get(entry.collection, &entry.record_id) {
            Ok(Some(current)) if current.queued_at > entry.queued_at => {}
            Ok(_) => {
                if let Err(e) = self.store.outbox_remove(entry.collection, &entry.record_id) {
                    tracing::warn!(error = %e, "failed to remove completed marker");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to re-check completed marker");
            }
        }
    }

    /// Run the drain loop until the task is aborted.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    () = self.notify.notified() => {}
                    _ = tick.tick() => {}
                }
                self.drain_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use veranda_cloud::MockBridge;
    use veranda_core::Collection;
    use veranda_store::MemoryStore;

    fn drainer_with(
        bridge: Arc<MockBridge>,
        online: bool,
    ) -> (OutboxDrainer, Arc<dyn Store>, watch::Sender<bool>) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let (tx, rx) = watch::channel(online);
        let drainer = OutboxDrainer::new(
            store.clone(),
            bridge,
            Arc::new(Notify::new()),
            rx,
            Duration::from_secs(15),
        );
        (drainer, store, tx)
    }

    #[tokio::test]
    async fn drains_upsert_with_current_image() {
        let bridge = Arc::new(MockBridge::new());
        let (drainer, store, _tx) = drainer_with(bridge.clone(), true);

        let record = json!({"id": "RM-1", "number": "101", "floor": 2});
        store.put(Collection::Rooms, &record).unwrap();
        store
            .outbox_put(&OutboxEntry::new(
                Collection::Rooms,
                "RM-1",
                PendingOp::Upsert,
            ))
            .unwrap();

        assert_eq!(drainer.drain_once().await, 1);
        assert!(store.outbox_list().unwrap().is_empty());

        let pushes = bridge.pushes();
        assert_eq!(pushes.len(), 1);
        // The full current record image was pushed, not a patch
        assert_eq!(pushes[0].1[0], record);
    }

    #[tokio::test]
    async fn drains_delete() {
        let bridge = Arc::new(MockBridge::new());
        let (drainer, store, _tx) = drainer_with(bridge.clone(), true);

        store
            .outbox_put(&OutboxEntry::new(
                Collection::Bookings,
                "BKG-1",
                PendingOp::Delete,
            ))
            .unwrap();

        assert_eq!(drainer.drain_once().await, 1);
        assert_eq!(
            bridge.removes(),
            vec![(Collection::Bookings, "BKG-1".to_string())]
        );
    }

    #[tokio::test]
    async fn offline_keeps_markers() {
        let bridge = Arc::new(MockBridge::new());
        let (drainer, store, tx) = drainer_with(bridge.clone(), false);

        store.put(Collection::Rooms, &json!({"id": "RM-1"})).unwrap();
        store
            .outbox_put(&OutboxEntry::new(
                Collection::Rooms,
                "RM-1",
                PendingOp::Upsert,
            ))
            .unwrap();

        assert_eq!(drainer.drain_once().await, 0);
        assert_eq!(store.outbox_list().unwrap().len(), 1);
        assert!(bridge.pushes().is_empty());

        // Back online, the marker drains
        tx.send(true).unwrap();
        assert_eq!(drainer.drain_once().await, 1);
        assert!(store.outbox_list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_push_backs_off() {
        let bridge = Arc::new(MockBridge::new());
        let (drainer, store, _tx) = drainer_with(bridge.clone(), true);

        store.put(Collection::Rooms, &json!({"id": "RM-1"})).unwrap();
        store
            .outbox_put(&OutboxEntry::new(
                Collection::Rooms,
                "RM-1",
                PendingOp::Upsert,
            ))
            .unwrap();

        // Reachable per the monitor, but the request itself fails
        bridge.set_healthy(false);
        assert_eq!(drainer.drain_once().await, 0);

        let entries = store.outbox_list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].attempts, 1);
        assert!(!entries[0].is_due(Utc::now()));

        // Not due yet, so the next pass skips it even with the bridge healthy
        bridge.set_healthy(true);
        assert_eq!(drainer.drain_once().await, 0);
    }

    #[tokio::test]
    async fn stale_upsert_marker_for_missing_record_is_dropped() {
        let bridge = Arc::new(MockBridge::new());
        let (drainer, store, _tx) = drainer_with(bridge.clone(), true);

        store
            .outbox_put(&OutboxEntry::new(
                Collection::Rooms,
                "RM-GONE",
                PendingOp::Upsert,
            ))
            .unwrap();

        assert_eq!(drainer.drain_once().await, 1);
        assert!(store.outbox_list().unwrap().is_empty());
        assert!(bridge.pushes().is_empty());
    }
}
