//! Sync interceptor: turns local writes into pending-sync markers.
//!
//! Attached to the [`LocalDb`] at engine construction, only when cloud
//! integration is enabled — with the cloud off there is nothing to mirror
//! and no hook fires. The hook body is deliberately minimal: persist one
//! marker keyed by `(collection, id)` and wake the drainer. The caller's
//! write has already committed; the network round-trip happens in the
//! drainer task, never on the write path.
//!
//! [`LocalDb`]: veranda_store::LocalDb

use std::sync::Arc;

use tokio::sync::Notify;
use veranda_core::Collection;
use veranda_store::{MutationKind, OutboxEntry, PendingOp, Store, WriteHook};

/// Write hook that enqueues outbox markers for the drainer.
pub struct SyncInterceptor {
    store: Arc<dyn Store>,
    notify: Arc<Notify>,
}

impl SyncInterceptor {
    /// Create an interceptor persisting markers into `store` and waking the
    /// drainer through `notify`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, notify: Arc<Notify>) -> Self {
        Self { store, notify }
    }
}

impl WriteHook for SyncInterceptor {
    fn record_changed(&self, collection: Collection, id: &str, mutation: MutationKind) {
        let op = match mutation {
            MutationKind::Put | MutationKind::Update => PendingOp::Upsert,
            MutationKind::Delete => PendingOp::Delete,
        };

        let entry = OutboxEntry::new(collection, id, op);
        if let Err(e) = self.store.outbox_put(&entry) {
            // The local write itself succeeded; a lost marker means a stale
            // mirror until the next write to this record.
            tracing::warn!(%collection, id, error = %e, "failed to enqueue sync marker");
            return;
        }

        tracing::debug!(%collection, id, ?op, "queued sync marker");
        self.notify.notify_one();
    }
}
