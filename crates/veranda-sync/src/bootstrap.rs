//! Bootstrap reconciler: reconcile local and remote state at startup.
//!
//! Runs once before the UI renders meaningful content. Per collection, in
//! the fixed order of [`Collection::ALL`] (settings first): pull the full
//! remote snapshot, merge it additively into the local store (last-write-wins
//! by `updated_at`, local-only records never deleted), then open a live
//! subscription whose handler applies each remote change and re-runs the
//! refresh cascade.
//!
//! One collection failing never aborts the others; every failure is logged
//! and the application proceeds with whatever local state exists.

use std::sync::Arc;

use veranda_cloud::{ChangeEvent, ChangeHandler, ChangeOp, CloudBridge, SubscriptionHandle};
use veranda_core::Collection;
use veranda_store::{LocalDb, StoreError};

use crate::seed;
use crate::state::StateCache;

/// Pull, merge, and subscribe every collection, then seed defaults if the
/// rooms collection is still empty.
///
/// Returns the live subscription handles (empty when the bridge is
/// disabled).
pub async fn run_bootstrap(
    db: &Arc<LocalDb>,
    bridge: &Arc<dyn CloudBridge>,
    cache: &Arc<StateCache>,
) -> Vec<SubscriptionHandle> {
    let mut subscriptions = Vec::new();

    if bridge.is_enabled() {
        for collection in Collection::ALL {
            let remote = bridge.pull_all(collection).await;
            if remote.is_empty() {
                tracing::debug!(%collection, "nothing pulled from cloud");
            } else {
                match db.merge_remote(collection, &remote) {
                    Ok(applied) => {
                        tracing::info!(
                            %collection,
                            pulled = remote.len(),
                            applied,
                            "merged remote snapshot"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(%collection, error = %e, "remote merge failed");
                    }
                }
            }

            let handler = change_handler(db.clone(), cache.clone());
            subscriptions.push(bridge.subscribe(collection, handler));
        }
    }

    match seed::seed_if_empty(db) {
        Ok(true) => tracing::info!("cold start, default rooms seeded"),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "seeding failed"),
    }

    subscriptions
}

/// Build the handler attached to one collection's live subscription.
///
/// The handler applies the event through the unhooked remote path and runs
/// the refresh cascade only when local state actually changed — an echo of
/// this client's own write matches local state and triggers nothing.
pub fn change_handler(db: Arc<LocalDb>, cache: Arc<StateCache>) -> ChangeHandler {
    Arc::new(move |event| match apply_change(&db, &event) {
        Ok(true) => {
            if let Err(e) = cache.refresh_local_state(db.store().as_ref()) {
                tracing::warn!(error = %e, "refresh after remote change failed");
            }
        }
        Ok(false) => {
            tracing::debug!(collection = %event.collection, "remote change was a no-op");
        }
        Err(e) => {
            tracing::warn!(collection = %event.collection, error = %e, "failed to apply remote change");
        }
    })
}

/// Apply one remote change to the local store. Returns whether local state
/// changed.
///
/// # Errors
///
/// Returns an error if a local read or write fails.
pub fn apply_change(db: &LocalDb, event: &ChangeEvent) -> Result<bool, StoreError> {
    match event.op {
        ChangeOp::Insert | ChangeOp::Update => {
            let Some(record) = &event.record else {
                return Ok(false);
            };
            let applied = db.merge_remote(event.collection, std::slice::from_ref(record))?;
            Ok(applied > 0)
        }
        ChangeOp::Delete => {
            let Some(id) = event.record_id() else {
                return Ok(false);
            };
            db.delete_remote(event.collection, id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use veranda_cloud::MockBridge;
    use veranda_store::{MemoryStore, Room, Store};

    fn setup() -> (Arc<LocalDb>, Arc<StateCache>) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        (Arc::new(LocalDb::new(store)), Arc::new(StateCache::new()))
    }

    #[tokio::test]
    async fn merges_remote_and_subscribes_every_collection() {
        let (db, cache) = setup();
        let mock = Arc::new(MockBridge::new());
        mock.set_remote(
            Collection::Rooms,
            vec![json!({"id": "RM-X", "number": "501"})],
        );
        let bridge: Arc<dyn CloudBridge> = mock.clone();

        let subscriptions = run_bootstrap(&db, &bridge, &cache).await;
        assert_eq!(subscriptions.len(), Collection::ALL.len());
        for collection in Collection::ALL {
            assert!(mock.has_subscription(collection));
        }

        let rooms: Vec<Room> = db.get_all().unwrap();
        assert!(rooms.iter().any(|r| r.id == "RM-X"));
    }

    #[tokio::test]
    async fn disabled_bridge_skips_cloud_but_still_seeds() {
        let (db, cache) = setup();
        let bridge: Arc<dyn CloudBridge> = Arc::new(MockBridge::disabled());

        let subscriptions = run_bootstrap(&db, &bridge, &cache).await;
        assert!(subscriptions.is_empty());
        assert!(!db.get_all::<Room>().unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeding_skipped_when_rooms_pulled() {
        let (db, cache) = setup();
        let mock = Arc::new(MockBridge::new());
        mock.set_remote(
            Collection::Rooms,
            vec![json!({"id": "RM-X", "number": "501"})],
        );
        let bridge: Arc<dyn CloudBridge> = mock.clone();

        run_bootstrap(&db, &bridge, &cache).await;
        let rooms: Vec<Room> = db.get_all().unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, "RM-X");
    }

    #[test]
    fn delete_event_removes_local_record() {
        let (db, _cache) = setup();
        db.merge_remote(Collection::Rooms, &[json!({"id": "RM-1", "number": "101"})])
            .unwrap();

        let changed = apply_change(
            &db,
            &ChangeEvent {
                collection: Collection::Rooms,
                op: ChangeOp::Delete,
                record: None,
                old_id: Some("RM-1".to_string()),
            },
        )
        .unwrap();

        assert!(changed);
        assert!(db.get::<Room>("RM-1").unwrap().is_none());

        // Deleting again is a no-op, not an error
        let changed = apply_change(
            &db,
            &ChangeEvent {
                collection: Collection::Rooms,
                op: ChangeOp::Delete,
                record: None,
                old_id: Some("RM-1".to_string()),
            },
        )
        .unwrap();
        assert!(!changed);
    }

    #[test]
    fn echo_event_changes_nothing() {
        let (db, _cache) = setup();
        let stored = db
            .merge_remote(Collection::Rooms, &[json!({"id": "RM-1", "number": "101"})])
            .unwrap();
        assert_eq!(stored, 1);

        let echo = db.store().get(Collection::Rooms, "RM-1").unwrap().unwrap();
        let changed = apply_change(
            &db,
            &ChangeEvent {
                collection: Collection::Rooms,
                op: ChangeOp::Update,
                record: Some(echo),
                old_id: None,
            },
        )
        .unwrap();
        assert!(!changed);
    }
}
