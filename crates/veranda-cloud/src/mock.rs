//! Scriptable in-memory bridge for engine-level tests.
//!
//! `MockBridge` records every push and remove, serves scripted pull
//! snapshots, and lets tests fire change events into registered
//! subscriptions as if the remote backend had emitted them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use veranda_core::Collection;

use crate::realtime::{ChangeEvent, ChangeHandler, SubscriptionHandle};
use crate::CloudBridge;

/// In-memory `CloudBridge` implementation for tests.
pub struct MockBridge {
    enabled: AtomicBool,
    healthy: AtomicBool,
    fail_requests: AtomicBool,
    remote: Mutex<HashMap<Collection, Vec<Value>>>,
    pushes: Mutex<Vec<(Collection, Vec<Value>)>>,
    removes: Mutex<Vec<(Collection, String)>>,
    handlers: Mutex<HashMap<Collection, ChangeHandler>>,
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBridge {
    /// An enabled, healthy bridge with an empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            healthy: AtomicBool::new(true),
            fail_requests: AtomicBool::new(false),
            remote: Mutex::new(HashMap::new()),
            pushes: Mutex::new(Vec::new()),
            removes: Mutex::new(Vec::new()),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// A bridge with cloud integration switched off.
    #[must_use]
    pub fn disabled() -> Self {
        let bridge = Self::new();
        bridge.enabled.store(false, Ordering::SeqCst);
        bridge
    }

    /// Script the remote snapshot served by `pull_all`.
    pub fn set_remote(&self, collection: Collection, records: Vec<Value>) {
        self.remote.lock().insert(collection, records);
    }

    /// Simulate network reachability; unhealthy also fails pushes/removes.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
        self.fail_requests.store(!healthy, Ordering::SeqCst);
    }

    /// Every push and remove observed, in order.
    #[must_use]
    pub fn pushes(&self) -> Vec<(Collection, Vec<Value>)> {
        self.pushes.lock().clone()
    }

    /// Every remove observed, in order.
    #[must_use]
    pub fn removes(&self) -> Vec<(Collection, String)> {
        self.removes.lock().clone()
    }

    /// Whether a subscription handler is registered for the collection.
    #[must_use]
    pub fn has_subscription(&self, collection: Collection) -> bool {
        self.handlers.lock().contains_key(&collection)
    }

    /// Fire a change event into the registered subscription, as the remote
    /// backend would. Panics if no subscription exists for the collection.
    pub fn emit(&self, event: ChangeEvent) {
        let handler = self
            .handlers
            .lock()
            .get(&event.collection)
            .cloned()
            .expect("no subscription registered for collection");
        handler(event);
    }
}

#[async_trait]
impl CloudBridge for MockBridge {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn push_records(&self, collection: Collection, records: &[Value]) -> bool {
        if !self.is_enabled() || records.is_empty() {
            return true;
        }
        if self.fail_requests.load(Ordering::SeqCst) {
            return false;
        }

        self.pushes.lock().push((collection, records.to_vec()));

        // Upsert into the scripted remote by id
        let mut remote = self.remote.lock();
        let table = remote.entry(collection).or_default();
        for record in records {
            let id = record.get("id").cloned();
            if let Some(existing) = table.iter_mut().find(|r| r.get("id") == id.as_ref()) {
                *existing = record.clone();
            } else {
                table.push(record.clone());
            }
        }
        true
    }

    async fn remove_record(&self, collection: Collection, id: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }
        if self.fail_requests.load(Ordering::SeqCst) {
            return false;
        }

        self.removes.lock().push((collection, id.to_string()));
        if let Some(table) = self.remote.lock().get_mut(&collection) {
            table.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
        }
        true
    }

    async fn pull_all(&self, collection: Collection) -> Vec<Value> {
        if !self.is_enabled() || self.fail_requests.load(Ordering::SeqCst) {
            return Vec::new();
        }
        self.remote
            .lock()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    fn subscribe(&self, collection: Collection, handler: ChangeHandler) -> SubscriptionHandle {
        if self.is_enabled() {
            self.handlers.lock().insert(collection, handler);
        }
        SubscriptionHandle::inert(collection)
    }

    async fn check_health(&self) -> bool {
        self.is_enabled() && self.healthy.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ChangeOp;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn push_updates_scripted_remote() {
        let bridge = MockBridge::new();
        assert!(
            bridge
                .push_records(Collection::Rooms, &[json!({"id": "RM-1", "v": 1})])
                .await
        );
        assert!(
            bridge
                .push_records(Collection::Rooms, &[json!({"id": "RM-1", "v": 2})])
                .await
        );

        let remote = bridge.pull_all(Collection::Rooms).await;
        assert_eq!(remote.len(), 1);
        assert_eq!(remote[0]["v"], 2);
        assert_eq!(bridge.pushes().len(), 2);
    }

    #[tokio::test]
    async fn unhealthy_bridge_fails_requests() {
        let bridge = MockBridge::new();
        bridge.set_healthy(false);

        assert!(!bridge.check_health().await);
        assert!(
            !bridge
                .push_records(Collection::Rooms, &[json!({"id": "RM-1"})])
                .await
        );
        assert!(!bridge.remove_record(Collection::Rooms, "RM-1").await);
    }

    #[tokio::test]
    async fn emit_reaches_subscription() {
        let bridge = MockBridge::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        bridge.subscribe(
            Collection::Rooms,
            Arc::new(move |event| sink.lock().push(event.op)),
        );
        assert!(bridge.has_subscription(Collection::Rooms));

        bridge.emit(ChangeEvent {
            collection: Collection::Rooms,
            op: ChangeOp::Insert,
            record: Some(json!({"id": "RM-1"})),
            old_id: None,
        });

        assert_eq!(*seen.lock(), vec![ChangeOp::Insert]);
    }
}
