//! In-memory storage implementation for tests.
//!
//! `MemoryStore` implements the same `Store` trait as the RocksDB backend,
//! so engine-level tests can run without touching the filesystem.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde_json::Value;
use veranda_core::Collection;

use crate::error::Result;
use crate::keys;
use crate::outbox::OutboxEntry;
use crate::records::record_id;
use crate::Store;

/// In-memory `Store` implementation.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, BTreeMap<String, Value>>>,
    outbox: RwLock<BTreeMap<Vec<u8>, OutboxEntry>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        Ok(self
            .collections
            .read()
            .get(&collection)
            .and_then(|records| records.get(id))
            .cloned())
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>> {
        Ok(self
            .collections
            .read()
            .get(&collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    fn put(&self, collection: Collection, record: &Value) -> Result<()> {
        let id = record_id(record)?.to_string();
        self.collections
            .write()
            .entry(collection)
            .or_default()
            .insert(id, record.clone());
        Ok(())
    }

    fn bulk_put(&self, collection: Collection, records: &[Value]) -> Result<()> {
        let mut collections = self.collections.write();
        let map = collections.entry(collection).or_default();
        for record in records {
            let id = record_id(record)?.to_string();
            map.insert(id, record.clone());
        }
        Ok(())
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        Ok(self
            .collections
            .write()
            .get_mut(&collection)
            .is_some_and(|records| records.remove(id).is_some()))
    }

    fn clear(&self, collection: Collection) -> Result<()> {
        if let Some(records) = self.collections.write().get_mut(&collection) {
            records.clear();
        }
        Ok(())
    }

    fn outbox_put(&self, entry: &OutboxEntry) -> Result<()> {
        let key = keys::outbox_key(entry.collection, &entry.record_id);
        self.outbox.write().insert(key, entry.clone());
        Ok(())
    }

    fn outbox_get(&self, collection: Collection, id: &str) -> Result<Option<OutboxEntry>> {
        Ok(self
            .outbox
            .read()
            .get(&keys::outbox_key(collection, id))
            .cloned())
    }

    fn outbox_list(&self) -> Result<Vec<OutboxEntry>> {
        Ok(self.outbox.read().values().cloned().collect())
    }

    fn outbox_remove(&self, collection: Collection, id: &str) -> Result<()> {
        self.outbox.write().remove(&keys::outbox_key(collection, id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::PendingOp;
    use serde_json::json;

    #[test]
    fn behaves_like_a_store() {
        let store = MemoryStore::new();
        let record = json!({"id": "RM-1", "number": "101"});

        store.put(Collection::Rooms, &record).unwrap();
        assert_eq!(
            store.get(Collection::Rooms, "RM-1").unwrap().unwrap(),
            record
        );
        assert_eq!(store.get_all(Collection::Rooms).unwrap().len(), 1);

        assert!(store.delete(Collection::Rooms, "RM-1").unwrap());
        assert!(!store.delete(Collection::Rooms, "RM-1").unwrap());
    }

    #[test]
    fn outbox_roundtrip() {
        let store = MemoryStore::new();
        let entry = OutboxEntry::new(Collection::Bookings, "BKG-1", PendingOp::Upsert);

        store.outbox_put(&entry).unwrap();
        assert_eq!(store.outbox_list().unwrap().len(), 1);

        store.outbox_remove(Collection::Bookings, "BKG-1").unwrap();
        assert!(store.outbox_list().unwrap().is_empty());
    }
}
