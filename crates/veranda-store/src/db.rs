//! Typed database façade with post-commit write hooks.
//!
//! `LocalDb` is the single write path for application code. It validates
//! records at the boundary (typed deserialization), stamps `updated_at` on
//! local writes, and fires the attached [`WriteHook`]s after each commit —
//! the seam the sync interceptor and the cache refresher attach to.
//!
//! Remote-sourced state enters through the separate unhooked paths
//! ([`LocalDb::merge_remote`], [`LocalDb::delete_remote`],
//! [`LocalDb::restore_raw`]) so applying a remote change can never re-enter
//! the interceptor and echo back to the cloud.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use veranda_core::Collection;

use crate::error::{Result, StoreError};
use crate::records::{self, Entity, Settings};
use crate::Store;

/// The kind of local mutation a hook is notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Create-or-replace of a full record.
    Put,
    /// Shallow-merge patch of an existing record.
    Update,
    /// Delete by id.
    Delete,
}

/// Post-commit hook fired after every local mutation.
///
/// Hooks run synchronously on the writing caller, so implementations must be
/// cheap (persist a marker, wake a task); the network mirror itself happens
/// elsewhere.
pub trait WriteHook: Send + Sync {
    /// Called after the local write for `id` in `collection` has committed.
    fn record_changed(&self, collection: Collection, id: &str, mutation: MutationKind);
}

/// Typed façade over a [`Store`] backend.
pub struct LocalDb {
    store: Arc<dyn Store>,
    hooks: RwLock<Vec<Arc<dyn WriteHook>>>,
}

impl LocalDb {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// The underlying storage backend.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Attach a post-commit write hook. Hooks fire in attachment order.
    pub fn attach_hook(&self, hook: Arc<dyn WriteHook>) {
        self.hooks.write().push(hook);
    }

    fn fire(&self, collection: Collection, id: &str, mutation: MutationKind) {
        for hook in self.hooks.read().iter() {
            hook.record_changed(collection, id, mutation);
        }
    }

    // =========================================================================
    // Typed read path
    // =========================================================================

    /// Get a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or deserialization fails.
    pub fn get<E: Entity>(&self, id: &str) -> Result<Option<E>> {
        self.store
            .get(E::COLLECTION, id)?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .transpose()
    }

    /// Get every record of a collection. Order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or deserialization fails.
    pub fn get_all<E: Entity>(&self) -> Result<Vec<E>> {
        self.store
            .get_all(E::COLLECTION)?
            .into_iter()
            .map(|value| {
                serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
            })
            .collect()
    }

    /// Get every record of a collection as raw JSON values.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn get_all_raw(&self, collection: Collection) -> Result<Vec<Value>> {
        self.store.get_all(collection)
    }

    /// Read the settings singleton, falling back to the built-in default
    /// when the property has not configured itself yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn settings(&self) -> Result<Settings> {
        Ok(self
            .get::<Settings>(veranda_core::SETTINGS_RECORD_ID)?
            .unwrap_or_else(Settings::default_primary))
    }

    // =========================================================================
    // Typed write path (hooked)
    // =========================================================================

    /// Create-or-replace a record, stamping `updated_at`.
    ///
    /// Returns the stored image.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has no usable id or the write fails.
    pub fn put<E: Entity>(&self, mut record: E) -> Result<E> {
        record.touch(Utc::now());
        let value = to_value(&record)?;
        records::record_id(&value)?;

        self.store.put(E::COLLECTION, &value)?;
        self.fire(E::COLLECTION, record.id(), MutationKind::Put);
        Ok(record)
    }

    /// Create-or-replace a batch of records, stamping `updated_at` on each.
    ///
    /// # Errors
    ///
    /// Returns an error if any record has no usable id or the write fails;
    /// on error nothing is written.
    pub fn bulk_put<E: Entity>(&self, mut batch: Vec<E>) -> Result<Vec<E>> {
        let now = Utc::now();
        let mut values = Vec::with_capacity(batch.len());
        for record in &mut batch {
            record.touch(now);
            let value = to_value(record)?;
            records::record_id(&value)?;
            values.push(value);
        }

        self.store.bulk_put(E::COLLECTION, &values)?;
        for record in &batch {
            self.fire(E::COLLECTION, record.id(), MutationKind::Put);
        }
        Ok(batch)
    }

    /// Shallow-merge a JSON patch into an existing record.
    ///
    /// Top-level fields of `patch` replace the stored record's fields; the
    /// merged object is re-validated against the record type and stamped.
    /// Returns the full merged image — the same image the sync mirror will
    /// push.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no record has `id`, and
    /// `StoreError::InvalidRecord` if the patch is not an object, tries to
    /// change `id`, or the merged object fails validation.
    pub fn update<E: Entity>(&self, id: &str, patch: &Value) -> Result<E> {
        let current = self.store.get(E::COLLECTION, id)?.ok_or(StoreError::NotFound)?;
        let merged_value = shallow_merge(current, patch)?;

        let mut merged: E = serde_json::from_value(merged_value)
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
        merged.touch(Utc::now());

        self.store.put(E::COLLECTION, &to_value(&merged)?)?;
        self.fire(E::COLLECTION, id, MutationKind::Update);
        Ok(merged)
    }

    /// Delete a record by id.
    ///
    /// Deleting an absent id is a no-op locally but still fires the hook, so
    /// the (idempotent) remote delete is mirrored regardless.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn delete<E: Entity>(&self, id: &str) -> Result<()> {
        self.store.delete(E::COLLECTION, id)?;
        self.fire(E::COLLECTION, id, MutationKind::Delete);
        Ok(())
    }

    /// Wipe a collection locally. Not mirrored.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn clear(&self, collection: Collection) -> Result<()> {
        self.store.clear(collection)
    }

    // =========================================================================
    // Remote-sourced path (unhooked)
    // =========================================================================

    /// Merge remote records into the local collection, additively and
    /// last-write-wins.
    ///
    /// Per id: a local record strictly newer by `updated_at` is kept; an
    /// identical local record is left untouched; otherwise the remote record
    /// replaces the local one. Records that fail validation or lack an id
    /// are skipped with a warning. Local-only records are never deleted.
    ///
    /// Returns the number of records actually applied, so callers can tell
    /// an effective merge from a pure echo.
    ///
    /// # Errors
    ///
    /// Returns an error if a local read or write fails.
    pub fn merge_remote(&self, collection: Collection, remote: &[Value]) -> Result<usize> {
        let mut applied = 0;
        for value in remote {
            let Ok(id) = records::record_id(value) else {
                tracing::warn!(%collection, "skipping remote record without id");
                continue;
            };
            if let Err(e) = records::validate(collection, value) {
                tracing::warn!(%collection, id, error = %e, "skipping invalid remote record");
                continue;
            }

            if let Some(local) = self.store.get(collection, id)? {
                if local == *value {
                    continue; // echo of local state
                }
                if records::record_updated_at(&local) > records::record_updated_at(value) {
                    tracing::debug!(%collection, id, "keeping newer local record");
                    continue;
                }
            }

            self.store.put(collection, value)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Apply a remote delete. Returns whether a local record was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn delete_remote(&self, collection: Collection, id: &str) -> Result<bool> {
        self.store.delete(collection, id)
    }

    /// Restore raw records verbatim (no stamping, no hooks), validating each
    /// against the collection's record type. Used by backup import.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidRecord` on the first record that fails
    /// validation; earlier collections of a multi-collection import are not
    /// rolled back.
    pub fn restore_raw(&self, collection: Collection, values: &[Value]) -> Result<()> {
        for value in values {
            records::validate(collection, value)?;
        }
        self.store.bulk_put(collection, values)
    }
}

fn to_value<E: Entity>(record: &E) -> Result<Value> {
    serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Merge `patch`'s top-level fields into `current`. Nested objects are
/// replaced wholesale, not merged.
fn shallow_merge(current: Value, patch: &Value) -> Result<Value> {
    let Value::Object(mut base) = current else {
        return Err(StoreError::InvalidRecord(
            "stored record is not an object".to_string(),
        ));
    };
    let Value::Object(fields) = patch else {
        return Err(StoreError::InvalidRecord(
            "patch must be a JSON object".to_string(),
        ));
    };

    for (key, value) in fields {
        if key == "id" && base.get("id") != Some(value) {
            return Err(StoreError::InvalidRecord(
                "patch may not change id".to_string(),
            ));
        }
        base.insert(key.clone(), value.clone());
    }

    Ok(Value::Object(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::records::{Booking, BookingStatus, Room, RoomStatus};
    use chrono::{DateTime, NaiveDate};
    use parking_lot::Mutex;
    use serde_json::json;

    fn test_db() -> LocalDb {
        LocalDb::new(Arc::new(MemoryStore::new()))
    }

    fn test_room(id: &str, number: &str) -> Room {
        Room {
            id: id.to_string(),
            number: number.to_string(),
            room_type: "Standard".to_string(),
            floor: 1,
            status: RoomStatus::Vacant,
            base_rate: 90.0,
            features: Vec::new(),
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn test_booking(id: &str) -> Booking {
        Booking {
            id: id.to_string(),
            room_id: "RM-1".to_string(),
            guest_id: "GST-1".to_string(),
            check_in: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
            status: BookingStatus::Active,
            adults: 2,
            children: 0,
            rate: 90.0,
            payments: Vec::new(),
            group_id: None,
            notes: None,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[derive(Default)]
    struct RecordingHook {
        seen: Mutex<Vec<(Collection, String, MutationKind)>>,
    }

    impl WriteHook for RecordingHook {
        fn record_changed(&self, collection: Collection, id: &str, mutation: MutationKind) {
            self.seen.lock().push((collection, id.to_string(), mutation));
        }
    }

    #[test]
    fn put_stamps_updated_at_and_is_readable() {
        let db = test_db();
        let stored = db.put(test_room("RM-1", "101")).unwrap();
        assert!(stored.updated_at > DateTime::<Utc>::UNIX_EPOCH);

        let read: Room = db.get("RM-1").unwrap().unwrap();
        assert_eq!(read, stored);
    }

    #[test]
    fn update_merges_and_returns_full_record() {
        let db = test_db();
        db.put(test_booking("B-1")).unwrap();

        let merged: Booking = db.update("B-1", &json!({"status": "COMPLETED"})).unwrap();
        assert_eq!(merged.status, BookingStatus::Completed);
        // untouched fields survive the merge
        assert_eq!(merged.room_id, "RM-1");
        assert_eq!(merged.adults, 2);

        let read: Booking = db.get("B-1").unwrap().unwrap();
        assert_eq!(read.status, BookingStatus::Completed);
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let db = test_db();
        let err = db
            .update::<Booking>("B-404", &json!({"status": "COMPLETED"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn update_cannot_change_id() {
        let db = test_db();
        db.put(test_room("RM-1", "101")).unwrap();

        let err = db
            .update::<Room>("RM-1", &json!({"id": "RM-2"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[test]
    fn update_rejects_malformed_patch() {
        let db = test_db();
        db.put(test_room("RM-1", "101")).unwrap();

        // not an object
        assert!(db.update::<Room>("RM-1", &json!(42)).is_err());
        // merged record fails typed validation
        assert!(db
            .update::<Room>("RM-1", &json!({"status": "HAUNTED"}))
            .is_err());
    }

    #[test]
    fn hooks_fire_per_mutation() {
        let db = test_db();
        let hook = Arc::new(RecordingHook::default());
        db.attach_hook(hook.clone());

        db.put(test_room("RM-1", "101")).unwrap();
        db.update::<Room>("RM-1", &json!({"floor": 2})).unwrap();
        db.delete::<Room>("RM-1").unwrap();

        let seen = hook.seen.lock();
        assert_eq!(
            *seen,
            vec![
                (Collection::Rooms, "RM-1".to_string(), MutationKind::Put),
                (Collection::Rooms, "RM-1".to_string(), MutationKind::Update),
                (Collection::Rooms, "RM-1".to_string(), MutationKind::Delete),
            ]
        );
    }

    #[test]
    fn merge_remote_is_additive_lww() {
        let db = test_db();
        // Local record, freshly stamped (newer than the remote's epoch stamp)
        db.put(test_room("RM-1", "101")).unwrap();

        let remote = vec![
            // stale echo of RM-1: local stays
            json!({"id": "RM-1", "number": "999", "updated_at": "1990-01-01T00:00:00Z"}),
            // remote-only record: added
            json!({"id": "RM-2", "number": "102"}),
        ];
        let applied = db.merge_remote(Collection::Rooms, &remote).unwrap();
        assert_eq!(applied, 1);

        let local: Room = db.get("RM-1").unwrap().unwrap();
        assert_eq!(local.number, "101");
        assert!(db.get::<Room>("RM-2").unwrap().is_some());
    }

    #[test]
    fn merge_remote_newer_remote_wins() {
        let db = test_db();
        db.put(test_room("RM-1", "101")).unwrap();

        let remote = vec![json!({
            "id": "RM-1", "number": "101A", "updated_at": "2099-01-01T00:00:00Z"
        })];
        assert_eq!(db.merge_remote(Collection::Rooms, &remote).unwrap(), 1);

        let local: Room = db.get("RM-1").unwrap().unwrap();
        assert_eq!(local.number, "101A");
    }

    #[test]
    fn merge_remote_skips_invalid_and_echoes() {
        let db = test_db();
        let stored = db.put(test_room("RM-1", "101")).unwrap();
        let echo = serde_json::to_value(&stored).unwrap();

        let remote = vec![
            echo,                      // identical echo: not counted
            json!({"number": "103"}),  // no id: skipped
            json!({"id": "RM-4", "number": "104", "status": "HAUNTED"}), // invalid: skipped
        ];
        assert_eq!(db.merge_remote(Collection::Rooms, &remote).unwrap(), 0);
        assert_eq!(db.get_all::<Room>().unwrap().len(), 1);
    }

    #[test]
    fn remote_paths_do_not_fire_hooks() {
        let db = test_db();
        let hook = Arc::new(RecordingHook::default());
        db.attach_hook(hook.clone());

        db.merge_remote(
            Collection::Rooms,
            &[json!({"id": "RM-9", "number": "901"})],
        )
        .unwrap();
        db.delete_remote(Collection::Rooms, "RM-9").unwrap();
        db.restore_raw(Collection::Rooms, &[json!({"id": "RM-9", "number": "901"})])
            .unwrap();

        assert!(hook.seen.lock().is_empty());
    }

    #[test]
    fn settings_falls_back_to_default() {
        let db = test_db();
        let settings = db.settings().unwrap();
        assert_eq!(settings.id, veranda_core::SETTINGS_RECORD_ID);

        let mut custom = settings;
        custom.property_name = "Harbor House".to_string();
        db.put(custom).unwrap();
        assert_eq!(db.settings().unwrap().property_name, "Harbor House");
    }
}
