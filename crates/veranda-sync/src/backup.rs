//! Database export and import for manual backup and disaster recovery.
//!
//! The backup format is a single JSON object whose top-level keys are
//! collection names and whose values are arrays of records, verbatim as
//! stored locally. On import, unknown keys are ignored and missing keys
//! leave the existing collections untouched; the operation is not atomic —
//! a collection failing after earlier ones succeeded leaves those in place.

use serde_json::Value;
use veranda_cloud::CloudBridge;
use veranda_core::Collection;
use veranda_store::LocalDb;

use crate::error::{Result, SyncError};

/// Outcome of an import, for display to the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Collections restored.
    pub collections: usize,
    /// Records restored locally.
    pub records: usize,
    /// Records successfully pushed to the cloud during force-reconcile.
    pub pushed: usize,
}

/// Serialize every collection into one backup document.
///
/// # Errors
///
/// Returns an error if a local read fails.
pub fn export_database(db: &LocalDb) -> Result<Value> {
    let mut document = serde_json::Map::new();
    for collection in Collection::ALL {
        document.insert(
            collection.as_str().to_string(),
            Value::Array(db.get_all_raw(collection)?),
        );
    }
    Ok(Value::Object(document))
}

/// Restore collections from a backup document.
///
/// For each known collection present in the document: clear the local
/// collection, restore the records verbatim, and — when cloud integration is
/// enabled — push every restored record individually and sequentially to
/// force-reconcile the remote mirror to the imported state. Failed pushes
/// are logged and counted, not retried here.
///
/// # Errors
///
/// Returns `SyncError::InvalidBackup` if the document is not valid JSON, not
/// an object, or a known collection's value is not an array of valid
/// records. Collections imported before the failure are not rolled back.
pub async fn import_database(
    db: &LocalDb,
    bridge: &dyn CloudBridge,
    raw: &str,
) -> Result<ImportReport> {
    let document: Value =
        serde_json::from_str(raw).map_err(|e| SyncError::InvalidBackup(e.to_string()))?;
    let Value::Object(entries) = document else {
        return Err(SyncError::InvalidBackup(
            "top level must be an object keyed by collection".to_string(),
        ));
    };

    let mut report = ImportReport::default();
    for (name, value) in &entries {
        let Some(collection) = Collection::from_name(name) else {
            tracing::debug!(name = %name, "ignoring unknown collection in backup");
            continue;
        };
        let Value::Array(records) = value else {
            return Err(SyncError::InvalidBackup(format!(
                "collection {name} must be an array"
            )));
        };

        db.clear(collection)?;
        db.restore_raw(collection, records)?;
        report.collections += 1;
        report.records += records.len();
        tracing::info!(%collection, count = records.len(), "restored collection");

        if bridge.is_enabled() {
            for record in records {
                if bridge
                    .push_records(collection, std::slice::from_ref(record))
                    .await
                {
                    report.pushed += 1;
                } else {
                    tracing::warn!(%collection, "push of imported record failed");
                }
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use veranda_cloud::MockBridge;
    use veranda_store::{Guest, MemoryStore, Room, Store, StoreError};

    fn test_db() -> LocalDb {
        LocalDb::new(Arc::new(MemoryStore::new()) as Arc<dyn Store>)
    }

    fn sample_data(db: &LocalDb) {
        db.restore_raw(
            Collection::Rooms,
            &[
                json!({"id": "RM-1", "number": "101", "floor": 1}),
                json!({"id": "RM-2", "number": "102", "floor": 1}),
            ],
        )
        .unwrap();
        db.restore_raw(
            Collection::Guests,
            &[json!({"id": "GST-1", "name": "Ada", "phone": "555-0101"})],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn export_import_roundtrip() {
        let source = test_db();
        sample_data(&source);
        let document = export_database(&source).unwrap();

        // Restore into a cleared store
        let target = test_db();
        let bridge = MockBridge::disabled();
        let report = import_database(&target, &bridge, &document.to_string())
            .await
            .unwrap();

        assert_eq!(report.records, 3);
        assert_eq!(report.pushed, 0);

        // Record sets identical, ids and fields verbatim
        for collection in Collection::ALL {
            let mut before = source.get_all_raw(collection).unwrap();
            let mut after = target.get_all_raw(collection).unwrap();
            before.sort_by_key(|r| r["id"].as_str().map(String::from));
            after.sort_by_key(|r| r["id"].as_str().map(String::from));
            assert_eq!(before, after, "collection {collection} differs");
        }

        let guests: Vec<Guest> = target.get_all().unwrap();
        assert_eq!(guests[0].phone.as_deref(), Some("555-0101"));
    }

    #[tokio::test]
    async fn import_replaces_existing_collection() {
        let db = test_db();
        sample_data(&db);

        let backup = json!({"rooms": [{"id": "RM-9", "number": "901"}]});
        let bridge = MockBridge::disabled();
        import_database(&db, &bridge, &backup.to_string())
            .await
            .unwrap();

        // rooms replaced wholesale, guests untouched
        let rooms: Vec<Room> = db.get_all().unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, "RM-9");
        assert_eq!(db.get_all::<Guest>().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn import_pushes_each_record_when_cloud_enabled() {
        let db = test_db();
        let bridge = MockBridge::new();

        let backup = json!({
            "rooms": [
                {"id": "RM-1", "number": "101"},
                {"id": "RM-2", "number": "102"}
            ]
        });
        let report = import_database(&db, &bridge, &backup.to_string())
            .await
            .unwrap();

        assert_eq!(report.pushed, 2);
        let pushes = bridge.pushes();
        // one push per record, sequential, not batched
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[0].1.len(), 1);
    }

    #[tokio::test]
    async fn malformed_document_is_rejected() {
        let db = test_db();
        let bridge = MockBridge::disabled();

        let err = import_database(&db, &bridge, "not json").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidBackup(_)));

        let err = import_database(&db, &bridge, "[1, 2]").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidBackup(_)));

        let err = import_database(&db, &bridge, r#"{"rooms": 7}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidBackup(_)));
    }

    #[tokio::test]
    async fn unknown_collections_are_ignored() {
        let db = test_db();
        let bridge = MockBridge::disabled();

        let backup = json!({
            "rooms": [{"id": "RM-1", "number": "101"}],
            "invoices": [{"id": "INV-1"}]
        });
        let report = import_database(&db, &bridge, &backup.to_string())
            .await
            .unwrap();
        assert_eq!(report.collections, 1);
    }

    #[tokio::test]
    async fn invalid_record_aborts_without_rollback() {
        let db = test_db();
        let bridge = MockBridge::disabled();

        // guests imports first (object keys iterate sorted), rooms fails
        let backup = json!({
            "guests": [{"id": "GST-1", "name": "Ada"}],
            "rooms": [{"id": "RM-1", "number": "101", "status": "HAUNTED"}]
        });
        let err = import_database(&db, &bridge, &backup.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::InvalidRecord(_))));

        // the earlier collection stayed imported
        assert_eq!(db.get_all::<Guest>().unwrap().len(), 1);
    }
}
