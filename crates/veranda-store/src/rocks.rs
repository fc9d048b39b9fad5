//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};
use serde_json::Value;
use veranda_core::Collection;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::outbox::OutboxEntry;
use crate::records::record_id;
use crate::schema::{all_column_families, cf_name, OUTBOX_CF};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Record operations
    // =========================================================================

    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>> {
        let cf = self.cf(cf_name(collection))?;

        self.db
            .get_cf(&cf, keys::record_key(id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>> {
        let cf = self.cf(cf_name(collection))?;

        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            records.push(Self::deserialize(&value)?);
        }

        Ok(records)
    }

    fn put(&self, collection: Collection, record: &Value) -> Result<()> {
        let id = record_id(record)?;
        let cf = self.cf(cf_name(collection))?;
        let value = Self::serialize(record)?;

        self.db
            .put_cf(&cf, keys::record_key(id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn bulk_put(&self, collection: Collection, records: &[Value]) -> Result<()> {
        let cf = self.cf(cf_name(collection))?;

        let mut batch = WriteBatch::default();
        for record in records {
            let id = record_id(record)?;
            batch.put_cf(&cf, keys::record_key(id), Self::serialize(record)?);
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn delete(&self, collection: Collection, id: &str) -> Result<bool> {
        let cf = self.cf(cf_name(collection))?;
        let key = keys::record_key(id);

        let existed = self
            .db
            .get_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        self.db
            .delete_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(existed)
    }

    fn clear(&self, collection: Collection) -> Result<()> {
        let cf = self.cf(cf_name(collection))?;

        let mut batch = WriteBatch::default();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            batch.delete_cf(&cf, key);
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    // =========================================================================
    // Outbox operations
    // =========================================================================

    fn outbox_put(&self, entry: &OutboxEntry) -> Result<()> {
        let cf = self.cf(OUTBOX_CF)?;
        let key = keys::outbox_key(entry.collection, &entry.record_id);

        self.db
            .put_cf(&cf, key, Self::serialize(entry)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn outbox_get(&self, collection: Collection, id: &str) -> Result<Option<OutboxEntry>> {
        let cf = self.cf(OUTBOX_CF)?;

        self.db
            .get_cf(&cf, keys::outbox_key(collection, id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn outbox_list(&self) -> Result<Vec<OutboxEntry>> {
        let cf = self.cf(OUTBOX_CF)?;

        let mut entries = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            entries.push(Self::deserialize(&value)?);
        }

        Ok(entries)
    }

    fn outbox_remove(&self, collection: Collection, id: &str) -> Result<()> {
        let cf = self.cf(OUTBOX_CF)?;

        self.db
            .delete_cf(&cf, keys::outbox_key(collection, id))
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
