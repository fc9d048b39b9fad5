//! Embedded entity store for the Veranda sync engine.
//!
//! This crate provides the local, durable side of the local-first design:
//! typed record collections held in `RocksDB` (one column family per
//! collection plus a pending-sync outbox), an in-memory backend for tests,
//! and the [`LocalDb`] façade that validates records at the boundary and
//! fires post-commit write hooks.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐
//! │  Application code  │
//! └─────────┬──────────┘
//!           │ typed records
//! ┌─────────▼──────────┐     hooks      ┌──────────────────┐
//! │      LocalDb       │───────────────▶│ WriteHook impls  │
//! │  (validate, stamp) │                │ (sync, cache)    │
//! └─────────┬──────────┘                └──────────────────┘
//!           │ raw JSON values
//! ┌─────────▼──────────┐
//! │    Store (trait)   │
//! └─────────┬──────────┘
//!     ┌─────┴──────┐
//! ┌───▼────┐  ┌────▼────────┐
//! │ Rocks  │  │  MemoryStore │
//! │ Store  │  │  (tests)     │
//! └────────┘  └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use veranda_store::{LocalDb, RocksStore, Room};
//!
//! let store = RocksStore::open("/tmp/veranda-db").unwrap();
//! let db = LocalDb::new(Arc::new(store));
//!
//! let rooms: Vec<Room> = db.get_all().unwrap();
//! for room in rooms {
//!     println!("{} is {:?}", room.number, room.status);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod db;
pub mod error;
pub mod keys;
pub mod memory;
pub mod outbox;
pub mod records;
pub mod rocks;
pub mod schema;

pub use db::{LocalDb, MutationKind, WriteHook};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use outbox::{OutboxEntry, PendingOp};
pub use records::{
    Booking, BookingStatus, Entity, Guest, GuestGroup, MenuItem, Payment, Room, RoomStatus,
    RoomTypeDef, Settings, StaffMember, Transaction, TransactionKind,
};
pub use rocks::RocksStore;

use serde_json::Value;
use veranda_core::Collection;

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer over raw JSON record values,
/// allowing different implementations (`RocksDB`, in-memory for testing).
/// Typed access and validation live in [`LocalDb`], which wraps a `Store`.
pub trait Store: Send + Sync {
    // =========================================================================
    // Record operations
    // =========================================================================

    /// Get a record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>>;

    /// Get every record of a collection. Order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_all(&self, collection: Collection) -> Result<Vec<Value>>;

    /// Insert or replace a record, keyed by its `id` field.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidRecord` if the record has no string id,
    /// or an error if the database operation fails.
    fn put(&self, collection: Collection, record: &Value) -> Result<()>;

    /// Insert or replace a batch of records in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if any record has no string id or the database
    /// operation fails; on error nothing is written.
    fn bulk_put(&self, collection: Collection, records: &[Value]) -> Result<()>;

    /// Delete a record by id. Returns whether a record existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete(&self, collection: Collection, id: &str) -> Result<bool>;

    /// Wipe a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn clear(&self, collection: Collection) -> Result<()>;

    // =========================================================================
    // Outbox operations
    // =========================================================================

    /// Insert or replace the pending-sync marker for the entry's
    /// `(collection, id)` pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn outbox_put(&self, entry: &OutboxEntry) -> Result<()>;

    /// Get the pending-sync marker for a record, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn outbox_get(&self, collection: Collection, id: &str) -> Result<Option<OutboxEntry>>;

    /// List all pending-sync markers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn outbox_list(&self) -> Result<Vec<OutboxEntry>>;

    /// Remove the pending-sync marker for a record, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn outbox_remove(&self, collection: Collection, id: &str) -> Result<()>;
}
