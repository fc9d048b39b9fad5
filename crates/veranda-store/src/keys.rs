//! Key encoding utilities for `RocksDB`.
//!
//! Record keys are the raw record-id bytes; outbox keys prepend the
//! collection tag so one marker exists per `(collection, id)` pair.

use veranda_core::Collection;

/// Encode a record key (just the id bytes).
#[must_use]
pub fn record_key(id: &str) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Encode an outbox marker key: `collection tag || record id`.
///
/// Keying markers by `(collection, id)` makes a later write to the same
/// record coalesce with the earlier pending marker.
#[must_use]
pub fn outbox_key(collection: Collection, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + id.len());
    key.push(collection.tag());
    key.extend_from_slice(id.as_bytes());
    key
}
