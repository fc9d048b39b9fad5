//! Application state cache and the refresh cascade.
//!
//! The cache is the one authoritative read path for UI-facing state: it is
//! populated only by [`StateCache::refresh_local_state`], which re-reads
//! every collection from the local store and swaps each collection's
//! snapshot atomically. Nothing ever patches the cache in place, so after
//! any refresh the cache exactly equals the persisted collections.
//!
//! A watch channel carries a generation counter that ticks once per refresh,
//! letting UI layers await "something changed" without polling.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use veranda_store::{
    Booking, Entity, Guest, GuestGroup, MenuItem, MutationKind, Room, Settings, StaffMember, Store,
    StoreError, Transaction, WriteHook,
};
use veranda_core::Collection;

/// In-memory snapshots of every collection, consumed by the UI layer.
pub struct StateCache {
    rooms: RwLock<Arc<Vec<Room>>>,
    guests: RwLock<Arc<Vec<Guest>>>,
    bookings: RwLock<Arc<Vec<Booking>>>,
    transactions: RwLock<Arc<Vec<Transaction>>>,
    groups: RwLock<Arc<Vec<GuestGroup>>>,
    staff: RwLock<Arc<Vec<StaffMember>>>,
    menu_items: RwLock<Arc<Vec<MenuItem>>>,
    settings: RwLock<Arc<Settings>>,
    generation: watch::Sender<u64>,
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCache {
    /// Create an empty cache at generation zero.
    #[must_use]
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            rooms: RwLock::new(Arc::new(Vec::new())),
            guests: RwLock::new(Arc::new(Vec::new())),
            bookings: RwLock::new(Arc::new(Vec::new())),
            transactions: RwLock::new(Arc::new(Vec::new())),
            groups: RwLock::new(Arc::new(Vec::new())),
            staff: RwLock::new(Arc::new(Vec::new())),
            menu_items: RwLock::new(Arc::new(Vec::new())),
            settings: RwLock::new(Arc::new(Settings::default_primary())),
            generation,
        }
    }

    /// Re-read every collection from the store and replace the snapshots,
    /// one atomic swap per collection. Safe to call repeatedly; cost is
    /// O(total records).
    ///
    /// # Errors
    ///
    /// Returns an error if a read or deserialization fails; collections
    /// already swapped in this pass keep their new snapshots.
    pub fn refresh_local_state(&self, store: &dyn Store) -> Result<(), StoreError> {
        *self.rooms.write() = Arc::new(read_all::<Room>(store)?);
        *self.guests.write() = Arc::new(read_all::<Guest>(store)?);
        *self.bookings.write() = Arc::new(read_all::<Booking>(store)?);
        *self.transactions.write() = Arc::new(read_all::<Transaction>(store)?);
        *self.groups.write() = Arc::new(read_all::<GuestGroup>(store)?);
        *self.staff.write() = Arc::new(read_all::<StaffMember>(store)?);
        *self.menu_items.write() = Arc::new(read_all::<MenuItem>(store)?);

        let settings = store
            .get(Collection::Settings, veranda_core::SETTINGS_RECORD_ID)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?
            .unwrap_or_else(Settings::default_primary);
        *self.settings.write() = Arc::new(settings);

        self.generation.send_modify(|g| *g += 1);
        Ok(())
    }

    /// Current rooms snapshot.
    #[must_use]
    pub fn rooms(&self) -> Arc<Vec<Room>> {
        self.rooms.read().clone()
    }

    /// Current guests snapshot.
    #[must_use]
    pub fn guests(&self) -> Arc<Vec<Guest>> {
        self.guests.read().clone()
    }

    /// Current bookings snapshot.
    #[must_use]
    pub fn bookings(&self) -> Arc<Vec<Booking>> {
        self.bookings.read().clone()
    }

    /// Current transactions snapshot.
    #[must_use]
    pub fn transactions(&self) -> Arc<Vec<Transaction>> {
        self.transactions.read().clone()
    }

    /// Current groups snapshot.
    #[must_use]
    pub fn groups(&self) -> Arc<Vec<GuestGroup>> {
        self.groups.read().clone()
    }

    /// Current staff snapshot.
    #[must_use]
    pub fn staff(&self) -> Arc<Vec<StaffMember>> {
        self.staff.read().clone()
    }

    /// Current menu snapshot.
    #[must_use]
    pub fn menu_items(&self) -> Arc<Vec<MenuItem>> {
        self.menu_items.read().clone()
    }

    /// Current settings snapshot (default until a settings record exists).
    #[must_use]
    pub fn settings(&self) -> Arc<Settings> {
        self.settings.read().clone()
    }

    /// The current refresh generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Subscribe to refresh notifications.
    #[must_use]
    pub fn watch_generation(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}

fn read_all<E: Entity>(store: &dyn Store) -> Result<Vec<E>, StoreError> {
    store
        .get_all(E::COLLECTION)?
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .collect()
}

/// Write hook that re-runs the refresh cascade after every local mutation,
/// so the UI reflects its own write immediately, independent of the cloud
/// round-trip.
pub struct CacheRefresher {
    store: Arc<dyn Store>,
    cache: Arc<StateCache>,
}

impl CacheRefresher {
    /// Create a refresher reading from `store` into `cache`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cache: Arc<StateCache>) -> Self {
        Self { store, cache }
    }
}

impl WriteHook for CacheRefresher {
    fn record_changed(&self, _collection: Collection, _id: &str, _mutation: MutationKind) {
        if let Err(e) = self.cache.refresh_local_state(self.store.as_ref()) {
            tracing::warn!(error = %e, "state refresh after local write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use veranda_store::{LocalDb, MemoryStore, RoomStatus};

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

    #[test]
    fn refresh_mirrors_store_contents() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let db = LocalDb::new(store.clone());
        let cache = StateCache::new();

        db.put(test_room("RM-1", "101")).unwrap();
        db.put(test_room("RM-2", "102")).unwrap();

        assert!(cache.rooms().is_empty());
        cache.refresh_local_state(store.as_ref()).unwrap();

        assert_eq!(cache.rooms().len(), 2);
        assert_eq!(cache.generation(), 1);
    }

    #[test]
    fn refresher_hook_keeps_cache_current() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let db = LocalDb::new(store.clone());
        let cache = Arc::new(StateCache::new());
        db.attach_hook(Arc::new(CacheRefresher::new(store.clone(), cache.clone())));

        db.put(test_room("RM-1", "101")).unwrap();
        assert_eq!(cache.rooms().len(), 1);

        db.delete::<Room>("RM-1").unwrap();
        assert!(cache.rooms().is_empty());
        assert_eq!(cache.generation(), 2);
    }

    #[test]
    fn settings_snapshot_defaults_then_follows_store() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let db = LocalDb::new(store.clone());
        let cache = StateCache::new();

        cache.refresh_local_state(store.as_ref()).unwrap();
        assert_eq!(cache.settings().property_name, "Veranda Resort");

        let mut settings = db.settings().unwrap();
        settings.property_name = "Harbor House".to_string();
        db.put(settings).unwrap();

        cache.refresh_local_state(store.as_ref()).unwrap();
        assert_eq!(cache.settings().property_name, "Harbor House");
    }

    #[tokio::test]
    async fn generation_watch_signals_refresh() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let cache = StateCache::new();
        let mut rx = cache.watch_generation();

        cache.refresh_local_state(store.as_ref()).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }
}
