//! Default seed data for a cold start.

use chrono::{DateTime, Utc};
use veranda_core::Collection;
use veranda_store::{LocalDb, Room, RoomStatus, StoreError};

/// The default room list seeded when the property starts with an empty
/// local store and nothing came back from the cloud.
#[must_use]
pub fn default_rooms() -> Vec<Room> {
    let mut rooms = Vec::new();

    let mut add = |number: &str, room_type: &str, floor: u32, base_rate: f64| {
        rooms.push(Room {
            id: format!("RM-{number}"),
            number: number.to_string(),
            room_type: room_type.to_string(),
            floor,
            status: RoomStatus::Vacant,
            base_rate,
            features: Vec::new(),
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        });
    };

    for number in ["101", "102", "103", "104"] {
        add(number, "Standard", 1, 90.0);
    }
    for number in ["201", "202", "203", "204"] {
        add(number, "Deluxe", 2, 140.0);
    }
    for number in ["301", "302"] {
        add(number, "Suite", 3, 220.0);
    }

    rooms
}

/// Seed the default room list if the rooms collection is empty.
///
/// Returns whether seeding happened. Seeded rooms go through the normal
/// write path, so with the cloud enabled they are mirrored like any other
/// local write.
///
/// # Errors
///
/// Returns an error if the read or write fails.
pub fn seed_if_empty(db: &LocalDb) -> Result<bool, StoreError> {
    if !db.get_all_raw(Collection::Rooms)?.is_empty() {
        return Ok(false);
    }

    let rooms = db.bulk_put(default_rooms())?;
    tracing::info!(count = rooms.len(), "seeded default room list");
    Ok(true)
}
