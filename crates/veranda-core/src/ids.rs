//! Record identifier generation.
//!
//! The store never allocates ids; the application generates them. Ids follow
//! the `PREFIX-millis-suffix` convention: a per-collection prefix, the epoch
//! timestamp in milliseconds, and a random suffix to survive collisions when
//! two terminals create records in the same millisecond.

use crate::Collection;

/// Per-collection id prefix, so an id is recognizable on sight.
#[must_use]
pub const fn prefix(collection: Collection) -> &'static str {
    match collection {
        Collection::Rooms => "RM",
        Collection::Guests => "GST",
        Collection::Bookings => "BKG",
        Collection::Transactions => "TXN",
        Collection::Groups => "GRP",
        Collection::Staff => "STF",
        Collection::MenuItems => "MNU",
        Collection::Settings => "SET",
    }
}

/// Generate a new record id for the given collection.
///
/// The id is `PREFIX-<epoch millis>-<8 random hex chars>`. Uniqueness within
/// a collection relies on the random suffix; the timestamp keeps ids roughly
/// sortable by creation time.
#[must_use]
pub fn new_record_id(collection: Collection) -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let uuid = uuid::Uuid::new_v4();
    let suffix = &uuid.simple().to_string()[..8];

    format!("{}-{millis}-{suffix}", prefix(collection))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_has_expected_shape() {
        let id = new_record_id(Collection::Bookings);
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "BKG");
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<String> = (0..100)
            .map(|_| new_record_id(Collection::Rooms))
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn prefixes_are_distinct() {
        let mut prefixes: Vec<&str> = Collection::ALL.iter().map(|c| prefix(*c)).collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), Collection::ALL.len());
    }
}
