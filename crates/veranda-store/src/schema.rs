//! Database schema definitions and column families.
//!
//! Each record collection maps to one `RocksDB` column family named after the
//! collection's wire name; one extra column family holds the sync outbox.

use veranda_core::Collection;

/// Column family holding pending-sync outbox markers.
pub const OUTBOX_CF: &str = "outbox";

/// The column family name for a record collection.
#[must_use]
pub const fn cf_name(collection: Collection) -> &'static str {
    collection.as_str()
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Collection::ALL.iter().map(|c| c.as_str()).collect();
    names.push(OUTBOX_CF);
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_cf_per_collection_plus_outbox() {
        let names = all_column_families();
        assert_eq!(names.len(), Collection::ALL.len() + 1);
        assert!(names.contains(&"rooms"));
        assert!(names.contains(&"settings"));
        assert!(names.contains(&OUTBOX_CF));
    }
}
