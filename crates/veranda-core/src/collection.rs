//! Record collections of the property-management domain.
//!
//! Every record belongs to exactly one collection. Collection names double as
//! the local column-family names and the remote table names, so the same
//! identifier is used end to end.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named record collection.
///
/// The variants cover the entity types the property-management application
/// persists. `Settings` is a singleton collection holding exactly one record
/// with the fixed id [`SETTINGS_RECORD_ID`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Physical rooms of the property.
    Rooms,
    /// Guest profiles.
    Guests,
    /// Room bookings, with embedded payment entries.
    Bookings,
    /// Ledger transactions (charges, payments, refunds).
    Transactions,
    /// Guest groups spanning multiple bookings.
    Groups,
    /// Staff roster.
    Staff,
    /// Dining menu items.
    MenuItems,
    /// Property-wide configuration singleton.
    Settings,
}

/// Fixed id of the settings singleton record.
pub const SETTINGS_RECORD_ID: &str = "primary";

impl Collection {
    /// All collections, in the order the bootstrap reconciler processes them.
    ///
    /// Settings is first so property configuration is in place before the
    /// operational collections load.
    pub const ALL: [Self; 8] = [
        Self::Settings,
        Self::Rooms,
        Self::Guests,
        Self::Groups,
        Self::Bookings,
        Self::Transactions,
        Self::Staff,
        Self::MenuItems,
    ];

    /// The wire name of the collection (local column family and remote table).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rooms => "rooms",
            Self::Guests => "guests",
            Self::Bookings => "bookings",
            Self::Transactions => "transactions",
            Self::Groups => "groups",
            Self::Staff => "staff",
            Self::MenuItems => "menu_items",
            Self::Settings => "settings",
        }
    }

    /// Look up a collection by its wire name.
    ///
    /// Returns `None` for unknown names, which import paths treat as
    /// "ignore this key" rather than an error.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rooms" => Some(Self::Rooms),
            "guests" => Some(Self::Guests),
            "bookings" => Some(Self::Bookings),
            "transactions" => Some(Self::Transactions),
            "groups" => Some(Self::Groups),
            "staff" => Some(Self::Staff),
            "menu_items" => Some(Self::MenuItems),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }

    /// A stable one-byte tag used as a key prefix in composite keys.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Rooms => 1,
            Self::Guests => 2,
            Self::Bookings => 3,
            Self::Transactions => 4,
            Self::Groups => 5,
            Self::Staff => 6,
            Self::MenuItems => 7,
            Self::Settings => 8,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_roundtrip() {
        for collection in Collection::ALL {
            assert_eq!(
                Collection::from_name(collection.as_str()),
                Some(collection)
            );
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(Collection::from_name("invoices"), None);
        assert_eq!(Collection::from_name(""), None);
    }

    #[test]
    fn tags_are_unique() {
        let mut tags: Vec<u8> = Collection::ALL.iter().map(|c| c.tag()).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), Collection::ALL.len());
    }

    #[test]
    fn serde_uses_wire_name() {
        let json = serde_json::to_string(&Collection::MenuItems).unwrap();
        assert_eq!(json, "\"menu_items\"");
        let back: Collection = serde_json::from_str("\"rooms\"").unwrap();
        assert_eq!(back, Collection::Rooms);
    }
}
