//! Typed records persisted in the entity store.
//!
//! Each collection stores one record type. Records are validated at the
//! store boundary by deserializing into these types, instead of accepting
//! arbitrary JSON; fields the application may omit are `Option` or carry
//! serde defaults so sparse rows pulled from the remote mirror still
//! validate. Nested structures (payments inside a booking, the room-type
//! catalog inside settings) stay embedded and are not normalized.
//!
//! Every record carries `updated_at`, stamped by [`LocalDb`] on local writes
//! and used as the last-write-wins comparison key when remote state is
//! merged.
//!
//! [`LocalDb`]: crate::LocalDb

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use veranda_core::{Collection, SETTINGS_RECORD_ID};

use crate::error::{Result, StoreError};

/// A typed record belonging to a fixed collection.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// The collection this record type is stored in.
    const COLLECTION: Collection;

    /// The record's unique id within its collection.
    fn id(&self) -> &str;

    /// Last-modified timestamp used for last-write-wins merging.
    fn updated_at(&self) -> DateTime<Utc>;

    /// Stamp the last-modified timestamp.
    fn touch(&mut self, at: DateTime<Utc>);
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

// =============================================================================
// Rooms
// =============================================================================

/// Occupancy status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Ready to sell.
    #[default]
    Vacant,
    /// Currently occupied by a checked-in booking.
    Occupied,
    /// Held by a future booking.
    Reserved,
    /// Blocked for maintenance.
    OutOfService,
}

/// A physical room of the property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Unique record id.
    pub id: String,
    /// Door number, e.g. `"204"`.
    pub number: String,
    /// Room-type name, matching an entry in the settings catalog.
    #[serde(default)]
    pub room_type: String,
    /// Floor the room is on.
    #[serde(default)]
    pub floor: u32,
    /// Current occupancy status.
    #[serde(default)]
    pub status: RoomStatus,
    /// Nightly rate.
    #[serde(default)]
    pub base_rate: f64,
    /// Feature tags, e.g. `"balcony"`.
    #[serde(default)]
    pub features: Vec<String>,
    /// Last-modified timestamp.
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Guests
// =============================================================================

/// A guest profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guest {
    /// Unique record id.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Identity document reference recorded at check-in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_document: Option<String>,
    /// Last-modified timestamp.
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Bookings
// =============================================================================

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Guest is checked in.
    #[default]
    Active,
    /// Booked for a future date.
    Reserved,
    /// Checked out and settled.
    Completed,
    /// Cancelled before check-in.
    Cancelled,
}

/// A payment entry embedded in a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Amount received.
    pub amount: f64,
    /// Payment method, e.g. `"cash"` or `"card"`.
    #[serde(default)]
    pub method: String,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the payment was taken.
    #[serde(default = "epoch")]
    pub received_at: DateTime<Utc>,
}

/// A room booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique record id.
    pub id: String,
    /// Id of the booked room.
    pub room_id: String,
    /// Id of the primary guest.
    pub guest_id: String,
    /// Check-in date.
    pub check_in: NaiveDate,
    /// Check-out date.
    pub check_out: NaiveDate,
    /// Lifecycle status.
    #[serde(default)]
    pub status: BookingStatus,
    /// Number of adults.
    #[serde(default)]
    pub adults: u32,
    /// Number of children.
    #[serde(default)]
    pub children: u32,
    /// Agreed nightly rate.
    #[serde(default)]
    pub rate: f64,
    /// Payments taken against this booking, stored embedded.
    #[serde(default)]
    pub payments: Vec<Payment>,
    /// Group this booking belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Last-modified timestamp.
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Transactions
// =============================================================================

/// Category of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Nightly room charge.
    RoomCharge,
    /// Dining / POS charge.
    Dining,
    /// Banquet or facility charge.
    Banquet,
    /// Payment received.
    Payment,
    /// Refund issued.
    Refund,
    /// Anything else.
    #[default]
    Other,
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique record id.
    pub id: String,
    /// Booking the entry is posted against, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    /// Guest the entry is posted against, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<String>,
    /// Amount; positive for charges, negative for payments/refunds.
    pub amount: f64,
    /// Category.
    #[serde(default)]
    pub kind: TransactionKind,
    /// Settlement method, e.g. `"cash"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the entry was posted.
    #[serde(default = "epoch")]
    pub posted_at: DateTime<Utc>,
    /// Last-modified timestamp.
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Groups
// =============================================================================

/// A guest group spanning multiple bookings (tour parties, corporate blocks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestGroup {
    /// Unique record id.
    pub id: String,
    /// Group name.
    pub name: String,
    /// Guest id of the group leader, if designated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_guest_id: Option<String>,
    /// Bookings that belong to the group.
    #[serde(default)]
    pub booking_ids: Vec<String>,
    /// Last-modified timestamp.
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Staff
// =============================================================================

/// A staff roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    /// Unique record id.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Role, e.g. `"front desk"`.
    #[serde(default)]
    pub role: String,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Monthly salary for payroll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_salary: Option<f64>,
    /// Joining date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_on: Option<NaiveDate>,
    /// Last-modified timestamp.
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Menu items
// =============================================================================

/// A dining menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Unique record id.
    pub id: String,
    /// Item name.
    pub name: String,
    /// Menu category, e.g. `"beverages"`.
    #[serde(default)]
    pub category: String,
    /// Price.
    #[serde(default)]
    pub price: f64,
    /// Whether the item is currently available.
    #[serde(default = "default_true")]
    pub available: bool,
    /// Last-modified timestamp.
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Settings
// =============================================================================

/// A room-type entry in the settings catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomTypeDef {
    /// Type name, e.g. `"Deluxe"`.
    pub name: String,
    /// Default nightly rate for the type.
    #[serde(default)]
    pub base_rate: f64,
    /// Maximum occupancy.
    #[serde(default)]
    pub max_occupancy: u32,
}

/// Property-wide configuration, stored as a singleton record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Fixed id, always [`SETTINGS_RECORD_ID`].
    pub id: String,
    /// Display name of the property.
    #[serde(default)]
    pub property_name: String,
    /// Tax rate applied to charges, in percent.
    #[serde(default)]
    pub tax_rate_percent: f64,
    /// ISO currency code.
    #[serde(default)]
    pub currency: String,
    /// Room-type catalog.
    #[serde(default)]
    pub room_types: Vec<RoomTypeDef>,
    /// Booking agents / channels tracked by the property.
    #[serde(default)]
    pub agents: Vec<String>,
    /// Static API key checked by the external REST facade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_api_key: Option<String>,
    /// Last-modified timestamp.
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    /// The default settings record used before a property configures itself.
    #[must_use]
    pub fn default_primary() -> Self {
        Self {
            id: SETTINGS_RECORD_ID.to_string(),
            property_name: "Veranda Resort".to_string(),
            tax_rate_percent: 12.0,
            currency: "USD".to_string(),
            room_types: vec![
                RoomTypeDef {
                    name: "Standard".to_string(),
                    base_rate: 90.0,
                    max_occupancy: 2,
                },
                RoomTypeDef {
                    name: "Deluxe".to_string(),
                    base_rate: 140.0,
                    max_occupancy: 3,
                },
                RoomTypeDef {
                    name: "Suite".to_string(),
                    base_rate: 220.0,
                    max_occupancy: 4,
                },
            ],
            agents: Vec::new(),
            external_api_key: None,
            updated_at: epoch(),
        }
    }
}

// =============================================================================
// Entity impls
// =============================================================================

macro_rules! impl_entity {
    ($ty:ty, $collection:expr) => {
        impl Entity for $ty {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> &str {
                &self.id
            }

            fn updated_at(&self) -> DateTime<Utc> {
                self.updated_at
            }

            fn touch(&mut self, at: DateTime<Utc>) {
                self.updated_at = at;
            }
        }
    };
}

impl_entity!(Room, Collection::Rooms);
impl_entity!(Guest, Collection::Guests);
impl_entity!(Booking, Collection::Bookings);
impl_entity!(Transaction, Collection::Transactions);
impl_entity!(GuestGroup, Collection::Groups);
impl_entity!(StaffMember, Collection::Staff);
impl_entity!(MenuItem, Collection::MenuItems);
impl_entity!(Settings, Collection::Settings);

// =============================================================================
// Raw-value helpers
// =============================================================================

/// Extract the non-empty string `id` from a raw record value.
///
/// # Errors
///
/// Returns `StoreError::InvalidRecord` if `id` is missing, not a string, or
/// empty.
pub fn record_id(value: &Value) -> Result<&str> {
    match value.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(StoreError::InvalidRecord(
            "record has no string id".to_string(),
        )),
    }
}

/// Read a raw record's `updated_at`, treating missing or malformed values as
/// the epoch so records without a timestamp always lose a last-write-wins
/// comparison.
#[must_use]
pub fn record_updated_at(value: &Value) -> DateTime<Utc> {
    value
        .get("updated_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or_else(epoch, |dt| dt.with_timezone(&Utc))
}

/// Validate a raw value against the record type of its collection.
///
/// # Errors
///
/// Returns `StoreError::InvalidRecord` if the value does not deserialize as
/// the collection's record type or has no usable id.
pub fn validate(collection: Collection, value: &Value) -> Result<()> {
    fn check<E: Entity>(value: &Value) -> Result<()> {
        serde_json::from_value::<E>(value.clone())
            .map(|_| ())
            .map_err(|e| StoreError::InvalidRecord(e.to_string()))
    }

    record_id(value)?;

    match collection {
        Collection::Rooms => check::<Room>(value),
        Collection::Guests => check::<Guest>(value),
        Collection::Bookings => check::<Booking>(value),
        Collection::Transactions => check::<Transaction>(value),
        Collection::Groups => check::<GuestGroup>(value),
        Collection::Staff => check::<StaffMember>(value),
        Collection::MenuItems => check::<MenuItem>(value),
        Collection::Settings => check::<Settings>(value),
    }
}
