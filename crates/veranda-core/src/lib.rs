//! Core types and utilities for the Veranda sync engine.
//!
//! This crate provides the foundational vocabulary shared by the storage,
//! cloud-bridge, and sync-engine crates:
//!
//! - **Collections**: the named record collections of the property domain
//! - **Record IDs**: collision-resistant string identifier generation
//!
//! # Example
//!
//! ```
//! use veranda_core::{ids, Collection};
//!
//! // Look up a collection by its wire name
//! let collection = Collection::from_name("bookings").unwrap();
//! assert_eq!(collection, Collection::Bookings);
//!
//! // Generate a record ID for it
//! let id = ids::new_record_id(collection);
//! assert!(id.starts_with("BKG-"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collection;
pub mod ids;

pub use collection::{Collection, SETTINGS_RECORD_ID};
