//! Entity flattening for table storage.
//!
//! A table row is a flat bag of typed properties. Domain entities are
//! usually not flat: a message has a sender and a recipient, each with their
//! own id and display name. This crate maps any `serde` structure onto a
//! [`PropertyMap`] and back by prefixing nested member names with the name of
//! the member that holds them.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use stowage_entity::{flatten, unflatten, PropertyValue};
//!
//! #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//! #[serde(default, rename_all = "PascalCase")]
//! struct Contact {
//!     contact_id: String,
//!     display_name: String,
//! }
//!
//! #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
//! #[serde(default, rename_all = "PascalCase")]
//! struct Message {
//!     from: Contact,
//!     to: Contact,
//! }
//!
//! let message = Message {
//!     from: Contact { contact_id: "A".into(), display_name: "Ann".into() },
//!     to: Contact { contact_id: "B".into(), display_name: "Bob".into() },
//! };
//!
//! let map = flatten(&message).unwrap();
//! assert_eq!(map.get("FromContactId"), Some(&PropertyValue::String("A".into())));
//! assert_eq!(map.get("ToDisplayName"), Some(&PropertyValue::String("Bob".into())));
//!
//! let back: Message = unflatten(&map).unwrap();
//! assert_eq!(back, message);
//! ```
//!
//! Scalar members map onto property types as follows:
//!
//! | Rust type | Property |
//! |-----------|----------|
//! | `String`, `&str`, `char`, unit enum variants | `String` |
//! | `i8`, `i16`, `i32`, `u8`, `u16` | `Int32` |
//! | `i64`, `u32`, `u64` up to `i64::MAX` | `Int64` |
//! | `f32`, `f64` | `Double` |
//! | `bool` | `Boolean` |
//! | `DateTime<Utc>` with [`timestamp`] | `DateTime` |
//! | `Vec<u8>` with [`binary`] | `Binary` |
//!
//! `Option` members that are `None` contribute no properties. Sequences,
//! maps, tuples and enum variants carrying data are rejected with
//! [`EntityError::UnsupportedPropertyType`].

mod de;
mod error;
mod ser;
mod value;

pub mod binary;
pub mod timestamp;

pub use de::unflatten;
pub use error::{EntityError, Result};
pub use ser::flatten;
pub use value::{PropertyMap, PropertyValue};
