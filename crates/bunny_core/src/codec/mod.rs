//! Key and value encodings used by the store.
//!
//! # Responsibility
//! - Map structured keys to strings whose byte order is the iteration order.
//! - Serialize records and position values to the store's text values.
//!
//! # Invariants
//! - Every key produced here parses back to the structure that produced it.
//! - Encoding failures and decoding failures stay distinguishable.

pub mod key;
pub mod record;

pub use key::{CollectionKey, CollectionKind, EntityKind, KeyError, MemberKey, Position};
pub use record::{decode, encode, CodecError};
