// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Normalized object cache for graph-shaped query results.
//!
//! `normcache` takes a [`Selection`] (what was requested) plus the JSON data
//! returned for it, splits the data into entity records keyed `Type:id`, and
//! later rebuilds any sub-shape of that data by walking a selection over the
//! stored records. Reads report whether the cache could satisfy the whole
//! selection or only part of it.
//!
//! ```
//! use normcache::{Cache, CacheConfig, Field, RecordKey, Selection};
//! use serde_json::json;
//!
//! let user = Selection::new()
//!     .field("id", Field::scalar("id", "ID"))
//!     .field("firstName", Field::scalar("firstName", "String"));
//! let query = Selection::new().field("viewer", Field::object("viewer", "User", user.clone()));
//!
//! let mut cache = Cache::new(CacheConfig::default());
//! cache
//!     .write(&query, &json!({ "viewer": { "id": "1", "firstName": "bob" } }))
//!     .unwrap();
//!
//! let result = cache.read_from(&RecordKey::from("User:1"), &user);
//! assert_eq!(result.data, json!({ "id": "1", "firstName": "bob" }));
//! assert!(!result.partial);
//! ```
//!
//! # Modules
//!
//! - [`key`] - record keys and the key resolver
//! - [`selection`] - selection descriptors (generator JSON or builders)
//! - [`record`] / [`store`] - slots, records and the record store
//! - [`lists`] - named-list registry and list operations
//! - [`snapshot`] - canonical export/import and state digests
//! - [`config`] - cache configuration and its JSON loader
#![forbid(unsafe_code)]

mod cache;
pub mod config;
mod error;
pub mod key;
pub mod lists;
pub mod patch;
mod read;
pub mod record;
pub mod selection;
pub mod snapshot;
pub mod store;
mod write;

pub use cache::{Cache, WriteSummary};
pub use config::{CacheConfig, ConfigError};
pub use error::CacheError;
pub use key::{EmbedReason, Identity, KeyResolver, RecordKey};
pub use lists::{
    ListAction, ListKind, ListLocation, ListOperation, ListOperationOutcome, ListPosition,
    ListRegistry,
};
pub use patch::{CacheOp, WritePatch};
pub use read::ReadResult;
pub use record::{Record, Slot};
pub use selection::{Field, FieldKind, ListMarker, OperationMarker, Selection};
pub use snapshot::{CacheSnapshot, StateDigest};
pub use store::{links_from, reachable_from_root, MemoryStore, RecordStore};
