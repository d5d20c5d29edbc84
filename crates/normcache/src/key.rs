// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record keys and the key resolver.
//!
//! Every record in the store is addressed by a [`RecordKey`]. Three shapes
//! exist:
//!
//! - the root record, `_ROOT_`;
//! - entity records, `Type:id`, produced by [`KeyResolver::identify`];
//! - embedded records, `@parent.subKey` (plus `[i]` per list level), for
//!   objects without an identity. Embedded keys are scoped to the slot that
//!   owns them and are never produced for anything else.
//!
//! Type names never start with `@`, so the embedded prefix keeps embedded
//! keys out of the `Type:id` namespace whatever characters an id contains.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::CacheConfig;

const ROOT_KEY: &str = "_ROOT_";

/// Leading marker of every embedded record key.
pub const EMBEDDED_PREFIX: char = '@';

/// Separator between the values of a composite identifier.
pub const COMPOSITE_SEPARATOR: &str = "__";

/// Address of a record in the store.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    /// Key of the root record that top-level writes and reads target.
    pub fn root() -> Self {
        Self(ROOT_KEY.to_owned())
    }

    /// `Type:id` key of a normalized entity.
    pub fn entity(type_name: &str, id: &str) -> Self {
        Self(format!("{type_name}:{id}"))
    }

    /// Key of an embedded object living in `parent`'s `sub_key` slot.
    ///
    /// `path` holds the list indices leading to the object when the slot is a
    /// (possibly nested) list. Nested embedded parents keep a single prefix.
    pub fn embedded(parent: &Self, sub_key: &str, path: &[usize]) -> Self {
        let base = parent.as_str().strip_prefix(EMBEDDED_PREFIX).unwrap_or(parent.as_str());
        let mut key = format!("{EMBEDDED_PREFIX}{base}.{sub_key}");
        for index in path {
            key.push_str(&format!("[{index}]"));
        }
        Self(key)
    }

    /// Returns `true` for keys minted by [`RecordKey::embedded`] (and list
    /// edge records).
    pub fn is_embedded(&self) -> bool {
        self.0.starts_with(EMBEDDED_PREFIX)
    }

    /// Returns `true` for the root record key.
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_KEY
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Why an object could not be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedReason {
    /// The field is abstract and the object carries no typename.
    MissingTypename,
    /// One of the identifying fields is absent, `null`, or not a scalar.
    MissingIdentifier,
}

/// Outcome of key resolution for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The object is a normalized entity stored under this key.
    Entity(RecordKey),
    /// The object has no stable identity and lives inside its parent's slot.
    Embedded(EmbedReason),
}

/// Computes entity keys from object data. Pure; holds only configuration.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    config: CacheConfig,
}

impl KeyResolver {
    /// Build a resolver from cache configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Field name carrying the runtime type of abstract values.
    pub fn typename_field(&self) -> &str {
        &self.config.typename_field
    }

    /// Concrete type of `object`: the declared type, or the typename carried
    /// by the data when the field is abstract.
    pub fn concrete_type<'a>(
        &self,
        declared: &'a str,
        is_abstract: bool,
        object: &'a Map<String, Value>,
    ) -> Option<&'a str> {
        if !is_abstract {
            return Some(declared);
        }
        object
            .get(&self.config.typename_field)
            .and_then(Value::as_str)
    }

    /// Resolve the identity of `object` declared as `declared`.
    pub fn identify(
        &self,
        declared: &str,
        is_abstract: bool,
        object: &Map<String, Value>,
    ) -> Identity {
        let Some(type_name) = self.concrete_type(declared, is_abstract, object) else {
            return Identity::Embedded(EmbedReason::MissingTypename);
        };
        let mut parts = Vec::new();
        for field in self.config.keys_for(type_name) {
            match object.get(field).and_then(identifier_text) {
                Some(text) => parts.push(text),
                None => return Identity::Embedded(EmbedReason::MissingIdentifier),
            }
        }
        if parts.is_empty() {
            return Identity::Embedded(EmbedReason::MissingIdentifier);
        }
        Identity::Entity(RecordKey::entity(
            type_name,
            &parts.join(COMPOSITE_SEPARATOR),
        ))
    }
}

fn identifier_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
