// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record types: slots and the records that hold them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::RecordKey;

/// Stored value of one field on one record.
///
/// Invariants
/// - `Value` never holds a JSON array; lists are always decomposed into
///   [`Slot::List`] so positional `null`s and nesting survive.
/// - `Link` targets are entity or embedded keys, never the root key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Explicit `null`. This is data, not absence.
    Null,
    /// Scalar or enum value (custom scalars may be JSON objects).
    Value(Value),
    /// Reference to another record.
    Link(RecordKey),
    /// Ordered list, possibly nested.
    List(Vec<Slot>),
}

impl Slot {
    /// Returns `true` for [`Slot::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Visit every link in this slot, descending into nested lists.
    pub fn for_each_link<'a>(&'a self, f: &mut impl FnMut(&'a RecordKey)) {
        match self {
            Self::Link(key) => f(key),
            Self::List(items) => {
                for item in items {
                    item.for_each_link(f);
                }
            }
            Self::Null | Self::Value(_) => {}
        }
    }

    /// All links in this slot in positional order.
    pub fn links(&self) -> Vec<&RecordKey> {
        let mut out = Vec::new();
        self.for_each_link(&mut |key| out.push(key));
        out
    }
}

/// Materialised record: sub-key → slot.
///
/// The record's own key is not embedded here; the store supplies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Slot>,
}

impl Record {
    /// An empty record. Stores never keep empty records around.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot stored at `sub_key`.
    pub fn get(&self, sub_key: &str) -> Option<&Slot> {
        self.fields.get(sub_key)
    }

    /// Replace the slot at `sub_key`, returning the previous one.
    pub fn set(&mut self, sub_key: impl Into<String>, slot: Slot) -> Option<Slot> {
        self.fields.insert(sub_key.into(), slot)
    }

    /// Remove the slot at `sub_key`.
    pub fn remove(&mut self, sub_key: &str) -> Option<Slot> {
        self.fields.remove(sub_key)
    }

    /// Iterate `(sub_key, slot)` pairs in sub-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Slot)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every record this one links to, in sub-key then positional order.
    pub fn links(&self) -> Vec<&RecordKey> {
        let mut out = Vec::new();
        for slot in self.fields.values() {
            slot.for_each_link(&mut |key| out.push(key));
        }
        out
    }

    /// Number of written sub-keys.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
