// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read path: rebuild a data tree from records and judge its completeness.
//!
//! # Cascade rules
//!
//! - A field is *missing* when its sub-key was never written, or when it links
//!   to a record that is itself missing required data.
//! - A stored `null` is data. It is never missing.
//! - A missing field that is `nullable` becomes `null` and marks the read
//!   partial. A missing non-nullable field turns its enclosing object into a
//!   missing value, and the rule repeats one level up.
//! - List entries follow the same rule, using the list field's nullability.
//!   An empty list is complete data.
//!
//! At the top level a read that found no data at all reports
//! `data: null, partial: false`; anything else reports what it found together
//! with the partial flag.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::key::RecordKey;
use crate::record::Slot;
use crate::selection::{Field, FieldKind, Selection};
use crate::store::RecordStore;

/// Outcome of a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadResult {
    /// Reconstructed data, or `null`.
    pub data: Value,
    /// Some requested data was not in the cache.
    pub partial: bool,
}

impl ReadResult {
    /// Returns `true` when data was found and nothing was missing.
    pub fn is_complete(&self) -> bool {
        !self.partial && !self.data.is_null()
    }
}

/// Resolve `selection` against the record at `parent`.
pub(crate) fn read_selection<S>(store: &S, selection: &Selection, parent: &RecordKey) -> ReadResult
where
    S: RecordStore + ?Sized,
{
    let resolved = Reader { store }.object(selection, parent);
    if resolved.has_data {
        ReadResult {
            data: resolved.value,
            partial: resolved.partial,
        }
    } else {
        ReadResult {
            data: Value::Null,
            partial: false,
        }
    }
}

/// Value resolved for one subtree.
#[derive(Debug)]
struct Resolved {
    value: Value,
    /// Something below was missing (absorbed or not).
    partial: bool,
    /// Something below was present, `null`s included.
    has_data: bool,
    /// This value itself is missing and must be absorbed by a nullable field.
    missing: bool,
}

impl Resolved {
    fn found(value: Value) -> Self {
        Self {
            value,
            partial: false,
            has_data: true,
            missing: false,
        }
    }

    fn missing() -> Self {
        Self {
            value: Value::Null,
            partial: true,
            has_data: false,
            missing: true,
        }
    }
}

struct Reader<'a, S: ?Sized> {
    store: &'a S,
}

impl<S> Reader<'_, S>
where
    S: RecordStore + ?Sized,
{
    fn object(&self, selection: &Selection, key: &RecordKey) -> Resolved {
        let record = self.store.record(key);
        let mut target = Map::new();
        let mut partial = false;
        let mut has_data = false;
        let mut cascade = false;

        for (name, field) in selection.iter() {
            let slot = record.and_then(|record| record.get(&field.key_raw));
            let resolved = match slot {
                None => Resolved::missing(),
                Some(slot) => self.field(field, slot, key),
            };
            partial |= resolved.partial;
            has_data |= resolved.has_data;
            if resolved.missing && !field.nullable {
                cascade = true;
            }
            target.insert(name.to_owned(), resolved.value);
        }

        Resolved {
            value: if cascade {
                Value::Null
            } else {
                Value::Object(target)
            },
            partial,
            has_data,
            missing: cascade,
        }
    }

    fn field(&self, field: &Field, slot: &Slot, key: &RecordKey) -> Resolved {
        match &field.kind {
            FieldKind::Scalar => match scalar_value(slot) {
                Some(value) => Resolved::found(value),
                None => {
                    debug!(record = %key, field = %field.key_raw, "scalar field holds a link; treating as missing");
                    Resolved::missing()
                }
            },
            FieldKind::Object(fields) | FieldKind::Abstract(fields) => {
                self.linked(field, fields, slot, key)
            }
        }
    }

    fn linked(&self, field: &Field, fields: &Selection, slot: &Slot, key: &RecordKey) -> Resolved {
        match slot {
            Slot::Null => Resolved::found(Value::Null),
            // A selection without fields is satisfied by any present link.
            Slot::Link(_) if fields.is_empty() => Resolved::found(Value::Object(Map::new())),
            Slot::Link(linked) => self.object(fields, linked),
            Slot::List(items) => self.list(field, fields, items, key),
            Slot::Value(_) => {
                debug!(record = %key, field = %field.key_raw, "object field holds a raw value; treating as missing");
                Resolved::missing()
            }
        }
    }

    fn list(&self, field: &Field, fields: &Selection, items: &[Slot], key: &RecordKey) -> Resolved {
        let mut values = Vec::with_capacity(items.len());
        let mut partial = false;
        let mut has_data = items.is_empty();
        let mut missing = false;

        for item in items {
            let resolved = self.linked(field, fields, item, key);
            partial |= resolved.partial;
            has_data |= resolved.has_data;
            if resolved.missing {
                partial = true;
                if !field.nullable {
                    missing = true;
                }
            }
            values.push(resolved.value);
        }

        Resolved {
            value: if missing {
                Value::Null
            } else {
                Value::Array(values)
            },
            partial,
            has_data,
            missing,
        }
    }
}

/// JSON form of a scalar slot; `None` if a link is found anywhere inside.
fn scalar_value(slot: &Slot) -> Option<Value> {
    match slot {
        Slot::Null => Some(Value::Null),
        Slot::Value(value) => Some(value.clone()),
        Slot::List(items) => items
            .iter()
            .map(scalar_value)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        Slot::Link(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let root = RecordKey::root();
        store.set_slot(&root, "viewer", Slot::Link("User:1".into()));
        store.set_slot(&"User:1".into(), "id", Slot::Value(json!("1")));
        store.set_slot(&"User:1".into(), "nickname", Slot::Null);
        store.set_slot(
            &"User:1".into(),
            "friends",
            Slot::List(vec![Slot::Link("User:2".into()), Slot::Null]),
        );
        store.set_slot(&"User:2".into(), "id", Slot::Value(json!("2")));
        store
    }

    fn id() -> Selection {
        Selection::new().field("id", Field::scalar("id", "ID"))
    }

    #[test]
    fn stored_null_is_data_even_when_non_nullable() {
        let selection = Selection::new().field("nickname", Field::scalar("nickname", "String"));
        let result = read_selection(&store(), &selection, &"User:1".into());
        assert_eq!(result, ReadResult { data: json!({ "nickname": null }), partial: false });
    }

    #[test]
    fn nullable_missing_scalar_becomes_null_and_partial() {
        let selection = id().field("age", Field::scalar("age", "Int").nullable());
        let result = read_selection(&store(), &selection, &"User:1".into());
        assert_eq!(result.data, json!({ "id": "1", "age": null }));
        assert!(result.partial);
    }

    #[test]
    fn missing_list_element_cascades_through_non_nullable_list() {
        let friend = id().field("name", Field::scalar("name", "String"));
        let selection = id().field("friends", Field::object("friends", "User", friend.clone()));
        let result = read_selection(&store(), &selection, &"User:1".into());
        assert_eq!(result, ReadResult { data: Value::Null, partial: true });

        let selection = id().field("friends", Field::object("friends", "User", friend).nullable());
        let result = read_selection(&store(), &selection, &"User:1".into());
        assert_eq!(result.data, json!({ "id": "1", "friends": [null, null] }));
        assert!(result.partial);
    }

    #[test]
    fn zero_field_selection_is_satisfied_by_link() {
        let selection = Selection::new().field("viewer", Field::object("viewer", "User", Selection::new()));
        let result = read_selection(&store(), &selection, &RecordKey::root());
        assert_eq!(result, ReadResult { data: json!({ "viewer": {} }), partial: false });
    }

    #[test]
    fn unknown_parent_has_no_data() {
        let result = read_selection(&store(), &id(), &"User:404".into());
        assert_eq!(result, ReadResult { data: Value::Null, partial: false });
        assert!(!result.is_complete());
    }

    #[test]
    fn scalar_selection_over_link_is_missing() {
        let selection = Selection::new()
            .field("viewer", Field::scalar("viewer", "String").nullable())
            .field("other", Field::scalar("other", "String").nullable());
        let mut store = store();
        store.set_slot(&RecordKey::root(), "other", Slot::Value(json!("x")));
        let result = read_selection(&store, &selection, &RecordKey::root());
        assert_eq!(result.data, json!({ "viewer": null, "other": "x" }));
        assert!(result.partial);
    }
}
