// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Write path: decompose a data tree into record mutations.
//!
//! [`plan_write`] walks a selection and its data side by side and returns the
//! [`WritePatch`] that stores it. Nothing is mutated here; the input data is
//! only borrowed.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{value_kind, CacheError};
use crate::key::{Identity, KeyResolver, RecordKey};
use crate::lists::{ListKind, ListLocation, ListOperation, DEFAULT_NODE_KEY};
use crate::patch::{CacheOp, WritePatch};
use crate::record::Slot;
use crate::selection::{Field, FieldKind, ListMarker, Selection};

/// Response name of the edge list inside a connection selection.
const EDGES_FIELD: &str = "edges";

/// Plan the mutations that store `data` (shaped by `selection`) under `parent`.
pub(crate) fn plan_write(
    keys: &KeyResolver,
    selection: &Selection,
    data: &Value,
    parent: &RecordKey,
) -> Result<WritePatch, CacheError> {
    let Value::Object(object) = data else {
        return Err(CacheError::NotAnObject {
            record: parent.clone(),
            found: value_kind(data),
        });
    };
    Writer { keys }.object(selection, object, parent)
}

struct Writer<'a> {
    keys: &'a KeyResolver,
}

impl Writer<'_> {
    /// Write every selected field present in `object` onto `record`.
    ///
    /// Fields absent from the data are skipped; they keep whatever the store
    /// already had.
    fn object(
        &self,
        selection: &Selection,
        object: &Map<String, Value>,
        record: &RecordKey,
    ) -> Result<WritePatch, CacheError> {
        let mut patch = WritePatch::new();
        for (name, field) in selection.iter() {
            let Some(value) = object.get(name) else {
                continue;
            };
            let (slot, nested) = self.field(field, value, record)?;
            patch.extend(nested);

            let registration = field
                .list
                .as_ref()
                .map(|marker| list_registration(field, marker, record, &slot));
            let operations: Vec<CacheOp> = field
                .operations
                .iter()
                .flat_map(|marker| {
                    slot.links().into_iter().map(move |target| {
                        CacheOp::ApplyList(ListOperation {
                            list: marker.list.clone(),
                            action: marker.action,
                            target: target.clone(),
                            position: marker.position,
                            parent: marker.parent.clone(),
                        })
                    })
                })
                .collect();

            // Linked records first, then the slot, then list bookkeeping.
            patch.push(CacheOp::SetSlot {
                record: record.clone(),
                sub_key: field.key_raw.clone(),
                slot,
            });
            patch.extend_ops(registration.into_iter().chain(operations));
        }
        Ok(patch)
    }

    fn field(
        &self,
        field: &Field,
        value: &Value,
        record: &RecordKey,
    ) -> Result<(Slot, WritePatch), CacheError> {
        match &field.kind {
            FieldKind::Scalar => Ok((scalar_slot(value), WritePatch::new())),
            FieldKind::Object(fields) | FieldKind::Abstract(fields) => {
                self.linked(field, fields, value, record, &mut Vec::new())
            }
        }
    }

    /// Store an object-typed value, descending through nested lists.
    ///
    /// `path` tracks list indices so embedded objects get distinct keys.
    fn linked(
        &self,
        field: &Field,
        fields: &Selection,
        value: &Value,
        owner: &RecordKey,
        path: &mut Vec<usize>,
    ) -> Result<(Slot, WritePatch), CacheError> {
        match value {
            Value::Null => Ok((Slot::Null, WritePatch::new())),
            Value::Array(items) => {
                let mut patch = WritePatch::new();
                let mut slots = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    path.push(index);
                    let result = self.linked(field, fields, item, owner, path);
                    path.pop();
                    let (slot, nested) = result?;
                    patch.extend(nested);
                    slots.push(slot);
                }
                Ok((Slot::List(slots), patch))
            }
            Value::Object(object) => {
                let (key, embedded) = match self
                    .keys
                    .identify(&field.type_name, field.is_abstract(), object)
                {
                    Identity::Entity(key) => (key, false),
                    Identity::Embedded(reason) => {
                        let key = RecordKey::embedded(owner, &field.key_raw, path.as_slice());
                        debug!(
                            field = %field.key_raw,
                            declared = %field.type_name,
                            ?reason,
                            embedded = %key,
                            "object has no identity; embedding under parent"
                        );
                        (key, true)
                    }
                };
                let mut patch = self.object(fields, object, &key)?;
                if embedded {
                    patch.note_embedded(key.clone());
                }
                Ok((Slot::Link(key), patch))
            }
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Err(CacheError::ShapeMismatch {
                record: owner.clone(),
                field: field.key_raw.clone(),
                expected: "object",
                found: value_kind(value),
            }),
        }
    }
}

/// Scalars are stored verbatim, except that lists are decomposed so nesting
/// and positional `null`s are explicit.
fn scalar_slot(value: &Value) -> Slot {
    match value {
        Value::Null => Slot::Null,
        Value::Array(items) => Slot::List(items.iter().map(scalar_slot).collect()),
        other => Slot::Value(other.clone()),
    }
}

fn list_registration(field: &Field, marker: &ListMarker, owner: &RecordKey, slot: &Slot) -> CacheOp {
    let location = if marker.connection {
        match slot {
            Slot::Link(connection) => Some(connection_location(field, owner, connection)),
            _ => None,
        }
    } else if slot.is_null() {
        None
    } else {
        Some(ListLocation::plain(owner.clone(), field.key_raw.clone()))
    };
    match location {
        Some(location) => CacheOp::RegisterList {
            name: marker.name.clone(),
            location,
        },
        None => CacheOp::UnregisterList {
            name: marker.name.clone(),
            owner: owner.clone(),
        },
    }
}

/// Location of the edge list inside a connection record.
fn connection_location(field: &Field, owner: &RecordKey, connection: &RecordKey) -> ListLocation {
    let edges = field.fields().and_then(|fields| fields.get(EDGES_FIELD));
    let sub_key = edges.map_or_else(|| EDGES_FIELD.to_owned(), |edges| edges.key_raw.clone());
    let node_key = edges
        .and_then(Field::fields)
        .and_then(|fields| fields.get(DEFAULT_NODE_KEY))
        .map_or_else(|| DEFAULT_NODE_KEY.to_owned(), |node| node.key_raw.clone());
    ListLocation {
        owner: owner.clone(),
        record: connection.clone(),
        sub_key,
        kind: ListKind::Connection { node_key },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::lists::ListAction;
    use crate::selection::OperationMarker;
    use serde_json::json;

    fn keys() -> KeyResolver {
        KeyResolver::from_config(&CacheConfig::default())
    }

    fn user_fields() -> Selection {
        Selection::new()
            .field("id", Field::scalar("id", "ID"))
            .field("firstName", Field::scalar("firstName", "String"))
    }

    fn set_slots(patch: &WritePatch) -> Vec<(String, String, Slot)> {
        patch
            .ops()
            .iter()
            .filter_map(|op| match op {
                CacheOp::SetSlot {
                    record,
                    sub_key,
                    slot,
                } => Some((record.to_string(), sub_key.clone(), slot.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn nested_entity_becomes_link() {
        let selection =
            Selection::new().field("viewer", Field::object("viewer", "User", user_fields()));
        let data = json!({ "viewer": { "id": "1", "firstName": "bob" } });
        let patch = plan_write(&keys(), &selection, &data, &RecordKey::root()).unwrap();
        let slots = set_slots(&patch);
        assert!(slots.contains(&("User:1".into(), "firstName".into(), Slot::Value(json!("bob")))));
        assert!(slots.contains(&("_ROOT_".into(), "viewer".into(), Slot::Link("User:1".into()))));
    }

    #[test]
    fn object_without_id_is_embedded_per_list_index() {
        let address = Selection::new().field("city", Field::scalar("city", "String"));
        let selection = Selection::new().field(
            "addresses",
            Field::object("addresses", "Address", address),
        );
        let data = json!({ "addresses": [{ "city": "Oslo" }, null, { "city": "Rome" }] });
        let patch = plan_write(&keys(), &selection, &data, &"User:1".into()).unwrap();
        let slots = set_slots(&patch);
        assert!(slots.contains(&(
            "User:1".into(),
            "addresses".into(),
            Slot::List(vec![
                Slot::Link("@User:1.addresses[0]".into()),
                Slot::Null,
                Slot::Link("@User:1.addresses[2]".into()),
            ])
        )));
        assert!(slots.contains(&(
            "@User:1.addresses[2]".into(),
            "city".into(),
            Slot::Value(json!("Rome"))
        )));
        let embedded: Vec<&str> = patch.embedded_records().iter().map(RecordKey::as_str).collect();
        assert_eq!(embedded, ["@User:1.addresses[0]", "@User:1.addresses[2]"]);
    }

    #[test]
    fn scalar_where_object_expected_is_shape_mismatch() {
        let selection =
            Selection::new().field("viewer", Field::object("viewer", "User", user_fields()));
        let err = plan_write(&keys(), &selection, &json!({ "viewer": "bob" }), &RecordKey::root())
            .unwrap_err();
        assert_eq!(
            err,
            CacheError::ShapeMismatch {
                record: RecordKey::root(),
                field: "viewer".into(),
                expected: "object",
                found: "string",
            }
        );
    }

    #[test]
    fn non_object_data_is_rejected() {
        let err = plan_write(&keys(), &user_fields(), &json!([1, 2]), &RecordKey::root()).unwrap_err();
        assert!(matches!(err, CacheError::NotAnObject { found: "list", .. }));
    }

    #[test]
    fn scalar_lists_keep_nulls_and_nesting() {
        let selection = Selection::new().field("grid", Field::scalar("grid", "Int"));
        let patch = plan_write(
            &keys(),
            &selection,
            &json!({ "grid": [[1, null], []] }),
            &RecordKey::root(),
        )
        .unwrap();
        assert_eq!(
            set_slots(&patch),
            [(
                "_ROOT_".to_owned(),
                "grid".to_owned(),
                Slot::List(vec![
                    Slot::List(vec![Slot::Value(json!(1)), Slot::Null]),
                    Slot::List(Vec::new()),
                ])
            )]
        );
    }

    #[test]
    fn list_marker_registers_and_null_unregisters() {
        let selection = Selection::new().field(
            "friends",
            Field::object("friends", "User", user_fields()).with_list("Friends", false),
        );
        let owner = RecordKey::from("User:1");
        let patch = plan_write(&keys(), &selection, &json!({ "friends": [] }), &owner).unwrap();
        assert!(patch.ops().contains(&CacheOp::RegisterList {
            name: "Friends".into(),
            location: ListLocation::plain(owner.clone(), "friends"),
        }));

        let patch = plan_write(&keys(), &selection, &json!({ "friends": null }), &owner).unwrap();
        assert!(patch.ops().contains(&CacheOp::UnregisterList {
            name: "Friends".into(),
            owner,
        }));
    }

    #[test]
    fn operation_marker_targets_written_entity() {
        let selection = Selection::new().field(
            "addFriend",
            Field::object("addFriend", "User", user_fields())
                .with_operation(OperationMarker::new(ListAction::Insert, "Friends")),
        );
        let patch = plan_write(
            &keys(),
            &selection,
            &json!({ "addFriend": { "id": "5", "firstName": "eve" } }),
            &RecordKey::root(),
        )
        .unwrap();
        assert!(patch.ops().contains(&CacheOp::ApplyList(ListOperation::new(
            "Friends",
            ListAction::Insert,
            "User:5".into()
        ))));
    }

    #[test]
    fn connection_marker_registers_edges_slot() {
        let node = Selection::new().field("node", Field::object("node", "User", user_fields()));
        let edges = Selection::new().field("edges", Field::object("edges", "UserEdge", node));
        let selection = Selection::new().field(
            "friends",
            Field::object("friends(first: 2)", "UserConnection", edges)
                .with_list("Friends", true),
        );
        let data = json!({ "friends": { "edges": [{ "node": { "id": "2", "firstName": "jane" } }] } });
        let owner = RecordKey::from("User:1");
        let patch = plan_write(&keys(), &selection, &data, &owner).unwrap();
        assert!(patch.ops().contains(&CacheOp::RegisterList {
            name: "Friends".into(),
            location: ListLocation {
                owner: owner.clone(),
                record: "@User:1.friends(first: 2)".into(),
                sub_key: "edges".into(),
                kind: ListKind::Connection {
                    node_key: "node".into()
                },
            },
        }));
    }
}
