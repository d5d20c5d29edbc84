// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Selection descriptors.
//!
//! A [`Selection`] describes which fields were requested and how they are
//! stored. Selections come from the code generator as JSON:
//!
//! ```json
//! {
//!   "viewer": {
//!     "type": "User",
//!     "keyRaw": "viewer",
//!     "nullable": true,
//!     "fields": { "id": { "type": "ID", "keyRaw": "id" } }
//!   }
//! }
//! ```
//!
//! Descriptor keys the cache does not understand are ignored. On the Rust side
//! each descriptor becomes a [`Field`] whose [`FieldKind`] is checked
//! exhaustively by the write and read paths.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::RecordKey;
use crate::lists::{ListAction, ListPosition};

/// Requested fields, keyed by response name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeMap<String, Field>);

impl Selection {
    /// An empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add `field` under response name `name`.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.0.insert(name.into(), field);
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, name: impl Into<String>, field: Field) -> Option<Field> {
        self.0.insert(name.into(), field)
    }

    /// Look up a field by response name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.get(name)
    }

    /// Iterate `(response name, field)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.0.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Number of selected fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no field is selected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a selection from generator JSON.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// How a field's value is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Scalar or enum leaf, stored verbatim.
    Scalar,
    /// Object of a known concrete type.
    Object(Selection),
    /// Interface or union; the concrete type comes from the data's typename.
    Abstract(Selection),
}

/// One selected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub struct Field {
    /// Storage sub-key, including serialized arguments.
    pub key_raw: String,
    /// Declared type name.
    pub type_name: String,
    /// Whether `null` here is tolerable for the enclosing object.
    pub nullable: bool,
    /// Leaf or nested shape.
    pub kind: FieldKind,
    /// Named-list marker.
    pub list: Option<ListMarker>,
    /// List operations to apply to the entities written through this field.
    pub operations: Vec<OperationMarker>,
}

impl Field {
    fn with_kind(key_raw: impl Into<String>, type_name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key_raw: key_raw.into(),
            type_name: type_name.into(),
            nullable: false,
            kind,
            list: None,
            operations: Vec::new(),
        }
    }

    /// Scalar or enum field.
    pub fn scalar(key_raw: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self::with_kind(key_raw, type_name, FieldKind::Scalar)
    }

    /// Object field with a nested selection.
    pub fn object(
        key_raw: impl Into<String>,
        type_name: impl Into<String>,
        fields: Selection,
    ) -> Self {
        Self::with_kind(key_raw, type_name, FieldKind::Object(fields))
    }

    /// Interface/union field with a nested selection.
    pub fn abstract_object(
        key_raw: impl Into<String>,
        type_name: impl Into<String>,
        fields: Selection,
    ) -> Self {
        Self::with_kind(key_raw, type_name, FieldKind::Abstract(fields))
    }

    /// Builder: mark the field nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Builder: attach a named-list marker.
    pub fn with_list(mut self, name: impl Into<String>, connection: bool) -> Self {
        self.list = Some(ListMarker {
            name: name.into(),
            connection,
        });
        self
    }

    /// Builder: attach a list-operation marker.
    pub fn with_operation(mut self, operation: OperationMarker) -> Self {
        self.operations.push(operation);
        self
    }

    /// Nested selection for object and abstract fields.
    pub fn fields(&self) -> Option<&Selection> {
        match &self.kind {
            FieldKind::Scalar => None,
            FieldKind::Object(fields) | FieldKind::Abstract(fields) => Some(fields),
        }
    }

    /// Returns `true` for interface/union fields.
    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, FieldKind::Abstract(_))
    }
}

/// Marks a field as a named list that list operations can target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMarker {
    /// List name.
    pub name: String,
    /// The field holds a connection (`edges { node }`) rather than a plain list.
    #[serde(default)]
    pub connection: bool,
}

/// Requests a list operation for every entity written through the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMarker {
    /// Insert, remove or toggle.
    pub action: ListAction,
    /// Target list name.
    pub list: String,
    /// Where inserted links go.
    #[serde(default)]
    pub position: ListPosition,
    /// Restrict the operation to lists owned by this record.
    #[serde(default, rename = "parentID", alias = "parentKey", skip_serializing_if = "Option::is_none")]
    pub parent: Option<RecordKey>,
}

impl OperationMarker {
    /// Marker for `action` against `list`, appending and unrestricted.
    pub fn new(action: ListAction, list: impl Into<String>) -> Self {
        Self {
            action,
            list: list.into(),
            position: ListPosition::default(),
            parent: None,
        }
    }

    /// Builder: set the insert position.
    pub fn at(mut self, position: ListPosition) -> Self {
        self.position = position;
        self
    }

    /// Builder: restrict to lists owned by `parent`.
    pub fn under(mut self, parent: RecordKey) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Wire shape of a field descriptor as emitted by the generator.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    #[serde(rename = "type")]
    type_name: String,
    key_raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Selection>,
    #[serde(default, rename = "abstract", skip_serializing_if = "is_false")]
    is_abstract: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    list: Option<ListMarker>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    operations: Vec<OperationMarker>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl From<RawField> for Field {
    fn from(raw: RawField) -> Self {
        // `abstract` without nested fields has nothing to dispatch on; keep it a leaf.
        let kind = match (raw.fields, raw.is_abstract) {
            (Some(fields), true) => FieldKind::Abstract(fields),
            (Some(fields), false) => FieldKind::Object(fields),
            (None, _) => FieldKind::Scalar,
        };
        Self {
            key_raw: raw.key_raw,
            type_name: raw.type_name,
            nullable: raw.nullable,
            kind,
            list: raw.list,
            operations: raw.operations,
        }
    }
}

impl From<Field> for RawField {
    fn from(field: Field) -> Self {
        let (fields, is_abstract) = match field.kind {
            FieldKind::Scalar => (None, false),
            FieldKind::Object(fields) => (Some(fields), false),
            FieldKind::Abstract(fields) => (Some(fields), true),
        };
        Self {
            type_name: field.type_name,
            key_raw: field.key_raw,
            fields,
            is_abstract,
            nullable: field.nullable,
            list: field.list,
            operations: field.operations,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_generator_json() {
        let selection = Selection::from_json(json!({
            "viewer": {
                "type": "Node",
                "keyRaw": "viewer",
                "abstract": true,
                "nullable": true,
                "fields": {
                    "id": { "type": "ID", "keyRaw": "id" },
                    "friends": {
                        "type": "User",
                        "keyRaw": "friends(first: 10)",
                        "list": { "name": "All_Friends", "connection": true },
                        "fields": {}
                    }
                }
            }
        }))
        .unwrap();

        let viewer = selection.get("viewer").unwrap();
        assert!(viewer.nullable);
        assert!(viewer.is_abstract());
        let nested = viewer.fields().unwrap();
        assert_eq!(nested.get("id").unwrap().kind, FieldKind::Scalar);
        let friends = nested.get("friends").unwrap();
        assert_eq!(friends.key_raw, "friends(first: 10)");
        assert_eq!(
            friends.list,
            Some(ListMarker {
                name: "All_Friends".into(),
                connection: true
            })
        );
    }

    #[test]
    fn unknown_descriptor_keys_are_ignored() {
        let selection = Selection::from_json(json!({
            "id": { "type": "ID", "keyRaw": "id", "directives": ["@deprecated"], "loading": 3 }
        }))
        .unwrap();
        assert_eq!(selection.get("id").unwrap(), &Field::scalar("id", "ID"));
    }

    #[test]
    fn abstract_without_fields_degrades_to_scalar() {
        let selection = Selection::from_json(json!({
            "kind": { "type": "Kind", "keyRaw": "kind", "abstract": true }
        }))
        .unwrap();
        assert_eq!(selection.get("kind").unwrap().kind, FieldKind::Scalar);
    }

    #[test]
    fn operation_markers_parse_positions_and_parent() {
        let selection = Selection::from_json(json!({
            "addFriend": {
                "type": "User",
                "keyRaw": "addFriend",
                "fields": { "id": { "type": "ID", "keyRaw": "id" } },
                "operations": [
                    { "action": "insert", "list": "All_Friends", "position": "first", "parentID": "User:1" },
                    { "action": "toggle", "list": "Favorites" }
                ]
            }
        }))
        .unwrap();
        let ops = &selection.get("addFriend").unwrap().operations;
        assert_eq!(
            ops[0],
            OperationMarker::new(ListAction::Insert, "All_Friends")
                .at(ListPosition::First)
                .under(RecordKey::from("User:1"))
        );
        assert_eq!(ops[1], OperationMarker::new(ListAction::Toggle, "Favorites"));
    }

    #[test]
    fn builder_matches_parsed_form() {
        let built = Selection::new().field(
            "viewer",
            Field::object(
                "viewer",
                "User",
                Selection::new().field("id", Field::scalar("id", "ID")),
            )
            .nullable(),
        );
        let json = serde_json::to_value(&built).unwrap();
        assert_eq!(
            json,
            json!({
                "viewer": {
                    "type": "User",
                    "keyRaw": "viewer",
                    "nullable": true,
                    "fields": { "id": { "type": "ID", "keyRaw": "id" } }
                }
            })
        );
        assert_eq!(Selection::from_json(json).unwrap(), built);
    }
}
