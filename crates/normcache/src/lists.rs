// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named lists and the insert/remove/toggle operations that target them.
//!
//! Writes register every location a named list is written to. An operation
//! against a name then rewrites each registered slot directly through the
//! store, without re-entering the write traversal.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::key::RecordKey;
use crate::record::Slot;
use crate::store::RecordStore;

/// Sub-key of the node link on edge records created by connection inserts
/// when the edges selection does not name one.
pub const DEFAULT_NODE_KEY: &str = "node";

/// Shape of the list living at a location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// The slot holds entity links directly.
    Plain,
    /// The slot holds links to edge records whose `node_key` slot links the
    /// entity.
    Connection {
        /// Sub-key of the node link on each edge record.
        node_key: String,
    },
}

/// One place a named list lives.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListLocation {
    /// Record holding the list-marked field.
    pub owner: RecordKey,
    /// Record holding the list slot (the owner, or a connection record).
    pub record: RecordKey,
    /// Sub-key of the list slot on `record`.
    pub sub_key: String,
    /// Plain list or connection edges.
    pub kind: ListKind,
}

impl ListLocation {
    /// A plain list stored directly on `owner`.
    pub fn plain(owner: RecordKey, sub_key: impl Into<String>) -> Self {
        Self {
            record: owner.clone(),
            owner,
            sub_key: sub_key.into(),
            kind: ListKind::Plain,
        }
    }
}

/// List name → locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListRegistry {
    lists: BTreeMap<String, BTreeSet<ListLocation>>,
}

impl ListRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` lives at `location`. Returns `false` if it was
    /// already registered.
    pub fn register(&mut self, name: impl Into<String>, location: ListLocation) -> bool {
        self.lists.entry(name.into()).or_default().insert(location)
    }

    /// Remove one location. Names left without locations are dropped.
    pub fn unregister(&mut self, name: &str, location: &ListLocation) -> bool {
        let Some(locations) = self.lists.get_mut(name) else {
            return false;
        };
        let removed = locations.remove(location);
        if locations.is_empty() {
            self.lists.remove(name);
        }
        removed
    }

    /// Remove every location of `name` owned by `owner`, returning how many
    /// were removed.
    pub fn unregister_owner(&mut self, name: &str, owner: &RecordKey) -> usize {
        let Some(locations) = self.lists.get_mut(name) else {
            return 0;
        };
        let before = locations.len();
        locations.retain(|location| &location.owner != owner);
        let removed = before - locations.len();
        if locations.is_empty() {
            self.lists.remove(name);
        }
        removed
    }

    /// Locations registered for `name`, sorted.
    pub fn locations_for(&self, name: &str) -> impl Iterator<Item = &ListLocation> {
        self.lists.get(name).into_iter().flatten()
    }

    /// Drop every location for `name`, returning how many there were.
    pub fn forget(&mut self, name: &str) -> usize {
        self.lists.remove(name).map_or(0, |locations| locations.len())
    }

    /// Registered list names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Returns `true` when no list is registered.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

/// What to do with the target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListAction {
    /// Add the entity unless it is already present.
    Insert,
    /// Remove every occurrence of the entity.
    Remove,
    /// Remove the entity if present, insert it otherwise.
    Toggle,
}

/// Where inserted links go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListPosition {
    /// Front of the list.
    #[serde(alias = "prepend")]
    First,
    /// End of the list.
    #[default]
    #[serde(alias = "append")]
    Last,
}

/// A list mutation addressed by list name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOperation {
    /// Target list name.
    pub list: String,
    /// Insert, remove or toggle.
    pub action: ListAction,
    /// Entity whose link is spliced in or out.
    pub target: RecordKey,
    /// Where inserted links go.
    pub position: ListPosition,
    /// Restrict to locations owned by this record.
    pub parent: Option<RecordKey>,
}

impl ListOperation {
    /// Operation appending/removing `target` in every location of `list`.
    pub fn new(list: impl Into<String>, action: ListAction, target: RecordKey) -> Self {
        Self {
            list: list.into(),
            action,
            target,
            position: ListPosition::default(),
            parent: None,
        }
    }

    /// Builder: set the insert position.
    pub fn at(mut self, position: ListPosition) -> Self {
        self.position = position;
        self
    }

    /// Builder: restrict to locations owned by `parent`.
    pub fn under(mut self, parent: RecordKey) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Result of applying a [`ListOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOperationOutcome {
    /// The operation ran against `locations` registered locations.
    Applied {
        /// Number of locations visited.
        locations: usize,
    },
    /// No location is registered under the list name (or none matched the
    /// parent filter). Nothing changed.
    UnknownList,
}

/// Apply `op` to every matching registered location.
pub(crate) fn apply_list_operation<S>(
    store: &mut S,
    registry: &ListRegistry,
    op: &ListOperation,
) -> ListOperationOutcome
where
    S: RecordStore + ?Sized,
{
    let targets: Vec<&ListLocation> = registry
        .locations_for(&op.list)
        .filter(|loc| op.parent.as_ref().is_none_or(|parent| &loc.owner == parent))
        .collect();
    if targets.is_empty() {
        debug!(list = %op.list, target = %op.target, "list operation has no registered location");
        return ListOperationOutcome::UnknownList;
    }
    let mut visited = 0;
    for location in targets {
        if apply_at(store, location, op) {
            visited += 1;
        }
    }
    ListOperationOutcome::Applied { locations: visited }
}

fn apply_at<S>(store: &mut S, location: &ListLocation, op: &ListOperation) -> bool
where
    S: RecordStore + ?Sized,
{
    let mut items = match store.slot(&location.record, &location.sub_key) {
        None | Some(Slot::Null) => Vec::new(),
        Some(Slot::List(items)) => items.clone(),
        Some(other) => {
            debug!(
                record = %location.record,
                sub_key = %location.sub_key,
                slot = ?other,
                "registered list location no longer holds a list"
            );
            return false;
        }
    };

    let present = items.iter().any(|item| holds(store, location, item, &op.target));
    let (remove, insert) = match op.action {
        ListAction::Insert => (false, !present),
        ListAction::Remove => (present, false),
        ListAction::Toggle => (present, !present),
    };

    if remove {
        items.retain(|item| !holds(store, location, item, &op.target));
    }
    if insert {
        let link = match &location.kind {
            ListKind::Plain => Slot::Link(op.target.clone()),
            ListKind::Connection { node_key } => {
                let edge = edge_key(location, &op.target);
                store.set_slot(&edge, node_key, Slot::Link(op.target.clone()));
                Slot::Link(edge)
            }
        };
        match op.position {
            ListPosition::First => items.insert(0, link),
            ListPosition::Last => items.push(link),
        }
    }
    trace!(
        record = %location.record,
        sub_key = %location.sub_key,
        action = ?op.action,
        target = %op.target,
        len = items.len(),
        "list operation applied"
    );
    store.set_slot(&location.record, &location.sub_key, Slot::List(items));
    true
}

/// Does `item` (an entry of the list at `location`) refer to `target`?
fn holds<S>(store: &S, location: &ListLocation, item: &Slot, target: &RecordKey) -> bool
where
    S: RecordStore + ?Sized,
{
    let Slot::Link(key) = item else {
        return false;
    };
    match &location.kind {
        ListKind::Plain => key == target,
        ListKind::Connection { node_key } => {
            matches!(store.slot(key, node_key), Some(Slot::Link(node)) if node == target)
        }
    }
}

/// Edge record created when inserting `target` into a connection.
fn edge_key(location: &ListLocation, target: &RecordKey) -> RecordKey {
    RecordKey::embedded(
        &location.record,
        &format!("{}<{}>", location.sub_key, target),
        &[],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn links(store: &MemoryStore, key: &str, sub_key: &str) -> Vec<String> {
        match store.slot(&key.into(), sub_key) {
            Some(Slot::List(items)) => items
                .iter()
                .map(|item| match item {
                    Slot::Link(k) => k.to_string(),
                    other => format!("{other:?}"),
                })
                .collect(),
            other => vec![format!("{other:?}")],
        }
    }

    fn seeded() -> (MemoryStore, ListRegistry) {
        let mut store = MemoryStore::new();
        store.set_slot(
            &"User:1".into(),
            "friends",
            Slot::List(vec![Slot::Link("User:2".into())]),
        );
        let mut registry = ListRegistry::new();
        registry.register("Friends", ListLocation::plain("User:1".into(), "friends"));
        (store, registry)
    }

    #[test]
    fn insert_appends_by_default_and_prepends_on_request() {
        let (mut store, registry) = seeded();
        let op = ListOperation::new("Friends", ListAction::Insert, "User:3".into());
        assert_eq!(
            apply_list_operation(&mut store, &registry, &op),
            ListOperationOutcome::Applied { locations: 1 }
        );
        let op = ListOperation::new("Friends", ListAction::Insert, "User:4".into())
            .at(ListPosition::First);
        apply_list_operation(&mut store, &registry, &op);
        assert_eq!(links(&store, "User:1", "friends"), ["User:4", "User:2", "User:3"]);
    }

    #[test]
    fn insert_does_not_duplicate() {
        let (mut store, registry) = seeded();
        let op = ListOperation::new("Friends", ListAction::Insert, "User:2".into());
        apply_list_operation(&mut store, &registry, &op);
        assert_eq!(links(&store, "User:1", "friends"), ["User:2"]);
    }

    #[test]
    fn remove_and_toggle() {
        let (mut store, registry) = seeded();
        let toggle = ListOperation::new("Friends", ListAction::Toggle, "User:3".into());
        apply_list_operation(&mut store, &registry, &toggle);
        assert_eq!(links(&store, "User:1", "friends"), ["User:2", "User:3"]);
        apply_list_operation(&mut store, &registry, &toggle);
        assert_eq!(links(&store, "User:1", "friends"), ["User:2"]);

        let remove = ListOperation::new("Friends", ListAction::Remove, "User:2".into());
        apply_list_operation(&mut store, &registry, &remove);
        assert!(links(&store, "User:1", "friends").is_empty());
    }

    #[test]
    fn unknown_list_is_reported_not_applied() {
        let (mut store, registry) = seeded();
        let before = store.clone();
        let op = ListOperation::new("Nope", ListAction::Insert, "User:3".into());
        assert_eq!(
            apply_list_operation(&mut store, &registry, &op),
            ListOperationOutcome::UnknownList
        );
        assert_eq!(store, before);
    }

    #[test]
    fn parent_filter_limits_locations() {
        let (mut store, mut registry) = seeded();
        registry.register("Friends", ListLocation::plain("User:5".into(), "friends"));
        let op = ListOperation::new("Friends", ListAction::Insert, "User:3".into())
            .under("User:5".into());
        assert_eq!(
            apply_list_operation(&mut store, &registry, &op),
            ListOperationOutcome::Applied { locations: 1 }
        );
        assert_eq!(links(&store, "User:1", "friends"), ["User:2"]);
        assert_eq!(links(&store, "User:5", "friends"), ["User:3"]);

        let op = ListOperation::new("Friends", ListAction::Insert, "User:3".into())
            .under("User:77".into());
        assert_eq!(
            apply_list_operation(&mut store, &registry, &op),
            ListOperationOutcome::UnknownList
        );
    }

    #[test]
    fn connection_insert_wraps_target_in_edge() {
        let mut store = MemoryStore::new();
        let mut registry = ListRegistry::new();
        let location = ListLocation {
            owner: "User:1".into(),
            record: "@User:1.friends".into(),
            sub_key: "edges".into(),
            kind: ListKind::Connection {
                node_key: DEFAULT_NODE_KEY.into(),
            },
        };
        registry.register("Friends", location);

        let insert = ListOperation::new("Friends", ListAction::Insert, "User:3".into());
        apply_list_operation(&mut store, &registry, &insert);
        assert_eq!(
            links(&store, "@User:1.friends", "edges"),
            ["@User:1.friends.edges<User:3>"]
        );
        assert_eq!(
            store.slot(&"@User:1.friends.edges<User:3>".into(), "node"),
            Some(&Slot::Link("User:3".into()))
        );

        let remove = ListOperation::new("Friends", ListAction::Remove, "User:3".into());
        apply_list_operation(&mut store, &registry, &remove);
        assert!(links(&store, "@User:1.friends", "edges").is_empty());
    }

    #[test]
    fn registry_bookkeeping() {
        let mut registry = ListRegistry::new();
        let a = ListLocation::plain("User:1".into(), "friends");
        let b = ListLocation::plain("User:2".into(), "friends");
        assert!(registry.register("Friends", a.clone()));
        assert!(!registry.register("Friends", a.clone()));
        assert!(registry.register("Friends", b));
        assert_eq!(registry.locations_for("Friends").count(), 2);
        assert!(registry.unregister("Friends", &a));
        assert_eq!(registry.forget("Friends"), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.forget("Friends"), 0);
    }
}
