// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Write patches: the ordered mutations a write produces.
//!
//! The write traversal never touches the store. It returns a [`WritePatch`]
//! which the cache applies only after the traversal succeeded, so a write that
//! fails part-way leaves no trace.

use std::collections::BTreeSet;

use tracing::trace;

use crate::key::RecordKey;
use crate::lists::{apply_list_operation, ListLocation, ListOperation, ListRegistry};
use crate::record::Slot;
use crate::store::RecordStore;

/// One store or registry mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    /// Overwrite one slot (creating the record if needed).
    SetSlot {
        /// Record being written.
        record: RecordKey,
        /// Sub-key within the record.
        sub_key: String,
        /// New value.
        slot: Slot,
    },
    /// Register a named-list location.
    RegisterList {
        /// List name.
        name: String,
        /// Where the list lives.
        location: ListLocation,
    },
    /// Unregister every location of a list owned by a record (the list field
    /// was written as `null`).
    UnregisterList {
        /// List name.
        name: String,
        /// Record that held the list-marked field.
        owner: RecordKey,
    },
    /// Splice an entity into or out of a named list.
    ApplyList(ListOperation),
}

/// Ordered mutations produced by one write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritePatch {
    ops: Vec<CacheOp>,
    embedded: BTreeSet<RecordKey>,
}

impl WritePatch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an op.
    pub fn push(&mut self, op: CacheOp) {
        self.ops.push(op);
    }

    /// Append all ops of `other`, preserving order.
    pub fn extend(&mut self, other: Self) {
        self.ops.extend(other.ops);
        self.embedded.extend(other.embedded);
    }

    /// Record that `key` was minted for an object without an identity.
    pub fn note_embedded(&mut self, key: RecordKey) {
        self.embedded.insert(key);
    }

    /// Embedded records this patch links to.
    pub fn embedded_records(&self) -> &BTreeSet<RecordKey> {
        &self.embedded
    }

    /// Append ops from an iterator, preserving order.
    pub fn extend_ops(&mut self, ops: impl IntoIterator<Item = CacheOp>) {
        self.ops.extend(ops);
    }

    /// Ops in application order.
    pub fn ops(&self) -> &[CacheOp] {
        &self.ops
    }

    /// Number of ops.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Records written by `SetSlot` ops.
    pub fn touched_records(&self) -> BTreeSet<RecordKey> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                CacheOp::SetSlot { record, .. } => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    /// Apply every op in order.
    pub fn apply<S>(&self, store: &mut S, lists: &mut ListRegistry)
    where
        S: RecordStore + ?Sized,
    {
        for op in &self.ops {
            match op {
                CacheOp::SetSlot {
                    record,
                    sub_key,
                    slot,
                } => {
                    trace!(%record, %sub_key, "set slot");
                    store.set_slot(record, sub_key, slot.clone());
                }
                CacheOp::RegisterList { name, location } => {
                    lists.register(name.clone(), location.clone());
                }
                CacheOp::UnregisterList { name, owner } => {
                    lists.unregister_owner(name, owner);
                }
                CacheOp::ApplyList(operation) => {
                    let outcome = apply_list_operation(store, lists, operation);
                    trace!(list = %operation.list, ?outcome, "list operation from selection");
                }
            }
        }
    }
}
