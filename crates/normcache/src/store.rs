// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record store: the flat key → record table.
//!
//! [`RecordStore`] is the storage seam of the cache; [`MemoryStore`] is the
//! in-process implementation. Persistence is layered on top through
//! [`CacheSnapshot`](crate::CacheSnapshot) import/export rather than through
//! another store implementation.
//!
//! # Determinism Invariant
//!
//! [`RecordStore::records`] yields records sorted by [`RecordKey`]. Exports
//! and digests rely on that order.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;

use crate::key::RecordKey;
use crate::record::{Record, Slot};

/// Flat table of records keyed by [`RecordKey`].
///
/// # Existence Semantics
///
/// A record exists only once at least one slot has been written to it.
/// [`record`](RecordStore::record) returns `None` for anything else; absence
/// is not an error.
pub trait RecordStore {
    /// Record stored under `key`.
    fn record(&self, key: &RecordKey) -> Option<&Record>;

    /// Write one slot, creating the record on first write. Returns the
    /// previous slot at that sub-key.
    fn set_slot(&mut self, key: &RecordKey, sub_key: &str, slot: Slot) -> Option<Slot>;

    /// Remove a whole record. Links pointing at it are left dangling; reads
    /// treat them as missing data.
    fn evict(&mut self, key: &RecordKey) -> Option<Record>;

    /// Iterate all records sorted by key.
    fn records(&self) -> Box<dyn Iterator<Item = (&RecordKey, &Record)> + '_>;

    /// Drop every record.
    fn clear(&mut self);

    /// Number of records.
    fn len(&self) -> usize;

    /// Slot stored at `(key, sub_key)`.
    fn slot(&self, key: &RecordKey, sub_key: &str) -> Option<&Slot> {
        self.record(key).and_then(|record| record.get(sub_key))
    }

    /// Returns `true` if a record exists under `key`.
    fn has(&self, key: &RecordKey) -> bool {
        self.record(key).is_some()
    }

    /// Returns `true` when no records are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory record store backed by a `BTreeMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    records: BTreeMap<RecordKey, Record>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<(RecordKey, Record)> for MemoryStore {
    fn from_iter<T: IntoIterator<Item = (RecordKey, Record)>>(iter: T) -> Self {
        Self {
            records: iter
                .into_iter()
                .filter(|(_, record)| !record.is_empty())
                .collect(),
        }
    }
}

impl RecordStore for MemoryStore {
    fn record(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    fn set_slot(&mut self, key: &RecordKey, sub_key: &str, slot: Slot) -> Option<Slot> {
        self.records
            .entry(key.clone())
            .or_default()
            .set(sub_key, slot)
    }

    fn evict(&mut self, key: &RecordKey) -> Option<Record> {
        self.records.remove(key)
    }

    fn records(&self) -> Box<dyn Iterator<Item = (&RecordKey, &Record)> + '_> {
        Box::new(self.records.iter())
    }

    fn clear(&mut self) {
        self.records.clear();
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Records directly linked from `key` (empty if the record does not exist).
pub fn links_from<'a, S>(store: &'a S, key: &RecordKey) -> Vec<&'a RecordKey>
where
    S: RecordStore + ?Sized,
{
    store.record(key).map(Record::links).unwrap_or_default()
}

/// Every stored record reachable from the root record by following links.
///
/// The root itself is included when it exists. Dangling links (to evicted or
/// never-written records) are not reported.
pub fn reachable_from_root<S>(store: &S) -> BTreeSet<RecordKey>
where
    S: RecordStore + ?Sized,
{
    let root = RecordKey::root();
    let mut seen: FxHashSet<RecordKey> = FxHashSet::default();
    let mut stack = vec![root];
    while let Some(key) = stack.pop() {
        let Some(record) = store.record(&key) else {
            continue;
        };
        if !seen.insert(key) {
            continue;
        }
        for link in record.links() {
            if !seen.contains(link) {
                stack.push(link.clone());
            }
        }
    }
    seen.into_iter().collect()
}
