// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The cache facade tying keys, store, lists and both traversal paths together.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::key::{KeyResolver, RecordKey};
use crate::lists::{apply_list_operation, ListOperation, ListOperationOutcome, ListRegistry};
use crate::read::{read_selection, ReadResult};
use crate::record::Record;
use crate::selection::Selection;
use crate::snapshot::{CacheSnapshot, StateDigest};
use crate::store::{reachable_from_root, MemoryStore, RecordStore};
use crate::write::plan_write;

/// What a successful write touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Records that received at least one slot.
    pub touched: BTreeSet<RecordKey>,
    /// Keys minted for objects that had no identity and were embedded under
    /// their parent instead of normalized.
    pub embedded: BTreeSet<RecordKey>,
}

/// Normalized object cache.
///
/// All mutation goes through `&mut self` and completes before returning;
/// reads take `&self`. Hosts sharing a cache across threads wrap it in a
/// lock at the call boundary.
#[derive(Debug, Clone)]
pub struct Cache<S = MemoryStore> {
    store: S,
    lists: ListRegistry,
    keys: KeyResolver,
    config: CacheConfig,
}

impl Cache<MemoryStore> {
    /// Create an empty in-memory cache.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_store(config, MemoryStore::new())
    }
}

impl Default for Cache<MemoryStore> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<S> Cache<S>
where
    S: RecordStore,
{
    /// Create a cache over an existing store.
    pub fn with_store(config: CacheConfig, store: S) -> Self {
        Self {
            store,
            lists: ListRegistry::new(),
            keys: KeyResolver::from_config(&config),
            config,
        }
    }

    /// Write `data` shaped by `selection` into the root record.
    pub fn write(&mut self, selection: &Selection, data: &Value) -> Result<WriteSummary, CacheError> {
        self.write_to(&RecordKey::root(), selection, data)
    }

    /// Write `data` shaped by `selection` into the record at `parent`.
    ///
    /// On error nothing is written.
    ///
    /// Plain data writes are idempotent. Operation markers in `selection` are
    /// not: each write applies them again, so writing a `toggle` marker twice
    /// restores the list it flipped.
    #[instrument(skip_all, fields(parent = %parent))]
    pub fn write_to(
        &mut self,
        parent: &RecordKey,
        selection: &Selection,
        data: &Value,
    ) -> Result<WriteSummary, CacheError> {
        let patch = plan_write(&self.keys, selection, data, parent)?;
        patch.apply(&mut self.store, &mut self.lists);
        let touched = patch.touched_records();
        let embedded = patch.embedded_records().clone();
        debug!(
            ops = patch.len(),
            records = touched.len(),
            embedded = embedded.len(),
            "write applied"
        );
        Ok(WriteSummary { touched, embedded })
    }

    /// Read `selection` from the root record.
    pub fn read(&self, selection: &Selection) -> ReadResult {
        self.read_from(&RecordKey::root(), selection)
    }

    /// Read `selection` from the record at `parent`.
    #[instrument(skip_all, fields(parent = %parent))]
    pub fn read_from(&self, parent: &RecordKey, selection: &Selection) -> ReadResult {
        let result = read_selection(&self.store, selection, parent);
        debug!(partial = result.partial, empty = result.data.is_null(), "read resolved");
        result
    }

    /// Insert, remove or toggle an entity in every location of a named list.
    #[instrument(skip_all, fields(list = %op.list, action = ?op.action, target = %op.target))]
    pub fn apply_list_operation(&mut self, op: &ListOperation) -> ListOperationOutcome {
        apply_list_operation(&mut self.store, &self.lists, op)
    }

    /// Snapshot of every record and list registration.
    pub fn export(&self) -> CacheSnapshot {
        CacheSnapshot::capture(&self.store, &self.lists)
    }

    /// Replace the whole cache state with `snapshot`.
    pub fn import(&mut self, snapshot: CacheSnapshot) {
        self.store.clear();
        for (key, record) in snapshot.records {
            for (sub_key, slot) in record.iter() {
                self.store.set_slot(&key, sub_key, slot.clone());
            }
        }
        self.lists = snapshot.lists;
    }

    /// Digest of the current state; equal states give equal digests.
    pub fn digest(&self) -> Result<StateDigest, CacheError> {
        self.export().digest()
    }

    /// Drop a record. Links to it become missing data for later reads.
    pub fn evict(&mut self, key: &RecordKey) -> Option<Record> {
        self.store.evict(key)
    }

    /// Records reachable from the root record.
    pub fn reachable(&self) -> BTreeSet<RecordKey> {
        reachable_from_root(&self.store)
    }

    /// The underlying record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The named-list registry.
    pub fn lists(&self) -> &ListRegistry {
        &self.lists
    }

    /// Mutable access to the registry (e.g. to `forget` a list).
    pub fn lists_mut(&mut self) -> &mut ListRegistry {
        &mut self.lists
    }

    /// Configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
