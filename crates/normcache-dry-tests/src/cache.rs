// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cache builder utilities for tests.

use normcache::{Cache, CacheConfig, CacheError, RecordKey, Selection};
use serde_json::Value;

/// Builder that creates a cache and replays writes into it.
///
/// # Example
///
/// ```
/// use normcache_dry_tests::{viewer_selection, CacheTestBuilder};
/// use serde_json::json;
///
/// let cache = CacheTestBuilder::new()
///     .with_write(viewer_selection(), json!({ "viewer": { "id": "1", "firstName": "bob" } }))
///     .build()
///     .unwrap();
/// assert!(cache.read(&viewer_selection()).is_complete());
/// ```
#[derive(Default)]
pub struct CacheTestBuilder {
    config: CacheConfig,
    writes: Vec<(RecordKey, Selection, Value)>,
}

impl CacheTestBuilder {
    /// Create a builder with the default configuration and no writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` instead of the defaults.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Queue a write against the root record.
    pub fn with_write(self, selection: Selection, data: Value) -> Self {
        self.with_write_to(RecordKey::root(), selection, data)
    }

    /// Queue a write against `parent`.
    pub fn with_write_to(mut self, parent: RecordKey, selection: Selection, data: Value) -> Self {
        self.writes.push((parent, selection, data));
        self
    }

    /// Build the cache, applying queued writes in order.
    pub fn build(self) -> Result<Cache, CacheError> {
        let mut cache = Cache::new(self.config);
        for (parent, selection, data) in &self.writes {
            cache.write_to(parent, selection, data)?;
        }
        Ok(cache)
    }
}
