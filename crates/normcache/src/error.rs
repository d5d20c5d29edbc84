// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types surfaced by the cache.
//!
//! Only caller-visible failures live here. Partial reads and unknown list
//! targets are ordinary results, not errors.

use thiserror::Error;

use crate::key::RecordKey;

/// Errors returned by cache writes and snapshot encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The data contradicts the selection at a field (e.g. an object was
    /// expected but a scalar was supplied).
    ///
    /// The store is left unchanged when a write fails with this error.
    #[error("[CACHE_SHAPE_MISMATCH] field `{field}` on {record}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Record the field was being written to.
        record: RecordKey,
        /// Storage sub-key (`keyRaw`) of the offending field.
        field: String,
        /// What the selection declared.
        expected: &'static str,
        /// What the data actually carried.
        found: &'static str,
    },
    /// The value passed to a write was not a JSON object.
    #[error("[CACHE_NOT_AN_OBJECT] write data for {record} must be an object, found {found}")]
    NotAnObject {
        /// Record the write targeted.
        record: RecordKey,
        /// Kind of the supplied value.
        found: &'static str,
    },
    /// Canonical snapshot encoding failed.
    #[error("[CACHE_SNAPSHOT_ENCODE] {0}")]
    SnapshotEncode(String),
    /// Snapshot bytes could not be decoded.
    #[error("[CACHE_SNAPSHOT_DECODE] {0}")]
    SnapshotDecode(String),
}

/// Human-readable kind of a JSON value, used in error messages.
pub(crate) fn value_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
