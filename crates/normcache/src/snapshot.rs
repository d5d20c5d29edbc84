// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Full-table import/export with canonical encoding and hashing.
//!
//! Persistence lives outside the cache: callers export a [`CacheSnapshot`],
//! store its canonical bytes wherever they like, and import it later. The
//! canonical form is CBOR over ordered maps, so equal cache states always
//! encode to equal bytes and hash to the same [`StateDigest`].

use std::collections::BTreeMap;
use std::fmt;

use ciborium::{de::from_reader, ser::into_writer};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::key::RecordKey;
use crate::lists::ListRegistry;
use crate::record::Record;
use crate::store::RecordStore;

/// Every record plus the list registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Records by key.
    pub records: BTreeMap<RecordKey, Record>,
    /// Named-list registrations.
    pub lists: ListRegistry,
}

impl CacheSnapshot {
    /// Capture the contents of `store` and `lists`.
    pub fn capture<S>(store: &S, lists: &ListRegistry) -> Self
    where
        S: RecordStore + ?Sized,
    {
        Self {
            records: store
                .records()
                .map(|(key, record)| (key.clone(), record.clone()))
                .collect(),
            lists: lists.clone(),
        }
    }

    /// Canonical CBOR encoding.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, CacheError> {
        let mut bytes = Vec::new();
        into_writer(self, &mut bytes).map_err(|e| CacheError::SnapshotEncode(e.to_string()))?;
        Ok(bytes)
    }

    /// Decode bytes produced by [`to_canonical_bytes`](Self::to_canonical_bytes).
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, CacheError> {
        from_reader(bytes).map_err(|e| CacheError::SnapshotDecode(e.to_string()))
    }

    /// BLAKE3 hash of the canonical encoding.
    pub fn digest(&self) -> Result<StateDigest, CacheError> {
        let bytes = self.to_canonical_bytes()?;
        Ok(StateDigest(*blake3::hash(&bytes).as_bytes()))
    }
}

/// 32-byte BLAKE3 hash of a canonical snapshot.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateDigest(pub [u8; 32]);

impl StateDigest {
    /// View the hash as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for StateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
