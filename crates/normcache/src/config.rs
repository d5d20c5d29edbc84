// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cache configuration.
//!
//! Hosts usually ship the configuration as a JSON blob next to generator
//! output; [`CacheConfig::from_json_slice`] parses and validates it in one
//! step. Missing fields take their defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key-derivation settings for a [`Cache`](crate::Cache).
///
/// Serialized in camelCase so it can live next to generator output:
///
/// ```json
/// { "idFields": ["id"], "typenameField": "__typename", "typeKeys": { "Book": ["isbn"] } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Identifying fields used for every type without a `type_keys` entry.
    pub id_fields: Vec<String>,
    /// Field carrying the concrete runtime type of abstract values.
    pub typename_field: String,
    /// Per-type identifying fields. All listed fields must be present for the
    /// object to be normalized.
    pub type_keys: BTreeMap<String, Vec<String>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            id_fields: vec!["id".to_owned()],
            typename_field: "__typename".to_owned(),
            type_keys: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    /// Identifying fields for `type_name`.
    pub fn keys_for(&self, type_name: &str) -> &[String] {
        self.type_keys
            .get(type_name)
            .map_or(self.id_fields.as_slice(), Vec::as_slice)
    }

    /// Parse a camelCase JSON blob and validate it.
    ///
    /// An empty blob yields the defaults.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that could never produce a key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.typename_field.is_empty() {
            return Err(ConfigError::Invalid("typenameField must not be empty".into()));
        }
        if self.id_fields.is_empty() || self.id_fields.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid(
                "idFields must list at least one non-empty field".into(),
            ));
        }
        for (type_name, keys) in &self.type_keys {
            if keys.is_empty() || keys.iter().any(String::is_empty) {
                return Err(ConfigError::Invalid(format!(
                    "typeKeys.{type_name} must list at least one non-empty field"
                )));
            }
        }
        Ok(())
    }
}

/// Why a configuration blob could not be turned into a [`CacheConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The blob is not valid JSON for a [`CacheConfig`].
    #[error("[CACHE_CONFIG_PARSE] {0}")]
    Serde(#[from] serde_json::Error),
    /// The blob parsed but describes an unusable configuration.
    #[error("[CACHE_CONFIG_INVALID] {0}")]
    Invalid(String),
}
