//! Configuration model
//!
//! Config is hierarchical: keys are `/`-separated paths and only leaves
//! carry values. A blueprint lists keys that must be present (with their
//! value) and keys that must be absent, for the global domain and per dogu
//! in a normal and a sensitive domain.

use reconciler_core_types::Sensitive;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::DomainError;

pub const KEY_SEPARATOR: char = '/';

/// A `/`-separated config key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigKey(String);

impl ConfigKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(KEY_SEPARATOR)
    }

    /// A key is well formed when it is non-empty and has no empty segment
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.segments().all(|s| !s.is_empty())
    }

    /// True if `self` lies strictly beneath `other` in the hierarchy
    pub fn is_beneath(&self, other: &ConfigKey) -> bool {
        self.0.len() > other.0.len()
            && self.0.starts_with(&other.0)
            && self.0[other.0.len()..].starts_with(KEY_SEPARATOR)
    }
}

impl From<&str> for ConfigKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Desired entries of one config domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "V: Serialize",
    deserialize = "V: Deserialize<'de>"
))]
pub struct ConfigEntries<V> {
    #[serde(default = "BTreeMap::new", skip_serializing_if = "BTreeMap::is_empty")]
    pub present: BTreeMap<ConfigKey, V>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub absent: BTreeSet<ConfigKey>,
}

impl<V> Default for ConfigEntries<V> {
    fn default() -> Self {
        Self {
            present: BTreeMap::new(),
            absent: BTreeSet::new(),
        }
    }
}

impl<V> ConfigEntries<V> {
    pub fn is_empty(&self) -> bool {
        self.present.is_empty() && self.absent.is_empty()
    }

    pub fn with_present(mut self, key: impl Into<ConfigKey>, value: V) -> Self {
        self.present.insert(key.into(), value);
        self
    }

    pub fn with_absent(mut self, key: impl Into<ConfigKey>) -> Self {
        self.absent.insert(key.into());
        self
    }
}

/// Normal and sensitive config of one dogu
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoguConfig {
    #[serde(default, skip_serializing_if = "ConfigEntries::is_empty")]
    pub normal: ConfigEntries<String>,
    #[serde(default, skip_serializing_if = "ConfigEntries::is_empty")]
    pub sensitive: ConfigEntries<Sensitive<String>>,
}

impl DoguConfig {
    pub fn is_empty(&self) -> bool {
        self.normal.is_empty() && self.sensitive.is_empty()
    }
}

/// All config a blueprint asks for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "ConfigEntries::is_empty")]
    pub global: ConfigEntries<String>,
    /// Keyed by dogu simple name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dogus: BTreeMap<String, DoguConfig>,
}

/// The current content of one config store
///
/// `owner` is `None` for the global config and the dogu simple name for dogu
/// config (normal or sensitive).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub entries: BTreeMap<ConfigKey, String>,
}

impl ConfigSnapshot {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn for_dogu(dogu: impl Into<String>) -> Self {
        Self {
            owner: Some(dogu.into()),
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &ConfigKey) -> Option<&String> {
        self.entries.get(key)
    }

    /// Upsert a value
    ///
    /// # Errors
    ///
    /// Returns `ConfigKeyCollision` if an ancestor of `key` already holds a
    /// scalar value, or if `key` itself has sub-keys.
    pub fn set(&mut self, key: ConfigKey, value: String) -> Result<(), DomainError> {
        if let Some(existing) = self
            .entries
            .keys()
            .find(|existing| key.is_beneath(existing) || existing.is_beneath(&key))
        {
            return Err(DomainError::ConfigKeyCollision {
                key: key.to_string(),
                existing: existing.to_string(),
            });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Delete a key; deleting a missing key is a no-op
    pub fn remove(&mut self, key: &ConfigKey) -> Option<String> {
        self.entries.remove(key)
    }
}
