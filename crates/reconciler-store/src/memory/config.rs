use async_trait::async_trait;
use reconciler_core::errors::ErrorKind;
use reconciler_core::model::{ConfigKey, ConfigSnapshot};
use reconciler_core::ports::{
    DoguConfigRepository, GlobalConfigRepository, PendingSensitiveConfigRepository,
    ReconcileContext,
};
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{CallLog, FailureSet};
use crate::errors::{poisoned, Result};

const GLOBAL: &str = "global";

#[derive(Debug, Default)]
pub struct InMemoryGlobalConfigRepository {
    snapshot: RwLock<ConfigSnapshot>,
    calls: CallLog,
    failures: FailureSet,
}

impl InMemoryGlobalConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let repo = Self::default();
        if let Ok(mut snapshot) = repo.snapshot.write() {
            for (key, value) in entries {
                snapshot.entries.insert(ConfigKey::new(key), value.to_string());
            }
        }
        repo
    }

    pub fn current(&self) -> ConfigSnapshot {
        self.snapshot.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn update_count(&self) -> usize {
        self.calls.snapshot().len()
    }

    pub fn fail_updates(&self) {
        self.failures.add(GLOBAL);
    }

    /// Fail updates with a specific kind, e.g. `Conflict`
    pub fn fail_updates_with(&self, kind: ErrorKind) {
        self.failures.add_kind(GLOBAL, kind);
    }
}

#[async_trait]
impl GlobalConfigRepository for InMemoryGlobalConfigRepository {
    async fn get(&self, _ctx: &ReconcileContext) -> Result<ConfigSnapshot> {
        Ok(self.snapshot.read().map_err(|_| poisoned("global config"))?.clone())
    }

    async fn update(
        &self,
        _ctx: &ReconcileContext,
        snapshot: ConfigSnapshot,
    ) -> Result<ConfigSnapshot> {
        self.failures.check("update_global_config", GLOBAL)?;
        self.calls.record(format!("update {} keys", snapshot.entries.len()))?;
        *self.snapshot.write().map_err(|_| poisoned("global config"))? = snapshot.clone();
        Ok(snapshot)
    }
}

/// Per-dogu config; one instance serves normal, another sensitive config
#[derive(Debug, Default)]
pub struct InMemoryDoguConfigRepository {
    snapshots: RwLock<BTreeMap<String, ConfigSnapshot>>,
    calls: CallLog,
    failures: FailureSet,
}

impl InMemoryDoguConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, dogu: &str, key: &str, value: &str) {
        if let Ok(mut snapshots) = self.snapshots.write() {
            snapshots
                .entry(dogu.to_string())
                .or_insert_with(|| ConfigSnapshot::for_dogu(dogu))
                .entries
                .insert(ConfigKey::new(key), value.to_string());
        }
    }

    pub fn current(&self, dogu: &str) -> Option<ConfigSnapshot> {
        self.snapshots.read().ok()?.get(dogu).cloned()
    }

    /// Dogus whose config was written, in write order
    pub fn updated_dogus(&self) -> Vec<String> {
        self.calls.snapshot()
    }

    pub fn fail_on(&self, dogu: &str) {
        self.failures.add(dogu);
    }
}

#[async_trait]
impl DoguConfigRepository for InMemoryDoguConfigRepository {
    async fn get_all_existing(
        &self,
        _ctx: &ReconcileContext,
        names: &[String],
    ) -> Result<BTreeMap<String, ConfigSnapshot>> {
        let snapshots = self.snapshots.read().map_err(|_| poisoned("dogu config"))?;
        Ok(names
            .iter()
            .filter_map(|name| snapshots.get(name).map(|s| (name.clone(), s.clone())))
            .collect())
    }

    async fn update_or_create(
        &self,
        _ctx: &ReconcileContext,
        snapshot: ConfigSnapshot,
    ) -> Result<ConfigSnapshot> {
        let owner = snapshot.owner.clone().unwrap_or_default();
        self.failures.check("update_dogu_config", &owner)?;
        self.calls.record(owner.clone())?;
        self.snapshots
            .write()
            .map_err(|_| poisoned("dogu config"))?
            .insert(owner, snapshot.clone());
        Ok(snapshot)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPendingSensitiveConfigRepository {
    pending: RwLock<BTreeMap<String, BTreeMap<ConfigKey, String>>>,
    failures: FailureSet,
}

impl InMemoryPendingSensitiveConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_for(&self, dogu: &str) -> BTreeMap<ConfigKey, String> {
        self.pending
            .read()
            .ok()
            .and_then(|p| p.get(dogu).cloned())
            .unwrap_or_default()
    }

    pub fn fail_on(&self, dogu: &str) {
        self.failures.add(dogu);
    }
}

#[async_trait]
impl PendingSensitiveConfigRepository for InMemoryPendingSensitiveConfigRepository {
    async fn save(
        &self,
        _ctx: &ReconcileContext,
        dogu: &str,
        key: &ConfigKey,
        value: &str,
    ) -> Result<()> {
        self.failures.check("save_pending_sensitive_config", dogu)?;
        self.pending
            .write()
            .map_err(|_| poisoned("pending sensitive config"))?
            .entry(dogu.to_string())
            .or_default()
            .insert(key.clone(), value.to_string());
        Ok(())
    }

    async fn get_all(
        &self,
        _ctx: &ReconcileContext,
    ) -> Result<BTreeMap<String, BTreeMap<ConfigKey, String>>> {
        Ok(self
            .pending
            .read()
            .map_err(|_| poisoned("pending sensitive config"))?
            .clone())
    }

    async fn delete(&self, _ctx: &ReconcileContext, dogu: &str) -> Result<()> {
        self.pending
            .write()
            .map_err(|_| poisoned("pending sensitive config"))?
            .remove(dogu);
        Ok(())
    }
}
