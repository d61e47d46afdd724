use async_trait::async_trait;
use reconciler_core::errors::ReconcileError;
use reconciler_core::model::BlueprintSpec;
use reconciler_core::ports::{BlueprintSpecRepository, ReconcileContext};
use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use crate::errors::{poisoned, Result};

/// Blueprint specs kept in a map, with the same version check as SQLite
#[derive(Debug, Default)]
pub struct InMemoryBlueprintSpecRepository {
    specs: RwLock<BTreeMap<String, BlueprintSpec>>,
    next_update_error: Mutex<Option<ReconcileError>>,
    updates: Mutex<usize>,
}

impl InMemoryBlueprintSpecRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a spec without version checks
    pub fn insert(&self, mut spec: BlueprintSpec) {
        if spec.resource_version == 0 {
            spec.resource_version = 1;
        }
        if let Ok(mut specs) = self.specs.write() {
            specs.insert(spec.id.clone(), persisted(&spec));
        }
    }

    /// Current stored state, for assertions
    pub fn stored(&self, id: &str) -> Option<BlueprintSpec> {
        self.specs.read().ok()?.get(id).cloned()
    }

    /// Pretend another writer updated the spec
    pub fn bump_version(&self, id: &str) {
        if let Ok(mut specs) = self.specs.write() {
            if let Some(spec) = specs.get_mut(id) {
                spec.resource_version += 1;
            }
        }
    }

    /// Make the next `update` fail with this error
    pub fn fail_next_update(&self, err: ReconcileError) {
        if let Ok(mut next) = self.next_update_error.lock() {
            *next = Some(err);
        }
    }

    /// Number of successful updates
    pub fn update_count(&self) -> usize {
        self.updates.lock().map(|n| *n).unwrap_or_default()
    }
}

#[async_trait]
impl BlueprintSpecRepository for InMemoryBlueprintSpecRepository {
    async fn get_by_id(&self, _ctx: &ReconcileContext, id: &str) -> Result<BlueprintSpec> {
        let specs = self.specs.read().map_err(|_| poisoned("blueprint specs"))?;
        specs.get(id).cloned().ok_or_else(|| {
            ReconcileError::not_found(id)
                .with_op("get_blueprint_spec")
                .with_message("blueprint spec not found")
        })
    }

    async fn update(&self, _ctx: &ReconcileContext, spec: &mut BlueprintSpec) -> Result<()> {
        let injected = self
            .next_update_error
            .lock()
            .map_err(|_| poisoned("injected error"))?
            .take();
        if let Some(err) = injected {
            return Err(err);
        }

        let mut specs = self.specs.write().map_err(|_| poisoned("blueprint specs"))?;
        let stored = specs.get_mut(&spec.id).ok_or_else(|| {
            ReconcileError::not_found(spec.id.clone())
                .with_op("update_blueprint_spec")
                .with_message("blueprint spec not found")
        })?;
        if stored.resource_version != spec.resource_version {
            return Err(ReconcileError::conflict(spec.id.clone())
                .with_op("update_blueprint_spec")
                .with_message(format!(
                    "blueprint spec was modified concurrently (expected version {}, stored {})",
                    spec.resource_version, stored.resource_version
                )));
        }

        spec.resource_version += 1;
        *stored = persisted(spec);
        *self.updates.lock().map_err(|_| poisoned("update counter"))? += 1;
        Ok(())
    }

    async fn create(&self, _ctx: &ReconcileContext, spec: &mut BlueprintSpec) -> Result<()> {
        let mut specs = self.specs.write().map_err(|_| poisoned("blueprint specs"))?;
        if specs.contains_key(&spec.id) {
            return Err(ReconcileError::conflict(spec.id.clone())
                .with_op("create_blueprint_spec")
                .with_message("blueprint spec already exists"));
        }
        spec.resource_version = 1;
        specs.insert(spec.id.clone(), persisted(spec));
        Ok(())
    }
}

/// The stored form: events belong to the pass, not to the aggregate
fn persisted(spec: &BlueprintSpec) -> BlueprintSpec {
    let mut stored = spec.clone();
    stored.take_events();
    stored
}
