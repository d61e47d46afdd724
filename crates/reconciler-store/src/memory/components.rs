use async_trait::async_trait;
use reconciler_core::errors::ReconcileError;
use reconciler_core::model::{ComponentInstallation, EcosystemComponent};
use reconciler_core::ports::{ComponentRepository, ReconcileContext};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use super::{CallLog, FailureSet};
use crate::errors::{poisoned, Result};

/// Component installation targets
///
/// Writes only set the requested version. The installed version follows
/// either immediately (auto-complete) or when a test calls
/// [`InMemoryComponentRepository::finish_installations`].
#[derive(Debug, Default)]
pub struct InMemoryComponentRepository {
    components: RwLock<BTreeMap<String, EcosystemComponent>>,
    auto_complete: AtomicBool,
    calls: CallLog,
    failures: FailureSet,
}

impl InMemoryComponentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_completing() -> Self {
        let repo = Self::default();
        repo.auto_complete.store(true, Ordering::SeqCst);
        repo
    }

    pub fn install(&self, component: EcosystemComponent) {
        if let Ok(mut components) = self.components.write() {
            components.insert(component.name.simple_name.clone(), component);
        }
    }

    /// Let every pending installation reach its requested version
    pub fn finish_installations(&self) {
        if let Ok(mut components) = self.components.write() {
            for component in components.values_mut() {
                component.actual_version = component.expected_version.clone();
            }
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.snapshot()
    }

    pub fn fail_on(&self, simple_name: &str) {
        self.failures.add(simple_name);
    }

    fn put(&self, op: &str, installation: &ComponentInstallation) -> Result<()> {
        let name = &installation.name;
        self.failures.check(op, &name.simple_name)?;
        self.calls.record(format!("{} {}@{}", op, name, installation.version))?;

        let mut components = self.components.write().map_err(|_| poisoned("components"))?;
        let entry = components
            .entry(name.simple_name.clone())
            .or_insert_with(|| EcosystemComponent {
                name: name.clone(),
                deploy_namespace: installation.deploy_namespace.clone(),
                expected_version: None,
                actual_version: None,
            });
        entry.name = name.clone();
        entry.deploy_namespace = installation.deploy_namespace.clone();
        entry.expected_version = Some(installation.version.clone());
        if self.auto_complete.load(Ordering::SeqCst) {
            entry.actual_version = Some(installation.version.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl ComponentRepository for InMemoryComponentRepository {
    async fn get_all(
        &self,
        _ctx: &ReconcileContext,
    ) -> Result<BTreeMap<String, EcosystemComponent>> {
        Ok(self
            .components
            .read()
            .map_err(|_| poisoned("components"))?
            .clone())
    }

    async fn get_by_name(
        &self,
        _ctx: &ReconcileContext,
        simple_name: &str,
    ) -> Result<EcosystemComponent> {
        let components = self.components.read().map_err(|_| poisoned("components"))?;
        components.get(simple_name).cloned().ok_or_else(|| {
            ReconcileError::not_found(simple_name)
                .with_op("get_component")
                .with_message("component is not installed")
        })
    }

    async fn create(
        &self,
        _ctx: &ReconcileContext,
        component: &ComponentInstallation,
    ) -> Result<()> {
        self.put("create", component)
    }

    async fn update(
        &self,
        _ctx: &ReconcileContext,
        component: &ComponentInstallation,
    ) -> Result<()> {
        self.put("update", component)
    }

    async fn delete(&self, _ctx: &ReconcileContext, simple_name: &str) -> Result<()> {
        self.failures.check("delete", simple_name)?;
        self.calls.record(format!("delete {}", simple_name))?;
        self.components
            .write()
            .map_err(|_| poisoned("components"))?
            .remove(simple_name);
        Ok(())
    }
}
