use async_trait::async_trait;
use reconciler_core::errors::ReconcileError;
use reconciler_core::model::{EcosystemDogu, QualifiedName, Version};
use reconciler_core::ports::{DoguRepository, ReconcileContext};
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{CallLog, FailureSet};
use crate::errors::{poisoned, Result};

/// Installed dogus; installs and upgrades take effect immediately
#[derive(Debug, Default)]
pub struct InMemoryDoguRepository {
    dogus: RwLock<BTreeMap<String, EcosystemDogu>>,
    calls: CallLog,
    failures: FailureSet,
}

impl InMemoryDoguRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installed(dogus: impl IntoIterator<Item = EcosystemDogu>) -> Self {
        let repo = Self::default();
        for dogu in dogus {
            repo.install(dogu);
        }
        repo
    }

    pub fn install(&self, dogu: EcosystemDogu) {
        if let Ok(mut dogus) = self.dogus.write() {
            dogus.insert(dogu.name.simple_name.clone(), dogu);
        }
    }

    /// Writes formatted as `create ns/name@version`, `update ...`, `delete name`
    pub fn calls(&self) -> Vec<String> {
        self.calls.snapshot()
    }

    /// Fail every write to this dogu
    pub fn fail_on(&self, simple_name: &str) {
        self.failures.add(simple_name);
    }

    fn put(&self, op: &str, name: &QualifiedName, version: &Version) -> Result<()> {
        self.failures.check(op, &name.simple_name)?;
        self.calls.record(format!("{} {}@{}", op, name, version))?;
        let mut dogus = self.dogus.write().map_err(|_| poisoned("dogus"))?;
        dogus.insert(
            name.simple_name.clone(),
            EcosystemDogu::new(name.clone(), version.clone()),
        );
        Ok(())
    }
}

#[async_trait]
impl DoguRepository for InMemoryDoguRepository {
    async fn get_all(&self, _ctx: &ReconcileContext) -> Result<BTreeMap<String, EcosystemDogu>> {
        Ok(self.dogus.read().map_err(|_| poisoned("dogus"))?.clone())
    }

    async fn create(
        &self,
        _ctx: &ReconcileContext,
        name: &QualifiedName,
        version: &Version,
    ) -> Result<()> {
        {
            let dogus = self.dogus.read().map_err(|_| poisoned("dogus"))?;
            if dogus.contains_key(&name.simple_name) {
                return Err(ReconcileError::conflict(name.simple_name.clone())
                    .with_op("create")
                    .with_message("dogu is already installed"));
            }
        }
        self.put("create", name, version)
    }

    async fn update(
        &self,
        _ctx: &ReconcileContext,
        name: &QualifiedName,
        version: &Version,
    ) -> Result<()> {
        self.put("update", name, version)
    }

    async fn delete(&self, _ctx: &ReconcileContext, simple_name: &str) -> Result<()> {
        self.failures.check("delete", simple_name)?;
        self.calls.record(format!("delete {}", simple_name))?;
        self.dogus
            .write()
            .map_err(|_| poisoned("dogus"))?
            .remove(simple_name);
        Ok(())
    }
}
