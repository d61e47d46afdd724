use async_trait::async_trait;
use reconciler_core::model::{Dependency, HealthResult, QualifiedName, Version};
use reconciler_core::ports::{
    DoguRegistry, HealthProvider, ReconcileContext, RestartTrigger, RestoreProgressChecker,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use super::FailureSet;
use crate::errors::{poisoned, Result};

const RESTART: &str = "restart";

/// Records every batch of restarts
#[derive(Debug, Default)]
pub struct RecordingRestartTrigger {
    batches: Mutex<Vec<Vec<String>>>,
    failures: FailureSet,
}

impl RecordingRestartTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn fail(&self) {
        self.failures.add(RESTART);
    }
}

#[async_trait]
impl RestartTrigger for RecordingRestartTrigger {
    async fn restart_all(&self, _ctx: &ReconcileContext, dogus: &[String]) -> Result<()> {
        self.failures.check("restart_dogus", RESTART)?;
        self.batches
            .lock()
            .map_err(|_| poisoned("restart batches"))?
            .push(dogus.to_vec());
        Ok(())
    }
}

/// Plays back queued health results; the last one repeats
///
/// With nothing queued the ecosystem is empty and therefore healthy.
#[derive(Debug, Default)]
pub struct ScriptedHealthProvider {
    script: Mutex<VecDeque<HealthResult>>,
    last: Mutex<HealthResult>,
    checks: AtomicUsize,
}

impl ScriptedHealthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: HealthResult) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
    }

    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProvider for ScriptedHealthProvider {
    async fn check_health(&self, _ctx: &ReconcileContext) -> Result<HealthResult> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .map_err(|_| poisoned("health script"))?
            .pop_front();
        let mut last = self.last.lock().map_err(|_| poisoned("health result"))?;
        if let Some(result) = next {
            *last = result;
        }
        Ok(last.clone())
    }
}

#[derive(Debug, Default)]
pub struct StaticRestoreProgressChecker {
    in_progress: AtomicBool,
}

impl StaticRestoreProgressChecker {
    pub fn new(in_progress: bool) -> Self {
        Self {
            in_progress: AtomicBool::new(in_progress),
        }
    }

    pub fn set(&self, in_progress: bool) {
        self.in_progress.store(in_progress, Ordering::SeqCst);
    }
}

#[async_trait]
impl RestoreProgressChecker for StaticRestoreProgressChecker {
    async fn is_restore_in_progress(&self, _ctx: &ReconcileContext) -> Result<bool> {
        Ok(self.in_progress.load(Ordering::SeqCst))
    }
}

/// Dependencies per dogu simple name, for every version
#[derive(Debug, Default)]
pub struct InMemoryDoguRegistry {
    dependencies: RwLock<BTreeMap<String, Vec<Dependency>>>,
    failures: FailureSet,
}

impl InMemoryDoguRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, dogu: &str, dependencies: Vec<Dependency>) {
        if let Ok(mut deps) = self.dependencies.write() {
            deps.insert(dogu.to_string(), dependencies);
        }
    }

    pub fn fail_on(&self, dogu: &str) {
        self.failures.add(dogu);
    }
}

#[async_trait]
impl DoguRegistry for InMemoryDoguRegistry {
    async fn get_dependencies(
        &self,
        _ctx: &ReconcileContext,
        name: &QualifiedName,
        _version: &Version,
    ) -> Result<Vec<Dependency>> {
        self.failures.check("get_dependencies", &name.simple_name)?;
        let deps = self.dependencies.read().map_err(|_| poisoned("dogu registry"))?;
        Ok(deps.get(&name.simple_name).cloned().unwrap_or_default())
    }
}
