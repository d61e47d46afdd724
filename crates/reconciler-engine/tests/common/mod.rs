// Shared fixtures for the engine integration tests
#![allow(dead_code)]

use reconciler_core::model::{
    Blueprint, BlueprintMask, BlueprintSpec, Component, Dogu, EcosystemComponent, EcosystemDogu,
    HealthResult, HealthStatus, QualifiedName, Version,
};
use reconciler_core::ports::ReconcileContext;
use reconciler_core_types::RequestContext;
use reconciler_engine::{Collaborators, HealthConfig, Reconciler, ReconcilerConfig};
use reconciler_store::memory::{
    InMemoryBlueprintSpecRepository, InMemoryComponentRepository, InMemoryDoguConfigRepository,
    InMemoryDoguRegistry, InMemoryDoguRepository, InMemoryGlobalConfigRepository,
    InMemoryPendingSensitiveConfigRepository, RecordingRestartTrigger, ScriptedHealthProvider,
    StaticRestoreProgressChecker,
};
use std::sync::Arc;

pub const OWN_COMPONENT: &str = "k8s-blueprint-operator";

/// In-memory ecosystem plus a reconciler wired to it
pub struct Harness {
    pub specs: Arc<InMemoryBlueprintSpecRepository>,
    pub dogus: Arc<InMemoryDoguRepository>,
    pub components: Arc<InMemoryComponentRepository>,
    pub global_config: Arc<InMemoryGlobalConfigRepository>,
    pub dogu_config: Arc<InMemoryDoguConfigRepository>,
    pub sensitive_config: Arc<InMemoryDoguConfigRepository>,
    pub pending_sensitive: Arc<InMemoryPendingSensitiveConfigRepository>,
    pub restarts: Arc<RecordingRestartTrigger>,
    pub health: Arc<ScriptedHealthProvider>,
    pub restore: Arc<StaticRestoreProgressChecker>,
    pub registry: Arc<InMemoryDoguRegistry>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_components(InMemoryComponentRepository::auto_completing())
    }

    /// Component installations stay pending until `finish_installations`
    pub fn with_pending_components() -> Self {
        Self::with_components(InMemoryComponentRepository::new())
    }

    fn with_components(components: InMemoryComponentRepository) -> Self {
        let specs = Arc::new(InMemoryBlueprintSpecRepository::new());
        let dogus = Arc::new(InMemoryDoguRepository::new());
        let components = Arc::new(components);
        let global_config = Arc::new(InMemoryGlobalConfigRepository::new());
        let dogu_config = Arc::new(InMemoryDoguConfigRepository::new());
        let sensitive_config = Arc::new(InMemoryDoguConfigRepository::new());
        let pending_sensitive = Arc::new(InMemoryPendingSensitiveConfigRepository::new());
        let restarts = Arc::new(RecordingRestartTrigger::new());
        let health = Arc::new(ScriptedHealthProvider::new());
        let restore = Arc::new(StaticRestoreProgressChecker::new(false));
        let registry = Arc::new(InMemoryDoguRegistry::new());

        let collaborators = Collaborators {
            specs: specs.clone(),
            dogus: dogus.clone(),
            components: components.clone(),
            global_config: global_config.clone(),
            dogu_config: dogu_config.clone(),
            sensitive_config: sensitive_config.clone(),
            pending_sensitive: pending_sensitive.clone(),
            restarts: restarts.clone(),
            health: health.clone(),
            restore: restore.clone(),
            registry: registry.clone(),
        };
        let reconciler = Reconciler::new(collaborators, fast_config());

        Self {
            specs,
            dogus,
            components,
            global_config,
            dogu_config,
            sensitive_config,
            pending_sensitive,
            restarts,
            health,
            restore,
            registry,
            reconciler,
        }
    }

    pub fn seed(&self, id: &str, blueprint: Blueprint) {
        self.specs
            .insert(BlueprintSpec::new(id, blueprint, BlueprintMask::default()));
    }

    pub fn stored(&self, id: &str) -> BlueprintSpec {
        self.specs.stored(id).unwrap()
    }
}

/// Health waits that give up after a few milliseconds
pub fn fast_config() -> ReconcilerConfig {
    ReconcilerConfig {
        own_component_name: OWN_COMPONENT.to_string(),
        health: HealthConfig {
            wait_interval_ms: 1,
            wait_timeout_ms: 20,
            ..HealthConfig::default()
        },
    }
}

pub fn ctx(id: &str) -> ReconcileContext {
    ReconcileContext::new(RequestContext::new(id))
}

pub fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

pub fn qn(s: &str) -> QualifiedName {
    s.parse().unwrap()
}

pub fn dogu(name: &str, version: &str) -> Dogu {
    Dogu::present(qn(name), v(version))
}

pub fn component(name: &str, version: &str) -> Component {
    Component::present(qn(name), v(version))
}

pub fn installed_dogu(name: &str, version: &str) -> EcosystemDogu {
    EcosystemDogu::new(qn(name), v(version))
}

pub fn installed_component(name: &str, version: &str) -> EcosystemComponent {
    EcosystemComponent::installed(qn(name), v(version))
}

pub fn unhealthy_dogu(name: &str) -> HealthResult {
    let mut health = HealthResult::default();
    health
        .dogus
        .insert(name.to_string(), HealthStatus::Unhealthy);
    health
}
