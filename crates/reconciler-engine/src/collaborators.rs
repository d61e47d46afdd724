//! The set of port implementations a reconciler works against

use reconciler_core::ports::{
    BlueprintSpecRepository, ComponentRepository, DoguConfigRepository, DoguRegistry,
    DoguRepository, GlobalConfigRepository, HealthProvider, PendingSensitiveConfigRepository,
    RestartTrigger, RestoreProgressChecker,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Collaborators {
    pub specs: Arc<dyn BlueprintSpecRepository>,
    pub dogus: Arc<dyn DoguRepository>,
    pub components: Arc<dyn ComponentRepository>,
    pub global_config: Arc<dyn GlobalConfigRepository>,
    pub dogu_config: Arc<dyn DoguConfigRepository>,
    pub sensitive_config: Arc<dyn DoguConfigRepository>,
    /// Sensitive values waiting for their dogu to be installed
    pub pending_sensitive: Arc<dyn PendingSensitiveConfigRepository>,
    pub restarts: Arc<dyn RestartTrigger>,
    pub health: Arc<dyn HealthProvider>,
    pub restore: Arc<dyn RestoreProgressChecker>,
    pub registry: Arc<dyn DoguRegistry>,
}
