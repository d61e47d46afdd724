//! Contracts of the external collaborators
//!
//! Adapters live outside the core. Every call takes the [`ReconcileContext`]
//! of the current pass. Storage failures are reported with
//! `ErrorKind::NotFound`, `ErrorKind::Conflict` or `ErrorKind::Internal`
//! so the external loop can tell them apart.

use async_trait::async_trait;
use reconciler_core_types::RequestContext;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::errors::{ErrorKind, ReconcileError, Result};
use crate::model::config::{ConfigKey, ConfigSnapshot};
use crate::model::entity::{
    ComponentInstallation, Dependency, EcosystemComponent, EcosystemDogu, QualifiedName,
};
use crate::model::health::HealthResult;
use crate::model::spec::BlueprintSpec;
use crate::model::version::Version;

/// Cancellation shared by all clones; once cancelled it stays cancelled
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` was called on any clone
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Correlation and cancellation for one reconciliation pass
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    pub request: RequestContext,
    pub cancel: CancelSignal,
}

impl ReconcileContext {
    pub fn new(request: RequestContext) -> Self {
        Self {
            request,
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_cancel(request: RequestContext, cancel: CancelSignal) -> Self {
        Self { request, cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// # Errors
    ///
    /// Returns `Cancelled` once the caller cancelled the pass.
    pub fn ensure_not_cancelled(&self, op: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(ReconcileError::new(ErrorKind::Cancelled)
                .with_op(op)
                .with_message("reconciliation was cancelled"));
        }
        Ok(())
    }
}

/// Persistence of the aggregate with optimistic concurrency
#[async_trait]
pub trait BlueprintSpecRepository: Send + Sync {
    /// # Errors
    ///
    /// `NotFound` when no spec has this id.
    async fn get_by_id(&self, ctx: &ReconcileContext, id: &str) -> Result<BlueprintSpec>;

    /// Store a spec whose `resource_version` matches the stored one and bump
    /// the version on success.
    ///
    /// # Errors
    ///
    /// `Conflict` when the stored version moved on.
    async fn update(&self, ctx: &ReconcileContext, spec: &mut BlueprintSpec) -> Result<()>;

    /// # Errors
    ///
    /// `Conflict` when a spec with this id exists.
    async fn create(&self, ctx: &ReconcileContext, spec: &mut BlueprintSpec) -> Result<()>;
}

#[async_trait]
pub trait DoguRepository: Send + Sync {
    /// Installed dogus keyed by simple name
    async fn get_all(&self, ctx: &ReconcileContext) -> Result<BTreeMap<String, EcosystemDogu>>;
    async fn create(&self, ctx: &ReconcileContext, name: &QualifiedName, version: &Version)
        -> Result<()>;
    async fn update(&self, ctx: &ReconcileContext, name: &QualifiedName, version: &Version)
        -> Result<()>;
    async fn delete(&self, ctx: &ReconcileContext, simple_name: &str) -> Result<()>;
}

#[async_trait]
pub trait ComponentRepository: Send + Sync {
    /// Installation targets keyed by simple name
    async fn get_all(&self, ctx: &ReconcileContext)
        -> Result<BTreeMap<String, EcosystemComponent>>;

    /// # Errors
    ///
    /// `NotFound` when the component was never installed this way.
    async fn get_by_name(&self, ctx: &ReconcileContext, simple_name: &str)
        -> Result<EcosystemComponent>;
    async fn create(&self, ctx: &ReconcileContext, component: &ComponentInstallation)
        -> Result<()>;
    async fn update(&self, ctx: &ReconcileContext, component: &ComponentInstallation)
        -> Result<()>;
    async fn delete(&self, ctx: &ReconcileContext, simple_name: &str) -> Result<()>;
}

#[async_trait]
pub trait GlobalConfigRepository: Send + Sync {
    async fn get(&self, ctx: &ReconcileContext) -> Result<ConfigSnapshot>;
    async fn update(&self, ctx: &ReconcileContext, snapshot: ConfigSnapshot)
        -> Result<ConfigSnapshot>;
}

/// Per-dogu config store; used for normal and for sensitive config
#[async_trait]
pub trait DoguConfigRepository: Send + Sync {
    /// Snapshots of the named dogus that have config; missing ones are
    /// left out of the map
    async fn get_all_existing(
        &self,
        ctx: &ReconcileContext,
        names: &[String],
    ) -> Result<BTreeMap<String, ConfigSnapshot>>;

    async fn update_or_create(
        &self,
        ctx: &ReconcileContext,
        snapshot: ConfigSnapshot,
    ) -> Result<ConfigSnapshot>;
}

/// Side store for sensitive values of dogus that are not installed yet
#[async_trait]
pub trait PendingSensitiveConfigRepository: Send + Sync {
    async fn save(
        &self,
        ctx: &ReconcileContext,
        dogu: &str,
        key: &ConfigKey,
        value: &str,
    ) -> Result<()>;

    /// Pending values keyed by dogu simple name
    async fn get_all(
        &self,
        ctx: &ReconcileContext,
    ) -> Result<BTreeMap<String, BTreeMap<ConfigKey, String>>>;

    async fn delete(&self, ctx: &ReconcileContext, dogu: &str) -> Result<()>;
}

#[async_trait]
pub trait RestartTrigger: Send + Sync {
    async fn restart_all(&self, ctx: &ReconcileContext, dogus: &[String]) -> Result<()>;
}

#[async_trait]
pub trait HealthProvider: Send + Sync {
    async fn check_health(&self, ctx: &ReconcileContext) -> Result<HealthResult>;
}

#[async_trait]
pub trait RestoreProgressChecker: Send + Sync {
    async fn is_restore_in_progress(&self, ctx: &ReconcileContext) -> Result<bool>;
}

/// Dogu metadata source
#[async_trait]
pub trait DoguRegistry: Send + Sync {
    async fn get_dependencies(
        &self,
        ctx: &ReconcileContext,
        name: &QualifiedName,
        version: &Version,
    ) -> Result<Vec<Dependency>>;
}
