//! In-memory adapters for every port
//!
//! They back the engine tests and the CLI's local runs. Each adapter records
//! the writes it received and can be told to fail for a given target.

mod components;
mod config;
mod dogus;
mod ecosystem;
mod spec_repo;

pub use components::InMemoryComponentRepository;
pub use config::{
    InMemoryDoguConfigRepository, InMemoryGlobalConfigRepository,
    InMemoryPendingSensitiveConfigRepository,
};
pub use dogus::InMemoryDoguRepository;
pub use ecosystem::{
    InMemoryDoguRegistry, RecordingRestartTrigger, ScriptedHealthProvider,
    StaticRestoreProgressChecker,
};
pub use spec_repo::InMemoryBlueprintSpecRepository;

use reconciler_core::errors::{ErrorKind, ReconcileError};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::errors::{poisoned, Result};

/// Targets for which an adapter fails, with the kind it reports
///
/// `add` makes the target reject writes like an ecosystem that refuses
/// them; `add_kind` injects any other kind, e.g. a storage conflict.
#[derive(Debug, Default)]
pub(crate) struct FailureSet {
    targets: Mutex<BTreeMap<String, ErrorKind>>,
}

impl FailureSet {
    pub(crate) fn add(&self, target: &str) {
        self.add_kind(target, ErrorKind::ExternalService);
    }

    pub(crate) fn add_kind(&self, target: &str, kind: ErrorKind) {
        if let Ok(mut targets) = self.targets.lock() {
            targets.insert(target.to_string(), kind);
        }
    }

    pub(crate) fn check(&self, op: &str, target: &str) -> Result<()> {
        let targets = self.targets.lock().map_err(|_| poisoned("failure set"))?;
        if let Some(kind) = targets.get(target) {
            return Err(ReconcileError::new(*kind)
                .with_op(op)
                .with_entity(target)
                .with_message(format!("injected failure for {}", target)));
        }
        Ok(())
    }
}

/// Ordered log of the writes an adapter received
#[derive(Debug, Default)]
pub(crate) struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub(crate) fn record(&self, call: String) -> Result<()> {
        self.calls
            .lock()
            .map_err(|_| poisoned("call log"))?
            .push(call);
        Ok(())
    }

    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}
