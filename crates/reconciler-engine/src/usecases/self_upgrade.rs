//! Self-upgrade coordinator
//!
//! The reconciler may have to upgrade its own component. It never waits for
//! its replacement: it requests the upgrade once, reports "waiting", and the
//! next pass (run by the new process) finds the upgrade completed.

use reconciler_core::diff::StateDiff;
use reconciler_core::errors::{ErrorKind, ReconcileError, Result};
use reconciler_core::model::{EcosystemComponent, Version};
use reconciler_core::ports::ReconcileContext;

use super::apply_entities::{apply_component_diff, ensure_no_forbidden_actions};
use crate::collaborators::Collaborators;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfUpgradeState {
    /// The expected version is installed, or there is nothing to upgrade
    Completed,
    /// The upgrade was requested in this pass
    Triggered { version: Version },
    /// Requested in an earlier pass; the installed version still lags
    AlreadyTriggered { version: Version },
}

/// Classify the own component and request its upgrade when needed
///
/// A component the repository does not know counts as never installed.
///
/// # Errors
///
/// Read failures other than `NotFound`, `ForbiddenAction` when the own
/// component's diff is forbidden, `ExternalService` when the request fails.
pub async fn coordinate_self_upgrade(
    c: &Collaborators,
    ctx: &ReconcileContext,
    own_component: &str,
    diff: &StateDiff,
) -> Result<SelfUpgradeState> {
    let Some(own_diff) = diff.component_diffs.get(own_component) else {
        return Ok(SelfUpgradeState::Completed);
    };
    let expected = match &own_diff.expected.version {
        Some(version) if own_diff.expected.installation_state.is_present() => version.clone(),
        _ => return Ok(SelfUpgradeState::Completed),
    };

    let installed: Option<EcosystemComponent> =
        match c.components.get_by_name(ctx, own_component).await {
            Ok(component) => Some(component),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

    let actual_version = installed.as_ref().and_then(|i| i.actual_version.as_ref());
    if actual_version == Some(&expected) {
        return Ok(SelfUpgradeState::Completed);
    }

    let requested_version = installed.as_ref().and_then(|i| i.expected_version.as_ref());
    if requested_version == Some(&expected) {
        tracing::debug!(version = %expected, "self upgrade already requested");
        return Ok(SelfUpgradeState::AlreadyTriggered { version: expected });
    }

    ensure_no_forbidden_actions("self_upgrade", std::iter::once(own_diff))?;
    apply_component_diff(c, ctx, own_diff).await.map_err(|err| {
        ReconcileError::new(ErrorKind::ExternalService)
            .with_op("self_upgrade")
            .with_entity(own_component)
            .with_message("requesting the self upgrade failed")
            .with_causes(vec![err])
    })?;
    tracing::info!(component_name = own_component, version = %expected, "self upgrade requested");
    Ok(SelfUpgradeState::Triggered { version: expected })
}
