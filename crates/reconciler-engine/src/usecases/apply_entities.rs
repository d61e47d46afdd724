//! Entity apply for components and dogus
//!
//! A domain with a forbidden action is refused before anything is written.
//! Otherwise every changed entity is attempted and failures are joined.

use reconciler_core::diff::{Action, ComponentDiff, DoguDiff, EntityDiff, StateDiff};
use reconciler_core::errors::{DomainError, ErrorKind, ReconcileError, Result};
use reconciler_core::model::{ComponentInstallation, QualifiedName, Version};
use reconciler_core::ports::ReconcileContext;

use crate::collaborators::Collaborators;

/// Refuse a set of diffs that contains forbidden actions
///
/// # Errors
///
/// `ForbiddenAction`, joining one cause per forbidden transition.
pub fn ensure_no_forbidden_actions<'a, D>(
    op: &str,
    diffs: impl IntoIterator<Item = &'a D>,
) -> Result<()>
where
    D: EntityDiff + 'a,
{
    let causes: Vec<ReconcileError> = diffs
        .into_iter()
        .flat_map(|d| {
            d.forbidden_actions()
                .into_iter()
                .map(move |action| forbidden_error(d.name(), action))
        })
        .collect();
    match ReconcileError::join(ErrorKind::ForbiddenAction, op, causes) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Apply every changed component diff, returning the applied names
///
/// # Errors
///
/// `ForbiddenAction` before any write, or the joined per-component errors.
pub async fn apply_component_diffs(
    c: &Collaborators,
    ctx: &ReconcileContext,
    diff: &StateDiff,
) -> Result<Vec<String>> {
    ensure_no_forbidden_actions("apply_components", diff.component_diffs.values())?;

    let mut applied = Vec::new();
    let mut errors = Vec::new();
    for component in diff.component_diffs.values().filter(|d| d.has_changes()) {
        if let Err(err) = ctx.ensure_not_cancelled("apply_components") {
            errors.push(err);
            break;
        }
        match apply_component_diff(c, ctx, component).await {
            Ok(()) => applied.push(component.name.clone()),
            Err(err) => errors.push(err),
        }
    }
    finish("apply_components", applied, errors)
}

/// Execute the primary action of one component diff
///
/// # Errors
///
/// Repository failures, `ForbiddenAction` for forbidden diffs.
pub async fn apply_component_diff(
    c: &Collaborators,
    ctx: &ReconcileContext,
    diff: &ComponentDiff,
) -> Result<()> {
    let action = diff.primary_action();
    tracing::info!(component_name = %diff.name, action = %action, "applying component");
    match action {
        Action::None => Ok(()),
        Action::Install | Action::Upgrade => {
            let installation = component_installation(diff)?;
            if action == Action::Install {
                c.components.create(ctx, &installation).await
            } else {
                c.components.update(ctx, &installation).await
            }
        }
        Action::Uninstall => c.components.delete(ctx, &diff.name).await,
        forbidden => Err(forbidden_error(&diff.name, forbidden)),
    }
}

fn component_installation(diff: &ComponentDiff) -> Result<ComponentInstallation> {
    let namespace = diff
        .expected
        .namespace
        .clone()
        .or_else(|| diff.actual.namespace.clone())
        .unwrap_or_default();
    let deploy_namespace = diff
        .expected
        .deploy_namespace
        .clone()
        .or_else(|| diff.actual.deploy_namespace.clone())
        .unwrap_or_default();
    Ok(ComponentInstallation {
        name: QualifiedName::new(namespace, diff.name.as_str()),
        deploy_namespace,
        version: expected_version(&diff.name, diff.expected.version.as_ref())?,
    })
}

/// Apply every changed dogu diff, returning the applied names
///
/// # Errors
///
/// `ForbiddenAction` before any write, or the joined per-dogu errors.
pub async fn apply_dogu_diffs(
    c: &Collaborators,
    ctx: &ReconcileContext,
    diff: &StateDiff,
) -> Result<Vec<String>> {
    ensure_no_forbidden_actions("apply_dogus", diff.dogu_diffs.values())?;

    let mut applied = Vec::new();
    let mut errors = Vec::new();
    for dogu in diff.dogu_diffs.values().filter(|d| d.has_changes()) {
        if let Err(err) = ctx.ensure_not_cancelled("apply_dogus") {
            errors.push(err);
            break;
        }
        match apply_dogu_diff(c, ctx, dogu).await {
            Ok(()) => applied.push(dogu.name.clone()),
            Err(err) => errors.push(err),
        }
    }
    finish("apply_dogus", applied, errors)
}

async fn apply_dogu_diff(c: &Collaborators, ctx: &ReconcileContext, diff: &DoguDiff) -> Result<()> {
    let action = diff.primary_action();
    tracing::info!(dogu = %diff.name, action = %action, "applying dogu");
    match action {
        Action::None => Ok(()),
        Action::Install | Action::Upgrade => {
            let namespace = diff
                .expected
                .namespace
                .clone()
                .or_else(|| diff.actual.namespace.clone())
                .unwrap_or_default();
            let name = QualifiedName::new(namespace, diff.name.as_str());
            let version = expected_version(&diff.name, diff.expected.version.as_ref())?;
            if action == Action::Install {
                c.dogus.create(ctx, &name, &version).await
            } else {
                c.dogus.update(ctx, &name, &version).await
            }
        }
        Action::Uninstall => c.dogus.delete(ctx, &diff.name).await,
        forbidden => Err(forbidden_error(&diff.name, forbidden)),
    }
}

fn expected_version(name: &str, version: Option<&Version>) -> Result<Version> {
    version.cloned().ok_or_else(|| {
        ReconcileError::new(ErrorKind::InvalidBlueprint)
            .with_op("apply_entity")
            .with_entity(name)
            .with_message("present entity has no expected version")
    })
}

fn forbidden_error(name: &str, action: Action) -> ReconcileError {
    DomainError::ForbiddenAction {
        entity: name.to_string(),
        action: action.to_string(),
        reason: "the ecosystem never executes this transition".to_string(),
    }
    .into()
}

fn finish(op: &str, applied: Vec<String>, errors: Vec<ReconcileError>) -> Result<Vec<String>> {
    match ReconcileError::join(ErrorKind::ExternalService, op, errors) {
        Some(err) => Err(err),
        None => Ok(applied),
    }
}
