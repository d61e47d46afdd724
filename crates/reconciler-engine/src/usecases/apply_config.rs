//! Config applier
//!
//! The three config domains are applied independently. Within a domain only
//! entities with a changed key are loaded, every key is attempted and the
//! per-key errors are joined after the full pass. Removals run before sets
//! so a scalar can be replaced by sub-keys in one pass.

use reconciler_core::diff::{
    ConfigAction, ConfigEntryDiff, NormalConfigEntryDiff, SensitiveConfigEntryDiff, StateDiff,
};
use reconciler_core::errors::{ErrorKind, ReconcileError, Result};
use reconciler_core::model::{ConfigKey, ConfigSnapshot};
use reconciler_core::ports::ReconcileContext;
use reconciler_core::{log_op_end, log_op_error, log_op_start};
use std::collections::BTreeMap;

use crate::collaborators::Collaborators;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigDomain {
    Global,
    Dogu,
    SensitiveDogu,
}

impl ConfigDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigDomain::Global => "global",
            ConfigDomain::Dogu => "dogu",
            ConfigDomain::SensitiveDogu => "sensitiveDogu",
        }
    }
}

/// Domains that failed, with their joined error
#[derive(Debug, Default)]
pub struct ConfigApplyReport {
    pub failures: Vec<(ConfigDomain, ReconcileError)>,
}

impl ConfigApplyReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failed domains, comma separated
    pub fn domains(&self) -> String {
        self.failures
            .iter()
            .map(|(d, _)| d.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn into_error(self) -> Option<ReconcileError> {
        ReconcileError::join(
            ErrorKind::ConfigApply,
            "apply_config",
            self.failures.into_iter().map(|(_, e)| e).collect(),
        )
    }
}

/// Apply all config diffs of the state diff
///
/// # Errors
///
/// A storage error of any config repository, returned unchanged once every
/// domain was attempted. Other failures are reported per domain.
pub async fn apply_config(
    c: &Collaborators,
    ctx: &ReconcileContext,
    diff: &StateDiff,
) -> Result<ConfigApplyReport> {
    log_op_start!("apply_config");
    let start = std::time::Instant::now();

    let mut report = ConfigApplyReport::default();
    if let Err(err) = apply_global_config(c, ctx, &diff.global_config_diffs).await {
        report.failures.push((ConfigDomain::Global, err));
    }
    if let Err(err) = apply_dogu_config(c, ctx, &diff.dogu_config_diffs).await {
        report.failures.push((ConfigDomain::Dogu, err));
    }
    if let Err(err) = apply_sensitive_config(c, ctx, &diff.sensitive_dogu_config_diffs).await {
        report.failures.push((ConfigDomain::SensitiveDogu, err));
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    if report.is_success() {
        log_op_end!("apply_config", duration_ms = duration_ms);
    } else {
        for (domain, err) in &report.failures {
            log_op_error!(
                "apply_config",
                err,
                duration_ms = duration_ms,
                domain = domain.as_str()
            );
        }
    }

    if let Some(storage) = report.failures.iter().find_map(|(_, e)| e.storage_error()) {
        return Err(storage.clone());
    }
    Ok(report)
}

/// # Errors
///
/// The joined per-key errors, or a storage error of the repository.
pub async fn apply_global_config(
    c: &Collaborators,
    ctx: &ReconcileContext,
    diffs: &[NormalConfigEntryDiff],
) -> Result<()> {
    if !any_change(diffs) {
        return Ok(());
    }
    let mut snapshot = c.global_config.get(ctx).await?;
    let mut errors = apply_entries(ctx, &mut snapshot, normal_entries(diffs));
    if let Err(err) = c.global_config.update(ctx, snapshot).await {
        errors.push(err);
    }
    joined(ConfigDomain::Global, errors)
}

/// # Errors
///
/// The joined errors of all dogus.
pub async fn apply_dogu_config(
    c: &Collaborators,
    ctx: &ReconcileContext,
    diffs: &BTreeMap<String, Vec<NormalConfigEntryDiff>>,
) -> Result<()> {
    let changed = changed_dogus(diffs);
    if changed.is_empty() {
        return Ok(());
    }
    let mut existing = c.dogu_config.get_all_existing(ctx, &changed).await?;

    let mut errors = Vec::new();
    for dogu in &changed {
        if let Err(err) = ctx.ensure_not_cancelled("apply_dogu_config") {
            errors.push(err);
            break;
        }
        let mut snapshot = existing
            .remove(dogu)
            .unwrap_or_else(|| ConfigSnapshot::for_dogu(dogu.as_str()));
        let entries = normal_entries(diffs.get(dogu).map(Vec::as_slice).unwrap_or_default());
        errors.extend(apply_entries(ctx, &mut snapshot, entries));
        if let Err(err) = c.dogu_config.update_or_create(ctx, snapshot).await {
            errors.push(err.with_entity(dogu.as_str()));
        }
    }
    joined(ConfigDomain::Dogu, errors)
}

/// Sensitive values of installed dogus go to the sensitive store; values
/// marked `SetToEncrypt` wait in the pending store.
///
/// # Errors
///
/// The joined errors of all dogus.
pub async fn apply_sensitive_config(
    c: &Collaborators,
    ctx: &ReconcileContext,
    diffs: &BTreeMap<String, Vec<SensitiveConfigEntryDiff>>,
) -> Result<()> {
    let changed = changed_dogus(diffs);
    if changed.is_empty() {
        return Ok(());
    }

    let mut errors = Vec::new();
    let mut direct = Vec::new();
    for dogu in &changed {
        let entries = diffs.get(dogu).map(Vec::as_slice).unwrap_or_default();
        for entry in entries.iter().filter(|e| e.needed_action == ConfigAction::SetToEncrypt) {
            if let Err(err) = ctx.ensure_not_cancelled("apply_sensitive_config") {
                errors.push(err);
                return joined(ConfigDomain::SensitiveDogu, errors);
            }
            let Some(value) = &entry.expected.value else {
                continue;
            };
            if let Err(err) = c
                .pending_sensitive
                .save(ctx, dogu, &entry.key, value.expose())
                .await
            {
                errors.push(err.with_entity(format!("{}/{}", dogu, entry.key)));
            }
        }
        if entries
            .iter()
            .any(|e| matches!(e.needed_action, ConfigAction::Set | ConfigAction::Remove))
        {
            direct.push(dogu.clone());
        }
    }

    if !direct.is_empty() {
        let mut existing = c.sensitive_config.get_all_existing(ctx, &direct).await?;
        for dogu in &direct {
            if let Err(err) = ctx.ensure_not_cancelled("apply_sensitive_config") {
                errors.push(err);
                break;
            }
            let mut snapshot = existing
                .remove(dogu)
                .unwrap_or_else(|| ConfigSnapshot::for_dogu(dogu.as_str()));
            let entries =
                sensitive_entries(diffs.get(dogu).map(Vec::as_slice).unwrap_or_default());
            errors.extend(apply_entries(ctx, &mut snapshot, entries));
            if let Err(err) = c.sensitive_config.update_or_create(ctx, snapshot).await {
                errors.push(err.with_entity(dogu.as_str()));
            }
        }
    }
    joined(ConfigDomain::SensitiveDogu, errors)
}

/// One key operation, detached from the value type of its domain
struct Entry<'a> {
    key: &'a ConfigKey,
    action: ConfigAction,
    value: Option<&'a str>,
}

fn normal_entries(diffs: &[NormalConfigEntryDiff]) -> Vec<Entry<'_>> {
    diffs
        .iter()
        .map(|d| Entry {
            key: &d.key,
            action: d.needed_action,
            value: d.expected.value.as_deref(),
        })
        .collect()
}

fn sensitive_entries(diffs: &[SensitiveConfigEntryDiff]) -> Vec<Entry<'_>> {
    diffs
        .iter()
        .map(|d| Entry {
            key: &d.key,
            action: d.needed_action,
            value: d.expected.value.as_ref().map(|v| v.expose().as_str()),
        })
        .collect()
}

/// Apply entries to a snapshot, returning the per-key errors
///
/// Stops at cancellation; keys applied so far stay in the snapshot.
fn apply_entries(
    ctx: &ReconcileContext,
    snapshot: &mut ConfigSnapshot,
    mut entries: Vec<Entry<'_>>,
) -> Vec<ReconcileError> {
    entries.sort_by_key(|e| e.action != ConfigAction::Remove);

    let mut errors = Vec::new();
    for entry in entries {
        if let Err(err) = ctx.ensure_not_cancelled("apply_config_entries") {
            errors.push(err);
            break;
        }
        match (entry.action, entry.value) {
            (ConfigAction::Remove, _) => {
                snapshot.remove(entry.key);
            }
            (ConfigAction::Set, Some(value)) => {
                if let Err(err) = snapshot.set(entry.key.clone(), value.to_string()) {
                    errors.push(ReconcileError::from(err).with_op("set_config_key"));
                }
            }
            (ConfigAction::Set, None) => errors.push(
                ReconcileError::internal("set without an expected value")
                    .with_op("set_config_key")
                    .with_entity(entry.key.as_str()),
            ),
            (ConfigAction::None | ConfigAction::SetToEncrypt, _) => {}
        }
    }
    errors
}

fn any_change<V>(diffs: &[ConfigEntryDiff<V>]) -> bool {
    diffs.iter().any(|d| d.needed_action != ConfigAction::None)
}

fn changed_dogus<V>(diffs: &BTreeMap<String, Vec<ConfigEntryDiff<V>>>) -> Vec<String> {
    diffs
        .iter()
        .filter(|(_, d)| any_change(d))
        .map(|(name, _)| name.clone())
        .collect()
}

fn joined(domain: ConfigDomain, errors: Vec<ReconcileError>) -> Result<()> {
    match ReconcileError::join(
        ErrorKind::ConfigApply,
        format!("apply_{}_config", domain.as_str()),
        errors,
    ) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
