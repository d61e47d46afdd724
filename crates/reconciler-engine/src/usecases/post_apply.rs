//! Steps after the entity apply: up-to-date gate, pending sensitive config
//! flush and restarts

use reconciler_core::diff::{Action, EntityDiff, StateDiff};
use reconciler_core::errors::{ErrorKind, ReconcileError, Result};
use reconciler_core::model::{ConfigSnapshot, EffectiveBlueprint};
use reconciler_core::ports::ReconcileContext;
use std::collections::BTreeSet;

use crate::collaborators::Collaborators;

/// Dogus whose installed state does not match their diff yet
///
/// # Errors
///
/// Storage errors of the dogu repository.
pub async fn find_outdated_dogus(
    c: &Collaborators,
    ctx: &ReconcileContext,
    diff: &StateDiff,
) -> Result<Vec<String>> {
    let installed = c.dogus.get_all(ctx).await?;
    Ok(diff
        .dogu_diffs
        .values()
        .filter(|d| d.has_changes())
        .filter(|d| {
            let current = installed.get(&d.name);
            if d.expected.installation_state.is_present() {
                current.map(|i| &i.version) != d.expected.version.as_ref()
            } else {
                current.is_some()
            }
        })
        .map(|d| d.name.clone())
        .collect())
}

/// Move pending sensitive values into the sensitive config of dogus that
/// are installed now, returning the flushed dogus
///
/// Pending values of a dogu are only dropped after all of them were
/// written.
///
/// # Errors
///
/// The joined per-dogu failures.
pub async fn flush_pending_sensitive_config(
    c: &Collaborators,
    ctx: &ReconcileContext,
) -> Result<Vec<String>> {
    let pending = c.pending_sensitive.get_all(ctx).await?;
    if pending.is_empty() {
        return Ok(Vec::new());
    }
    let installed = c.dogus.get_all(ctx).await?;
    let ready: Vec<String> = pending
        .keys()
        .filter(|dogu| installed.contains_key(*dogu))
        .cloned()
        .collect();
    let mut existing = c.sensitive_config.get_all_existing(ctx, &ready).await?;

    let mut flushed = Vec::new();
    let mut errors = Vec::new();
    for dogu in ready {
        if let Err(err) = ctx.ensure_not_cancelled("flush_pending_sensitive_config") {
            errors.push(err);
            break;
        }
        let mut snapshot = existing
            .remove(&dogu)
            .unwrap_or_else(|| ConfigSnapshot::for_dogu(dogu.as_str()));
        let mut failed = false;
        for (key, value) in pending.get(&dogu).into_iter().flatten() {
            if let Err(err) = snapshot.set(key.clone(), value.clone()) {
                errors.push(ReconcileError::from(err).with_op("flush_sensitive_key"));
                failed = true;
            }
        }
        if let Err(err) = c.sensitive_config.update_or_create(ctx, snapshot).await {
            errors.push(err.with_entity(dogu.as_str()));
            continue;
        }
        if failed {
            continue;
        }
        match c.pending_sensitive.delete(ctx, &dogu).await {
            Ok(()) => flushed.push(dogu),
            Err(err) => errors.push(err.with_entity(dogu.as_str())),
        }
    }

    match ReconcileError::join(ErrorKind::ExternalService, "flush_pending_sensitive_config", errors)
    {
        Some(err) => Err(err),
        None => Ok(flushed),
    }
}

/// Dogus to restart after a config change
///
/// Global config changes restart every present dogu; dogu config changes
/// restart that dogu. Freshly installed and removed dogus are never
/// restarted.
pub fn dogus_to_restart(diff: &StateDiff, effective: &EffectiveBlueprint) -> Vec<String> {
    let skipped: BTreeSet<&str> = diff
        .dogu_diffs
        .values()
        .filter(|d| {
            d.primary_action() == Action::Install || !d.expected.installation_state.is_present()
        })
        .map(|d| d.name.as_str())
        .collect();

    let mut names: BTreeSet<String> = BTreeSet::new();
    if diff.has_global_config_changes() {
        names.extend(effective.present_dogus().map(|d| d.simple_name().to_string()));
    }
    names.extend(diff.dogus_with_config_changes());
    names.retain(|name| !skipped.contains(name.as_str()));
    names.into_iter().collect()
}

/// # Errors
///
/// `ExternalService` wrapping the failure of the restart trigger.
pub async fn trigger_restarts(
    c: &Collaborators,
    ctx: &ReconcileContext,
    diff: &StateDiff,
    effective: &EffectiveBlueprint,
) -> Result<Vec<String>> {
    let dogus = dogus_to_restart(diff, effective);
    if !dogus.is_empty() {
        c.restarts.restart_all(ctx, &dogus).await.map_err(|err| {
            ReconcileError::new(ErrorKind::ExternalService)
                .with_op("trigger_restarts")
                .with_message(format!("restarting {} failed", dogus.join(", ")))
                .with_causes(vec![err])
        })?;
    }
    Ok(dogus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconciler_core::diff::{determine_state_diff, EcosystemState};
    use reconciler_core::model::{ConfigEntries, Dogu, DoguConfig, EcosystemDogu, Version};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn effective(dogus: Vec<Dogu>) -> EffectiveBlueprint {
        EffectiveBlueprint {
            dogus,
            ..EffectiveBlueprint::default()
        }
    }

    fn installed(names: &[&str]) -> EcosystemState {
        let mut state = EcosystemState::default();
        for name in names {
            let dogu = EcosystemDogu::new(format!("official/{}", name).parse().unwrap(), v("1.0.0"));
            state.dogus.insert(name.to_string(), dogu);
        }
        state
    }

    #[test]
    fn test_global_change_restarts_present_dogus_except_fresh_installs() {
        let mut bp = effective(vec![
            Dogu::present("official/ldap".parse().unwrap(), v("1.0.0")),
            Dogu::present("official/cas".parse().unwrap(), v("1.0.0")),
            Dogu::present("official/redmine".parse().unwrap(), v("1.0.0")),
        ]);
        bp.config.global =
            ConfigEntries::default().with_present("fqdn", "ces.example.com".to_string());
        let diff = determine_state_diff(&bp, &installed(&["ldap", "cas"]));

        assert_eq!(dogus_to_restart(&diff, &bp), vec!["cas", "ldap"]);
    }

    #[test]
    fn test_dogu_config_change_restarts_only_that_dogu() {
        let mut bp = effective(vec![
            Dogu::present("official/ldap".parse().unwrap(), v("1.0.0")),
            Dogu::present("official/cas".parse().unwrap(), v("1.0.0")),
        ]);
        bp.config.dogus.insert(
            "cas".to_string(),
            DoguConfig {
                normal: ConfigEntries::default()
                    .with_present("logging/root", "DEBUG".to_string()),
                ..DoguConfig::default()
            },
        );
        let diff = determine_state_diff(&bp, &installed(&["ldap", "cas"]));

        assert_eq!(dogus_to_restart(&diff, &bp), vec!["cas"]);
    }

    #[test]
    fn test_no_config_change_restarts_nothing() {
        let bp = effective(vec![Dogu::present("official/ldap".parse().unwrap(), v("2.0.0"))]);
        let diff = determine_state_diff(&bp, &installed(&["ldap"]));

        assert!(dogus_to_restart(&diff, &bp).is_empty());
    }
}
