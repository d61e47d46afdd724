//! Whole-ecosystem diff.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diff::config::{compute_normal_config_diff, compute_sensitive_config_diff};
use crate::diff::entity::{compute_component_diff, compute_dogu_diff};
use crate::diff::model::StateDiff;
use crate::model::blueprint::EffectiveBlueprint;
use crate::model::config::ConfigSnapshot;
use crate::model::entity::{EcosystemComponent, EcosystemDogu};

/// Observed ecosystem, keyed by simple name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcosystemState {
    #[serde(default)]
    pub dogus: BTreeMap<String, EcosystemDogu>,
    #[serde(default)]
    pub components: BTreeMap<String, EcosystemComponent>,
    #[serde(default)]
    pub global_config: ConfigSnapshot,
    #[serde(default)]
    pub dogu_configs: BTreeMap<String, ConfigSnapshot>,
    #[serde(default)]
    pub sensitive_dogu_configs: BTreeMap<String, ConfigSnapshot>,
}

/// Diff the effective blueprint against the observed ecosystem
///
/// Only entities listed in the blueprint are diffed; everything else in the
/// ecosystem is left alone.
pub fn determine_state_diff(effective: &EffectiveBlueprint, actual: &EcosystemState) -> StateDiff {
    let dogu_diffs = effective
        .dogus
        .iter()
        .map(|dogu| {
            let diff = compute_dogu_diff(dogu, actual.dogus.get(dogu.simple_name()));
            (diff.name.clone(), diff)
        })
        .collect();

    let component_diffs = effective
        .components
        .iter()
        .map(|component| {
            let diff =
                compute_component_diff(component, actual.components.get(component.simple_name()));
            (diff.name.clone(), diff)
        })
        .collect();

    let global_config_diffs =
        compute_normal_config_diff(&effective.config.global, Some(&actual.global_config));

    let mut dogu_config_diffs = BTreeMap::new();
    let mut sensitive_dogu_config_diffs = BTreeMap::new();
    for (dogu, config) in &effective.config.dogus {
        let normal = compute_normal_config_diff(&config.normal, actual.dogu_configs.get(dogu));
        if !normal.is_empty() {
            dogu_config_diffs.insert(dogu.clone(), normal);
        }

        let installed = actual.dogus.contains_key(dogu);
        let sensitive = compute_sensitive_config_diff(
            &config.sensitive,
            actual.sensitive_dogu_configs.get(dogu),
            installed,
        );
        if !sensitive.is_empty() {
            sensitive_dogu_config_diffs.insert(dogu.clone(), sensitive);
        }
    }

    StateDiff {
        dogu_diffs,
        component_diffs,
        global_config_diffs,
        dogu_config_diffs,
        sensitive_dogu_config_diffs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::model::{Action, ConfigAction, EntityDiff};
    use crate::model::config::{ConfigEntries, DoguConfig};
    use crate::model::entity::Dogu;
    use crate::model::version::Version;
    use reconciler_core_types::Sensitive;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_unlisted_dogus_are_not_diffed() {
        let effective = EffectiveBlueprint::default();
        let mut actual = EcosystemState::default();
        actual.dogus.insert(
            "cas".to_string(),
            EcosystemDogu::new("official/cas".parse().unwrap(), v("7.0.0")),
        );

        let diff = determine_state_diff(&effective, &actual);
        assert!(diff.dogu_diffs.is_empty());
        assert!(!diff.has_changes());
    }

    #[test]
    fn test_sensitive_config_of_new_dogu_is_deferred() {
        let mut effective = EffectiveBlueprint::default();
        effective
            .dogus
            .push(Dogu::present("official/ldap".parse().unwrap(), v("2.6.0")));
        effective.config.dogus.insert(
            "ldap".to_string(),
            DoguConfig {
                normal: ConfigEntries::default().with_present("logging/root", "INFO".to_string()),
                sensitive: ConfigEntries::default()
                    .with_present("admin/password", Sensitive::new("pw".to_string())),
            },
        );

        let diff = determine_state_diff(&effective, &EcosystemState::default());

        assert_eq!(diff.dogu_diffs["ldap"].primary_action(), Action::Install);
        assert_eq!(
            diff.dogu_config_diffs["ldap"][0].needed_action,
            ConfigAction::Set
        );
        assert_eq!(
            diff.sensitive_dogu_config_diffs["ldap"][0].needed_action,
            ConfigAction::SetToEncrypt
        );
        assert_eq!(diff.dogus_with_config_changes(), vec!["ldap".to_string()]);
        assert!(diff.has_changes());
    }

    #[test]
    fn test_forbidden_actions_are_listed() {
        let mut effective = EffectiveBlueprint::default();
        effective
            .dogus
            .push(Dogu::present("official/ldap".parse().unwrap(), v("1.0.0")));
        let mut actual = EcosystemState::default();
        actual.dogus.insert(
            "ldap".to_string(),
            EcosystemDogu::new("official/ldap".parse().unwrap(), v("2.0.0")),
        );

        let diff = determine_state_diff(&effective, &actual);
        assert_eq!(diff.forbidden_actions(), vec!["ldap: downgrade".to_string()]);
    }

    #[test]
    fn test_ecosystem_state_from_json() {
        let json = r#"{
            "dogus": {"ldap": {"name": "official/ldap", "version": "2.6.0-1"}},
            "components": {
                "k8s-etcd": {
                    "name": "k8s/k8s-etcd",
                    "expectedVersion": "3.5.0",
                    "actualVersion": "3.5.0"
                }
            },
            "globalConfig": {"entries": {"fqdn": "ces.local"}}
        }"#;
        let state: EcosystemState = serde_json::from_str(json).unwrap();
        assert_eq!(state.dogus["ldap"].version, v("2.6.0-1"));
        assert_eq!(state.global_config.entries.len(), 1);
        assert!(state.dogu_configs.is_empty());
    }
}
