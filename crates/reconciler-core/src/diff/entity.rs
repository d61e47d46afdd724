//! Entity diff computation for dogus and components.
//!
//! Both functions are pure and total. Forbidden outcomes are reported as
//! actions; nothing here fails.

use std::cmp::Ordering;

use crate::diff::model::{
    Action, ComponentDiff, ComponentDiffState, DoguDiff, DoguDiffState,
};
use crate::model::entity::{Component, Dogu, EcosystemComponent, EcosystemDogu, TargetState};
use crate::model::version::Version;

/// Compare a blueprint dogu with its installed counterpart
///
/// A changed distribution namespace is forbidden unless the dogu allows
/// the switch, in which case it is handled as an upgrade.
pub fn compute_dogu_diff(expected: &Dogu, actual: Option<&EcosystemDogu>) -> DoguDiff {
    let expected_state = DoguDiffState {
        namespace: Some(expected.name.namespace.clone()),
        version: expected.version.clone(),
        installation_state: expected.target_state,
    };
    let actual_state = match actual {
        Some(dogu) => DoguDiffState {
            namespace: Some(dogu.name.namespace.clone()),
            version: Some(dogu.version.clone()),
            installation_state: TargetState::Present,
        },
        None => DoguDiffState::absent(),
    };

    let mut actions = Vec::new();
    match (expected.target_state, actual) {
        (TargetState::Absent, None) => {}
        (TargetState::Absent, Some(_)) => actions.push(Action::Uninstall),
        (TargetState::Present, None) => actions.push(Action::Install),
        (TargetState::Present, Some(installed)) => {
            if installed.name.namespace != expected.name.namespace {
                if expected.allow_namespace_switch {
                    actions.push(Action::Upgrade);
                } else {
                    actions.push(Action::SwitchDistributionNamespace);
                }
            }
            if let Some(action) = version_action(expected.version.as_ref(), Some(&installed.version))
            {
                actions.push(action);
            }
        }
    }

    DoguDiff {
        name: expected.simple_name().to_string(),
        actual: actual_state,
        expected: expected_state,
        needed_actions: normalize(actions),
    }
}

/// Compare a blueprint component with its installation target
///
/// Components never switch their distribution namespace. An empty expected
/// deploy namespace means "keep whatever is deployed". A component whose
/// installed version is not known yet is treated as needing an upgrade.
pub fn compute_component_diff(
    expected: &Component,
    actual: Option<&EcosystemComponent>,
) -> ComponentDiff {
    let expected_state = ComponentDiffState {
        namespace: Some(expected.name.namespace.clone()),
        version: expected.version.clone(),
        deploy_namespace: Some(expected.deploy_namespace.clone()).filter(|ns| !ns.is_empty()),
        installation_state: expected.target_state,
    };
    let actual_state = match actual {
        Some(component) => ComponentDiffState {
            namespace: Some(component.name.namespace.clone()),
            version: component.actual_version.clone(),
            deploy_namespace: Some(component.deploy_namespace.clone())
                .filter(|ns| !ns.is_empty()),
            installation_state: TargetState::Present,
        },
        None => ComponentDiffState::absent(),
    };

    let mut actions = Vec::new();
    match (expected.target_state, actual) {
        (TargetState::Absent, None) => {}
        (TargetState::Absent, Some(_)) => actions.push(Action::Uninstall),
        (TargetState::Present, None) => actions.push(Action::Install),
        (TargetState::Present, Some(installed)) => {
            if installed.name.namespace != expected.name.namespace {
                actions.push(Action::SwitchDistributionNamespace);
            }
            if !expected.deploy_namespace.is_empty()
                && installed.deploy_namespace != expected.deploy_namespace
            {
                actions.push(Action::SwitchDeployNamespace);
            }
            match installed.actual_version.as_ref() {
                None => actions.push(Action::Upgrade),
                Some(version) => {
                    if let Some(action) = version_action(expected.version.as_ref(), Some(version)) {
                        actions.push(action);
                    }
                }
            }
        }
    }

    ComponentDiff {
        name: expected.simple_name().to_string(),
        actual: actual_state,
        expected: expected_state,
        needed_actions: normalize(actions),
    }
}

fn version_action(expected: Option<&Version>, actual: Option<&Version>) -> Option<Action> {
    let (expected, actual) = (expected?, actual?);
    match expected.cmp(actual) {
        Ordering::Greater => Some(Action::Upgrade),
        Ordering::Less => Some(Action::Downgrade),
        Ordering::Equal => None,
    }
}

fn normalize(mut actions: Vec<Action>) -> Vec<Action> {
    actions.sort();
    actions.dedup();
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::model::EntityDiff;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn dogu(name: &str, version: &str) -> Dogu {
        Dogu::present(name.parse().unwrap(), v(version))
    }

    fn installed(name: &str, version: &str) -> EcosystemDogu {
        EcosystemDogu::new(name.parse().unwrap(), v(version))
    }

    #[test]
    fn test_dogu_upgrade() {
        let diff = compute_dogu_diff(
            &dogu("official/ldap", "1.2.3"),
            Some(&installed("official/ldap", "1.1.1")),
        );
        assert_eq!(diff.needed_actions, vec![Action::Upgrade]);
        assert_eq!(diff.primary_action(), Action::Upgrade);
    }

    #[test]
    fn test_dogu_install_and_uninstall() {
        let install = compute_dogu_diff(&dogu("official/ldap", "1.0.0"), None);
        assert_eq!(install.needed_actions, vec![Action::Install]);

        let uninstall = compute_dogu_diff(
            &Dogu::absent("official/ldap".parse().unwrap()),
            Some(&installed("official/ldap", "1.0.0")),
        );
        assert_eq!(uninstall.needed_actions, vec![Action::Uninstall]);

        let nothing = compute_dogu_diff(&Dogu::absent("official/ldap".parse().unwrap()), None);
        assert_eq!(nothing.primary_action(), Action::None);
        assert!(!nothing.has_changes());
    }

    #[test]
    fn test_dogu_namespace_switch_is_forbidden_by_default() {
        let diff = compute_dogu_diff(
            &dogu("premium/ldap", "1.0.0"),
            Some(&installed("official/ldap", "1.0.0")),
        );
        assert_eq!(diff.needed_actions, vec![Action::SwitchDistributionNamespace]);
        assert_eq!(diff.forbidden_actions().len(), 1);
    }

    #[test]
    fn test_dogu_namespace_switch_allowed_becomes_upgrade() {
        let mut expected = dogu("premium/ldap", "1.0.0");
        expected.allow_namespace_switch = true;
        let diff = compute_dogu_diff(&expected, Some(&installed("official/ldap", "1.0.0")));
        assert_eq!(diff.needed_actions, vec![Action::Upgrade]);
    }

    #[test]
    fn test_dogu_downgrade_is_reported() {
        let diff = compute_dogu_diff(
            &dogu("official/ldap", "1.0.0-1"),
            Some(&installed("official/ldap", "1.0.0-2")),
        );
        assert_eq!(diff.needed_actions, vec![Action::Downgrade]);
    }

    #[test]
    fn test_component_deploy_namespace_switch() {
        let mut expected = Component::present("k8s/k8s-etcd".parse().unwrap(), v("3.5.0"));
        expected.deploy_namespace = "other".to_string();
        let mut actual = EcosystemComponent::installed("k8s/k8s-etcd".parse().unwrap(), v("3.5.0"));
        actual.deploy_namespace = "ecosystem".to_string();

        let diff = compute_component_diff(&expected, Some(&actual));
        assert_eq!(diff.needed_actions, vec![Action::SwitchDeployNamespace]);
    }

    #[test]
    fn test_component_empty_deploy_namespace_is_not_compared() {
        let expected = Component::present("k8s/k8s-etcd".parse().unwrap(), v("3.5.0"));
        let mut actual = EcosystemComponent::installed("k8s/k8s-etcd".parse().unwrap(), v("3.5.0"));
        actual.deploy_namespace = "ecosystem".to_string();

        let diff = compute_component_diff(&expected, Some(&actual));
        assert!(diff.needed_actions.is_empty());
    }

    #[test]
    fn test_component_namespace_switch_never_allowed() {
        let expected = Component::present("k8s-testing/k8s-etcd".parse().unwrap(), v("3.6.0"));
        let actual = EcosystemComponent::installed("k8s/k8s-etcd".parse().unwrap(), v("3.5.0"));

        let diff = compute_component_diff(&expected, Some(&actual));
        assert_eq!(
            diff.needed_actions,
            vec![Action::Upgrade, Action::SwitchDistributionNamespace]
        );
        assert_eq!(diff.primary_action(), Action::SwitchDistributionNamespace);
    }

    #[test]
    fn test_component_without_actual_version_needs_upgrade() {
        let expected = Component::present("k8s/k8s-etcd".parse().unwrap(), v("3.5.0"));
        let mut actual = EcosystemComponent::installed("k8s/k8s-etcd".parse().unwrap(), v("3.5.0"));
        actual.actual_version = None;

        let diff = compute_component_diff(&expected, Some(&actual));
        assert_eq!(diff.needed_actions, vec![Action::Upgrade]);
        assert_eq!(diff.actual.version, None);
    }
}
