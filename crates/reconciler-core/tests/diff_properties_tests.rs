#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use reconciler_core::diff::{compute_component_diff, compute_dogu_diff, Action, EntityDiff};
use reconciler_core::model::{Component, Dogu, EcosystemComponent, EcosystemDogu, Version};

/// Version suffix: none, a nano revision or a pre-release tag
#[derive(Debug, Clone)]
enum Suffix {
    Release,
    Nano(u64),
    Pre(&'static str, u64),
}

fn suffix() -> impl Strategy<Value = Suffix> {
    prop_oneof![
        Just(Suffix::Release),
        (1u64..10).prop_map(Suffix::Nano),
        (prop_oneof![Just("alpha"), Just("beta"), Just("rc")], 0u64..15)
            .prop_map(|(tag, n)| Suffix::Pre(tag, n)),
    ]
}

fn version() -> impl Strategy<Value = Version> {
    (0u64..20, 0u64..20, 0u64..20, suffix()).prop_map(|(major, minor, patch, suffix)| {
        let raw = match suffix {
            Suffix::Release => format!("{}.{}.{}", major, minor, patch),
            Suffix::Nano(n) => format!("{}.{}.{}-{}", major, minor, patch, n),
            Suffix::Pre(tag, n) => format!("{}.{}.{}-{}.{}", major, minor, patch, tag, n),
        };
        Version::parse(&raw).unwrap()
    })
}

fn namespace() -> impl Strategy<Value = String> {
    prop_oneof![Just("official".to_string()), Just("premium".to_string())]
}

proptest! {
    #[test]
    fn dogu_diff_of_equal_states_is_none(ns in namespace(), version in version()) {
        let name = format!("{}/ldap", ns).parse().unwrap();
        let expected = Dogu::present(name, version.clone());
        let actual = EcosystemDogu::new(expected.name.clone(), version);

        let diff = compute_dogu_diff(&expected, Some(&actual));

        prop_assert_eq!(diff.primary_action(), Action::None);
        prop_assert!(!diff.has_changes());
    }

    #[test]
    fn component_diff_of_equal_states_is_none(version in version()) {
        let expected = Component::present("k8s/k8s-etcd".parse().unwrap(), version.clone());
        let actual = EcosystemComponent::installed(expected.name.clone(), version);

        let diff = compute_component_diff(&expected, Some(&actual));

        prop_assert_eq!(diff.primary_action(), Action::None);
    }

    #[test]
    fn lower_expected_dogu_version_is_always_downgrade(a in version(), b in version()) {
        prop_assume!(a != b);
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let expected = Dogu::present("official/ldap".parse().unwrap(), low);
        let actual = EcosystemDogu::new(expected.name.clone(), high);

        let diff = compute_dogu_diff(&expected, Some(&actual));

        prop_assert!(diff.needed_actions.contains(&Action::Downgrade));
        prop_assert!(!diff.needed_actions.contains(&Action::Upgrade));
        prop_assert!(!diff.forbidden_actions().is_empty());
    }

    #[test]
    fn lower_expected_component_version_is_always_downgrade(a in version(), b in version()) {
        prop_assume!(a != b);
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let expected = Component::present("k8s/k8s-etcd".parse().unwrap(), low);
        let actual = EcosystemComponent::installed(expected.name.clone(), high);

        let diff = compute_component_diff(&expected, Some(&actual));

        prop_assert_eq!(diff.needed_actions, vec![Action::Downgrade]);
    }

    #[test]
    fn higher_expected_version_is_upgrade(a in version(), b in version()) {
        prop_assume!(a != b);
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let expected = Dogu::present("official/ldap".parse().unwrap(), high);
        let actual = EcosystemDogu::new(expected.name.clone(), low);

        let diff = compute_dogu_diff(&expected, Some(&actual));

        prop_assert_eq!(diff.needed_actions, vec![Action::Upgrade]);
    }
}
