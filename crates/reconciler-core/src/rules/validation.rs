use crate::errors::DomainError;
use crate::model::blueprint::{Blueprint, BlueprintMask};

use super::invariants;

/// Validate a blueprint and its mask without looking at the ecosystem
///
/// Every rule runs; all violations are reported together:
///
/// 1. Dogu, component and mask dogu names are unique
/// 2. Names and namespaces are not empty
/// 3. Present entities carry a version
/// 4. Dogu config only exists for dogus that are present
/// 5. Config keys are well formed
/// 6. A key is never both present and absent
/// 7. The mask only touches blueprint dogus unless it allows additions
///
/// # Errors
///
/// Returns `InvalidBlueprint` listing every violation.
pub fn validate_blueprint(blueprint: &Blueprint, mask: &BlueprintMask) -> Result<(), DomainError> {
    let mut violations = Vec::new();

    let mut report = |label: &str, found: Vec<String>| {
        if !found.is_empty() {
            violations.push(format!("{}: {}", label, found.join(", ")));
        }
    };

    report("duplicate dogus", invariants::find_duplicate_dogus(blueprint));
    report(
        "duplicate components",
        invariants::find_duplicate_components(blueprint),
    );
    report(
        "duplicate mask dogus",
        invariants::find_duplicate_mask_dogus(mask),
    );
    report("empty names", invariants::find_blank_names(blueprint));
    report(
        "present entities without version",
        invariants::find_present_without_version(blueprint),
    );
    report(
        "config for dogus that are not present",
        invariants::find_config_without_present_dogu(blueprint),
    );
    report(
        "malformed config keys",
        invariants::find_malformed_config_keys(blueprint),
    );
    report(
        "config keys both present and absent",
        invariants::find_present_and_absent_keys(blueprint),
    );
    if !mask.allow_additions {
        report(
            "mask dogus not in blueprint",
            invariants::find_mask_additions(blueprint, mask),
        );
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DomainError::InvalidBlueprint {
            message: violations.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::blueprint::MaskDogu;
    use crate::model::config::{ConfigEntries, DoguConfig};
    use crate::model::entity::{Component, Dogu, TargetState};
    use crate::model::version::Version;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn valid_blueprint() -> Blueprint {
        let mut blueprint = Blueprint {
            dogus: vec![
                Dogu::present("official/ldap".parse().unwrap(), v("2.6.0-1")),
                Dogu::absent("official/cas".parse().unwrap()),
            ],
            components: vec![Component::present(
                "k8s/k8s-etcd".parse().unwrap(),
                v("3.5.0"),
            )],
            ..Blueprint::default()
        };
        blueprint.config.global = ConfigEntries::default()
            .with_present("fqdn", "ces.local".to_string())
            .with_absent("legacy/flag");
        blueprint.config.dogus.insert(
            "ldap".to_string(),
            DoguConfig {
                normal: ConfigEntries::default().with_present("logging/root", "INFO".to_string()),
                ..DoguConfig::default()
            },
        );
        blueprint
    }

    fn message(err: DomainError) -> String {
        match err {
            DomainError::InvalidBlueprint { message } => message,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_valid_blueprint_passes() {
        assert!(validate_blueprint(&valid_blueprint(), &BlueprintMask::default()).is_ok());
    }

    #[test]
    fn test_all_violations_are_reported() {
        let mut blueprint = valid_blueprint();
        blueprint
            .dogus
            .push(Dogu::present("official/ldap".parse().unwrap(), v("2.6.0-1")));
        blueprint.components[0].version = None;
        blueprint.config.global = ConfigEntries::default()
            .with_present("a//b", "x".to_string())
            .with_present("c", "1".to_string())
            .with_absent("c");

        let msg = message(validate_blueprint(&blueprint, &BlueprintMask::default()).unwrap_err());

        assert!(msg.contains("duplicate dogus: ldap"), "{msg}");
        assert!(msg.contains("k8s/k8s-etcd"), "{msg}");
        assert!(msg.contains("global: 'a//b'"), "{msg}");
        assert!(msg.contains("both present and absent: global: 'c'"), "{msg}");
    }

    #[test]
    fn test_config_for_absent_dogu_is_rejected() {
        let mut blueprint = valid_blueprint();
        blueprint.config.dogus.insert(
            "cas".to_string(),
            DoguConfig {
                normal: ConfigEntries::default().with_present("x", "y".to_string()),
                ..DoguConfig::default()
            },
        );
        let msg = message(validate_blueprint(&blueprint, &BlueprintMask::default()).unwrap_err());
        assert!(msg.contains("not present: cas"), "{msg}");
    }

    #[test]
    fn test_mask_additions_need_permission() {
        let blueprint = valid_blueprint();
        let mut mask = BlueprintMask {
            dogus: vec![MaskDogu {
                name: "official/redmine".parse().unwrap(),
                version: Some(v("5.1.0")),
                target_state: TargetState::Present,
                allow_namespace_switch: false,
            }],
            allow_additions: false,
        };

        assert!(validate_blueprint(&blueprint, &mask).is_err());
        mask.allow_additions = true;
        assert!(validate_blueprint(&blueprint, &mask).is_ok());
    }
}
