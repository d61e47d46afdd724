use std::collections::BTreeMap;

use crate::model::blueprint::EffectiveBlueprint;
use crate::model::entity::{Dependency, EcosystemDogu};
use crate::model::version::Version;

/// Find unsatisfied dogu dependencies
///
/// A dependency is satisfied by a present dogu of the effective blueprint
/// or, failing that, by an installed dogu the blueprint does not remove.
/// `dependencies` maps a dogu simple name to what it depends on.
pub fn check_dependencies(
    effective: &EffectiveBlueprint,
    installed: &BTreeMap<String, EcosystemDogu>,
    dependencies: &BTreeMap<String, Vec<Dependency>>,
) -> Vec<String> {
    let mut problems = Vec::new();

    for dogu in effective.present_dogus() {
        let Some(deps) = dependencies.get(dogu.simple_name()) else {
            continue;
        };
        for dep in deps {
            match provided_version(effective, installed, &dep.name) {
                None => problems.push(format!(
                    "{} depends on {} which is neither in the blueprint nor installed",
                    dogu.simple_name(),
                    dep.name
                )),
                Some(found) => {
                    if let (Some(min), Some(found)) = (&dep.min_version, found) {
                        if found < min {
                            problems.push(format!(
                                "{} needs {} >= {}, found {}",
                                dogu.simple_name(),
                                dep.name,
                                min,
                                found
                            ));
                        }
                    }
                }
            }
        }
    }

    problems
}

/// `None` when nothing provides the dogu; `Some(None)` when it is provided
/// without a known version
fn provided_version<'a>(
    effective: &'a EffectiveBlueprint,
    installed: &'a BTreeMap<String, EcosystemDogu>,
    name: &str,
) -> Option<Option<&'a Version>> {
    match effective.dogu(name) {
        Some(dogu) if dogu.target_state.is_present() => Some(dogu.version.as_ref()),
        Some(_) => None,
        None => installed.get(name).map(|d| Some(&d.version)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entity::Dogu;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn effective(dogus: Vec<Dogu>) -> EffectiveBlueprint {
        EffectiveBlueprint {
            dogus,
            ..EffectiveBlueprint::default()
        }
    }

    fn needs(name: &str, dep: &str, min: Option<&str>) -> BTreeMap<String, Vec<Dependency>> {
        [(
            name.to_string(),
            vec![Dependency {
                name: dep.to_string(),
                min_version: min.map(v),
            }],
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_satisfied_by_blueprint() {
        let bp = effective(vec![
            Dogu::present("official/redmine".parse().unwrap(), v("5.1.0")),
            Dogu::present("official/postgresql".parse().unwrap(), v("14.0.0")),
        ]);
        let problems = check_dependencies(
            &bp,
            &BTreeMap::new(),
            &needs("redmine", "postgresql", Some("12.0.0")),
        );
        assert!(problems.is_empty(), "{problems:?}");
    }

    #[test]
    fn test_satisfied_by_installed_dogu() {
        let bp = effective(vec![Dogu::present(
            "official/redmine".parse().unwrap(),
            v("5.1.0"),
        )]);
        let installed = [(
            "postgresql".to_string(),
            EcosystemDogu::new("official/postgresql".parse().unwrap(), v("14.0.0")),
        )]
        .into_iter()
        .collect();
        let problems =
            check_dependencies(&bp, &installed, &needs("redmine", "postgresql", None));
        assert!(problems.is_empty());
    }

    #[test]
    fn test_missing_and_too_old() {
        let bp = effective(vec![
            Dogu::present("official/redmine".parse().unwrap(), v("5.1.0")),
            Dogu::present("official/postgresql".parse().unwrap(), v("10.0.0")),
        ]);
        let too_old = check_dependencies(
            &bp,
            &BTreeMap::new(),
            &needs("redmine", "postgresql", Some("12.0.0")),
        );
        assert_eq!(too_old.len(), 1);
        assert!(too_old[0].contains(">= 12.0.0"));

        let missing = check_dependencies(&bp, &BTreeMap::new(), &needs("redmine", "cas", None));
        assert!(missing[0].contains("neither in the blueprint nor installed"));
    }

    #[test]
    fn test_absent_blueprint_dogu_does_not_satisfy() {
        let bp = effective(vec![
            Dogu::present("official/redmine".parse().unwrap(), v("5.1.0")),
            Dogu::absent("official/postgresql".parse().unwrap()),
        ]);
        let installed = [(
            "postgresql".to_string(),
            EcosystemDogu::new("official/postgresql".parse().unwrap(), v("14.0.0")),
        )]
        .into_iter()
        .collect();
        let problems =
            check_dependencies(&bp, &installed, &needs("redmine", "postgresql", None));
        assert_eq!(problems.len(), 1);
    }
}
