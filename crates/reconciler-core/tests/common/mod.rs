use reconciler_core::diff::EcosystemState;
use reconciler_core::model::{
    Blueprint, BlueprintMask, BlueprintSpec, Component, Dogu, EcosystemComponent, EcosystemDogu,
    Version,
};

#[allow(dead_code)]
pub fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

#[allow(dead_code)]
pub fn dogu(name: &str, version: &str) -> Dogu {
    Dogu::present(name.parse().unwrap(), v(version))
}

#[allow(dead_code)]
pub fn component(name: &str, version: &str) -> Component {
    Component::present(name.parse().unwrap(), v(version))
}

#[allow(dead_code)]
pub fn installed_dogu(name: &str, version: &str) -> EcosystemDogu {
    EcosystemDogu::new(name.parse().unwrap(), v(version))
}

#[allow(dead_code)]
pub fn installed_component(name: &str, version: &str) -> EcosystemComponent {
    EcosystemComponent::installed(name.parse().unwrap(), v(version))
}

/// Ecosystem with the given dogus installed
#[allow(dead_code)]
pub fn ecosystem_with(dogus: &[(&str, &str)]) -> EcosystemState {
    let mut state = EcosystemState::default();
    for (name, version) in dogus {
        let dogu = installed_dogu(name, version);
        state.dogus.insert(dogu.name.simple_name.clone(), dogu);
    }
    state
}

/// A spec that already passed validation and the mask merge
#[allow(dead_code)]
pub fn validated_spec(blueprint: Blueprint) -> BlueprintSpec {
    let mut spec = BlueprintSpec::new("bp-test", blueprint, BlueprintMask::default());
    spec.validate_statically().unwrap();
    spec.calculate_effective_blueprint().unwrap();
    spec.mark_dependencies_validated(Vec::new()).unwrap();
    spec
}
