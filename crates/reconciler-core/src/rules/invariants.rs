use std::collections::BTreeSet;

use crate::model::blueprint::{Blueprint, BlueprintMask};
use crate::model::config::{ConfigEntries, ConfigKey};
use crate::model::entity::QualifiedName;

fn duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut dupes = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            dupes.insert(name.to_string());
        }
    }
    dupes.into_iter().collect()
}

/// Dogus listed more than once (by simple name)
pub fn find_duplicate_dogus(blueprint: &Blueprint) -> Vec<String> {
    duplicates(blueprint.dogus.iter().map(|d| d.simple_name()))
}

/// Components listed more than once (by simple name)
pub fn find_duplicate_components(blueprint: &Blueprint) -> Vec<String> {
    duplicates(blueprint.components.iter().map(|c| c.simple_name()))
}

/// Mask dogus listed more than once
pub fn find_duplicate_mask_dogus(mask: &BlueprintMask) -> Vec<String> {
    duplicates(mask.dogus.iter().map(|d| d.name.simple_name.as_str()))
}

fn is_blank(name: &QualifiedName) -> bool {
    name.namespace.trim().is_empty() || name.simple_name.trim().is_empty()
}

/// Entities whose namespace or name is empty
pub fn find_blank_names(blueprint: &Blueprint) -> Vec<String> {
    blueprint
        .dogus
        .iter()
        .map(|d| &d.name)
        .chain(blueprint.components.iter().map(|c| &c.name))
        .filter(|name| is_blank(name))
        .map(|name| format!("'{}'", name))
        .collect()
}

/// Present entities without a version
pub fn find_present_without_version(blueprint: &Blueprint) -> Vec<String> {
    let dogus = blueprint
        .dogus
        .iter()
        .filter(|d| d.target_state.is_present() && d.version.is_none())
        .map(|d| d.name.to_string());
    let components = blueprint
        .components
        .iter()
        .filter(|c| c.target_state.is_present() && c.version.is_none())
        .map(|c| c.name.to_string());
    dogus.chain(components).collect()
}

/// Dogu config sections that belong to absent dogus or to no dogu at all
///
/// Covers normal and sensitive config alike.
pub fn find_config_without_present_dogu(blueprint: &Blueprint) -> Vec<String> {
    let present: BTreeSet<&str> = blueprint
        .dogus
        .iter()
        .filter(|d| d.target_state.is_present())
        .map(|d| d.simple_name())
        .collect();
    blueprint
        .config
        .dogus
        .iter()
        .filter(|(name, config)| !config.is_empty() && !present.contains(name.as_str()))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Keys of one config domain, independent of the value type
struct DomainKeys<'a> {
    domain: String,
    present: BTreeSet<&'a ConfigKey>,
    absent: &'a BTreeSet<ConfigKey>,
}

impl<'a> DomainKeys<'a> {
    fn of<V>(domain: String, entries: &'a ConfigEntries<V>) -> Self {
        Self {
            domain,
            present: entries.present.keys().collect(),
            absent: &entries.absent,
        }
    }
}

fn config_domains(blueprint: &Blueprint) -> Vec<DomainKeys<'_>> {
    let mut domains = vec![DomainKeys::of("global".to_string(), &blueprint.config.global)];
    for (dogu, config) in &blueprint.config.dogus {
        domains.push(DomainKeys::of(format!("{} config", dogu), &config.normal));
        domains.push(DomainKeys::of(
            format!("{} sensitive config", dogu),
            &config.sensitive,
        ));
    }
    domains
}

/// Config keys that are empty or contain an empty segment, as `domain: key`
pub fn find_malformed_config_keys(blueprint: &Blueprint) -> Vec<String> {
    config_domains(blueprint)
        .iter()
        .flat_map(|d| {
            d.present
                .iter()
                .copied()
                .chain(d.absent.iter())
                .filter(|key| !key.is_well_formed())
                .map(move |key| format!("{}: '{}'", d.domain, key))
        })
        .collect()
}

/// Config keys that are both present and absent, as `domain: key`
pub fn find_present_and_absent_keys(blueprint: &Blueprint) -> Vec<String> {
    config_domains(blueprint)
        .iter()
        .flat_map(|d| {
            d.absent
                .iter()
                .filter(|key| d.present.contains(key))
                .map(move |key| format!("{}: '{}'", d.domain, key))
        })
        .collect()
}

/// Mask dogus that the blueprint does not contain
pub fn find_mask_additions(blueprint: &Blueprint, mask: &BlueprintMask) -> Vec<String> {
    let known: BTreeSet<&str> = blueprint.dogus.iter().map(|d| d.simple_name()).collect();
    mask.dogus
        .iter()
        .filter(|d| !known.contains(d.name.simple_name.as_str()))
        .map(|d| d.name.to_string())
        .collect()
}
