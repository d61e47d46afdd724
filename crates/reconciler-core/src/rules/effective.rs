//! Mask merge producing the effective blueprint

use crate::errors::DomainError;
use crate::model::blueprint::{Blueprint, BlueprintMask, EffectiveBlueprint, MaskDogu};
use crate::model::entity::{Dogu, TargetState};

/// Merge a mask into a blueprint
///
/// Mask entries override version, target state and distribution namespace
/// of the blueprint dogu with the same simple name. Dogu config of dogus
/// that end up absent is dropped.
///
/// # Errors
///
/// Returns `InvalidBlueprint` when a mask entry switches a namespace without
/// `allow_namespace_switch`, adds a dogu the mask does not allow, or leaves
/// a present dogu without a version.
pub fn calculate_effective_blueprint(
    blueprint: &Blueprint,
    mask: &BlueprintMask,
) -> Result<EffectiveBlueprint, DomainError> {
    let mut dogus = blueprint.dogus.clone();
    let mut problems = Vec::new();

    for entry in &mask.dogus {
        match dogus
            .iter_mut()
            .find(|d| d.simple_name() == entry.name.simple_name)
        {
            Some(dogu) => {
                if let Err(problem) = apply_mask_entry(dogu, entry) {
                    problems.push(problem);
                }
            }
            None if mask.allow_additions => match added_dogu(entry) {
                Ok(dogu) => dogus.push(dogu),
                Err(problem) => problems.push(problem),
            },
            None => problems.push(format!(
                "mask dogu {} is not part of the blueprint",
                entry.name
            )),
        }
    }

    if !problems.is_empty() {
        return Err(DomainError::InvalidBlueprint {
            message: problems.join("; "),
        });
    }

    let mut config = blueprint.config.clone();
    config.dogus.retain(|name, _| {
        dogus
            .iter()
            .any(|d| d.simple_name() == name && d.target_state.is_present())
    });

    Ok(EffectiveBlueprint {
        dogus,
        components: blueprint.components.clone(),
        config,
    })
}

fn apply_mask_entry(dogu: &mut Dogu, entry: &MaskDogu) -> Result<(), String> {
    if dogu.name.namespace != entry.name.namespace {
        if !entry.allow_namespace_switch {
            return Err(format!(
                "mask changes namespace of {} to {} without allowing a namespace switch",
                dogu.name, entry.name
            ));
        }
        dogu.name = entry.name.clone();
        dogu.allow_namespace_switch = true;
    }

    dogu.target_state = entry.target_state;
    match entry.target_state {
        TargetState::Absent => dogu.version = None,
        TargetState::Present => {
            if let Some(version) = &entry.version {
                dogu.version = Some(version.clone());
            }
            if dogu.version.is_none() {
                return Err(format!("masked dogu {} has no version", dogu.name));
            }
        }
    }
    Ok(())
}

fn added_dogu(entry: &MaskDogu) -> Result<Dogu, String> {
    if entry.target_state.is_present() && entry.version.is_none() {
        return Err(format!("mask dogu {} has no version", entry.name));
    }
    Ok(Dogu {
        name: entry.name.clone(),
        version: entry.version.clone(),
        target_state: entry.target_state,
        allow_namespace_switch: entry.allow_namespace_switch,
    })
}
