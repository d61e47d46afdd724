//! Config diff computation.
//!
//! Keys are evaluated over the union of expected present, expected absent
//! and actual keys. The result is sorted by key.

use reconciler_core_types::Sensitive;
use std::collections::{BTreeMap, BTreeSet};

use crate::diff::model::{
    ConfigAction, ConfigEntryDiff, ConfigValueState, NormalConfigEntryDiff,
    SensitiveConfigEntryDiff,
};
use crate::model::config::{ConfigEntries, ConfigKey, ConfigSnapshot};

/// Diff one config domain
///
/// `defer_set` turns every `Set` into `SetToEncrypt`; it is used for
/// sensitive config of dogus that are not installed yet.
pub fn compute_config_diff<V>(
    expected: &ConfigEntries<V>,
    actual: &BTreeMap<ConfigKey, V>,
    defer_set: bool,
) -> Vec<ConfigEntryDiff<V>>
where
    V: Clone + PartialEq,
{
    let keys: BTreeSet<&ConfigKey> = expected
        .present
        .keys()
        .chain(expected.absent.iter())
        .chain(actual.keys())
        .collect();

    keys.into_iter()
        .map(|key| {
            let actual_value = actual.get(key);
            let actual_state = match actual_value {
                Some(value) => ConfigValueState::with_value(value.clone()),
                None => ConfigValueState::missing(),
            };

            let (expected_state, needed_action) = if let Some(value) = expected.present.get(key) {
                let action = if actual_value == Some(value) {
                    ConfigAction::None
                } else if defer_set {
                    ConfigAction::SetToEncrypt
                } else {
                    ConfigAction::Set
                };
                (ConfigValueState::with_value(value.clone()), action)
            } else if expected.absent.contains(key) {
                let action = if actual_value.is_some() {
                    ConfigAction::Remove
                } else {
                    ConfigAction::None
                };
                (ConfigValueState::missing(), action)
            } else {
                // not managed by the blueprint; keep what is there
                (actual_state.clone(), ConfigAction::None)
            };

            ConfigEntryDiff {
                key: key.clone(),
                actual: actual_state,
                expected: expected_state,
                needed_action,
            }
        })
        .collect()
}

pub fn compute_normal_config_diff(
    expected: &ConfigEntries<String>,
    actual: Option<&ConfigSnapshot>,
) -> Vec<NormalConfigEntryDiff> {
    let empty = BTreeMap::new();
    let entries = actual.map(|s| &s.entries).unwrap_or(&empty);
    compute_config_diff(expected, entries, false)
}

/// Sensitive config diff of one dogu
///
/// Values of dogus that are not installed cannot be encrypted yet and end
/// up as `SetToEncrypt`.
pub fn compute_sensitive_config_diff(
    expected: &ConfigEntries<Sensitive<String>>,
    actual: Option<&ConfigSnapshot>,
    dogu_installed: bool,
) -> Vec<SensitiveConfigEntryDiff> {
    let entries: BTreeMap<ConfigKey, Sensitive<String>> = actual
        .map(|s| {
            s.entries
                .iter()
                .map(|(k, v)| (k.clone(), Sensitive::new(v.clone())))
                .collect()
        })
        .unwrap_or_default();
    compute_config_diff(expected, &entries, !dogu_installed)
}
