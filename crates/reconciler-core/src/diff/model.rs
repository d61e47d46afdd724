//! State diff output types.
//!
//! Collections use `BTreeMap` and sorted `Vec` for deterministic
//! serialization. A diff is derived from one expected and one actual
//! snapshot and is never patched; a new pass replaces it wholesale.

use reconciler_core_types::Sensitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::config::ConfigKey;
use crate::model::entity::TargetState;
use crate::model::version::Version;

/// What has to happen to an entity
///
/// `Downgrade`, `SwitchDistributionNamespace` and `SwitchDeployNamespace`
/// are forbidden outcomes: the diff reports them and executing them is
/// always an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    None,
    Install,
    Upgrade,
    Uninstall,
    Downgrade,
    SwitchDistributionNamespace,
    SwitchDeployNamespace,
}

impl Action {
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            Action::Downgrade | Action::SwitchDistributionNamespace | Action::SwitchDeployNamespace
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::None => "none",
            Action::Install => "install",
            Action::Upgrade => "upgrade",
            Action::Uninstall => "uninstall",
            Action::Downgrade => "downgrade",
            Action::SwitchDistributionNamespace => "switch distribution namespace",
            Action::SwitchDeployNamespace => "switch deploy namespace",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What has to happen to a config key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigAction {
    None,
    Set,
    Remove,
    /// Sensitive value for a dogu that has no encryption key yet
    SetToEncrypt,
}

/// One side of a dogu diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoguDiffState {
    pub namespace: Option<String>,
    pub version: Option<Version>,
    pub installation_state: TargetState,
}

impl DoguDiffState {
    pub fn absent() -> Self {
        Self {
            namespace: None,
            version: None,
            installation_state: TargetState::Absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoguDiff {
    pub name: String,
    pub actual: DoguDiffState,
    pub expected: DoguDiffState,
    pub needed_actions: Vec<Action>,
}

/// One side of a component diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDiffState {
    pub namespace: Option<String>,
    pub version: Option<Version>,
    pub deploy_namespace: Option<String>,
    pub installation_state: TargetState,
}

impl ComponentDiffState {
    pub fn absent() -> Self {
        Self {
            namespace: None,
            version: None,
            deploy_namespace: None,
            installation_state: TargetState::Absent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDiff {
    pub name: String,
    pub actual: ComponentDiffState,
    pub expected: ComponentDiffState,
    pub needed_actions: Vec<Action>,
}

/// Shared view over dogu and component diffs
pub trait EntityDiff {
    fn name(&self) -> &str;
    fn needed_actions(&self) -> &[Action];

    /// Most significant action, `Action::None` when nothing is needed
    fn primary_action(&self) -> Action {
        self.needed_actions()
            .iter()
            .copied()
            .max()
            .unwrap_or(Action::None)
    }

    fn has_changes(&self) -> bool {
        self.needed_actions().iter().any(|a| *a != Action::None)
    }

    fn forbidden_actions(&self) -> Vec<Action> {
        self.needed_actions()
            .iter()
            .copied()
            .filter(Action::is_forbidden)
            .collect()
    }
}

impl EntityDiff for DoguDiff {
    fn name(&self) -> &str {
        &self.name
    }

    fn needed_actions(&self) -> &[Action] {
        &self.needed_actions
    }
}

impl EntityDiff for ComponentDiff {
    fn name(&self) -> &str {
        &self.name
    }

    fn needed_actions(&self) -> &[Action] {
        &self.needed_actions
    }
}

/// One side of a config entry diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "V: Serialize", deserialize = "V: Deserialize<'de>"))]
pub struct ConfigValueState<V> {
    pub value: Option<V>,
    pub exists: bool,
}

impl<V> ConfigValueState<V> {
    pub fn missing() -> Self {
        Self {
            value: None,
            exists: false,
        }
    }

    pub fn with_value(value: V) -> Self {
        Self {
            value: Some(value),
            exists: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(serialize = "V: Serialize", deserialize = "V: Deserialize<'de>")
)]
pub struct ConfigEntryDiff<V> {
    pub key: ConfigKey,
    pub actual: ConfigValueState<V>,
    pub expected: ConfigValueState<V>,
    pub needed_action: ConfigAction,
}

pub type NormalConfigEntryDiff = ConfigEntryDiff<String>;
pub type SensitiveConfigEntryDiff = ConfigEntryDiff<Sensitive<String>>;

fn any_config_change<V>(diffs: &[ConfigEntryDiff<V>]) -> bool {
    diffs.iter().any(|d| d.needed_action != ConfigAction::None)
}

/// Everything that differs between effective blueprint and ecosystem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDiff {
    #[serde(default)]
    pub dogu_diffs: BTreeMap<String, DoguDiff>,
    #[serde(default)]
    pub component_diffs: BTreeMap<String, ComponentDiff>,
    #[serde(default)]
    pub global_config_diffs: Vec<NormalConfigEntryDiff>,
    #[serde(default)]
    pub dogu_config_diffs: BTreeMap<String, Vec<NormalConfigEntryDiff>>,
    #[serde(default)]
    pub sensitive_dogu_config_diffs: BTreeMap<String, Vec<SensitiveConfigEntryDiff>>,
}

impl StateDiff {
    /// True iff any contained diff needs an action other than `None`
    pub fn has_changes(&self) -> bool {
        self.dogu_diffs.values().any(EntityDiff::has_changes)
            || self.component_diffs.values().any(EntityDiff::has_changes)
            || self.has_config_changes()
    }

    pub fn has_config_changes(&self) -> bool {
        self.has_global_config_changes()
            || self.dogu_config_diffs.values().any(|d| any_config_change(d))
            || self
                .sensitive_dogu_config_diffs
                .values()
                .any(|d| any_config_change(d))
    }

    pub fn has_global_config_changes(&self) -> bool {
        any_config_change(&self.global_config_diffs)
    }

    /// Dogus whose normal or sensitive config changes
    pub fn dogus_with_config_changes(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .dogu_config_diffs
            .iter()
            .filter(|(_, d)| any_config_change(d))
            .map(|(name, _)| name.clone())
            .chain(
                self.sensitive_dogu_config_diffs
                    .iter()
                    .filter(|(_, d)| any_config_change(d))
                    .map(|(name, _)| name.clone()),
            )
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Entity names with a forbidden action, formatted `name: action`
    pub fn forbidden_actions(&self) -> Vec<String> {
        let dogus = self.dogu_diffs.values().map(|d| d as &dyn EntityDiff);
        let components = self.component_diffs.values().map(|d| d as &dyn EntityDiff);
        dogus
            .chain(components)
            .flat_map(|d| {
                d.forbidden_actions()
                    .into_iter()
                    .map(move |a| format!("{}: {}", d.name(), a))
            })
            .collect()
    }

    /// Short description used for the StateDiffDetermined event
    pub fn summary(&self) -> String {
        let dogus = self
            .dogu_diffs
            .values()
            .filter(|d| d.has_changes())
            .count();
        let components = self
            .component_diffs
            .values()
            .filter(|d| d.has_changes())
            .count();
        let count_config = |diffs: &[NormalConfigEntryDiff]| {
            diffs
                .iter()
                .filter(|d| d.needed_action != ConfigAction::None)
                .count()
        };
        let global = count_config(&self.global_config_diffs);
        let dogu_config: usize = self
            .dogu_config_diffs
            .values()
            .map(|d| count_config(d))
            .sum();
        let sensitive: usize = self
            .sensitive_dogu_config_diffs
            .values()
            .map(|d| {
                d.iter()
                    .filter(|e| e.needed_action != ConfigAction::None)
                    .count()
            })
            .sum();
        format!(
            "state diff determined: {} dogu, {} component, {} global config, {} dogu config and {} sensitive config changes",
            dogus, components, global, dogu_config, sensitive
        )
    }
}
