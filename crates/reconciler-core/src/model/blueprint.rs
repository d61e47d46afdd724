use serde::{Deserialize, Serialize};

use super::config::Config;
use super::entity::{Component, Dogu, QualifiedName, TargetState};
use super::version::Version;

/// The desired-state document as submitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    #[serde(default)]
    pub dogus: Vec<Dogu>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub config: Config,
}

/// A per-dogu override applied on top of a blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskDogu {
    pub name: QualifiedName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default)]
    pub target_state: TargetState,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_namespace_switch: bool,
}

/// Overrides for an otherwise shared blueprint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintMask {
    #[serde(default)]
    pub dogus: Vec<MaskDogu>,
    /// Permits mask dogus that the blueprint does not contain
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_additions: bool,
}

impl BlueprintMask {
    pub fn is_empty(&self) -> bool {
        self.dogus.is_empty()
    }
}

/// Blueprint and mask merged; the input of the diff engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveBlueprint {
    #[serde(default)]
    pub dogus: Vec<Dogu>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub config: Config,
}

impl EffectiveBlueprint {
    pub fn dogu(&self, simple_name: &str) -> Option<&Dogu> {
        self.dogus.iter().find(|d| d.simple_name() == simple_name)
    }

    pub fn component(&self, simple_name: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|c| c.simple_name() == simple_name)
    }

    pub fn present_dogus(&self) -> impl Iterator<Item = &Dogu> {
        self.dogus.iter().filter(|d| d.target_state.is_present())
    }
}
