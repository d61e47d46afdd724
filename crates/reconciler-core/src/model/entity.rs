use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::version::Version;
use crate::errors::DomainError;

/// Namespace plus simple name, written `namespace/name`
///
/// For dogus the namespace is the distribution namespace (`official`,
/// `premium`, ...). Components use it the same way; their deploy
/// namespace is a separate field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    pub namespace: String,
    pub simple_name: String,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, simple_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            simple_name: simple_name.into(),
        }
    }
}

impl FromStr for QualifiedName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(ns, name))
            }
            _ => Err(DomainError::InvalidBlueprint {
                message: format!("'{}' is not a qualified name of the form namespace/name", s),
            }),
        }
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.to_string()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.simple_name)
    }
}

/// Whether an entity should exist in the ecosystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    #[default]
    Present,
    Absent,
}

impl TargetState {
    pub fn is_present(&self) -> bool {
        *self == TargetState::Present
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetState::Present => f.write_str("present"),
            TargetState::Absent => f.write_str("absent"),
        }
    }
}

/// A dogu as requested by a blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dogu {
    pub name: QualifiedName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default)]
    pub target_state: TargetState,
    /// Permits a change of the distribution namespace for this dogu
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub allow_namespace_switch: bool,
}

impl Dogu {
    pub fn present(name: QualifiedName, version: Version) -> Self {
        Self {
            name,
            version: Some(version),
            target_state: TargetState::Present,
            allow_namespace_switch: false,
        }
    }

    pub fn absent(name: QualifiedName) -> Self {
        Self {
            name,
            version: None,
            target_state: TargetState::Absent,
            allow_namespace_switch: false,
        }
    }

    pub fn simple_name(&self) -> &str {
        &self.name.simple_name
    }
}

/// A component as requested by a blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: QualifiedName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// Kubernetes namespace the component is deployed to; empty means default
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deploy_namespace: String,
    #[serde(default)]
    pub target_state: TargetState,
}

impl Component {
    pub fn present(name: QualifiedName, version: Version) -> Self {
        Self {
            name,
            version: Some(version),
            deploy_namespace: String::new(),
            target_state: TargetState::Present,
        }
    }

    pub fn absent(name: QualifiedName) -> Self {
        Self {
            name,
            version: None,
            deploy_namespace: String::new(),
            target_state: TargetState::Absent,
        }
    }

    pub fn simple_name(&self) -> &str {
        &self.name.simple_name
    }
}

/// A dogu installed in the ecosystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcosystemDogu {
    pub name: QualifiedName,
    pub version: Version,
}

impl EcosystemDogu {
    pub fn new(name: QualifiedName, version: Version) -> Self {
        Self { name, version }
    }
}

/// A component installation target and its observed state
///
/// `expected_version` is the version requested on the installation target,
/// `actual_version` what is really installed. They differ while an
/// installation or upgrade is still running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcosystemComponent {
    pub name: QualifiedName,
    #[serde(default)]
    pub deploy_namespace: String,
    #[serde(default)]
    pub expected_version: Option<Version>,
    #[serde(default)]
    pub actual_version: Option<Version>,
}

impl EcosystemComponent {
    /// A component whose requested and installed versions agree
    pub fn installed(name: QualifiedName, version: Version) -> Self {
        Self {
            name,
            deploy_namespace: String::new(),
            expected_version: Some(version.clone()),
            actual_version: Some(version),
        }
    }
}

/// What the reconciler asks the component repository to install
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstallation {
    pub name: QualifiedName,
    pub deploy_namespace: String,
    pub version: Version,
}

/// A dependency of a dogu on another dogu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub min_version: Option<Version>,
}
