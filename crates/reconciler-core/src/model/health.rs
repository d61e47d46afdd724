use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Health of a single dogu or component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

/// Snapshot of the ecosystem's health
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthResult {
    #[serde(default)]
    pub dogus: BTreeMap<String, HealthStatus>,
    #[serde(default)]
    pub components: BTreeMap<String, HealthStatus>,
}

/// Entities excluded from health evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthIgnoreList {
    pub dogus: BTreeSet<String>,
    pub components: BTreeSet<String>,
}

impl HealthResult {
    /// Names of unhealthy dogus and components, ignore lists applied
    pub fn unhealthy(&self, ignore: &HealthIgnoreList) -> (Vec<&str>, Vec<&str>) {
        let dogus = self
            .dogus
            .iter()
            .filter(|(name, status)| {
                **status != HealthStatus::Healthy && !ignore.dogus.contains(*name)
            })
            .map(|(name, _)| name.as_str())
            .collect();
        let components = self
            .components
            .iter()
            .filter(|(name, status)| {
                **status != HealthStatus::Healthy && !ignore.components.contains(*name)
            })
            .map(|(name, _)| name.as_str())
            .collect();
        (dogus, components)
    }

    pub fn all_healthy(&self, ignore: &HealthIgnoreList) -> bool {
        let (dogus, components) = self.unhealthy(ignore);
        dogus.is_empty() && components.is_empty()
    }

    /// One-line description for events and condition messages
    pub fn summary(&self, ignore: &HealthIgnoreList) -> String {
        let (dogus, components) = self.unhealthy(ignore);
        if dogus.is_empty() && components.is_empty() {
            return "ecosystem is healthy".to_string();
        }
        let mut parts = Vec::new();
        if !dogus.is_empty() {
            parts.push(format!("unhealthy dogus: {}", dogus.join(", ")));
        }
        if !components.is_empty() {
            parts.push(format!("unhealthy components: {}", components.join(", ")));
        }
        parts.join("; ")
    }
}
