//! Reconciler configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.

use reconciler_core::errors::{ErrorKind, ReconcileError, Result};
use reconciler_core::model::HealthIgnoreList;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Overrides `own_component_name` in [`ReconcilerConfig::load_with_env`]
pub const OWN_COMPONENT_ENV: &str = "RECONCILER_OWN_COMPONENT";

const DEFAULT_OWN_COMPONENT: &str = "k8s-blueprint-operator";

fn default_own_component() -> String {
    DEFAULT_OWN_COMPONENT.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Component name of the reconciler itself
    #[serde(default = "default_own_component")]
    pub own_component_name: String,

    #[serde(default)]
    pub health: HealthConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            own_component_name: default_own_component(),
            health: HealthConfig::default(),
        }
    }
}

/// Health waiting after the apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Poll interval in milliseconds
    pub wait_interval_ms: u64,

    /// Give up after this many milliseconds with the last unhealthy result
    pub wait_timeout_ms: u64,

    pub ignored_dogus: Vec<String>,
    pub ignored_components: Vec<String>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            wait_interval_ms: 10_000,
            wait_timeout_ms: 600_000,
            ignored_dogus: Vec::new(),
            ignored_components: Vec::new(),
        }
    }
}

impl HealthConfig {
    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn ignore_list(&self) -> HealthIgnoreList {
        HealthIgnoreList {
            dogus: self.ignored_dogus.iter().cloned().collect(),
            components: self.ignored_components.iter().cloned().collect(),
        }
    }
}

impl ReconcilerConfig {
    /// # Errors
    ///
    /// `InvalidInput` for malformed TOML or values rejected by
    /// [`ReconcilerConfig::validate`].
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: ReconcilerConfig = toml::from_str(input).map_err(|e| {
            ReconcileError::new(ErrorKind::InvalidInput)
                .with_op("load_config")
                .with_message(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `InvalidInput` when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReconcileError::new(ErrorKind::InvalidInput)
                .with_op("load_config")
                .with_entity(path.display().to_string())
                .with_message(e.to_string())
        })?;
        Self::from_toml_str(&content)
    }

    /// Like [`ReconcilerConfig::load`] (defaults without a path), then
    /// applies `RECONCILER_OWN_COMPONENT`
    ///
    /// # Errors
    ///
    /// `InvalidInput` as for `load`, or when the override is empty.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Ok(name) = std::env::var(OWN_COMPONENT_ENV) {
            config.own_component_name = name;
            config.validate()?;
        }
        Ok(config)
    }

    /// # Errors
    ///
    /// `InvalidInput` for an empty own component name or a zero poll
    /// interval.
    pub fn validate(&self) -> Result<()> {
        if self.own_component_name.trim().is_empty() {
            return Err(invalid("own_component_name must not be empty"));
        }
        if self.health.wait_interval_ms == 0 {
            return Err(invalid("health.wait_interval_ms must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ReconcileError {
    ReconcileError::new(ErrorKind::InvalidInput)
        .with_op("validate_config")
        .with_message(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = ReconcilerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReconcilerConfig::default());
        assert_eq!(config.own_component_name, "k8s-blueprint-operator");
        assert_eq!(config.health.wait_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_health_section_keeps_other_defaults() {
        let config = ReconcilerConfig::from_toml_str(
            r#"
            own_component_name = "blueprint-operator"

            [health]
            wait_timeout_ms = 5000
            ignored_dogus = ["nginx"]
            "#,
        )
        .unwrap();

        assert_eq!(config.own_component_name, "blueprint-operator");
        assert_eq!(config.health.wait_timeout_ms, 5000);
        assert_eq!(config.health.wait_interval_ms, 10_000);
        assert!(config.health.ignore_list().dogus.contains("nginx"));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = ReconcilerConfig::from_toml_str("[health]\nwait_interval_ms = 0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_malformed_toml_is_invalid_input() {
        let err = ReconcilerConfig::from_toml_str("own_component_name = ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reconciler.toml");
        std::fs::write(&path, "own_component_name = \"operator\"\n").unwrap();

        let config = ReconcilerConfig::load(&path).unwrap();
        assert_eq!(config.own_component_name, "operator");
    }
}
