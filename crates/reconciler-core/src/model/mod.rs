pub mod blueprint;
pub mod condition;
pub mod config;
pub mod entity;
pub mod event;
pub mod health;
pub mod phase;
pub mod spec;
pub mod version;

pub use blueprint::{Blueprint, BlueprintMask, EffectiveBlueprint, MaskDogu};
pub use condition::{Condition, ConditionStatus, ConditionType, Conditions};
pub use config::{Config, ConfigEntries, ConfigKey, ConfigSnapshot, DoguConfig};
pub use entity::{
    Component, ComponentInstallation, Dependency, Dogu, EcosystemComponent, EcosystemDogu,
    QualifiedName, TargetState,
};
pub use event::DomainEvent;
pub use health::{HealthIgnoreList, HealthResult, HealthStatus};
pub use phase::Phase;
pub use spec::BlueprintSpec;
pub use version::Version;
