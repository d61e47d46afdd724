use serde::{Deserialize, Serialize};

/// Domain events recorded on meaningful transitions
///
/// They are not persisted with the aggregate; the caller of `advance`
/// hands them to a notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    StaticallyValidated,
    BlueprintInvalid { message: String },
    EffectiveBlueprintCalculated,
    DependenciesValidated,
    StateDiffDetermined { summary: String },
    EcosystemHealthyUpfront,
    EcosystemUnhealthyUpfront { summary: String },
    BlueprintApplicationPreProcessed,
    AwaitSelfUpgrade { component: String, version: String },
    SelfUpgradeCompleted,
    EcosystemConfigApplied,
    ApplyEcosystemConfigFailed { domain: String, message: String },
    ApplicationStarted,
    ComponentsApplied { components: Vec<String> },
    DogusApplied { dogus: Vec<String> },
    BlueprintApplicationFailed { message: String },
    SensitiveConfigFlushed { dogus: Vec<String> },
    RestartsTriggered { dogus: Vec<String> },
    EcosystemHealthyAfterwards,
    EcosystemUnhealthyAfterwards { summary: String },
    Completed,
    Failed { message: String },
}

impl DomainEvent {
    /// Stable event name for notifiers
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::StaticallyValidated => "StaticallyValidated",
            DomainEvent::BlueprintInvalid { .. } => "BlueprintInvalid",
            DomainEvent::EffectiveBlueprintCalculated => "EffectiveBlueprintCalculated",
            DomainEvent::DependenciesValidated => "DependenciesValidated",
            DomainEvent::StateDiffDetermined { .. } => "StateDiffDetermined",
            DomainEvent::EcosystemHealthyUpfront => "EcosystemHealthyUpfront",
            DomainEvent::EcosystemUnhealthyUpfront { .. } => "EcosystemUnhealthyUpfront",
            DomainEvent::BlueprintApplicationPreProcessed => "BlueprintApplicationPreProcessed",
            DomainEvent::AwaitSelfUpgrade { .. } => "AwaitSelfUpgrade",
            DomainEvent::SelfUpgradeCompleted => "SelfUpgradeCompleted",
            DomainEvent::EcosystemConfigApplied => "EcosystemConfigApplied",
            DomainEvent::ApplyEcosystemConfigFailed { .. } => "ApplyEcosystemConfigFailed",
            DomainEvent::ApplicationStarted => "ApplicationStarted",
            DomainEvent::ComponentsApplied { .. } => "ComponentsApplied",
            DomainEvent::DogusApplied { .. } => "DogusApplied",
            DomainEvent::BlueprintApplicationFailed { .. } => "BlueprintApplicationFailed",
            DomainEvent::SensitiveConfigFlushed { .. } => "SensitiveConfigFlushed",
            DomainEvent::RestartsTriggered { .. } => "RestartsTriggered",
            DomainEvent::EcosystemHealthyAfterwards => "EcosystemHealthyAfterwards",
            DomainEvent::EcosystemUnhealthyAfterwards { .. } => "EcosystemUnhealthyAfterwards",
            DomainEvent::Completed => "Completed",
            DomainEvent::Failed { .. } => "Failed",
        }
    }

    /// Human-readable message
    pub fn message(&self) -> String {
        match self {
            DomainEvent::StaticallyValidated => "blueprint was statically validated".to_string(),
            DomainEvent::BlueprintInvalid { message } => message.clone(),
            DomainEvent::EffectiveBlueprintCalculated => {
                "effective blueprint was calculated".to_string()
            }
            DomainEvent::DependenciesValidated => "dogu dependencies are satisfied".to_string(),
            DomainEvent::StateDiffDetermined { summary } => summary.clone(),
            DomainEvent::EcosystemHealthyUpfront => {
                "ecosystem is healthy before application".to_string()
            }
            DomainEvent::EcosystemUnhealthyUpfront { summary } => summary.clone(),
            DomainEvent::BlueprintApplicationPreProcessed => {
                "blueprint application was pre-processed".to_string()
            }
            DomainEvent::AwaitSelfUpgrade { component, version } => {
                format!("waiting for {} to upgrade itself to {}", component, version)
            }
            DomainEvent::SelfUpgradeCompleted => "self upgrade is completed".to_string(),
            DomainEvent::EcosystemConfigApplied => "ecosystem config was applied".to_string(),
            DomainEvent::ApplyEcosystemConfigFailed { domain, message } => {
                format!("could not apply {} config: {}", domain, message)
            }
            DomainEvent::ApplicationStarted => "blueprint application started".to_string(),
            DomainEvent::ComponentsApplied { components } => {
                format!("components applied: {}", components.join(", "))
            }
            DomainEvent::DogusApplied { dogus } => format!("dogus applied: {}", dogus.join(", ")),
            DomainEvent::BlueprintApplicationFailed { message } => message.clone(),
            DomainEvent::SensitiveConfigFlushed { dogus } => {
                format!("pending sensitive config written for: {}", dogus.join(", "))
            }
            DomainEvent::RestartsTriggered { dogus } => {
                format!("restarts triggered for: {}", dogus.join(", "))
            }
            DomainEvent::EcosystemHealthyAfterwards => {
                "ecosystem is healthy after application".to_string()
            }
            DomainEvent::EcosystemUnhealthyAfterwards { summary } => summary.clone(),
            DomainEvent::Completed => "blueprint was applied completely".to_string(),
            DomainEvent::Failed { message } => message.clone(),
        }
    }
}
