use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the reconciliation state machine
///
/// The string identifiers are part of the external status vocabulary and
/// must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    New,
    Invalid,
    StaticallyValidated,
    EffectiveBlueprintGenerated,
    Validated,
    StateDiffDetermined,
    EcosystemHealthyUpfront,
    EcosystemUnhealthyUpfront,
    BlueprintApplicationPreProcessed,
    AwaitSelfUpgrade,
    SelfUpgradeCompleted,
    /// An apply was started and its outcome is unknown
    InProgress,
    EcosystemConfigApplied,
    ApplyEcosystemConfigFailed,
    ComponentsApplied,
    DogusApplied,
    BlueprintApplicationFailed,
    RestartsTriggered,
    EcosystemHealthyAfterwards,
    EcosystemUnhealthyAfterwards,
    Completed,
    Failed,
}

impl Phase {
    pub const ALL: [Phase; 22] = [
        Phase::New,
        Phase::Invalid,
        Phase::StaticallyValidated,
        Phase::EffectiveBlueprintGenerated,
        Phase::Validated,
        Phase::StateDiffDetermined,
        Phase::EcosystemHealthyUpfront,
        Phase::EcosystemUnhealthyUpfront,
        Phase::BlueprintApplicationPreProcessed,
        Phase::AwaitSelfUpgrade,
        Phase::SelfUpgradeCompleted,
        Phase::InProgress,
        Phase::EcosystemConfigApplied,
        Phase::ApplyEcosystemConfigFailed,
        Phase::ComponentsApplied,
        Phase::DogusApplied,
        Phase::BlueprintApplicationFailed,
        Phase::RestartsTriggered,
        Phase::EcosystemHealthyAfterwards,
        Phase::EcosystemUnhealthyAfterwards,
        Phase::Completed,
        Phase::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::New => "new",
            Phase::Invalid => "invalid",
            Phase::StaticallyValidated => "staticallyValidated",
            Phase::EffectiveBlueprintGenerated => "effectiveBlueprintGenerated",
            Phase::Validated => "validated",
            Phase::StateDiffDetermined => "stateDiffDetermined",
            Phase::EcosystemHealthyUpfront => "ecosystemHealthyUpfront",
            Phase::EcosystemUnhealthyUpfront => "ecosystemUnhealthyUpfront",
            Phase::BlueprintApplicationPreProcessed => "blueprintApplicationPreProcessed",
            Phase::AwaitSelfUpgrade => "awaitSelfUpgrade",
            Phase::SelfUpgradeCompleted => "selfUpgradeCompleted",
            Phase::InProgress => "inProgress",
            Phase::EcosystemConfigApplied => "ecosystemConfigApplied",
            Phase::ApplyEcosystemConfigFailed => "applyEcosystemConfigFailed",
            Phase::ComponentsApplied => "componentsApplied",
            Phase::DogusApplied => "dogusApplied",
            Phase::BlueprintApplicationFailed => "blueprintApplicationFailed",
            Phase::RestartsTriggered => "restartsTriggered",
            Phase::EcosystemHealthyAfterwards => "ecosystemHealthyAfterwards",
            Phase::EcosystemUnhealthyAfterwards => "ecosystemUnhealthyAfterwards",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        }
    }

    /// Terminal phases never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed | Phase::Invalid)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
