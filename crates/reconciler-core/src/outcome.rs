//! Result of one reconciliation step
//!
//! Phase handlers report "advanced", "come back later" and "failed"
//! explicitly instead of encoding the latter two as errors.

use serde::{Deserialize, Serialize};

/// Why a step could not advance in this pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitReason {
    AwaitSelfUpgrade,
    StateDiffNotEmpty,
    DogusNotUpToDate,
    RestoreInProgress,
    EcosystemUnhealthy,
}

impl WaitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitReason::AwaitSelfUpgrade => "awaitSelfUpgrade",
            WaitReason::StateDiffNotEmpty => "stateDiffNotEmpty",
            WaitReason::DogusNotUpToDate => "dogusNotUpToDate",
            WaitReason::RestoreInProgress => "restoreInProgress",
            WaitReason::EcosystemUnhealthy => "ecosystemUnhealthy",
        }
    }
}

impl std::fmt::Display for WaitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single phase handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The phase moved forward; the caller should invoke again
    Advanced,
    /// Nothing to do until the ecosystem changes; retry later
    WaitingOn(WaitReason),
    /// A genuine failure was recorded on the aggregate; the next pass
    /// resolves it into a terminal phase
    Failed(String),
    /// The aggregate reached a terminal phase
    Terminal,
}

impl StepOutcome {
    /// Whether the external loop should invoke `advance` again
    pub fn should_requeue(&self) -> bool {
        !matches!(self, StepOutcome::Terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_semantics() {
        assert!(StepOutcome::Advanced.should_requeue());
        assert!(StepOutcome::WaitingOn(WaitReason::AwaitSelfUpgrade).should_requeue());
        assert!(StepOutcome::Failed("config".to_string()).should_requeue());
        assert!(!StepOutcome::Terminal.should_requeue());
    }

    #[test]
    fn test_wait_reason_display() {
        assert_eq!(
            WaitReason::StateDiffNotEmpty.to_string(),
            "stateDiffNotEmpty"
        );
    }
}
