//! The blueprint aggregate
//!
//! A `BlueprintSpec` is loaded, moved one phase forward by exactly one
//! transition method, and persisted. Transition methods mutate `phase`,
//! `conditions` and the pending event list together so a persisted spec is
//! always self-consistent. None of them perform I/O.

use serde::{Deserialize, Serialize};

use super::blueprint::{Blueprint, BlueprintMask, EffectiveBlueprint};
use super::condition::{ConditionStatus, ConditionType, Conditions};
use super::event::DomainEvent;
use super::health::{HealthIgnoreList, HealthResult};
use super::phase::Phase;
use crate::diff::{determine_state_diff, EcosystemState, StateDiff};
use crate::errors::DomainError;
use crate::rules::effective::calculate_effective_blueprint;
use crate::rules::validation::validate_blueprint;

const REASON_VALID: &str = "Valid";
const REASON_INVALID: &str = "Invalid";
const REASON_HEALTHY: &str = "Healthy";
const REASON_UNHEALTHY: &str = "Unhealthy";
const REASON_FORBIDDEN: &str = "ForbiddenAction";
const REASON_AWAITING: &str = "AwaitSelfUpgrade";
const REASON_APPLIED: &str = "Applied";
const REASON_APPLY_FAILED: &str = "ApplyFailed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintSpec {
    pub id: String,
    pub blueprint: Blueprint,
    #[serde(default)]
    pub mask: BlueprintMask,
    #[serde(default)]
    pub effective_blueprint: EffectiveBlueprint,
    #[serde(default)]
    pub state_diff: StateDiff,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub conditions: Conditions,
    /// Optimistic concurrency token, bumped by the repository on update
    #[serde(default)]
    pub resource_version: u64,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl BlueprintSpec {
    pub fn new(id: impl Into<String>, blueprint: Blueprint, mask: BlueprintMask) -> Self {
        Self {
            id: id.into(),
            blueprint,
            mask,
            effective_blueprint: EffectiveBlueprint::default(),
            state_diff: StateDiff::default(),
            phase: Phase::New,
            conditions: Conditions::default(),
            resource_version: 0,
            events: Vec::new(),
        }
    }

    /// Events recorded since the spec was loaded
    pub fn events(&self) -> &[DomainEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn record(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    fn set_condition(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) -> bool {
        self.conditions.set(condition_type, status, reason, message)
    }

    /// `New -> StaticallyValidated | Invalid`
    ///
    /// # Errors
    ///
    /// Returns `InvalidBlueprint` after moving to `Invalid`.
    pub fn validate_statically(&mut self) -> Result<(), DomainError> {
        match validate_blueprint(&self.blueprint, &self.mask) {
            Ok(()) => {
                self.phase = Phase::StaticallyValidated;
                self.record(DomainEvent::StaticallyValidated);
                Ok(())
            }
            Err(err) => {
                self.mark_invalid(err.to_string());
                Err(err)
            }
        }
    }

    /// `StaticallyValidated -> EffectiveBlueprintGenerated | Invalid`
    ///
    /// # Errors
    ///
    /// Returns `InvalidBlueprint` if the mask cannot be applied.
    pub fn calculate_effective_blueprint(&mut self) -> Result<(), DomainError> {
        match calculate_effective_blueprint(&self.blueprint, &self.mask) {
            Ok(effective) => {
                self.effective_blueprint = effective;
                self.phase = Phase::EffectiveBlueprintGenerated;
                self.record(DomainEvent::EffectiveBlueprintCalculated);
                Ok(())
            }
            Err(err) => {
                self.mark_invalid(err.to_string());
                Err(err)
            }
        }
    }

    /// `EffectiveBlueprintGenerated -> Validated | Invalid`
    ///
    /// `problems` are the unsatisfied dependencies found by the caller.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBlueprint` listing every problem.
    pub fn mark_dependencies_validated(&mut self, problems: Vec<String>) -> Result<(), DomainError> {
        if problems.is_empty() {
            self.phase = Phase::Validated;
            self.set_condition(
                ConditionType::Valid,
                ConditionStatus::True,
                REASON_VALID,
                "blueprint is valid",
            );
            self.record(DomainEvent::DependenciesValidated);
            return Ok(());
        }
        let err = DomainError::InvalidBlueprint {
            message: format!("unsatisfied dogu dependencies: {}", problems.join("; ")),
        };
        self.mark_invalid(err.to_string());
        Err(err)
    }

    /// Terminal `Invalid`; the blueprint itself cannot be satisfied
    pub fn mark_invalid(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.phase = Phase::Invalid;
        self.set_condition(
            ConditionType::Valid,
            ConditionStatus::False,
            REASON_INVALID,
            message.clone(),
        );
        self.record(DomainEvent::BlueprintInvalid { message });
    }

    /// `Validated -> StateDiffDetermined`
    ///
    /// Replaces the diff wholesale. `Executable` turns `False` when the diff
    /// holds a forbidden action.
    pub fn determine_state_diff(&mut self, actual: &EcosystemState) {
        self.state_diff = determine_state_diff(&self.effective_blueprint, actual);

        let forbidden = self.state_diff.forbidden_actions();
        if forbidden.is_empty() {
            self.set_condition(
                ConditionType::Executable,
                ConditionStatus::True,
                "Executable",
                "",
            );
        } else {
            self.set_condition(
                ConditionType::Executable,
                ConditionStatus::False,
                REASON_FORBIDDEN,
                format!("forbidden actions: {}", forbidden.join(", ")),
            );
        }

        self.phase = Phase::StateDiffDetermined;
        let summary = self.state_diff.summary();
        self.record(DomainEvent::StateDiffDetermined { summary });
    }

    /// `StateDiffDetermined | EcosystemUnhealthyUpfront -> EcosystemHealthyUpfront | EcosystemUnhealthyUpfront`
    ///
    /// Staying unhealthy records nothing new. Returns whether the ecosystem
    /// is healthy.
    pub fn check_ecosystem_health_upfront(
        &mut self,
        health: &HealthResult,
        ignore: &HealthIgnoreList,
    ) -> bool {
        self.apply_health(
            health,
            ignore,
            Phase::EcosystemHealthyUpfront,
            Phase::EcosystemUnhealthyUpfront,
        )
    }

    /// `RestartsTriggered | EcosystemUnhealthyAfterwards -> EcosystemHealthyAfterwards | EcosystemUnhealthyAfterwards`
    pub fn check_ecosystem_health_afterwards(
        &mut self,
        health: &HealthResult,
        ignore: &HealthIgnoreList,
    ) -> bool {
        self.apply_health(
            health,
            ignore,
            Phase::EcosystemHealthyAfterwards,
            Phase::EcosystemUnhealthyAfterwards,
        )
    }

    fn apply_health(
        &mut self,
        health: &HealthResult,
        ignore: &HealthIgnoreList,
        healthy_phase: Phase,
        unhealthy_phase: Phase,
    ) -> bool {
        let summary = health.summary(ignore);
        if health.all_healthy(ignore) {
            self.set_condition(
                ConditionType::EcosystemHealthy,
                ConditionStatus::True,
                REASON_HEALTHY,
                summary,
            );
            self.phase = healthy_phase;
            let event = if healthy_phase == Phase::EcosystemHealthyUpfront {
                DomainEvent::EcosystemHealthyUpfront
            } else {
                DomainEvent::EcosystemHealthyAfterwards
            };
            self.record(event);
            return true;
        }

        self.set_condition(
            ConditionType::EcosystemHealthy,
            ConditionStatus::False,
            REASON_UNHEALTHY,
            summary.clone(),
        );
        if self.phase != unhealthy_phase {
            self.phase = unhealthy_phase;
            let event = if unhealthy_phase == Phase::EcosystemUnhealthyUpfront {
                DomainEvent::EcosystemUnhealthyUpfront { summary }
            } else {
                DomainEvent::EcosystemUnhealthyAfterwards { summary }
            };
            self.record(event);
        }
        false
    }

    /// `EcosystemHealthyUpfront -> BlueprintApplicationPreProcessed`
    pub fn mark_pre_processed(&mut self) {
        self.phase = Phase::BlueprintApplicationPreProcessed;
        self.record(DomainEvent::BlueprintApplicationPreProcessed);
    }

    /// `BlueprintApplicationPreProcessed | AwaitSelfUpgrade -> AwaitSelfUpgrade`
    ///
    /// Only the first entry records an event.
    pub fn mark_await_self_upgrade(&mut self, component: &str, version: &str) {
        self.set_condition(
            ConditionType::SelfUpgradeCompleted,
            ConditionStatus::False,
            REASON_AWAITING,
            format!("waiting for {} to reach {}", component, version),
        );
        if self.phase != Phase::AwaitSelfUpgrade {
            self.phase = Phase::AwaitSelfUpgrade;
            self.record(DomainEvent::AwaitSelfUpgrade {
                component: component.to_string(),
                version: version.to_string(),
            });
        }
    }

    /// `BlueprintApplicationPreProcessed | AwaitSelfUpgrade -> SelfUpgradeCompleted`
    pub fn mark_self_upgrade_completed(&mut self) {
        self.set_condition(
            ConditionType::SelfUpgradeCompleted,
            ConditionStatus::True,
            "SelfUpgradeCompleted",
            "",
        );
        self.phase = Phase::SelfUpgradeCompleted;
        self.record(DomainEvent::SelfUpgradeCompleted);
    }

    /// Marks an apply whose outcome is unknown until it returns
    pub fn start_application(&mut self) {
        self.phase = Phase::InProgress;
        self.record(DomainEvent::ApplicationStarted);
    }

    /// `InProgress -> resume`, for an apply stopped by a storage error
    ///
    /// The next pass runs the same apply again instead of treating it as
    /// interrupted.
    pub fn withdraw_application(&mut self, resume: Phase) {
        if self.phase == Phase::InProgress {
            self.phase = resume;
        }
    }

    /// `InProgress -> EcosystemConfigApplied`
    pub fn mark_config_applied(&mut self) {
        self.set_condition(
            ConditionType::ConfigApplied,
            ConditionStatus::True,
            REASON_APPLIED,
            "",
        );
        self.phase = Phase::EcosystemConfigApplied;
        self.record(DomainEvent::EcosystemConfigApplied);
    }

    /// `InProgress -> ApplyEcosystemConfigFailed`
    pub fn mark_apply_config_failed(&mut self, domain: &str, message: impl Into<String>) {
        let message = message.into();
        self.set_condition(
            ConditionType::ConfigApplied,
            ConditionStatus::False,
            REASON_APPLY_FAILED,
            format!("{}: {}", domain, message),
        );
        self.phase = Phase::ApplyEcosystemConfigFailed;
        self.record(DomainEvent::ApplyEcosystemConfigFailed {
            domain: domain.to_string(),
            message,
        });
    }

    /// `InProgress -> ComponentsApplied`
    pub fn mark_components_applied(&mut self, components: Vec<String>) {
        self.phase = Phase::ComponentsApplied;
        self.record(DomainEvent::ComponentsApplied { components });
    }

    /// `InProgress -> DogusApplied`
    pub fn mark_dogus_applied(&mut self, dogus: Vec<String>) {
        self.phase = Phase::DogusApplied;
        self.record(DomainEvent::DogusApplied { dogus });
    }

    /// `InProgress -> BlueprintApplicationFailed`
    pub fn mark_application_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.set_condition(
            ConditionType::Completed,
            ConditionStatus::False,
            REASON_APPLY_FAILED,
            message.clone(),
        );
        self.phase = Phase::BlueprintApplicationFailed;
        self.record(DomainEvent::BlueprintApplicationFailed { message });
    }

    /// `BlueprintApplicationFailed | ApplyEcosystemConfigFailed -> Failed`
    ///
    /// The failure message is taken from the condition the failed step set.
    pub fn resolve_failure(&mut self) {
        let source = match self.phase {
            Phase::ApplyEcosystemConfigFailed => ConditionType::ConfigApplied,
            _ => ConditionType::Completed,
        };
        let message = self.conditions.get(source).message.clone();
        self.mark_failed(message);
    }

    /// Replace the diff without moving the phase, for the completion gate
    pub fn refresh_state_diff(&mut self, actual: &EcosystemState) {
        self.state_diff = determine_state_diff(&self.effective_blueprint, actual);
    }

    /// Whether anything persisted differs from `other`
    ///
    /// Pending events and `resource_version` are not part of the comparison.
    pub fn differs_from(&self, other: &BlueprintSpec) -> bool {
        self.id != other.id
            || self.phase != other.phase
            || self.conditions != other.conditions
            || self.state_diff != other.state_diff
            || self.effective_blueprint != other.effective_blueprint
            || self.blueprint != other.blueprint
            || self.mask != other.mask
    }

    /// Records the pending sensitive config moved into dogu config
    pub fn mark_sensitive_config_flushed(&mut self, dogus: Vec<String>) {
        if !dogus.is_empty() {
            self.record(DomainEvent::SensitiveConfigFlushed { dogus });
        }
    }

    /// `DogusApplied -> RestartsTriggered`
    pub fn mark_restarts_triggered(&mut self, dogus: Vec<String>) {
        self.phase = Phase::RestartsTriggered;
        self.record(DomainEvent::RestartsTriggered { dogus });
    }

    /// `EcosystemHealthyAfterwards -> Completed`
    ///
    /// # Errors
    ///
    /// Returns `StateDiffNotEmpty` with the phase left unchanged while the
    /// current diff still has changes.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        if self.state_diff.has_changes() {
            return Err(DomainError::StateDiffNotEmpty);
        }
        self.set_condition(
            ConditionType::Completed,
            ConditionStatus::True,
            "Completed",
            "",
        );
        self.phase = Phase::Completed;
        self.record(DomainEvent::Completed);
        Ok(())
    }

    /// Terminal `Failed`
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.set_condition(
            ConditionType::Completed,
            ConditionStatus::False,
            "Failed",
            message.clone(),
        );
        self.phase = Phase::Failed;
        self.record(DomainEvent::Failed { message });
    }
}
