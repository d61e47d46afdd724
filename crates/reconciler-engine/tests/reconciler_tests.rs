// Integration tests for the reconciliation state machine
// Each test drives a seeded blueprint through `advance` against the
// in-memory ecosystem and checks the stored aggregate and the port calls.

mod common;

use common::*;
use reconciler_core::errors::{ErrorKind, ReconcileError};
use reconciler_core::model::{
    Blueprint, BlueprintMask, ConditionStatus, ConditionType, ConfigEntries, ConfigKey,
    Dependency, DoguConfig, DomainEvent, HealthResult, Phase,
};
use reconciler_core::outcome::{StepOutcome, WaitReason};
use reconciler_core_types::Sensitive;

fn ldap_blueprint() -> Blueprint {
    let mut blueprint = Blueprint {
        dogus: vec![dogu("official/ldap", "2.6.2-1")],
        components: vec![component("k8s/k8s-dogu-operator", "3.0.1")],
        ..Blueprint::default()
    };
    blueprint.config.global = ConfigEntries::default().with_present("fqdn", "ces.local".to_string());
    blueprint.config.dogus.insert(
        "ldap".to_string(),
        DoguConfig {
            normal: ConfigEntries::default().with_present("logging/root", "INFO".to_string()),
            sensitive: ConfigEntries::default()
                .with_present("admin_password", Sensitive::new("s3cret".to_string())),
        },
    );
    blueprint
}

fn event_names(events: &[DomainEvent]) -> Vec<&'static str> {
    events.iter().map(DomainEvent::name).collect()
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_fresh_ecosystem_reaches_completed() {
    // Given an empty ecosystem and a blueprint with a dogu, a component and config
    let h = Harness::new();
    h.seed("bp-happy", ldap_blueprint());

    // When the reconciler runs until it settles
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-happy"), "bp-happy", 30)
        .await
        .unwrap();

    // Then the blueprint is completed and the ecosystem matches it
    assert_eq!(report.outcome, StepOutcome::Terminal);
    assert_eq!(report.phase, Phase::Completed);
    assert_eq!(h.stored("bp-happy").phase, Phase::Completed);
    assert_eq!(h.dogus.calls(), vec!["create official/ldap@2.6.2-1"]);
    assert_eq!(h.components.calls().len(), 1);

    let fqdn = ConfigKey::new("fqdn");
    assert_eq!(h.global_config.current().get(&fqdn).map(String::as_str), Some("ces.local"));
    let ldap_config = h.dogu_config.current("ldap").unwrap();
    assert_eq!(
        ldap_config.get(&ConfigKey::new("logging/root")).map(String::as_str),
        Some("INFO")
    );
    let ldap_secrets = h.sensitive_config.current("ldap").unwrap();
    assert_eq!(
        ldap_secrets.get(&ConfigKey::new("admin_password")).map(String::as_str),
        Some("s3cret")
    );
    assert!(h.pending_sensitive.pending_for("ldap").is_empty());
    assert!(h.restarts.batches().is_empty(), "fresh installs are not restarted");
}

#[tokio::test]
async fn test_events_follow_the_phase_order() {
    // Given
    let h = Harness::new();
    h.seed("bp-events", ldap_blueprint());

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-events"), "bp-events", 30)
        .await
        .unwrap();

    // Then
    let names = event_names(&report.events);
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert!(position("StaticallyValidated") < position("StateDiffDetermined"));
    assert!(position("StateDiffDetermined") < position("EcosystemConfigApplied"));
    assert!(position("SensitiveConfigFlushed") < position("RestartsTriggered"));
    assert_eq!(names.last(), Some(&"Completed"));
    assert_eq!(names.iter().filter(|n| **n == "ApplicationStarted").count(), 3);
}

#[tokio::test]
async fn test_global_config_change_restarts_installed_dogus() {
    // Given ldap is installed at the requested version
    let h = Harness::new();
    h.dogus.install(installed_dogu("official/ldap", "2.6.2-1"));
    let blueprint = Blueprint {
        dogus: vec![dogu("official/ldap", "2.6.2-1"), dogu("official/cas", "7.0.5-1")],
        config: reconciler_core::model::Config {
            global: ConfigEntries::default().with_present("fqdn", "ces.local".to_string()),
            ..Default::default()
        },
        ..Blueprint::default()
    };
    h.seed("bp-restart", blueprint);

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-restart"), "bp-restart", 30)
        .await
        .unwrap();

    // Then only the dogu that was not freshly installed is restarted
    assert_eq!(report.phase, Phase::Completed);
    assert_eq!(h.restarts.batches(), vec![vec!["ldap".to_string()]]);
}

#[tokio::test]
async fn test_terminal_phase_is_not_persisted_again() {
    // Given a completed blueprint
    let h = Harness::new();
    h.seed("bp-done", Blueprint::default());
    h.reconciler
        .run_until_settled(&ctx("bp-done"), "bp-done", 30)
        .await
        .unwrap();
    let updates = h.specs.update_count();

    // When it is advanced again
    let report = h.reconciler.advance(&ctx("bp-done"), "bp-done").await.unwrap();

    // Then nothing changes
    assert_eq!(report.outcome, StepOutcome::Terminal);
    assert!(report.events.is_empty());
    assert_eq!(h.specs.update_count(), updates);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_dogu_without_version_is_invalid() {
    // Given
    let h = Harness::new();
    let mut broken = dogu("official/ldap", "2.6.2-1");
    broken.version = None;
    h.seed(
        "bp-invalid",
        Blueprint {
            dogus: vec![broken],
            ..Blueprint::default()
        },
    );

    // When
    let report = h
        .reconciler
        .advance(&ctx("bp-invalid"), "bp-invalid")
        .await
        .unwrap();

    // Then
    assert_eq!(report.outcome, StepOutcome::Terminal);
    assert_eq!(report.phase, Phase::Invalid);
    let stored = h.stored("bp-invalid");
    assert_eq!(
        stored.conditions.get(ConditionType::Valid).status,
        ConditionStatus::False
    );
}

#[tokio::test]
async fn test_missing_dependency_is_invalid() {
    // Given redmine needs postgresql, which the blueprint does not contain
    let h = Harness::new();
    h.registry.add(
        "redmine",
        vec![Dependency {
            name: "postgresql".to_string(),
            min_version: None,
        }],
    );
    h.seed(
        "bp-deps",
        Blueprint {
            dogus: vec![dogu("official/redmine", "5.1.0-1")],
            ..Blueprint::default()
        },
    );

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-deps"), "bp-deps", 10)
        .await
        .unwrap();

    // Then
    assert_eq!(report.phase, Phase::Invalid);
    assert!(h.dogus.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Gates and waits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_unhealthy_ecosystem_blocks_before_apply() {
    // Given
    let h = Harness::new();
    h.health.push(unhealthy_dogu("postfix"));
    h.seed("bp-sick", ldap_blueprint());

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-sick"), "bp-sick", 30)
        .await
        .unwrap();

    // Then nothing was applied
    assert_eq!(report.outcome, StepOutcome::WaitingOn(WaitReason::EcosystemUnhealthy));
    assert_eq!(report.phase, Phase::EcosystemUnhealthyUpfront);
    assert!(h.dogus.calls().is_empty());

    // And a later healthy check resumes the application
    h.health.push(HealthResult::default());
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-sick"), "bp-sick", 30)
        .await
        .unwrap();
    assert_eq!(report.phase, Phase::Completed);
}

#[tokio::test]
async fn test_restore_in_progress_blocks_application() {
    // Given
    let h = Harness::new();
    h.restore.set(true);
    h.seed("bp-restore", ldap_blueprint());

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-restore"), "bp-restore", 30)
        .await
        .unwrap();

    // Then
    assert_eq!(report.outcome, StepOutcome::WaitingOn(WaitReason::RestoreInProgress));
    assert_eq!(report.phase, Phase::EcosystemHealthyUpfront);
    assert!(h.components.calls().is_empty());
}

#[tokio::test]
async fn test_health_timeout_after_apply_waits_and_recovers() {
    // Given a healthy ecosystem that turns unhealthy after the upfront check
    let h = Harness::new();
    h.health.push(HealthResult::default());
    h.health.push(unhealthy_dogu("ldap"));
    h.seed("bp-timeout", ldap_blueprint());

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-timeout"), "bp-timeout", 30)
        .await
        .unwrap();

    // Then the wait gives up with the last unhealthy result
    assert_eq!(report.outcome, StepOutcome::WaitingOn(WaitReason::EcosystemUnhealthy));
    assert_eq!(report.phase, Phase::EcosystemUnhealthyAfterwards);
    assert!(h.health.check_count() > 2);

    // When the ecosystem recovers
    h.health.push(HealthResult::default());
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-timeout"), "bp-timeout", 30)
        .await
        .unwrap();

    // Then
    assert_eq!(report.phase, Phase::Completed);
}

#[tokio::test]
async fn test_completion_waits_for_pending_component_installation() {
    // Given component installations that do not finish by themselves
    let h = Harness::with_pending_components();
    h.seed(
        "bp-gate",
        Blueprint {
            components: vec![component("k8s/k8s-dogu-operator", "3.0.1")],
            ..Blueprint::default()
        },
    );

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-gate"), "bp-gate", 30)
        .await
        .unwrap();

    // Then the completion gate holds
    assert_eq!(report.outcome, StepOutcome::WaitingOn(WaitReason::StateDiffNotEmpty));
    assert_eq!(report.phase, Phase::EcosystemHealthyAfterwards);
    assert!(h.stored("bp-gate").state_diff.has_changes());

    // When the installation finishes
    h.components.finish_installations();
    let report = h.reconciler.advance(&ctx("bp-gate"), "bp-gate").await.unwrap();

    // Then
    assert_eq!(report.outcome, StepOutcome::Terminal);
    assert_eq!(report.phase, Phase::Completed);
    assert_eq!(h.components.calls().len(), 1);
}

// ---------------------------------------------------------------------------
// Self upgrade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_self_upgrade_is_requested_once() {
    // Given the reconciler's own component at 1.0.0 and a blueprint asking for 1.1.0
    let h = Harness::with_pending_components();
    h.components
        .install(installed_component("k8s/k8s-blueprint-operator", "1.0.0"));
    h.seed(
        "bp-self",
        Blueprint {
            components: vec![component("k8s/k8s-blueprint-operator", "1.1.0")],
            ..Blueprint::default()
        },
    );

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-self"), "bp-self", 30)
        .await
        .unwrap();

    // Then the upgrade is requested and the reconciler waits for its successor
    assert_eq!(report.outcome, StepOutcome::WaitingOn(WaitReason::AwaitSelfUpgrade));
    assert_eq!(report.phase, Phase::AwaitSelfUpgrade);
    assert_eq!(h.components.calls().len(), 1);

    // When the old process runs again before the upgrade finished
    let report = h.reconciler.advance(&ctx("bp-self"), "bp-self").await.unwrap();

    // Then no second request is made
    assert_eq!(report.outcome, StepOutcome::WaitingOn(WaitReason::AwaitSelfUpgrade));
    assert_eq!(h.components.calls().len(), 1);

    // When the new version is running
    h.components.finish_installations();
    let report = h.reconciler.advance(&ctx("bp-self"), "bp-self").await.unwrap();

    // Then the application continues
    assert_eq!(report.outcome, StepOutcome::Advanced);
    assert_eq!(report.phase, Phase::SelfUpgradeCompleted);
    assert!(h
        .stored("bp-self")
        .conditions
        .is_true(ConditionType::SelfUpgradeCompleted));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_dogu_downgrade_fails_without_writes() {
    // Given ldap is installed in a newer version than requested
    let h = Harness::new();
    h.dogus.install(installed_dogu("official/ldap", "2.6.2-1"));
    h.seed(
        "bp-down",
        Blueprint {
            dogus: vec![dogu("official/ldap", "2.6.1-1")],
            ..Blueprint::default()
        },
    );

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-down"), "bp-down", 30)
        .await
        .unwrap();

    // Then
    let StepOutcome::Failed(message) = &report.outcome else {
        panic!("expected a failure, got {:?}", report.outcome);
    };
    assert!(message.contains("ldap"), "{}", message);
    assert_eq!(report.phase, Phase::BlueprintApplicationFailed);
    assert!(h.dogus.calls().is_empty());

    // When the failure is resolved
    let report = h.reconciler.advance(&ctx("bp-down"), "bp-down").await.unwrap();

    // Then
    assert_eq!(report.outcome, StepOutcome::Terminal);
    assert_eq!(report.phase, Phase::Failed);
}

#[tokio::test]
async fn test_dogu_config_failure_keeps_other_domains_applied() {
    // Given writes of ldap's config fail
    let h = Harness::new();
    h.dogu_config.fail_on("ldap");
    h.seed("bp-cfg", ldap_blueprint());

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-cfg"), "bp-cfg", 30)
        .await
        .unwrap();

    // Then the config step failed but global config was still written
    assert!(matches!(report.outcome, StepOutcome::Failed(_)));
    assert_eq!(report.phase, Phase::ApplyEcosystemConfigFailed);
    assert_eq!(h.global_config.update_count(), 1);
    assert!(h.dogus.calls().is_empty());
    let condition = h
        .stored("bp-cfg")
        .conditions
        .get(ConditionType::ConfigApplied)
        .clone();
    assert_eq!(condition.status, ConditionStatus::False);
    assert!(condition.message.starts_with("dogu"), "{}", condition.message);

    // When
    let report = h.reconciler.advance(&ctx("bp-cfg"), "bp-cfg").await.unwrap();

    // Then
    assert_eq!(report.phase, Phase::Failed);
    let completed = h.stored("bp-cfg").conditions.get(ConditionType::Completed).clone();
    assert_eq!(completed.status, ConditionStatus::False);
    assert_eq!(completed.message, condition.message);
}

#[tokio::test]
async fn test_component_write_failure_fails_the_application() {
    // Given
    let h = Harness::new();
    h.components.fail_on("k8s-dogu-operator");
    h.seed("bp-comp", ldap_blueprint());

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-comp"), "bp-comp", 30)
        .await
        .unwrap();

    // Then dogus are never applied after the component failure
    assert!(matches!(report.outcome, StepOutcome::Failed(_)));
    assert_eq!(report.phase, Phase::BlueprintApplicationFailed);
    assert!(h.dogus.calls().is_empty());
}

#[tokio::test]
async fn test_interrupted_application_is_failed_on_resume() {
    // Given a spec stored while an apply was running
    let h = Harness::new();
    h.seed("bp-crash", ldap_blueprint());
    for _ in 0..7 {
        h.reconciler.advance(&ctx("bp-crash"), "bp-crash").await.unwrap();
    }
    assert_eq!(h.stored("bp-crash").phase, Phase::SelfUpgradeCompleted);
    let mut crashed = h.stored("bp-crash");
    crashed.phase = Phase::InProgress;
    h.specs.insert(crashed);

    // When
    let report = h.reconciler.advance(&ctx("bp-crash"), "bp-crash").await.unwrap();

    // Then
    assert_eq!(
        report.outcome,
        StepOutcome::Failed("application was interrupted".to_string())
    );
    assert_eq!(h.stored("bp-crash").phase, Phase::BlueprintApplicationFailed);
}

#[tokio::test]
async fn test_config_keys_are_applied_around_a_failing_key() {
    // Given ldap already holds a scalar at `a`, and the blueprint sets a key
    // beneath it between two unrelated keys
    let h = Harness::new();
    h.dogu_config.set("ldap", "a", "x");
    let mut blueprint = Blueprint {
        dogus: vec![dogu("official/ldap", "2.6.2-1")],
        ..Blueprint::default()
    };
    blueprint.config.dogus.insert(
        "ldap".to_string(),
        DoguConfig {
            normal: ConfigEntries::default()
                .with_present("k1", "1".to_string())
                .with_present("a/b", "2".to_string())
                .with_present("k3", "3".to_string()),
            ..DoguConfig::default()
        },
    );
    h.seed("bp-keys", blueprint);

    // When
    let report = h
        .reconciler
        .run_until_settled(&ctx("bp-keys"), "bp-keys", 30)
        .await
        .unwrap();

    // Then the first and third key are written and only the second is reported
    let StepOutcome::Failed(message) = &report.outcome else {
        panic!("expected a failure, got {:?}", report.outcome);
    };
    assert_eq!(report.phase, Phase::ApplyEcosystemConfigFailed);
    assert!(message.contains("a/b"), "{}", message);
    assert!(message.contains("ERR_CONFIG_KEY_COLLISION"), "{}", message);
    assert!(!message.contains("k1") && !message.contains("k3"), "{}", message);

    let ldap = h.dogu_config.current("ldap").unwrap();
    assert_eq!(ldap.get(&ConfigKey::new("k1")).map(String::as_str), Some("1"));
    assert_eq!(ldap.get(&ConfigKey::new("k3")).map(String::as_str), Some("3"));
    assert_eq!(ldap.get(&ConfigKey::new("a")).map(String::as_str), Some("x"));
    assert!(h.dogus.calls().is_empty());
}

async fn advance_to_self_upgrade_completed(h: &Harness, id: &str) {
    for _ in 0..7 {
        h.reconciler.advance(&ctx(id), id).await.unwrap();
    }
    assert_eq!(h.stored(id).phase, Phase::SelfUpgradeCompleted);
}

// ---------------------------------------------------------------------------
// Storage and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_conflict_is_returned_unchanged() {
    // Given another writer wins the next update
    let h = Harness::new();
    h.seed("bp-race", ldap_blueprint());
    h.specs
        .fail_next_update(ReconcileError::conflict("bp-race").with_op("update_blueprint_spec"));

    // When
    let err = h
        .reconciler
        .advance(&ctx("bp-race"), "bp-race")
        .await
        .unwrap_err();

    // Then
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.stored("bp-race").phase, Phase::New);

    // And a retry succeeds
    let report = h.reconciler.advance(&ctx("bp-race"), "bp-race").await.unwrap();
    assert_eq!(report.phase, Phase::StaticallyValidated);
    assert_eq!(report.resource_version, 2);
}

#[tokio::test]
async fn test_failed_checkpoint_save_is_not_written_again() {
    // Given the spec is ready to apply and its next save fails
    let h = Harness::new();
    h.seed("bp-checkpoint", ldap_blueprint());
    advance_to_self_upgrade_completed(&h, "bp-checkpoint").await;
    let writes = h.specs.update_count();
    h.specs
        .fail_next_update(ReconcileError::internal("transient").with_op("update_blueprint_spec"));

    // When
    let err = h
        .reconciler
        .advance(&ctx("bp-checkpoint"), "bp-checkpoint")
        .await
        .unwrap_err();

    // Then the error is returned as is and nothing was written or applied
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(h.specs.update_count(), writes);
    assert_eq!(h.stored("bp-checkpoint").phase, Phase::SelfUpgradeCompleted);
    assert_eq!(h.global_config.update_count(), 0);

    // And the retry applies the config instead of failing the blueprint
    let report = h
        .reconciler
        .advance(&ctx("bp-checkpoint"), "bp-checkpoint")
        .await
        .unwrap();
    assert_eq!(report.outcome, StepOutcome::Advanced);
    assert_eq!(report.phase, Phase::EcosystemConfigApplied);
}

#[tokio::test]
async fn test_config_store_conflict_is_returned_without_failing() {
    // Given the global config store reports a conflict on write
    let h = Harness::new();
    h.global_config.fail_updates_with(ErrorKind::Conflict);
    h.seed("bp-cfg-race", ldap_blueprint());
    advance_to_self_upgrade_completed(&h, "bp-cfg-race").await;

    // When
    let err = h
        .reconciler
        .advance(&ctx("bp-cfg-race"), "bp-cfg-race")
        .await
        .unwrap_err();

    // Then the conflict reaches the caller and the apply can be retried
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.op(), Some("update_global_config"));
    let stored = h.stored("bp-cfg-race");
    assert_eq!(stored.phase, Phase::SelfUpgradeCompleted);
    assert_eq!(
        stored.conditions.get(ConditionType::ConfigApplied).status,
        ConditionStatus::Unknown
    );

    // And a retry meets the same conflict instead of an interrupted apply
    let err = h
        .reconciler
        .advance(&ctx("bp-cfg-race"), "bp-cfg-race")
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(h.stored("bp-cfg-race").phase, Phase::SelfUpgradeCompleted);
}

#[tokio::test]
async fn test_unknown_blueprint_is_not_found() {
    let h = Harness::new();
    let err = h
        .reconciler
        .advance(&ctx("bp-ghost"), "bp-ghost")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_cancelled_pass_changes_nothing() {
    // Given
    let h = Harness::new();
    h.seed("bp-cancel", ldap_blueprint());
    let ctx = ctx("bp-cancel");
    ctx.cancel.cancel();

    // When
    let err = h.reconciler.advance(&ctx, "bp-cancel").await.unwrap_err();

    // Then
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(h.stored("bp-cancel").phase, Phase::New);
    assert_eq!(h.specs.update_count(), 0);
}

#[tokio::test]
async fn test_submit_rejects_taken_id() {
    // Given
    let h = Harness::new();
    let ctx = ctx("bp-submit");
    h.reconciler
        .submit(&ctx, "bp-submit", ldap_blueprint(), BlueprintMask::default())
        .await
        .unwrap();

    // When
    let err = h
        .reconciler
        .submit(&ctx, "bp-submit", Blueprint::default(), BlueprintMask::default())
        .await
        .unwrap_err();

    // Then
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.stored("bp-submit").blueprint, ldap_blueprint());
}
