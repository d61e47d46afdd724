//! Reconciliation state machine
//!
//! `advance` loads a blueprint aggregate, runs the one handler registered for
//! its phase and persists the aggregate if the handler changed it. Apply
//! handlers persist an `InProgress` checkpoint before touching the
//! ecosystem, so a crash mid-apply is detected on the next pass.
//!
//! Storage errors (`NotFound`, `Conflict`, `Internal`) are returned
//! unchanged and never retried here. A pass that hits one writes nothing
//! further, except to withdraw an `InProgress` checkpoint it saved itself.

use reconciler_core::errors::{DomainError, ErrorKind, ReconcileError, Result};
use reconciler_core::model::{Blueprint, BlueprintMask, BlueprintSpec, DomainEvent, Phase};
use reconciler_core::outcome::{StepOutcome, WaitReason};
use reconciler_core::ports::{BlueprintSpecRepository, ReconcileContext};
use reconciler_core_types::schema::{FIELD_BLUEPRINT_ID, FIELD_PHASE, FIELD_REQUEST_ID};
use reconciler_core::{log_op_end, log_op_error, log_op_start};
use std::time::Instant;
use tracing::Instrument;

use crate::collaborators::Collaborators;
use crate::config::ReconcilerConfig;
use crate::usecases::apply_config::apply_config;
use crate::usecases::apply_entities::{apply_component_diffs, apply_dogu_diffs};
use crate::usecases::ecosystem::collect_ecosystem_state;
use crate::usecases::health::{wait_for_healthy, HealthWaitOutcome};
use crate::usecases::post_apply::{
    find_outdated_dogus, flush_pending_sensitive_config, trigger_restarts,
};
use crate::usecases::self_upgrade::{coordinate_self_upgrade, SelfUpgradeState};
use crate::usecases::submit::submit_blueprint;
use crate::usecases::validation::find_unsatisfied_dependencies;

const INTERRUPTED: &str = "application was interrupted";

/// Result of one `advance` call
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceReport {
    pub outcome: StepOutcome,
    /// Phase after the step
    pub phase: Phase,
    pub resource_version: u64,
    /// Events recorded during the step, for notifiers
    pub events: Vec<DomainEvent>,
}

/// The aggregate of one pass plus the state last persisted
struct Pass<'a> {
    ctx: &'a ReconcileContext,
    repo: &'a dyn BlueprintSpecRepository,
    spec: BlueprintSpec,
    baseline: BlueprintSpec,
}

impl<'a> Pass<'a> {
    fn new(ctx: &'a ReconcileContext, repo: &'a dyn BlueprintSpecRepository, spec: BlueprintSpec) -> Self {
        Self {
            ctx,
            repo,
            baseline: spec.clone(),
            spec,
        }
    }

    /// Persist if anything changed since the last save
    async fn save_if_dirty(&mut self) -> Result<()> {
        if !self.spec.differs_from(&self.baseline) {
            return Ok(());
        }
        self.repo.update(self.ctx, &mut self.spec).await?;
        self.baseline = self.spec.clone();
        Ok(())
    }

    /// Drop unsaved changes, so a failed save is never written again
    fn discard_changes(&mut self) {
        self.spec = self.baseline.clone();
    }
}

pub struct Reconciler {
    collaborators: Collaborators,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(collaborators: Collaborators, config: ReconcilerConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Store a new blueprint under `id`; see [`submit_blueprint`]
    ///
    /// # Errors
    ///
    /// `Conflict` when `id` is taken.
    pub async fn submit(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        blueprint: Blueprint,
        mask: BlueprintMask,
    ) -> Result<BlueprintSpec> {
        submit_blueprint(&self.collaborators, ctx, id, blueprint, mask).await
    }

    /// Run exactly one phase transition of the blueprint `id`
    ///
    /// Safe to call again after any error: handlers are idempotent and an
    /// interrupted apply is turned into a failure on re-entry.
    ///
    /// # Errors
    ///
    /// Storage errors verbatim, `Cancelled` when the pass was cancelled. A
    /// handler error whose state cannot be persisted is joined with the
    /// persist error.
    pub async fn advance(&self, ctx: &ReconcileContext, id: &str) -> Result<AdvanceReport> {
        let span = tracing::info_span!(
            "advance",
            blueprint_id = tracing::field::Empty,
            request_id = tracing::field::Empty,
            phase = tracing::field::Empty,
        );
        span.record(FIELD_BLUEPRINT_ID, id);
        span.record(FIELD_REQUEST_ID, tracing::field::display(&ctx.request.request_id));
        self.advance_in_span(ctx, id).instrument(span).await
    }

    async fn advance_in_span(&self, ctx: &ReconcileContext, id: &str) -> Result<AdvanceReport> {
        ctx.ensure_not_cancelled("advance")?;
        let spec = self.collaborators.specs.get_by_id(ctx, id).await?;
        tracing::Span::current().record(FIELD_PHASE, spec.phase.as_str());

        let op = handler_name(spec.phase);
        log_op_start!(op);
        let start = Instant::now();

        let mut pass = Pass::new(ctx, self.collaborators.specs.as_ref(), spec);
        let result = match self.dispatch(&mut pass).await {
            Ok(outcome) => pass.save_if_dirty().await.map(|()| outcome),
            // the caller retries storage errors against the stored state
            Err(err) if err.is_storage() => {
                pass.discard_changes();
                Err(err)
            }
            Err(err) => match pass.save_if_dirty().await {
                Ok(()) => Err(err),
                Err(persist) => Err(ReconcileError::join_persist_failure(err, persist)),
            },
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(outcome) => {
                log_op_end!(
                    op,
                    duration_ms = duration_ms,
                    outcome = ?outcome,
                    next_phase = pass.spec.phase.as_str()
                );
                Ok(AdvanceReport {
                    outcome,
                    phase: pass.spec.phase,
                    resource_version: pass.spec.resource_version,
                    events: pass.spec.take_events(),
                })
            }
            Err(err) => {
                log_op_error!(op, &err, duration_ms = duration_ms);
                Err(err)
            }
        }
    }

    /// Call `advance` while it reports `Advanced`, at most `max_steps` times
    ///
    /// The returned report carries the events of all steps.
    ///
    /// # Errors
    ///
    /// The first error of `advance`.
    pub async fn run_until_settled(
        &self,
        ctx: &ReconcileContext,
        id: &str,
        max_steps: usize,
    ) -> Result<AdvanceReport> {
        let mut events = Vec::new();
        let mut report = None;
        for _ in 0..max_steps {
            let mut step = self.advance(ctx, id).await?;
            events.append(&mut step.events);
            let settled = step.outcome != StepOutcome::Advanced;
            report = Some(step);
            if settled {
                break;
            }
        }
        let mut report = report.ok_or_else(|| {
            ReconcileError::new(ErrorKind::InvalidInput)
                .with_op("run_until_settled")
                .with_message("max_steps must be greater than zero")
        })?;
        report.events = events;
        Ok(report)
    }

    async fn dispatch(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        match pass.spec.phase {
            Phase::New => Ok(self.validate_statically(pass)),
            Phase::StaticallyValidated => Ok(self.calculate_effective_blueprint(pass)),
            Phase::EffectiveBlueprintGenerated => self.validate_dependencies(pass).await,
            Phase::Validated => self.determine_state_diff(pass).await,
            Phase::StateDiffDetermined | Phase::EcosystemUnhealthyUpfront => {
                self.check_health_upfront(pass).await
            }
            Phase::EcosystemHealthyUpfront => self.pre_process(pass).await,
            Phase::BlueprintApplicationPreProcessed | Phase::AwaitSelfUpgrade => {
                self.handle_self_upgrade(pass).await
            }
            Phase::SelfUpgradeCompleted => self.apply_ecosystem_config(pass).await,
            Phase::EcosystemConfigApplied => self.apply_components(pass).await,
            Phase::ComponentsApplied => self.apply_dogus(pass).await,
            Phase::InProgress => Ok(self.handle_interrupted(pass)),
            Phase::DogusApplied => self.post_process(pass).await,
            Phase::RestartsTriggered => self.await_health_afterwards(pass).await,
            Phase::EcosystemUnhealthyAfterwards => self.recheck_health_afterwards(pass).await,
            Phase::EcosystemHealthyAfterwards => self.complete(pass).await,
            Phase::BlueprintApplicationFailed | Phase::ApplyEcosystemConfigFailed => {
                pass.spec.resolve_failure();
                Ok(StepOutcome::Terminal)
            }
            Phase::Completed | Phase::Failed | Phase::Invalid => Ok(StepOutcome::Terminal),
        }
    }

    fn validate_statically(&self, pass: &mut Pass<'_>) -> StepOutcome {
        match pass.spec.validate_statically() {
            Ok(()) => StepOutcome::Advanced,
            Err(err) => {
                tracing::warn!(error = %err, "blueprint is invalid");
                StepOutcome::Terminal
            }
        }
    }

    fn calculate_effective_blueprint(&self, pass: &mut Pass<'_>) -> StepOutcome {
        match pass.spec.calculate_effective_blueprint() {
            Ok(()) => StepOutcome::Advanced,
            Err(err) => {
                tracing::warn!(error = %err, "mask cannot be applied");
                StepOutcome::Terminal
            }
        }
    }

    async fn validate_dependencies(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let problems =
            find_unsatisfied_dependencies(&self.collaborators, pass.ctx, &pass.spec.effective_blueprint)
                .await?;
        match pass.spec.mark_dependencies_validated(problems) {
            Ok(()) => Ok(StepOutcome::Advanced),
            Err(err) => {
                tracing::warn!(error = %err, "dependencies are not satisfied");
                Ok(StepOutcome::Terminal)
            }
        }
    }

    async fn determine_state_diff(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let actual =
            collect_ecosystem_state(&self.collaborators, pass.ctx, &pass.spec.effective_blueprint)
                .await?;
        pass.spec.determine_state_diff(&actual);
        Ok(StepOutcome::Advanced)
    }

    async fn check_health_upfront(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let health = self.collaborators.health.check_health(pass.ctx).await?;
        let ignore = self.config.health.ignore_list();
        if pass.spec.check_ecosystem_health_upfront(&health, &ignore) {
            Ok(StepOutcome::Advanced)
        } else {
            Ok(StepOutcome::WaitingOn(WaitReason::EcosystemUnhealthy))
        }
    }

    /// Restore gate and forbidden-action check before anything is applied
    async fn pre_process(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        if self.collaborators.restore.is_restore_in_progress(pass.ctx).await? {
            return Self::wait_on(DomainError::RestoreInProgress);
        }

        let forbidden = pass.spec.state_diff.forbidden_actions();
        if !forbidden.is_empty() {
            let message = format!("forbidden actions: {}", forbidden.join(", "));
            pass.spec.mark_application_failed(message.clone());
            return Ok(StepOutcome::Failed(message));
        }

        pass.spec.mark_pre_processed();
        Ok(StepOutcome::Advanced)
    }

    async fn handle_self_upgrade(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let own = self.config.own_component_name.as_str();
        let state =
            coordinate_self_upgrade(&self.collaborators, pass.ctx, own, &pass.spec.state_diff).await;
        match state {
            Ok(SelfUpgradeState::Completed) => {
                pass.spec.mark_self_upgrade_completed();
                Ok(StepOutcome::Advanced)
            }
            Ok(SelfUpgradeState::Triggered { version })
            | Ok(SelfUpgradeState::AlreadyTriggered { version }) => {
                pass.spec.mark_await_self_upgrade(own, version.as_str());
                Self::wait_on(DomainError::AwaitSelfUpgrade {
                    message: format!("{} is being upgraded to {}", own, version),
                })
            }
            Err(err) => Self::fail_application(pass, err),
        }
    }

    /// Record `InProgress` before the ecosystem is touched
    ///
    /// Returns the phase to resume from when the apply stops on a storage
    /// error. A failed save is returned as is and discarded by `advance`.
    async fn begin_application(&self, pass: &mut Pass<'_>) -> Result<Phase> {
        let resume = pass.spec.phase;
        pass.spec.start_application();
        pass.save_if_dirty().await?;
        Ok(resume)
    }

    async fn apply_ecosystem_config(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let resume = self.begin_application(pass).await?;
        let report = match apply_config(&self.collaborators, pass.ctx, &pass.spec.state_diff).await
        {
            Ok(report) => report,
            Err(err) => return Self::fail_started_application(pass, resume, err).await,
        };
        if report.is_success() {
            pass.spec.mark_config_applied();
            return Ok(StepOutcome::Advanced);
        }

        let domains = report.domains();
        let message = report
            .into_error()
            .map(|e| e.to_string())
            .unwrap_or_default();
        pass.spec.mark_apply_config_failed(&domains, message.clone());
        Ok(StepOutcome::Failed(message))
    }

    async fn apply_components(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let resume = self.begin_application(pass).await?;
        match apply_component_diffs(&self.collaborators, pass.ctx, &pass.spec.state_diff).await {
            Ok(applied) => {
                pass.spec.mark_components_applied(applied);
                Ok(StepOutcome::Advanced)
            }
            Err(err) => Self::fail_started_application(pass, resume, err).await,
        }
    }

    async fn apply_dogus(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let resume = self.begin_application(pass).await?;
        match apply_dogu_diffs(&self.collaborators, pass.ctx, &pass.spec.state_diff).await {
            Ok(applied) => {
                pass.spec.mark_dogus_applied(applied);
                Ok(StepOutcome::Advanced)
            }
            Err(err) => Self::fail_started_application(pass, resume, err).await,
        }
    }

    fn handle_interrupted(&self, pass: &mut Pass<'_>) -> StepOutcome {
        tracing::warn!("found an apply without outcome");
        pass.spec.mark_application_failed(INTERRUPTED);
        StepOutcome::Failed(INTERRUPTED.to_string())
    }

    async fn post_process(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let outdated = find_outdated_dogus(&self.collaborators, pass.ctx, &pass.spec.state_diff).await?;
        if !outdated.is_empty() {
            return Self::wait_on(DomainError::DogusNotUpToDate { dogus: outdated });
        }

        let flushed = match flush_pending_sensitive_config(&self.collaborators, pass.ctx).await {
            Ok(flushed) => flushed,
            Err(err) => return Self::fail_application(pass, err),
        };
        pass.spec.mark_sensitive_config_flushed(flushed);

        let restarted = trigger_restarts(
            &self.collaborators,
            pass.ctx,
            &pass.spec.state_diff,
            &pass.spec.effective_blueprint,
        )
        .await;
        match restarted {
            Ok(dogus) => {
                pass.spec.mark_restarts_triggered(dogus);
                Ok(StepOutcome::Advanced)
            }
            Err(err) => Self::fail_application(pass, err),
        }
    }

    async fn await_health_afterwards(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let health_config = &self.config.health;
        let ignore = health_config.ignore_list();
        let outcome = wait_for_healthy(
            self.collaborators.health.as_ref(),
            pass.ctx,
            &ignore,
            health_config.wait_interval(),
            health_config.wait_timeout(),
        )
        .await?;

        if let HealthWaitOutcome::Cancelled(last) = &outcome {
            return Err(ReconcileError::new(ErrorKind::Cancelled)
                .with_op("await_health_afterwards")
                .with_message(format!(
                    "health wait cancelled, last result: {}",
                    last.summary(&ignore)
                )));
        }
        if pass
            .spec
            .check_ecosystem_health_afterwards(outcome.result(), &ignore)
        {
            Ok(StepOutcome::Advanced)
        } else {
            Ok(StepOutcome::WaitingOn(WaitReason::EcosystemUnhealthy))
        }
    }

    async fn recheck_health_afterwards(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let health = self.collaborators.health.check_health(pass.ctx).await?;
        let ignore = self.config.health.ignore_list();
        if pass.spec.check_ecosystem_health_afterwards(&health, &ignore) {
            Ok(StepOutcome::Advanced)
        } else {
            Ok(StepOutcome::WaitingOn(WaitReason::EcosystemUnhealthy))
        }
    }

    /// Completion gate: the ecosystem is diffed again and must match
    async fn complete(&self, pass: &mut Pass<'_>) -> Result<StepOutcome> {
        let actual =
            collect_ecosystem_state(&self.collaborators, pass.ctx, &pass.spec.effective_blueprint)
                .await?;
        pass.spec.refresh_state_diff(&actual);
        match pass.spec.complete() {
            Ok(()) => Ok(StepOutcome::Terminal),
            Err(err) => {
                tracing::info!(summary = %pass.spec.state_diff.summary(), "not completing");
                Self::wait_on(err)
            }
        }
    }

    /// Storage errors go to the caller; anything else fails the application
    fn fail_application(pass: &mut Pass<'_>, err: ReconcileError) -> Result<StepOutcome> {
        if err.is_storage() {
            return Err(err);
        }
        let message = err.to_string();
        pass.spec.mark_application_failed(message.clone());
        Ok(StepOutcome::Failed(message))
    }

    /// Like `fail_application`, for an apply behind an `InProgress`
    /// checkpoint: a storage error withdraws the checkpoint so the retry
    /// runs the apply again.
    async fn fail_started_application(
        pass: &mut Pass<'_>,
        resume: Phase,
        err: ReconcileError,
    ) -> Result<StepOutcome> {
        let Some(storage) = err.storage_error().cloned() else {
            return Self::fail_application(pass, err);
        };
        pass.spec.withdraw_application(resume);
        match pass.save_if_dirty().await {
            Ok(()) => Err(storage),
            Err(persist) => Err(ReconcileError::join_persist_failure(storage, persist)),
        }
    }

    /// Control-flow domain errors end the pass as a wait
    fn wait_on(err: DomainError) -> Result<StepOutcome> {
        match err.wait_reason() {
            Some(reason) => {
                tracing::info!(reason = %reason, error = %err, "waiting");
                Ok(StepOutcome::WaitingOn(reason))
            }
            None => Err(err.into()),
        }
    }
}

/// Operation name logged for the handler of a phase
pub fn handler_name(phase: Phase) -> &'static str {
    match phase {
        Phase::New => "validate_blueprint_statically",
        Phase::StaticallyValidated => "calculate_effective_blueprint",
        Phase::EffectiveBlueprintGenerated => "validate_dependencies",
        Phase::Validated => "determine_state_diff",
        Phase::StateDiffDetermined | Phase::EcosystemUnhealthyUpfront => "check_health_upfront",
        Phase::EcosystemHealthyUpfront => "pre_process_application",
        Phase::BlueprintApplicationPreProcessed | Phase::AwaitSelfUpgrade => "self_upgrade",
        Phase::SelfUpgradeCompleted => "apply_ecosystem_config",
        Phase::EcosystemConfigApplied => "apply_components",
        Phase::ComponentsApplied => "apply_dogus",
        Phase::InProgress => "handle_interrupted_application",
        Phase::DogusApplied => "post_process_application",
        Phase::RestartsTriggered => "await_health_afterwards",
        Phase::EcosystemUnhealthyAfterwards => "recheck_health_afterwards",
        Phase::EcosystemHealthyAfterwards => "complete_blueprint",
        Phase::BlueprintApplicationFailed | Phase::ApplyEcosystemConfigFailed => "resolve_failure",
        Phase::Completed | Phase::Failed | Phase::Invalid => "terminal",
    }
}
