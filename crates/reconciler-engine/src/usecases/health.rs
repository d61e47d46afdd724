//! Ecosystem health checks

use reconciler_core::errors::Result;
use reconciler_core::model::{HealthIgnoreList, HealthResult};
use reconciler_core::ports::{HealthProvider, ReconcileContext};
use std::time::Duration;
use tokio::time::Instant;

/// How a health wait ended; every variant carries the last observed result
#[derive(Debug, Clone, PartialEq)]
pub enum HealthWaitOutcome {
    Healthy(HealthResult),
    TimedOut(HealthResult),
    Cancelled(HealthResult),
}

impl HealthWaitOutcome {
    pub fn result(&self) -> &HealthResult {
        match self {
            HealthWaitOutcome::Healthy(r)
            | HealthWaitOutcome::TimedOut(r)
            | HealthWaitOutcome::Cancelled(r) => r,
        }
    }
}

/// Poll until healthy, the timeout passes or the pass is cancelled
///
/// # Errors
///
/// Failures of the health provider.
pub async fn wait_for_healthy(
    provider: &dyn HealthProvider,
    ctx: &ReconcileContext,
    ignore: &HealthIgnoreList,
    interval: Duration,
    timeout: Duration,
) -> Result<HealthWaitOutcome> {
    let deadline = Instant::now() + timeout;
    loop {
        let result = provider.check_health(ctx).await?;
        if result.all_healthy(ignore) {
            return Ok(HealthWaitOutcome::Healthy(result));
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::info!(summary = %result.summary(ignore), "health wait timed out");
            return Ok(HealthWaitOutcome::TimedOut(result));
        }

        tokio::select! {
            _ = ctx.cancel.cancelled() => return Ok(HealthWaitOutcome::Cancelled(result)),
            _ = tokio::time::sleep(interval.min(deadline - now)) => {}
        }
    }
}
