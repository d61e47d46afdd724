//! Registration of a new blueprint

use reconciler_core::errors::Result;
use reconciler_core::model::{Blueprint, BlueprintMask, BlueprintSpec};
use reconciler_core::ports::ReconcileContext;
use reconciler_core::{log_op_end, log_op_error, log_op_start};

use crate::collaborators::Collaborators;

/// Store a blueprint as a new aggregate in phase `New`
///
/// # Errors
///
/// `Conflict` when the id is taken.
pub async fn submit_blueprint(
    c: &Collaborators,
    ctx: &ReconcileContext,
    id: &str,
    blueprint: Blueprint,
    mask: BlueprintMask,
) -> Result<BlueprintSpec> {
    log_op_start!("submit_blueprint", blueprint_id = id);
    let start = std::time::Instant::now();

    let mut spec = BlueprintSpec::new(id, blueprint, mask);
    match c.specs.create(ctx, &mut spec).await {
        Ok(()) => {
            log_op_end!(
                "submit_blueprint",
                duration_ms = start.elapsed().as_millis() as u64
            );
            Ok(spec)
        }
        Err(err) => {
            log_op_error!(
                "submit_blueprint",
                &err,
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(err)
        }
    }
}
