//! Observation of the ecosystem parts a blueprint touches

use reconciler_core::diff::EcosystemState;
use reconciler_core::errors::Result;
use reconciler_core::model::EffectiveBlueprint;
use reconciler_core::ports::ReconcileContext;

use crate::collaborators::Collaborators;

/// Load installed entities, global config and the config of every dogu the
/// blueprint configures
///
/// # Errors
///
/// Storage errors of the repositories, unchanged.
pub async fn collect_ecosystem_state(
    c: &Collaborators,
    ctx: &ReconcileContext,
    effective: &EffectiveBlueprint,
) -> Result<EcosystemState> {
    let configured: Vec<String> = effective.config.dogus.keys().cloned().collect();

    let dogus = c.dogus.get_all(ctx).await?;
    let components = c.components.get_all(ctx).await?;
    let global_config = c.global_config.get(ctx).await?;
    let dogu_configs = c.dogu_config.get_all_existing(ctx, &configured).await?;
    let sensitive_dogu_configs = c.sensitive_config.get_all_existing(ctx, &configured).await?;

    tracing::debug!(
        dogus = dogus.len(),
        components = components.len(),
        configured_dogus = configured.len(),
        "ecosystem state collected"
    );

    Ok(EcosystemState {
        dogus,
        components,
        global_config,
        dogu_configs,
        sensitive_dogu_configs,
    })
}
