//! Dependency validation of the effective blueprint

use reconciler_core::errors::Result;
use reconciler_core::model::EffectiveBlueprint;
use reconciler_core::ports::ReconcileContext;
use reconciler_core::rules::check_dependencies;
use std::collections::BTreeMap;

use crate::collaborators::Collaborators;

/// Ask the registry for the dependencies of every present dogu and report
/// those neither the blueprint nor the ecosystem satisfies
///
/// # Errors
///
/// Registry or repository failures, and `Cancelled` between lookups.
pub async fn find_unsatisfied_dependencies(
    c: &Collaborators,
    ctx: &ReconcileContext,
    effective: &EffectiveBlueprint,
) -> Result<Vec<String>> {
    let mut dependencies = BTreeMap::new();
    for dogu in effective.present_dogus() {
        ctx.ensure_not_cancelled("validate_dependencies")?;
        let Some(version) = &dogu.version else {
            continue;
        };
        let found = c.registry.get_dependencies(ctx, &dogu.name, version).await?;
        dependencies.insert(dogu.simple_name().to_string(), found);
    }

    let installed = c.dogus.get_all(ctx).await?;
    Ok(check_dependencies(effective, &installed, &dependencies))
}
