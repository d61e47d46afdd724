//! Plan command
//!
//! Runs static validation, the mask merge and the state diff without
//! touching any store. Dependency validation needs a dogu registry and is
//! left to the reconciler.

use clap::Args;
use reconciler_core::diff::{EcosystemState, StateDiff};
use reconciler_core::model::{Blueprint, BlueprintMask, BlueprintSpec, EffectiveBlueprint};
use serde::Serialize;
use std::path::PathBuf;

use super::{read_json, CliResult};

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Blueprint JSON file
    pub blueprint: PathBuf,

    /// Blueprint mask JSON file
    #[arg(long)]
    pub mask: Option<PathBuf>,

    /// Ecosystem state JSON file; an empty ecosystem when omitted
    #[arg(long)]
    pub actual: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Plan {
    summary: String,
    forbidden_actions: Vec<String>,
    effective_blueprint: EffectiveBlueprint,
    state_diff: StateDiff,
}

pub fn execute(args: PlanArgs) -> CliResult {
    let blueprint: Blueprint = read_json(&args.blueprint)?;
    let mask = match &args.mask {
        Some(path) => read_json(path)?,
        None => BlueprintMask::default(),
    };
    let actual: EcosystemState = match &args.actual {
        Some(path) => read_json(path)?,
        None => EcosystemState::default(),
    };

    let mut spec = BlueprintSpec::new("plan", blueprint, mask);
    spec.validate_statically()?;
    spec.calculate_effective_blueprint()?;
    spec.determine_state_diff(&actual);

    let plan = Plan {
        summary: spec.state_diff.summary(),
        forbidden_actions: spec.state_diff.forbidden_actions(),
        effective_blueprint: spec.effective_blueprint,
        state_diff: spec.state_diff,
    };
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
