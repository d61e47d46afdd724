//! Submit command
//!
//! Usage: reconcile submit <BLUEPRINT> --id <ID> [--mask <MASK>] [--db <PATH>]

use clap::Args;
use reconciler_core::model::{Blueprint, BlueprintMask, BlueprintSpec};
use reconciler_core::ports::{BlueprintSpecRepository, ReconcileContext};
use reconciler_core_types::RequestContext;
use reconciler_store::SqliteBlueprintSpecRepository;
use std::path::PathBuf;

use super::{read_json, CliResult, DEFAULT_DB};

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Blueprint JSON file
    pub blueprint: PathBuf,

    #[arg(long)]
    pub id: String,

    /// Blueprint mask JSON file
    #[arg(long)]
    pub mask: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_DB)]
    pub db: PathBuf,
}

pub async fn execute(args: SubmitArgs) -> CliResult {
    let blueprint: Blueprint = read_json(&args.blueprint)?;
    let mask = match &args.mask {
        Some(path) => read_json(path)?,
        None => BlueprintMask::default(),
    };

    if let Some(parent) = args.db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let repo = SqliteBlueprintSpecRepository::open(&args.db)?;
    let ctx = ReconcileContext::new(RequestContext::new(args.id.as_str()));

    let mut spec = BlueprintSpec::new(args.id.as_str(), blueprint, mask);
    repo.create(&ctx, &mut spec).await?;
    tracing::info!(blueprint_id = %spec.id, request_id = %ctx.request.request_id, "blueprint submitted");

    println!("Blueprint submitted:");
    println!("  id: {}", spec.id);
    println!("  phase: {}", spec.phase);
    println!("  resource_version: {}", spec.resource_version);
    Ok(())
}
