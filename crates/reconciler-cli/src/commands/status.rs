//! Status command

use clap::Args;
use reconciler_core::ports::{BlueprintSpecRepository, ReconcileContext};
use reconciler_core_types::RequestContext;
use reconciler_store::SqliteBlueprintSpecRepository;
use std::path::PathBuf;

use super::{CliResult, DEFAULT_DB};

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Blueprint id; lists every stored blueprint when omitted
    pub id: Option<String>,

    #[arg(long, default_value = DEFAULT_DB)]
    pub db: PathBuf,
}

pub async fn execute(args: StatusArgs) -> CliResult {
    if !args.db.exists() {
        return Err(format!("no blueprint store at {}", args.db.display()).into());
    }
    let repo = SqliteBlueprintSpecRepository::open(&args.db)?;

    let Some(id) = args.id else {
        for summary in repo.list()? {
            println!(
                "{}\t{}\tv{}",
                summary.id, summary.phase, summary.resource_version
            );
        }
        return Ok(());
    };

    let ctx = ReconcileContext::new(RequestContext::new(id.as_str()));
    let spec = repo.get_by_id(&ctx, &id).await?;

    println!("Blueprint {}:", spec.id);
    println!("  phase: {}", spec.phase);
    println!("  resource_version: {}", spec.resource_version);
    println!("  diff: {}", spec.state_diff.summary());
    println!("  conditions:");
    for condition in spec.conditions.iter() {
        print!(
            "    {}: {:?}",
            condition.condition_type, condition.status
        );
        if !condition.reason.is_empty() {
            print!(" ({})", condition.reason);
        }
        if !condition.message.is_empty() {
            print!(" - {}", condition.message);
        }
        println!();
    }
    Ok(())
}
