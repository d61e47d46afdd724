//! Config command

use clap::Args;
use reconciler_engine::ReconcilerConfig;
use std::path::PathBuf;

use super::CliResult;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Print the configuration after defaults and environment overrides
pub fn execute(args: ConfigArgs) -> CliResult {
    let config = ReconcilerConfig::load_with_env(args.file.as_deref())?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
