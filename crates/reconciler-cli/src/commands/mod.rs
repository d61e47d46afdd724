pub mod config;
pub mod plan;
pub mod status;
pub mod submit;

use serde::de::DeserializeOwned;
use std::path::Path;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Default location of the blueprint store
pub const DEFAULT_DB: &str = ".reconciler/specs.db";

/// Parse a JSON document, naming the file on failure
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let value = serde_json::from_str(&content)
        .map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))?;
    Ok(value)
}
