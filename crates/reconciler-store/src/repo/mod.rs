//! Repository layer persisting blueprint aggregates

mod sqlite_repo;

pub use sqlite_repo::{SpecSummary, SqliteBlueprintSpecRepository};
