//! Reconciler Store - adapters for the reconciler ports
//!
//! Provides:
//! - SQLite persistence of blueprint specs with checksummed migrations
//! - Optimistic concurrency on `resource_version`
//! - In-memory adapters for every port, used by tests and local runs

pub mod db;
pub mod errors;
pub mod memory;
pub mod migrations;
pub mod repo;

pub use errors::Result;
pub use repo::SqliteBlueprintSpecRepository;
