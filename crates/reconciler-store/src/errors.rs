//! Error helpers for reconciler-store
//!
//! Store failures use the core `ReconcileError`. SQLite failures surface as
//! `Internal` so the external loop treats them like any storage error.

use reconciler_core::errors::{ErrorKind, ReconcileError};

pub type Result<T> = std::result::Result<T, ReconcileError>;

pub fn migration_error(migration_id: &str, reason: &str) -> ReconcileError {
    ReconcileError::new(ErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ReconcileError {
    ReconcileError::new(ErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

pub fn from_rusqlite(err: rusqlite::Error) -> ReconcileError {
    ReconcileError::new(ErrorKind::Internal)
        .with_op("sqlite")
        .with_message(err.to_string())
}

pub fn serialization(op: &str, err: serde_json::Error) -> ReconcileError {
    ReconcileError::new(ErrorKind::Serialization)
        .with_op(op.to_string())
        .with_message(err.to_string())
}

/// A poisoned lock of an in-memory adapter
pub fn poisoned(what: &str) -> ReconcileError {
    ReconcileError::internal(format!("{} lock is poisoned", what))
}
