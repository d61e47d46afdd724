//! Reconciler Core - pure domain of blueprint reconciliation
//!
//! This crate holds everything that does not perform I/O:
//! - The blueprint, ecosystem and aggregate model (`model`)
//! - The state diff engine (`diff`)
//! - Static validation, mask merge and dependency checks (`rules`)
//! - Contracts of the external collaborators (`ports`)
//! - The error and logging facilities
//!
//! Use cases and the reconciliation state machine live in
//! `reconciler-engine`.

pub mod diff;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod outcome;
pub mod ports;
pub mod rules;

// Used by the logging macros
#[doc(hidden)]
pub use reconciler_core_types;

pub use errors::{DomainError, ErrorKind, ReconcileError, Result};
pub use model::{BlueprintSpec, Phase};
pub use outcome::{StepOutcome, WaitReason};
pub use ports::{CancelSignal, ReconcileContext};
