//! State diff engine.
//!
//! Compares the effective blueprint with the observed ecosystem and
//! produces a typed diff with the needed action per entity and per config
//! key.
//!
//! ## Entry point
//!
//! ```ignore
//! use reconciler_core::diff::determine_state_diff;
//!
//! let diff = determine_state_diff(&effective_blueprint, &ecosystem_state);
//! if diff.has_changes() { /* apply */ }
//! ```
//!
//! ## Guarantees
//!
//! - **Purity**: no I/O, no failure. Forbidden transitions are reported as
//!   actions and rejected later at apply time.
//! - **Determinism**: all collections are sorted, identical inputs give
//!   identical output.
//! - **Scope**: entities not listed in the blueprint are never diffed.

pub mod config;
pub mod entity;
pub mod model;
pub mod state;

pub use config::{compute_config_diff, compute_normal_config_diff, compute_sensitive_config_diff};
pub use entity::{compute_component_diff, compute_dogu_diff};
pub use model::{
    Action, ComponentDiff, ConfigAction, ConfigEntryDiff, DoguDiff, EntityDiff,
    NormalConfigEntryDiff, SensitiveConfigEntryDiff, StateDiff,
};
pub use state::{determine_state_diff, EcosystemState};
