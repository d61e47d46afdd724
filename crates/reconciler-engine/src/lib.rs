//! Reconciler engine - orchestration layer
//!
//! Drives a blueprint aggregate through its phases. Each call to
//! [`Reconciler::advance`] performs one transition against the ports in
//! [`Collaborators`]; the outer loop decides when to call again.

pub mod collaborators;
pub mod config;
pub mod reconciler;
pub mod usecases;

pub use collaborators::Collaborators;
pub use config::{HealthConfig, ReconcilerConfig};
pub use reconciler::{AdvanceReport, Reconciler};
pub use usecases::submit::submit_blueprint;
