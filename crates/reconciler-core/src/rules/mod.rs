//! Blueprint rules: static validation, mask merge and dependency checks

pub mod dependencies;
pub mod effective;
pub mod invariants;
pub mod validation;

pub use dependencies::check_dependencies;
pub use effective::calculate_effective_blueprint;
pub use validation::validate_blueprint;
