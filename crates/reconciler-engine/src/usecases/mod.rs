//! Use cases invoked by the phase handlers
//!
//! Each use case talks to the ports and returns plain results; moving the
//! aggregate's phase is left to the reconciler.

pub mod apply_config;
pub mod apply_entities;
pub mod ecosystem;
pub mod health;
pub mod post_apply;
pub mod self_upgrade;
pub mod submit;
pub mod validation;
