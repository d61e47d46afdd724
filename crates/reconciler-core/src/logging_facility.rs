//! Structured logging facility
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//!   with the canonical field names of `reconciler_core_types::schema`
//! - Test capture with span fields for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use reconciler_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{capture_subscriber, init_test_capture, CapturedEvent, TestCapture};
