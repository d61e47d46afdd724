//! Canonical logging macros
//!
//! Field names come from `reconciler_core_types::schema`; callers need
//! `tracing` in scope.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use reconciler_core::log_op_start;
/// log_op_start!("apply_config");
/// log_op_start!("apply_config", dogu = "ldap");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::reconciler_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::reconciler_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use reconciler_core::log_op_end;
/// log_op_end!("apply_config", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::reconciler_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::reconciler_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Anything convertible into `ReconcileError` is accepted; the error is
/// borrowed, so it can still be returned afterwards.
///
/// # Example
///
/// ```
/// # use reconciler_core::log_op_error;
/// # use reconciler_core::errors::ReconcileError;
/// let err = ReconcileError::not_found("bp-1");
/// log_op_error!("load_spec", &err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let err: &$crate::errors::ReconcileError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::reconciler_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?err.kind(),
            err_code = err.code(),
            error = %err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let err: &$crate::errors::ReconcileError = $err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::reconciler_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?err.kind(),
            err_code = err.code(),
            error = %err,
            $($field)*
        );
    }};
}
