use thiserror::Error;

use crate::outcome::WaitReason;

/// Result type alias using ReconcileError
pub type Result<T> = std::result::Result<T, ReconcileError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code. The external loop decides how to
/// retry by looking at the kind: storage kinds (`NotFound`, `Conflict`,
/// `Internal`) are retried by reloading the aggregate, control-flow kinds
/// mean "come back later", everything else is a genuine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Input
    InvalidInput,
    InvalidBlueprint,
    InvalidVersion,

    // Application
    ForbiddenAction,
    ConfigApply,
    ConfigKeyCollision,

    // Control flow
    AwaitSelfUpgrade,
    StateDiffNotEmpty,
    DogusNotUpToDate,
    RestoreInProgress,

    // Storage
    NotFound,
    Conflict,
    Internal,
    Persistence,
    Serialization,

    // Integration
    ExternalService,
    Cancelled,
    Timeout,
}

impl ErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ErrorKind::InvalidBlueprint => "ERR_INVALID_BLUEPRINT",
            ErrorKind::InvalidVersion => "ERR_INVALID_VERSION",
            ErrorKind::ForbiddenAction => "ERR_FORBIDDEN_ACTION",
            ErrorKind::ConfigApply => "ERR_CONFIG_APPLY",
            ErrorKind::ConfigKeyCollision => "ERR_CONFIG_KEY_COLLISION",
            ErrorKind::AwaitSelfUpgrade => "ERR_AWAIT_SELF_UPGRADE",
            ErrorKind::StateDiffNotEmpty => "ERR_STATE_DIFF_NOT_EMPTY",
            ErrorKind::DogusNotUpToDate => "ERR_DOGUS_NOT_UP_TO_DATE",
            ErrorKind::RestoreInProgress => "ERR_RESTORE_IN_PROGRESS",
            ErrorKind::NotFound => "ERR_NOT_FOUND",
            ErrorKind::Conflict => "ERR_CONFLICT",
            ErrorKind::Internal => "ERR_INTERNAL",
            ErrorKind::Persistence => "ERR_PERSISTENCE",
            ErrorKind::Serialization => "ERR_SERIALIZATION",
            ErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
            ErrorKind::Cancelled => "ERR_CANCELLED",
            ErrorKind::Timeout => "ERR_TIMEOUT",
        }
    }

    /// Storage-layer kinds must reach the external loop unchanged
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            ErrorKind::NotFound | ErrorKind::Conflict | ErrorKind::Internal
        )
    }
}

/// Canonical structured error type
///
/// Carries a kind plus optional context. Partial failures of multi-item
/// operations are joined into one error whose `causes` hold every
/// individual failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileError {
    kind: ErrorKind,
    op: Option<String>,
    entity: Option<String>,
    message: String,
    causes: Vec<ReconcileError>,
}

impl ReconcileError {
    /// Create a new error with the specified kind
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            message: String::new(),
            causes: Vec::new(),
        }
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound).with_entity(entity)
    }

    pub fn conflict(entity: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict).with_entity(entity)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(message)
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity context (dogu, component, config key, blueprint id)
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach underlying errors
    pub fn with_causes(mut self, causes: Vec<ReconcileError>) -> Self {
        self.causes = causes;
        self
    }

    /// Join the collected errors of a multi-item operation
    ///
    /// Returns `None` when nothing failed. A single error is still wrapped so
    /// that the aggregate kind and operation are uniform for callers.
    pub fn join(
        kind: ErrorKind,
        op: impl Into<String>,
        errors: Vec<ReconcileError>,
    ) -> Option<ReconcileError> {
        if errors.is_empty() {
            return None;
        }
        let count = errors.len();
        Some(
            ReconcileError::new(kind)
                .with_op(op)
                .with_message(format!("{} item(s) failed", count))
                .with_causes(errors),
        )
    }

    /// Join a domain failure with the failure to persist it
    ///
    /// The persist error decides the kind, so a conflict still reaches the
    /// external loop as a conflict.
    pub fn join_persist_failure(original: ReconcileError, persist: ReconcileError) -> Self {
        ReconcileError::new(persist.kind)
            .with_op("persist_failure")
            .with_message("failed to persist failure state")
            .with_causes(vec![original, persist])
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn causes(&self) -> &[ReconcileError] {
        &self.causes
    }

    pub fn is_storage(&self) -> bool {
        self.kind.is_storage()
    }

    /// This error or the first joined cause of a storage kind
    pub fn storage_error(&self) -> Option<&ReconcileError> {
        if self.is_storage() {
            return Some(self);
        }
        self.causes.iter().find_map(ReconcileError::storage_error)
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        for cause in &self.causes {
            write!(f, "\n  - {}", cause.to_string().replace('\n', "\n    "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes
            .first()
            .map(|c| c as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Semantic errors raised by pure domain code
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// The blueprint cannot be satisfied as written
    #[error("blueprint is invalid: {message}")]
    InvalidBlueprint { message: String },

    /// A diff requires an action that may never be executed
    #[error("action {action} is forbidden for {entity}: {reason}")]
    ForbiddenAction {
        entity: String,
        action: String,
        reason: String,
    },

    /// Completion was requested while the ecosystem still differs
    #[error("cannot complete blueprint: state diff still contains changes")]
    StateDiffNotEmpty,

    /// The reconciler's own component is being upgraded
    #[error("waiting for self upgrade: {message}")]
    AwaitSelfUpgrade { message: String },

    /// Applied dogus did not reach their expected version yet
    #[error("dogus are not up to date yet: {}", dogus.join(", "))]
    DogusNotUpToDate { dogus: Vec<String> },

    /// A restore is running in the ecosystem
    #[error("a restore is in progress")]
    RestoreInProgress,

    /// A config key would be written beneath an existing scalar value
    #[error("config key {key} collides with existing key {existing}")]
    ConfigKeyCollision { key: String, existing: String },

    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },
}

impl DomainError {
    /// The wait reason for control-flow variants
    pub fn wait_reason(&self) -> Option<WaitReason> {
        match self {
            DomainError::StateDiffNotEmpty => Some(WaitReason::StateDiffNotEmpty),
            DomainError::AwaitSelfUpgrade { .. } => Some(WaitReason::AwaitSelfUpgrade),
            DomainError::DogusNotUpToDate { .. } => Some(WaitReason::DogusNotUpToDate),
            DomainError::RestoreInProgress => Some(WaitReason::RestoreInProgress),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::InvalidBlueprint { .. } => ErrorKind::InvalidBlueprint,
            DomainError::ForbiddenAction { .. } => ErrorKind::ForbiddenAction,
            DomainError::StateDiffNotEmpty => ErrorKind::StateDiffNotEmpty,
            DomainError::AwaitSelfUpgrade { .. } => ErrorKind::AwaitSelfUpgrade,
            DomainError::DogusNotUpToDate { .. } => ErrorKind::DogusNotUpToDate,
            DomainError::RestoreInProgress => ErrorKind::RestoreInProgress,
            DomainError::ConfigKeyCollision { .. } => ErrorKind::ConfigKeyCollision,
            DomainError::InvalidVersion { .. } => ErrorKind::InvalidVersion,
        }
    }
}

impl From<DomainError> for ReconcileError {
    fn from(err: DomainError) -> Self {
        let base = ReconcileError::new(err.kind()).with_message(err.to_string());
        match err {
            DomainError::ForbiddenAction { entity, .. } => base.with_entity(entity),
            DomainError::ConfigKeyCollision { key, .. } => base.with_entity(key),
            _ => base,
        }
    }
}
