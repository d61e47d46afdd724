//! Correlation types for request tracking and tracing
//!
//! Every reconciliation pass gets its own request id so that log lines of
//! one `advance` call can be told apart from the next one for the same
//! blueprint.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random RequestId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context carried through one reconciliation pass
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub blueprint_id: String,
}

impl RequestContext {
    /// Create a context for the given blueprint with a fresh RequestId
    pub fn new(blueprint_id: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            blueprint_id: blueprint_id.into(),
        }
    }

    /// Replace the generated RequestId with an existing one
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }
}
