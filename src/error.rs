//! Error types for the anchor lifecycle system.

use crate::types::PlaneId;
use thiserror::Error;

/// History-store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history store unavailable: {0}")]
    Db(#[from] sled::Error),

    #[error("corrupt history record at sequence {seq}: {reason}")]
    Corrupt { seq: u64, reason: String },

    #[error("history store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anchor-service errors (attach and management surface).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("plane {0} is no longer tracked")]
    PlaneLost(PlaneId),

    #[error("anchor service request failed: {0}")]
    RequestFailed(String),

    #[error("anchor service authentication failed: {0}")]
    AuthFailed(String),

    #[error("anchor service rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("hosted anchor not found: {0}")]
    AnchorNotFound(String),

    #[error("unexpected anchor service response: {0}")]
    BadResponse(String),
}

/// Placement misses. These are recoverable: the session re-prompts for input.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("no tracked surface under the touch point")]
    NoSurfaceHit,

    #[error("hit surface could not be resolved to a tracked plane ({0})")]
    PlaneUnresolved(PlaneId),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Session-level errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A hosting or resolving task is already pending or cached for this
    /// anchor. Submitting again is a programming error, not a user-facing
    /// condition.
    #[error("a cloud task is already active for this anchor")]
    AlreadyActive,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),
}

impl From<config::ConfigError> for SessionError {
    fn from(err: config::ConfigError) -> Self {
        SessionError::Config(err.to_string())
    }
}
