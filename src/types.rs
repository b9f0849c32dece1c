//! Shared identifier and session types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the cloud anchor service once an anchor has been
/// hosted. Opaque; only ever compared and displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CloudAnchorId(pub String);

impl CloudAnchorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CloudAnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CloudAnchorId {
    fn from(s: &str) -> Self {
        CloudAnchorId(s.to_string())
    }
}

/// Identifier of a tracked plane reported by the spatial tracking backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaneId(pub u64);

impl fmt::Display for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plane-{}", self.0)
    }
}

/// Which side effects fire when a cloud task completes.
///
/// Supplied by the caller at session construction; the state machine itself
/// runs the same branches in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Hosting,
    Resolving,
}

impl SessionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Hosting => "hosting",
            SessionMode::Resolving => "resolving",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
