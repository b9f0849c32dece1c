//! Cloud anchor service abstraction.
//!
//! The session-facing surface is deliberately small: attach a local anchor,
//! estimate mapping quality, submit a hosting task. Hosting is asynchronous
//! on the service side; a submission returns a [`TaskHandle`] immediately
//! and the handle's state is observed by polling on later ticks, never by
//! awaiting.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::geometry::{Plane, Pose};
use crate::quality::MappingQuality;
use crate::types::{CloudAnchorId, PlaneId};

pub mod management;

/// A local anchor attached to a tracked plane, eligible for hosting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorAttachment {
    pub plane: PlaneId,
    pub pose: Pose,
}

/// Terminal failure codes a cloud task can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFailure {
    Internal,
    NotAuthorized,
    ResourceExhausted,
    DatasetProcessingFailed,
    CloudIdNotFound,
    ServiceUnavailable,
}

impl TaskFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskFailure::Internal => "internal error",
            TaskFailure::NotAuthorized => "not authorized",
            TaskFailure::ResourceExhausted => "resource exhausted",
            TaskFailure::DatasetProcessingFailed => "dataset processing failed",
            TaskFailure::CloudIdNotFound => "cloud anchor id not found",
            TaskFailure::ServiceUnavailable => "service unavailable",
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of a cloud task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPoll {
    InProgress,
    Success,
    Failed(TaskFailure),
}

impl TaskPoll {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskPoll::InProgress)
    }
}

struct TaskShared {
    state: Mutex<TaskPoll>,
    cloud_id: Mutex<Option<CloudAnchorId>>,
}

/// Shared handle to an in-flight or completed cloud task.
///
/// The service side completes it; the lifecycle side only reads. Cloning is
/// cheap and all clones observe the same state.
#[derive(Clone)]
pub struct TaskHandle {
    shared: Arc<TaskShared>,
}

impl TaskHandle {
    /// A handle in the `InProgress` state with no cloud id assigned yet.
    pub fn pending() -> Self {
        TaskHandle {
            shared: Arc::new(TaskShared {
                state: Mutex::new(TaskPoll::InProgress),
                cloud_id: Mutex::new(None),
            }),
        }
    }

    /// A handle that already carries a cloud id (resolving-side tasks).
    pub fn pending_with_id(id: CloudAnchorId) -> Self {
        let handle = TaskHandle::pending();
        *handle.shared.cloud_id.lock() = Some(id);
        handle
    }

    pub fn state(&self) -> TaskPoll {
        *self.shared.state.lock()
    }

    pub fn cloud_id(&self) -> Option<CloudAnchorId> {
        self.shared.cloud_id.lock().clone()
    }

    /// Service side: mark the task successful, assigning the cloud id.
    /// Terminal states stick; completing twice is a no-op.
    pub fn complete(&self, id: CloudAnchorId) {
        let mut state = self.shared.state.lock();
        if state.is_terminal() {
            return;
        }
        *state = TaskPoll::Success;
        *self.shared.cloud_id.lock() = Some(id);
    }

    /// Service side: mark the task failed. Terminal states stick.
    pub fn fail(&self, failure: TaskFailure) {
        let mut state = self.shared.state.lock();
        if state.is_terminal() {
            return;
        }
        *state = TaskPoll::Failed(failure);
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("state", &self.state())
            .field("cloud_id", &self.cloud_id())
            .finish()
    }
}

/// Session-facing anchor service.
///
/// All calls return immediately. `host` hands back a handle whose completion
/// is driven by the service implementation; `None` means the service refused
/// to create a task at all.
pub trait CloudAnchorService: Send + Sync {
    /// Attach a local anchor to a tracked plane at the given pose.
    fn attach(&self, plane: &Plane, pose: Pose) -> Result<AnchorAttachment, ServiceError>;

    /// Current mapping-quality estimate for hosting from this camera pose.
    fn estimate_quality(&self, camera: &Pose) -> MappingQuality;

    /// Submit a hosting request with the given retention period.
    fn host(&self, anchor: &AnchorAttachment, ttl_days: u32) -> Option<TaskHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_starts_in_progress_without_id() {
        let handle = TaskHandle::pending();
        assert_eq!(handle.state(), TaskPoll::InProgress);
        assert_eq!(handle.cloud_id(), None);
    }

    #[test]
    fn complete_assigns_id_and_sticks() {
        let handle = TaskHandle::pending();
        handle.complete(CloudAnchorId::from("ua-1"));
        assert_eq!(handle.state(), TaskPoll::Success);
        assert_eq!(handle.cloud_id(), Some(CloudAnchorId::from("ua-1")));

        // Terminal state is immutable.
        handle.fail(TaskFailure::Internal);
        assert_eq!(handle.state(), TaskPoll::Success);
    }

    #[test]
    fn fail_sticks_and_keeps_missing_id() {
        let handle = TaskHandle::pending();
        handle.fail(TaskFailure::ResourceExhausted);
        assert_eq!(
            handle.state(),
            TaskPoll::Failed(TaskFailure::ResourceExhausted)
        );
        handle.complete(CloudAnchorId::from("ua-2"));
        assert_eq!(
            handle.state(),
            TaskPoll::Failed(TaskFailure::ResourceExhausted)
        );
        assert_eq!(handle.cloud_id(), None);
    }

    #[test]
    fn clones_share_state() {
        let handle = TaskHandle::pending();
        let observer = handle.clone();
        handle.complete(CloudAnchorId::from("ua-3"));
        assert_eq!(observer.state(), TaskPoll::Success);
    }
}
