//! Task registry: the pending set and the completed cache.
//!
//! At most one cloud task may ever be active per anchor in a session; the
//! registry enforces that at the submission boundary instead of scattering
//! the check across call sites.

use tracing::debug;

use crate::error::SessionError;
use crate::geometry::Pose;
use crate::service::{TaskFailure, TaskHandle, TaskPoll};
use crate::types::{CloudAnchorId, SessionMode};

/// One outstanding or completed cloud operation.
///
/// Mutated only by [`TaskRegistry::poll_and_classify`]; immutable once it
/// reaches the cache.
#[derive(Debug, Clone)]
pub struct AnchorTask {
    handle: TaskHandle,
    mode: SessionMode,
    pose: Pose,
    last_observed: TaskPoll,
}

impl AnchorTask {
    pub fn new(handle: TaskHandle, mode: SessionMode, pose: Pose) -> Self {
        AnchorTask {
            handle,
            mode,
            pose,
            last_observed: TaskPoll::InProgress,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn cloud_id(&self) -> Option<CloudAnchorId> {
        self.handle.cloud_id()
    }

    /// State as of the last classification pass.
    pub fn last_observed(&self) -> TaskPoll {
        self.last_observed
    }
}

/// What a classification pass observed for one task that reached a terminal
/// state. Mode-dependent side effects are applied by the caller.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Succeeded {
        mode: SessionMode,
        cloud_id: Option<CloudAnchorId>,
        pose: Pose,
    },
    Failed {
        mode: SessionMode,
        failure: TaskFailure,
        cloud_id: Option<CloudAnchorId>,
        pose: Pose,
    },
}

/// Owns the pending set and the completed cache.
///
/// Pending order is submission order (there is at most one entry during the
/// hosting flow); cache order is completion order and append-only.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    pending: Vec<AnchorTask>,
    cache: Vec<AnchorTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        TaskRegistry::default()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Whether any task is pending or cached.
    pub fn has_activity(&self) -> bool {
        !self.pending.is_empty() || !self.cache.is_empty()
    }

    pub fn pending(&self) -> &[AnchorTask] {
        &self.pending
    }

    pub fn cache(&self) -> &[AnchorTask] {
        &self.cache
    }

    /// Register a newly submitted task.
    ///
    /// Fails with [`SessionError::AlreadyActive`] whenever the pending set or
    /// the cache is non-empty: one cloud task per anchor, across the whole
    /// session.
    pub fn submit(&mut self, task: AnchorTask) -> Result<(), SessionError> {
        if self.has_activity() {
            return Err(SessionError::AlreadyActive);
        }
        debug!(mode = %task.mode(), "cloud task submitted");
        self.pending.push(task);
        Ok(())
    }

    /// Read every pending task's current remote state and move the ones that
    /// reached a terminal state into the cache, in completion order.
    ///
    /// Idempotent drain: with no underlying state change a second call
    /// observes nothing and returns no outcomes.
    pub fn poll_and_classify(&mut self) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for mut task in self.pending.drain(..) {
            task.last_observed = task.handle.state();
            match task.last_observed {
                TaskPoll::InProgress => still_pending.push(task),
                TaskPoll::Success => {
                    outcomes.push(TaskOutcome::Succeeded {
                        mode: task.mode,
                        cloud_id: task.cloud_id(),
                        pose: task.pose,
                    });
                    self.cache.push(task);
                }
                TaskPoll::Failed(failure) => {
                    outcomes.push(TaskOutcome::Failed {
                        mode: task.mode,
                        failure,
                        cloud_id: task.cloud_id(),
                        pose: task.pose,
                    });
                    self.cache.push(task);
                }
            }
        }

        self.pending = still_pending;
        outcomes
    }

    /// Re-enqueue the first cached entry into the pending set.
    ///
    /// Used once, by the final resolution pass, which iterates pending and
    /// then latches the session done — so the entry deliberately ends up in
    /// both lists and is never polled again. This mirrors the shipped
    /// behavior exactly; see DESIGN.md before "fixing" it.
    pub fn requeue_cached_front(&mut self) {
        if let Some(front) = self.cache.first() {
            self.pending.push(front.clone());
        }
    }
}
