//! Registry invariants: one active task per anchor, lossless classification.

use anchorage::error::SessionError;
use anchorage::geometry::{Pose, Vec3};
use anchorage::registry::{AnchorTask, TaskOutcome, TaskRegistry};
use anchorage::service::{TaskFailure, TaskHandle, TaskPoll};
use anchorage::types::{CloudAnchorId, SessionMode};

fn new_task(mode: SessionMode) -> (TaskHandle, AnchorTask) {
    let handle = TaskHandle::pending();
    let task = AnchorTask::new(handle.clone(), mode, Pose::at(Vec3::new(0.5, 0.0, 1.0)));
    (handle, task)
}

#[test]
fn submit_fails_whenever_pending_or_cache_is_nonempty() {
    // Pending occupied.
    let mut registry = TaskRegistry::new();
    let (_handle, task) = new_task(SessionMode::Hosting);
    registry.submit(task).unwrap();
    let (_h2, second) = new_task(SessionMode::Hosting);
    assert!(matches!(
        registry.submit(second),
        Err(SessionError::AlreadyActive)
    ));

    // Cache occupied, pending empty.
    let mut registry = TaskRegistry::new();
    let (handle, task) = new_task(SessionMode::Hosting);
    registry.submit(task).unwrap();
    handle.complete(CloudAnchorId::from("ua-done"));
    registry.poll_and_classify();
    assert_eq!(registry.pending_len(), 0);
    assert_eq!(registry.cache_len(), 1);

    let (_h3, third) = new_task(SessionMode::Hosting);
    assert!(matches!(
        registry.submit(third),
        Err(SessionError::AlreadyActive)
    ));
}

#[test]
fn every_task_ends_in_exactly_one_cache_slot() {
    for terminal in [
        TaskPoll::Success,
        TaskPoll::Failed(TaskFailure::Internal),
        TaskPoll::Failed(TaskFailure::ServiceUnavailable),
    ] {
        let mut registry = TaskRegistry::new();
        let (handle, task) = new_task(SessionMode::Hosting);
        registry.submit(task).unwrap();

        // Still pending while in progress: not dropped, not duplicated.
        assert!(registry.poll_and_classify().is_empty());
        assert_eq!(registry.pending_len() + registry.cache_len(), 1);

        match terminal {
            TaskPoll::Success => handle.complete(CloudAnchorId::from("ua-x")),
            TaskPoll::Failed(failure) => handle.fail(failure),
            TaskPoll::InProgress => unreachable!(),
        }

        let outcomes = registry.poll_and_classify();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(registry.pending_len(), 0);
        assert_eq!(registry.cache_len(), 1);
        assert_eq!(registry.cache()[0].last_observed(), terminal);
    }
}

#[test]
fn drain_with_no_state_change_is_observably_idle() {
    let mut registry = TaskRegistry::new();
    let (handle, task) = new_task(SessionMode::Resolving);
    registry.submit(task).unwrap();

    // Repeated drains while in progress change nothing.
    for _ in 0..3 {
        assert!(registry.poll_and_classify().is_empty());
        assert_eq!(registry.pending_len(), 1);
        assert_eq!(registry.cache_len(), 0);
    }

    handle.fail(TaskFailure::CloudIdNotFound);
    assert_eq!(registry.poll_and_classify().len(), 1);

    // And again after the terminal transition has been drained.
    for _ in 0..3 {
        assert!(registry.poll_and_classify().is_empty());
        assert_eq!(registry.pending_len(), 0);
        assert_eq!(registry.cache_len(), 1);
    }
}

#[test]
fn failure_outcome_carries_mode_and_reason() {
    let mut registry = TaskRegistry::new();
    let (handle, task) = new_task(SessionMode::Resolving);
    registry.submit(task).unwrap();
    handle.fail(TaskFailure::NotAuthorized);

    let outcomes = registry.poll_and_classify();
    match &outcomes[0] {
        TaskOutcome::Failed { mode, failure, .. } => {
            assert_eq!(*mode, SessionMode::Resolving);
            assert_eq!(*failure, TaskFailure::NotAuthorized);
        }
        other => panic!("expected a failure outcome, got {:?}", other),
    }
}

#[test]
fn requeue_preserves_the_cached_entry() {
    let mut registry = TaskRegistry::new();
    let (handle, task) = new_task(SessionMode::Hosting);
    registry.submit(task).unwrap();
    handle.complete(CloudAnchorId::from("ua-front"));
    registry.poll_and_classify();

    // The resolution pass duplicates cache[0] into pending; the cache side
    // is untouched and keeps its terminal state.
    registry.requeue_cached_front();
    assert_eq!(registry.cache_len(), 1);
    assert_eq!(registry.pending_len(), 1);
    assert_eq!(registry.cache()[0].last_observed(), TaskPoll::Success);
    assert_eq!(
        registry.pending()[0].cloud_id().map(|id| id.to_string()),
        Some("ua-front".to_string())
    );
}
