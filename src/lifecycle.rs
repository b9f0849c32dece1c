//! Per-tick session driver.
//!
//! Advances one shared anchor through placement, quality-gated hosting, and
//! the final one-shot resolution pass. Runs cooperatively: `tick` never
//! blocks, and all cloud work is observed by polling task handles.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::PlacementError;
use crate::history::{HistoryRecord, HistoryStore};
use crate::placement::{Placement, PlacementService};
use crate::quality::{GateVerdict, QualityGate};
use crate::registry::{AnchorTask, TaskOutcome, TaskRegistry};
use crate::scene::{
    ContentRenderer, DisplayChannel, InputSource, PrefabKind, ScreenPoint, SpatialTracker,
    StatusDisplay, TouchPhase,
};
use crate::service::CloudAnchorService;
use crate::types::{CloudAnchorId, SessionMode};

/// Where the session currently is. Derived from orchestrator state; the
/// transitions themselves happen inside [`LifecycleOrchestrator::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Letting tracking stabilize before accepting input.
    WarmingUp,
    /// Waiting for a touch to place the anchor.
    AwaitingInput,
    /// Anchor placed, gathering mapping quality before hosting.
    AwaitingAnchor,
    /// A hosting task is pending.
    Hosting,
    /// A task completed; the one-shot resolution pass runs next tick.
    Resolving,
    /// Steady state, nothing further happens.
    Done,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::WarmingUp => "warming-up",
            SessionPhase::AwaitingInput => "awaiting-input",
            SessionPhase::AwaitingAnchor => "awaiting-anchor",
            SessionPhase::Hosting => "hosting",
            SessionPhase::Resolving => "resolving",
            SessionPhase::Done => "done",
        }
    }
}

/// Drives the anchor lifecycle once per external tick.
pub struct LifecycleOrchestrator {
    mode: SessionMode,
    gate: QualityGate,
    warmup: Duration,
    host_ttl_days: u32,

    tracker: Arc<dyn SpatialTracker>,
    service: Arc<dyn CloudAnchorService>,
    renderer: Arc<dyn ContentRenderer>,
    display: Arc<dyn StatusDisplay>,
    input: Box<dyn InputSource>,
    history: Arc<HistoryStore>,

    placer: PlacementService,
    registry: TaskRegistry,
    placement: Option<Placement>,
    elapsed: Duration,
    done: bool,
}

impl LifecycleOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mode: SessionMode,
        config: &SessionConfig,
        tracker: Arc<dyn SpatialTracker>,
        service: Arc<dyn CloudAnchorService>,
        renderer: Arc<dyn ContentRenderer>,
        display: Arc<dyn StatusDisplay>,
        input: Box<dyn InputSource>,
        history: Arc<HistoryStore>,
    ) -> Self {
        let placer =
            PlacementService::new(tracker.clone(), service.clone(), renderer.clone(), config);
        LifecycleOrchestrator {
            mode,
            gate: config.gate(),
            warmup: Duration::from_secs_f32(config.warmup_secs.max(0.0)),
            host_ttl_days: config.host_ttl_days,
            tracker,
            service,
            renderer,
            display,
            input,
            history,
            placer,
            registry: TaskRegistry::new(),
            placement: None,
            elapsed: Duration::ZERO,
            done: false,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn phase(&self) -> SessionPhase {
        if self.done {
            SessionPhase::Done
        } else if self.registry.cache_len() > 0 {
            SessionPhase::Resolving
        } else if self.elapsed < self.warmup {
            SessionPhase::WarmingUp
        } else if self.placement.is_none() {
            SessionPhase::AwaitingInput
        } else if self.registry.pending_len() > 0 {
            SessionPhase::Hosting
        } else {
            SessionPhase::AwaitingAnchor
        }
    }

    /// Advance the session by one tick. Never blocks.
    pub fn tick(&mut self, dt: Duration) {
        if !self.done {
            if self.registry.cache_len() == 0 {
                self.advance_capture(dt);
            } else {
                self.resolution_pass();
                self.done = true;
                info!(mode = %self.mode, "session complete");
            }
        } else {
            // No further placement is possible; keep plane overlays hidden.
            self.tracker.set_planes_visible(false);
        }

        self.display.set_text(
            DisplayChannel::AnchorCount,
            &format!("Cached anchors: {}", self.registry.cache_len()),
        );
    }

    fn advance_capture(&mut self, dt: Duration) {
        if self.elapsed < self.warmup {
            self.elapsed += dt;
            return;
        }

        if self.placement.is_none() {
            match self.input.poll_touch() {
                Some(touch) if touch.phase == TouchPhase::Began => {
                    self.try_place(touch.position);
                }
                _ => {
                    self.display.set_text(
                        DisplayChannel::Instruction,
                        "Tap on a surface to place the anchor.",
                    );
                    return;
                }
            }
        }

        self.advance_hosting();
        for outcome in self.registry.poll_and_classify() {
            self.apply_outcome(outcome);
        }
    }

    fn try_place(&mut self, point: ScreenPoint) {
        let camera = self.tracker.camera_pose();
        match self.placer.place_at(point, &camera) {
            Ok(placement) => {
                info!(plane = %placement.anchor.plane, "anchor placed");
                self.display.set_text(
                    DisplayChannel::Status,
                    "Waiting for sufficient mapping quality...",
                );
                self.placement = Some(placement);
            }
            Err(PlacementError::NoSurfaceHit) => {
                // Recoverable; the next tick re-prompts.
                debug!("touch did not hit a tracked surface");
            }
            Err(err) => {
                warn!(%err, "placement failed");
                self.display
                    .set_text(DisplayChannel::Status, &format!("Placement failed: {}", err));
            }
        }
    }

    fn advance_hosting(&mut self) {
        let Some(placement) = self.placement.as_mut() else {
            return;
        };
        // A pending or finished task means there is nothing to gate.
        if self.registry.has_activity() {
            return;
        }

        let camera = self.tracker.camera_pose();
        let reported = self.service.estimate_quality(&camera);
        self.display.set_text(
            DisplayChannel::Quality,
            &format!("Current map quality: {}", reported),
        );

        placement.indicator.observe(&camera, reported, &self.gate);
        if let GateVerdict::Block(reason) = self.gate.evaluate(&camera, &placement.indicator, reported)
        {
            self.display
                .set_text(DisplayChannel::Instruction, reason.instruction());
            return;
        }

        self.display
            .set_text(DisplayChannel::Instruction, "Starting hosting...");
        match self.service.host(&placement.anchor, self.host_ttl_days) {
            None => {
                warn!("anchor service refused to create a hosting task");
                self.display
                    .set_text(DisplayChannel::Status, "Failed to create a cloud anchor task.");
            }
            Some(handle) => {
                info!(ttl_days = self.host_ttl_days, "hosting task submitted");
                let task = AnchorTask::new(handle, self.mode, placement.anchor.pose);
                if let Err(err) = self.registry.submit(task) {
                    // Unreachable given the activity guard above.
                    error!(%err, "task registry rejected a guarded submission");
                }
            }
        }
    }

    fn apply_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Succeeded {
                mode,
                cloud_id,
                pose,
            } => match mode {
                SessionMode::Hosting => {
                    let Some(id) = cloud_id else {
                        error!("hosting task completed without a cloud anchor id");
                        return;
                    };
                    info!(cloud_id = %id, "cloud anchor hosted");
                    self.record_hosted(id.clone());
                    self.display.set_text(
                        DisplayChannel::Instruction,
                        &format!("Successfully hosted the cloud anchor: {}.", id),
                    );
                }
                SessionMode::Resolving => {
                    let shown = display_id(&cloud_id);
                    info!(cloud_id = %shown, "cloud anchor resolved");
                    self.display.set_text(
                        DisplayChannel::Instruction,
                        &format!("Successfully resolved the cloud anchor: {}.", shown),
                    );
                    self.renderer.materialize(PrefabKind::Content, pose);
                }
            },
            TaskOutcome::Failed {
                mode,
                failure,
                cloud_id,
                ..
            } => {
                let text = match mode {
                    SessionMode::Hosting => {
                        format!("Failed to host the cloud anchor: {}.", failure)
                    }
                    SessionMode::Resolving => format!(
                        "Failed to resolve the cloud anchor {}: {}.",
                        display_id(&cloud_id),
                        failure
                    ),
                };
                warn!(mode = %mode, %failure, "cloud task failed");
                self.display.set_text(DisplayChannel::Instruction, &text);
            }
        }
    }

    fn record_hosted(&self, id: CloudAnchorId) {
        // Sequential naming: the record count at completion time picks the
        // name. Concurrent writers can collide; see DESIGN.md.
        let count = self.history.count();
        let record = HistoryRecord::new(format!("CloudAnchor{}", count), id);
        if let Err(err) = self.history.append(&record) {
            warn!(%err, "failed to persist hosted anchor record");
            self.display
                .set_text(DisplayChannel::Status, "Failed to record the hosted anchor.");
        }
    }

    /// One-shot pass once a completed task exists: re-enqueue the first
    /// cached entry and materialize content for everything pending. The
    /// caller latches `done` immediately after, so this runs exactly once.
    fn resolution_pass(&mut self) {
        self.registry.requeue_cached_front();
        for task in self.registry.pending() {
            let shown = display_id(&task.cloud_id());
            self.display.set_text(
                DisplayChannel::Instruction,
                &format!("Successfully resolved the cloud anchor: {}.", shown),
            );
            self.renderer.materialize(PrefabKind::Content, task.pose());
        }
    }
}

fn display_id(id: &Option<CloudAnchorId>) -> String {
    id.as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "<unassigned>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RecordingDisplay, RecordingRenderer, ScriptedInput, SimScene, SimulatedAnchorService};
    use tempfile::TempDir;

    fn orchestrator(
        input: ScriptedInput,
        warmup_secs: f32,
    ) -> (LifecycleOrchestrator, TempDir) {
        let dir = TempDir::new().unwrap();
        let history = Arc::new(HistoryStore::open(dir.path().join("history")).unwrap());
        let mut config = SessionConfig::default();
        config.warmup_secs = warmup_secs;
        let orchestrator = LifecycleOrchestrator::new(
            SessionMode::Hosting,
            &config,
            Arc::new(SimScene::with_floor()),
            Arc::new(SimulatedAnchorService::new(2)),
            Arc::new(RecordingRenderer::new()),
            Arc::new(RecordingDisplay::new()),
            Box::new(input),
            history,
        );
        (orchestrator, dir)
    }

    #[test]
    fn warmup_gates_input() {
        let (mut orchestrator, _dir) = orchestrator(ScriptedInput::tap_after(0), 3.0);
        assert_eq!(orchestrator.phase(), SessionPhase::WarmingUp);

        // Three one-second ticks accumulate the warm-up; input is not
        // polled until the tick after it elapses.
        for _ in 0..3 {
            orchestrator.tick(Duration::from_secs(1));
            assert!(orchestrator.registry().pending_len() == 0);
        }
        assert_eq!(orchestrator.phase(), SessionPhase::AwaitingInput);

        orchestrator.tick(Duration::from_secs(1));
        assert_ne!(orchestrator.phase(), SessionPhase::AwaitingInput);
    }

    #[test]
    fn no_input_keeps_prompting() {
        let (mut orchestrator, _dir) = orchestrator(ScriptedInput::silent(), 0.0);
        for _ in 0..5 {
            orchestrator.tick(Duration::from_millis(100));
        }
        assert_eq!(orchestrator.phase(), SessionPhase::AwaitingInput);
    }
}
