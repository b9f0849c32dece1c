//! Deterministic simulation harness.
//!
//! Backs the CLI's demo sessions and the integration tests with scripted
//! collaborators: an input source that replays a touch script, a scene with
//! preset planes and a movable camera, recording display/renderer sinks,
//! and an anchor service whose tasks complete after an explicit number of
//! [`SimulatedAnchorService::step`] calls instead of wall-clock time.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::ServiceError;
use crate::geometry::{Plane, PlaneAlignment, Pose, Vec3};
use crate::quality::MappingQuality;
use crate::scene::{
    ContentRenderer, DisplayChannel, HitPoseConvention, InputSource, PrefabKind, RaycastFilter,
    RaycastHit, ScreenPoint, SpatialTracker, StatusDisplay, TouchEvent, TouchPhase,
};
use crate::service::{AnchorAttachment, CloudAnchorService, TaskFailure, TaskHandle};
use crate::types::{CloudAnchorId, PlaneId};

/// Input source that replays a prerecorded per-tick script.
pub struct ScriptedInput {
    script: VecDeque<Option<TouchEvent>>,
}

impl ScriptedInput {
    pub fn new(script: Vec<Option<TouchEvent>>) -> Self {
        ScriptedInput {
            script: script.into(),
        }
    }

    /// No input at all.
    pub fn silent() -> Self {
        ScriptedInput::new(Vec::new())
    }

    /// `quiet_ticks` empty polls, then a single touch-began at screen center.
    pub fn tap_after(quiet_ticks: usize) -> Self {
        let mut script = vec![None; quiet_ticks];
        script.push(Some(TouchEvent {
            phase: TouchPhase::Began,
            position: ScreenPoint { x: 0.5, y: 0.5 },
        }));
        ScriptedInput::new(script)
    }
}

impl InputSource for ScriptedInput {
    fn poll_touch(&mut self) -> Option<TouchEvent> {
        self.script.pop_front().flatten()
    }
}

/// Scene with preset planes, a movable camera, and recorded visibility.
pub struct SimScene {
    planes: Vec<Plane>,
    camera: Mutex<Pose>,
    planes_visible: AtomicBool,
    convention: HitPoseConvention,
    phantom_hit: Option<PlaneId>,
}

impl SimScene {
    pub fn new(planes: Vec<Plane>) -> Self {
        SimScene {
            planes,
            camera: Mutex::new(Pose::at(Vec3::new(0.0, 1.6, -2.0))),
            planes_visible: AtomicBool::new(true),
            convention: HitPoseConvention::Oriented,
            phantom_hit: None,
        }
    }

    /// No planes tracked; every raycast misses.
    pub fn empty() -> Self {
        SimScene::new(Vec::new())
    }

    /// One horizontal-up floor plane at the origin.
    pub fn with_floor() -> Self {
        SimScene::new(vec![Plane {
            id: PlaneId(1),
            alignment: PlaneAlignment::HorizontalUp,
            center: Pose::at(Vec3::ZERO),
        }])
    }

    /// Raycasts report a hit on a plane id that cannot be resolved.
    pub fn with_phantom_hit(id: PlaneId) -> Self {
        let mut scene = SimScene::empty();
        scene.phantom_hit = Some(id);
        scene
    }

    pub fn convention(mut self, convention: HitPoseConvention) -> Self {
        self.convention = convention;
        self
    }

    pub fn set_camera(&self, pose: Pose) {
        *self.camera.lock() = pose;
    }

    pub fn planes_visible(&self) -> bool {
        self.planes_visible.load(Ordering::Relaxed)
    }
}

impl SpatialTracker for SimScene {
    fn raycast(&self, _point: ScreenPoint, _filter: RaycastFilter) -> Vec<RaycastHit> {
        if let Some(id) = self.phantom_hit {
            return vec![RaycastHit {
                plane_id: id,
                pose: Pose::at(Vec3::ZERO),
            }];
        }
        self.planes
            .first()
            .map(|plane| {
                vec![RaycastHit {
                    plane_id: plane.id,
                    pose: plane.center,
                }]
            })
            .unwrap_or_default()
    }

    fn resolve_plane(&self, id: PlaneId) -> Option<Plane> {
        self.planes.iter().find(|p| p.id == id).copied()
    }

    fn tracked_planes(&self) -> Vec<Plane> {
        self.planes.clone()
    }

    fn camera_pose(&self) -> Pose {
        *self.camera.lock()
    }

    fn set_planes_visible(&self, visible: bool) {
        self.planes_visible.store(visible, Ordering::Relaxed);
    }

    fn hit_pose_convention(&self) -> HitPoseConvention {
        self.convention
    }
}

/// Renderer that records every materialization request.
#[derive(Default)]
pub struct RecordingRenderer {
    spawned: Mutex<Vec<(PrefabKind, Pose)>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        RecordingRenderer::default()
    }

    pub fn spawned(&self) -> Vec<(PrefabKind, Pose)> {
        self.spawned.lock().clone()
    }
}

impl ContentRenderer for RecordingRenderer {
    fn materialize(&self, kind: PrefabKind, pose: Pose) {
        self.spawned.lock().push((kind, pose));
    }
}

/// Display sink that keeps the latest text per channel plus a full log.
#[derive(Default)]
pub struct RecordingDisplay {
    latest: Mutex<HashMap<DisplayChannel, String>>,
    log: Mutex<Vec<(DisplayChannel, String)>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        RecordingDisplay::default()
    }

    pub fn text(&self, channel: DisplayChannel) -> Option<String> {
        self.latest.lock().get(&channel).cloned()
    }

    pub fn log(&self) -> Vec<(DisplayChannel, String)> {
        self.log.lock().clone()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn set_text(&self, channel: DisplayChannel, text: &str) {
        self.latest.lock().insert(channel, text.to_string());
        self.log.lock().push((channel, text.to_string()));
    }
}

/// How a simulated task should end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimOutcome {
    Succeed,
    Fail(TaskFailure),
    /// `host` returns no task handle at all.
    RefuseSubmission,
}

/// Anchor service whose tasks complete after `latency_steps` calls to
/// [`SimulatedAnchorService::step`]. Quality readings and task outcomes are
/// scripted by the test or the CLI loop.
pub struct SimulatedAnchorService {
    latency_steps: u32,
    outcome: Mutex<SimOutcome>,
    quality: Mutex<MappingQuality>,
    inflight: Mutex<Vec<(TaskHandle, u32)>>,
    next_id: AtomicU64,
}

impl SimulatedAnchorService {
    pub fn new(latency_steps: u32) -> Self {
        SimulatedAnchorService {
            latency_steps,
            outcome: Mutex::new(SimOutcome::Succeed),
            quality: Mutex::new(MappingQuality::Insufficient),
            inflight: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn set_quality(&self, quality: MappingQuality) {
        *self.quality.lock() = quality;
    }

    pub fn set_outcome(&self, outcome: SimOutcome) {
        *self.outcome.lock() = outcome;
    }

    /// Advance every in-flight task by one step; tasks whose latency has
    /// elapsed reach their scripted terminal state.
    pub fn step(&self) {
        let outcome = *self.outcome.lock();
        let mut inflight = self.inflight.lock();
        for (handle, remaining) in inflight.iter_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                match outcome {
                    SimOutcome::Succeed | SimOutcome::RefuseSubmission => {
                        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                        handle.complete(CloudAnchorId(format!("ua-sim-{:04}", id)));
                    }
                    SimOutcome::Fail(failure) => handle.fail(failure),
                }
            }
        }
        inflight.retain(|(_, remaining)| *remaining > 0);
    }

    /// Tasks submitted but not yet driven to completion.
    pub fn inflight_len(&self) -> usize {
        self.inflight.lock().len()
    }
}

impl CloudAnchorService for SimulatedAnchorService {
    fn attach(&self, plane: &Plane, pose: Pose) -> Result<AnchorAttachment, ServiceError> {
        Ok(AnchorAttachment {
            plane: plane.id,
            pose,
        })
    }

    fn estimate_quality(&self, _camera: &Pose) -> MappingQuality {
        *self.quality.lock()
    }

    fn host(&self, _anchor: &AnchorAttachment, _ttl_days: u32) -> Option<TaskHandle> {
        if *self.outcome.lock() == SimOutcome::RefuseSubmission {
            return None;
        }
        let handle = TaskHandle::pending();
        self.inflight
            .lock()
            .push((handle.clone(), self.latency_steps.max(1)));
        Some(handle)
    }
}
