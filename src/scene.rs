//! Collaborator contracts for the platform side of a session.
//!
//! The lifecycle core never talks to a rendering engine, an input stack, or
//! a tracking subsystem directly; it goes through these traits. Production
//! bindings live in the embedding application, the crate ships simulated
//! implementations in [`crate::sim`].

use serde::{Deserialize, Serialize};

use crate::geometry::{Plane, Pose};
use crate::types::PlaneId;

/// Screen-space point, normalized device-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Began,
    Moved,
    Ended,
}

/// A single touch sample. At most one arrives per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub position: ScreenPoint,
}

/// Raycast target filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaycastFilter {
    /// Hits inside the boundary polygon of a tracked plane.
    PlaneWithinPolygon,
    /// Hits anywhere on a tracked plane's infinite extension.
    PlaneInfinite,
}

/// One raycast intersection, nearest first in the returned ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub plane_id: PlaneId,
    pub pose: Pose,
}

/// How the tracking backend orients raycast hit poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitPoseConvention {
    /// Hit rotations are already usable for content placement.
    Oriented,
    /// Hit rotations are arbitrary; placement derives a yaw-only rotation
    /// from the camera heading instead.
    CameraYaw,
}

/// Spatial tracking subsystem: planes, raycasts, and the device camera pose.
pub trait SpatialTracker: Send + Sync {
    /// Hits ordered nearest-first. Empty when nothing was intersected.
    fn raycast(&self, point: ScreenPoint, filter: RaycastFilter) -> Vec<RaycastHit>;

    /// Look up a tracked plane by id. `None` when tracking lost it.
    fn resolve_plane(&self, id: PlaneId) -> Option<Plane>;

    fn tracked_planes(&self) -> Vec<Plane>;

    fn camera_pose(&self) -> Pose;

    /// Show or hide plane visualizations. Idempotent.
    fn set_planes_visible(&self, visible: bool);

    /// Orientation convention of this backend's hit poses.
    fn hit_pose_convention(&self) -> HitPoseConvention {
        HitPoseConvention::Oriented
    }
}

/// Input source: at most one touch event per tick.
pub trait InputSource: Send {
    fn poll_touch(&mut self) -> Option<TouchEvent>;
}

/// Kinds of objects the renderer can be asked to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefabKind {
    /// Marker shown at the anchor's pose while hosting.
    AnchorMarker,
    /// Visualization of mapping-quality coverage around the anchor.
    QualityIndicator,
    /// The shared content placed at a successfully processed anchor.
    Content,
}

/// Rendering collaborator. Fire-and-forget; the core never reads back.
pub trait ContentRenderer: Send + Sync {
    fn materialize(&self, kind: PrefabKind, pose: Pose);
}

/// Named one-way text channels on the session UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayChannel {
    /// General status and non-fatal diagnostics.
    Status,
    /// Current reported map quality.
    Quality,
    /// What the user should do next.
    Instruction,
    /// Running count of completed cloud tasks.
    AnchorCount,
}

/// Write-only display sink; no feedback into the core.
pub trait StatusDisplay: Send + Sync {
    fn set_text(&self, channel: DisplayChannel, text: &str);
}
