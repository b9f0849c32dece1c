//! Placement: turn a touch into an anchored pose plus a quality indicator.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::PlacementError;
use crate::geometry::Pose;
use crate::quality::QualityIndicator;
use crate::scene::{
    ContentRenderer, HitPoseConvention, PrefabKind, RaycastFilter, ScreenPoint, SpatialTracker,
};
use crate::service::{AnchorAttachment, CloudAnchorService};

/// A committed anchor and its quality indicator. At most one per session.
#[derive(Debug, Clone)]
pub struct Placement {
    pub anchor: AnchorAttachment,
    pub indicator: QualityIndicator,
}

/// Converts a hit test into a committed anchor.
pub struct PlacementService {
    tracker: Arc<dyn SpatialTracker>,
    service: Arc<dyn CloudAnchorService>,
    renderer: Arc<dyn ContentRenderer>,
    indicator_radius: f32,
    indicator_radius_steep: f32,
}

impl PlacementService {
    pub fn new(
        tracker: Arc<dyn SpatialTracker>,
        service: Arc<dyn CloudAnchorService>,
        renderer: Arc<dyn ContentRenderer>,
        config: &SessionConfig,
    ) -> Self {
        PlacementService {
            tracker,
            service,
            renderer,
            indicator_radius: config.indicator_radius,
            indicator_radius_steep: config.indicator_radius_steep,
        }
    }

    /// Hit-test the touch point against tracked plane interiors and attach
    /// an anchor at the hit pose.
    ///
    /// Misses are recoverable: the caller re-prompts for input. A hit whose
    /// plane cannot be resolved is logged and surfaced as
    /// [`PlacementError::PlaneUnresolved`].
    pub fn place_at(
        &self,
        point: ScreenPoint,
        camera: &Pose,
    ) -> Result<Placement, PlacementError> {
        let hits = self
            .tracker
            .raycast(point, RaycastFilter::PlaneWithinPolygon);
        let hit = hits.first().copied().ok_or(PlacementError::NoSurfaceHit)?;

        let plane = self.tracker.resolve_plane(hit.plane_id).ok_or_else(|| {
            warn!(plane = %hit.plane_id, "hit surface is not a tracked plane");
            PlacementError::PlaneUnresolved(hit.plane_id)
        })?;

        // Backends that return arbitrary hit rotations get a yaw-only
        // rotation pointing away from the camera heading, so the quality
        // logic behaves the same across platforms.
        let pose = match self.tracker.hit_pose_convention() {
            HitPoseConvention::Oriented => hit.pose,
            HitPoseConvention::CameraYaw => hit.pose.with_yaw_only(camera.rotation.yaw()),
        };

        let anchor = self.service.attach(&plane, pose)?;
        debug!(plane = %plane.id, "anchor attached");

        let radius = if plane.alignment.is_horizontal_up() {
            self.indicator_radius
        } else {
            self.indicator_radius_steep
        };
        let indicator = QualityIndicator::new(pose.position, radius, plane.alignment);

        self.renderer.materialize(PrefabKind::AnchorMarker, pose);
        self.renderer.materialize(PrefabKind::QualityIndicator, pose);

        Ok(Placement { anchor, indicator })
    }
}
