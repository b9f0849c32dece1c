//! Mapping-quality policy: the indicator geometry and the hosting gate.
//!
//! The gate is a pure decision function. Distance and viewing-angle checks
//! are cheap geometric pre-filters; the reported map quality is the
//! authoritative signal once those pass.

use std::f32::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{PlaneAlignment, Pose, Vec3};

/// Service-reported confidence that enough feature data has been captured
/// around the anchor to host it reliably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingQuality {
    Insufficient,
    Sufficient,
    Good,
}

impl MappingQuality {
    /// Whether this reading passes the hosting gate's quality check.
    pub fn is_sufficient(self) -> bool {
        self >= MappingQuality::Sufficient
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MappingQuality::Insufficient => "Insufficient",
            MappingQuality::Sufficient => "Sufficient",
            MappingQuality::Good => "Good",
        }
    }
}

impl fmt::Display for MappingQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of azimuth sectors tracked around the indicator.
const SECTOR_COUNT: usize = 12;

/// Sectors that must be covered before the indicator reports its quality
/// threshold reached.
const SECTORS_REQUIRED: usize = 8;

/// Viewing directions within this many degrees of straight-down count as a
/// top view.
const TOP_VIEW_THRESHOLD_DEG: f32 = 15.0;

/// Local geometric proxy for hosting readiness.
///
/// Created alongside the anchor, destroyed with it. `observe` is fed the
/// camera pose and the latest reported quality once per tick; the gate then
/// reads the derived flags.
#[derive(Debug, Clone)]
pub struct QualityIndicator {
    position: Vec3,
    radius: f32,
    alignment: PlaneAlignment,
    covered: [bool; SECTOR_COUNT],
    top_view: bool,
}

impl QualityIndicator {
    pub fn new(position: Vec3, radius: f32, alignment: PlaneAlignment) -> Self {
        QualityIndicator {
            position,
            radius,
            alignment,
            covered: [false; SECTOR_COUNT],
            top_view: false,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn alignment(&self) -> PlaneAlignment {
        self.alignment
    }

    /// Whether the camera is currently looking at the anchor from the top.
    pub fn top_view_reached(&self) -> bool {
        self.top_view
    }

    /// Whether enough azimuth sectors have seen sufficient quality.
    pub fn quality_threshold_reached(&self) -> bool {
        self.covered.iter().filter(|&&c| c).count() >= SECTORS_REQUIRED
    }

    /// Fraction of the surrounding azimuth observed with sufficient quality.
    pub fn coverage(&self) -> f32 {
        self.covered.iter().filter(|&&c| c).count() as f32 / SECTOR_COUNT as f32
    }

    /// Update derived state from the current camera pose and quality reading.
    ///
    /// A sector is marked covered when viewed with sufficient reported
    /// quality from inside the valid distance band; coverage never unwinds.
    /// The top-view flag tracks the current pose only.
    pub fn observe(&mut self, camera: &Pose, reported: MappingQuality, gate: &QualityGate) {
        let offset = camera.position.sub(self.position);
        let distance = offset.length();

        self.top_view = {
            let to_anchor = self.position.sub(camera.position).normalized();
            let down = Vec3::new(0.0, -1.0, 0.0);
            let cos = to_anchor.dot(down).clamp(-1.0, 1.0);
            cos.acos().to_degrees() < TOP_VIEW_THRESHOLD_DEG
        };

        let in_band =
            distance >= gate.min_distance_factor * self.radius && distance <= gate.max_distance;
        if in_band && reported.is_sufficient() {
            self.covered[self.sector_of(offset)] = true;
        }
    }

    fn sector_of(&self, offset: Vec3) -> usize {
        let azimuth = offset.x.atan2(offset.z); // (-PI, PI]
        let normalized = (azimuth + PI) / TAU; // [0, 1)
        ((normalized * SECTOR_COUNT as f32) as usize).min(SECTOR_COUNT - 1)
    }
}

/// Why the gate refused to host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    TooClose,
    TooFar,
    TopView,
    InsufficientCoverage,
}

impl BlockReason {
    /// User-facing instruction for this refusal.
    pub fn instruction(self) -> &'static str {
        match self {
            BlockReason::TooClose => "You are too close, move backward.",
            BlockReason::TooFar => "You are too far, come closer.",
            BlockReason::TopView => {
                "You are looking from the top view, move around from all sides."
            }
            BlockReason::InsufficientCoverage => {
                "Save the object here by capturing it from all sides."
            }
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.instruction())
    }
}

/// Gating verdict: host now, or hold with a reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Proceed,
    Block(BlockReason),
}

impl GateVerdict {
    pub fn is_proceed(self) -> bool {
        matches!(self, GateVerdict::Proceed)
    }
}

/// Distance limits for the hosting gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityGate {
    /// Minimum camera distance, as a multiple of the indicator radius.
    pub min_distance_factor: f32,
    /// Maximum camera distance, meters.
    pub max_distance: f32,
}

impl Default for QualityGate {
    fn default() -> Self {
        QualityGate {
            min_distance_factor: 1.5,
            max_distance: 10.0,
        }
    }
}

impl QualityGate {
    /// Decide whether hosting may start. First matching rule wins:
    /// distance too small, distance too large, top view, then the
    /// authoritative quality check (skipped once the indicator's own
    /// threshold has been reached).
    pub fn evaluate(
        &self,
        camera: &Pose,
        indicator: &QualityIndicator,
        reported: MappingQuality,
    ) -> GateVerdict {
        let distance = camera.position.distance(indicator.position());

        if distance < self.min_distance_factor * indicator.radius() {
            return GateVerdict::Block(BlockReason::TooClose);
        }
        if distance > self.max_distance {
            return GateVerdict::Block(BlockReason::TooFar);
        }
        if indicator.top_view_reached() {
            return GateVerdict::Block(BlockReason::TopView);
        }
        if !indicator.quality_threshold_reached() && !reported.is_sufficient() {
            return GateVerdict::Block(BlockReason::InsufficientCoverage);
        }
        GateVerdict::Proceed
    }
}
