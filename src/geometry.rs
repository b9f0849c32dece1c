//! Poses, planes, and the small amount of vector math the lifecycle needs.
//!
//! Coordinate frame: right-handed, +Y up, distances in meters. Yaw is the
//! rotation about +Y; a yaw of zero faces +Z.

use serde::{Deserialize, Serialize};

use crate::types::PlaneId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    pub fn sub(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        self.sub(other).length()
    }

    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len <= f32::EPSILON {
            Vec3::ZERO
        } else {
            Vec3::new(self.x / len, self.y / len, self.z / len)
        }
    }
}

/// Unit quaternion rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation of `yaw` radians about +Y, pitch and roll zero.
    pub fn from_yaw(yaw: f32) -> Self {
        let half = yaw * 0.5;
        Quat {
            x: 0.0,
            y: half.sin(),
            z: 0.0,
            w: half.cos(),
        }
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // q * v * q^-1 expanded for a unit quaternion.
        let u = Vec3::new(self.x, self.y, self.z);
        let s = self.w;
        let uv = Vec3::new(
            u.y * v.z - u.z * v.y,
            u.z * v.x - u.x * v.z,
            u.x * v.y - u.y * v.x,
        );
        let uuv = Vec3::new(
            u.y * uv.z - u.z * uv.y,
            u.z * uv.x - u.x * uv.z,
            u.x * uv.y - u.y * uv.x,
        );
        Vec3::new(
            v.x + 2.0 * (s * uv.x + uuv.x),
            v.y + 2.0 * (s * uv.y + uuv.y),
            v.z + 2.0 * (s * uv.z + uuv.z),
        )
    }

    /// Forward direction (+Z rotated by this rotation).
    pub fn forward(self) -> Vec3 {
        self.rotate(Vec3::new(0.0, 0.0, 1.0))
    }

    /// Heading about +Y, ignoring pitch and roll. Returns 0 when the
    /// forward direction is vertical.
    pub fn yaw(self) -> f32 {
        let f = self.forward();
        if f.x.abs() <= f32::EPSILON && f.z.abs() <= f32::EPSILON {
            0.0
        } else {
            f.x.atan2(f.z)
        }
    }
}

/// A position plus orientation in the tracking frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Pose { position, rotation }
    }

    pub fn at(position: Vec3) -> Self {
        Pose {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Same position, rotation replaced by a yaw-only rotation.
    pub fn with_yaw_only(self, yaw: f32) -> Pose {
        Pose {
            position: self.position,
            rotation: Quat::from_yaw(yaw),
        }
    }
}

/// Alignment class of a tracked plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneAlignment {
    HorizontalUp,
    HorizontalDown,
    Vertical,
    Inclined,
}

impl PlaneAlignment {
    pub fn is_horizontal_up(self) -> bool {
        matches!(self, PlaneAlignment::HorizontalUp)
    }
}

/// A tracked plane as reported by the spatial tracking backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub id: PlaneId,
    pub alignment: PlaneAlignment,
    pub center: Pose,
}
