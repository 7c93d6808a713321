//! Spatial value types.
//!
//! Positions are reported in world-space meters. The server sends them as
//! flat `X`/`Y`/`Z` fields on each entity, so [`Vec3`] is usually embedded
//! with `#[serde(flatten)]`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A point or direction in 3D world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct Vec3 {
    /// X component.
    #[serde(default)]
    pub x: f64,
    /// Y component.
    #[serde(default)]
    pub y: f64,
    /// Z component.
    #[serde(default)]
    pub z: f64,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a vector from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance to `other`.
    ///
    /// This is the movement metric used for change detection; the square
    /// root is never needed because thresholds are expressed squared.
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        dz.mul_add(dz, dx.mul_add(dx, dy * dy))
    }

    /// Whether all components are exactly zero.
    ///
    /// The server reports players without a body at the origin.
    #[allow(clippy::float_cmp)]
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

/// An orientation quaternion as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "PascalCase")]
#[ts(export, export_to = "bindings/")]
pub struct Quaternion {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
    /// W (scalar) component.
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}
