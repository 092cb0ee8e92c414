//! World-space vectors and heading math
//!
//! Headings are degrees in `[0, 360)`, clockwise from north (+Y).

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// 3D world position or offset (meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn length_2d(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Horizontal distance, ignoring height
    pub fn distance_2d(self, other: Self) -> f32 {
        (self - other).length_2d()
    }

    pub fn dot_2d(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 2D cross product; positive when `other` is to the
    /// left of `self`
    pub fn cross_2d(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Point `distance` meters along `heading` on the horizontal plane
    pub fn offset_along(self, heading: f32, distance: f32) -> Self {
        self + forward_vector(heading) * distance
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Wrap any angle into `[0, 360)`
pub fn normalize_heading(heading: f32) -> f32 {
    let wrapped = heading.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`, in `(-180, 180]`.
/// Positive is clockwise (a right turn).
pub fn heading_delta(from: f32, to: f32) -> f32 {
    let delta = normalize_heading(to - from);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Unit vector on the horizontal plane pointing along `heading`
pub fn forward_vector(heading: f32) -> Vec3 {
    let rad = heading.to_radians();
    Vec3::new(rad.sin(), rad.cos(), 0.0)
}

/// Heading from `from` towards `to`
pub fn bearing(from: Vec3, to: Vec3) -> f32 {
    let d = to - from;
    normalize_heading(d.x.atan2(d.y).to_degrees())
}

/// Stereo pan in `[-1, 1]` for a relative bearing (degrees, positive right)
pub fn pan_for_relative_bearing(relative: f32) -> f32 {
    relative.to_radians().sin().clamp(-1.0, 1.0)
}
