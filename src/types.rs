//! Common types for 3D cargo geometry.
//!
//! Axis conventions used throughout the crate:
//! - `x` runs along the container width,
//! - `y` runs along the container depth; `y = 0` is the open access face,
//! - `z` runs along the container height; `z = 0` is the floor.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Represents a 3D vector or point in space.
///
/// Used for positions, extents, and calculations in 3D space.
///
/// # Examples
/// ```
/// use stowage::types::Vec3;
///
/// let position = Vec3::new(1.0, 2.0, 3.0);
/// let extent = Vec3::new(10.0, 20.0, 30.0);
/// let far_corner = position + extent;
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Calculates the volume (product of all components).
    ///
    /// Useful for extent vectors.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Checks if all components are positive and finite.
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        self.x > 0.0
            && self.y > 0.0
            && self.z > 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// # Parameters
    /// * `outer` - The outer vector (e.g., container extents)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, outer: &Self, tolerance: f64) -> bool {
        self.x <= outer.x + tolerance
            && self.y <= outer.y + tolerance
            && self.z <= outer.z + tolerance
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// Represents an Axis-Aligned Bounding Box (AABB).
///
/// Placed cargo occupies the region between `min` (near the floor and the
/// access face) and `max` (the far corner).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + extent)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from an anchor position and extents.
    #[inline]
    pub fn from_origin_and_extent(origin: Vec3, extent: Vec3) -> Self {
        Self {
            min: origin,
            max: origin + extent,
        }
    }

    /// Checks if two bounding boxes intersect.
    ///
    /// Implements the Separating Axis Theorem (SAT) for AABBs: two boxes do
    /// NOT intersect when they are fully separated along at least one axis.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z)
    }

    /// Returns the extents (width, depth, height) of the box.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the enclosed volume.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.extent().volume()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn vec3_volume() {
        let extent = Vec3::new(10.0, 20.0, 30.0);
        assert!((extent.volume() - 6000.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn vec3_fits_within() {
        let small = Vec3::new(5.0, 5.0, 5.0);
        let large = Vec3::new(10.0, 10.0, 10.0);

        assert!(small.fits_within(&large, EPSILON_GENERAL));
        assert!(!large.fits_within(&small, EPSILON_GENERAL));
    }

    #[test]
    fn vec3_validity() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_valid_dimension());
        assert!(!Vec3::new(0.0, 2.0, 3.0).is_valid_dimension());
        assert!(!Vec3::new(1.0, -2.0, 3.0).is_valid_dimension());
        assert!(!Vec3::new(1.0, f64::NAN, 3.0).is_valid_dimension());
        assert!(!Vec3::new(1.0, 2.0, f64::INFINITY).is_valid_dimension());
    }

    #[test]
    fn bounding_box_intersects() {
        let a = BoundingBox::from_origin_and_extent(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        let b = BoundingBox::from_origin_and_extent(
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(10.0, 10.0, 10.0),
        );
        let c = BoundingBox::from_origin_and_extent(
            Vec3::new(20.0, 20.0, 20.0),
            Vec3::new(10.0, 10.0, 10.0),
        );

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn touching_boxes_do_not_intersect() {
        let a = BoundingBox::from_origin_and_extent(Vec3::zero(), Vec3::new(10.0, 10.0, 10.0));
        let b = BoundingBox::from_origin_and_extent(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 10.0),
        );

        assert!(!a.intersects(&b));
    }

    #[test]
    fn bounding_box_extent_and_volume() {
        let bbox = BoundingBox::from_origin_and_extent(
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(10.0, 20.0, 30.0),
        );
        assert_eq!(bbox.extent(), Vec3::new(10.0, 20.0, 30.0));
        assert!((bbox.volume() - 6000.0).abs() < EPSILON_GENERAL);
    }
}
