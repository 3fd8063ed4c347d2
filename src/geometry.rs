//! Geometric helpers for collision detection and access-path planning.
//!
//! All checks operate on axis-aligned bounding boxes. The access face of a
//! container is the `y = 0` plane; anything with a smaller `min.y` sits
//! closer to the opening.

use crate::types::{BoundingBox, EPSILON_GENERAL, Vec3};

/// Checks whether a box lies fully inside a container of the given extents.
///
/// The container is anchored at the origin, so the check reduces to
/// non-negative `min` components and `max` components within the extents.
pub fn within_container(bbox: &BoundingBox, container_extent: &Vec3) -> bool {
    bbox.min.x >= -EPSILON_GENERAL
        && bbox.min.y >= -EPSILON_GENERAL
        && bbox.min.z >= -EPSILON_GENERAL
        && bbox.max.x <= container_extent.x + EPSILON_GENERAL
        && bbox.max.y <= container_extent.y + EPSILON_GENERAL
        && bbox.max.z <= container_extent.z + EPSILON_GENERAL
}

/// Calculates the overlap of two intervals in one dimension.
///
/// # Parameters
/// * `a1` - Start of the first interval
/// * `a2` - End of the first interval
/// * `b1` - Start of the second interval
/// * `b2` - End of the second interval
///
/// # Returns
/// Length of the overlap, at least 0.0
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Checks whether two boxes overlap in the width/height footprint.
///
/// Used for access planning: a box only obstructs another box along the
/// depth axis when their projections onto the x/z plane overlap.
pub fn footprint_overlaps(a: &BoundingBox, b: &BoundingBox) -> bool {
    overlap_1d(a.min.x, a.max.x, b.min.x, b.max.x) > EPSILON_GENERAL
        && overlap_1d(a.min.z, a.max.z, b.min.z, b.max.z) > EPSILON_GENERAL
}

/// Checks whether a candidate box collides with any occupied box.
pub fn collides_with_any<'a>(
    candidate: &BoundingBox,
    occupied: impl IntoIterator<Item = &'a BoundingBox>,
) -> bool {
    occupied.into_iter().any(|b| candidate.intersects(b))
}
