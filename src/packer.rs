//! Spatial packing of a single item into a single container.
//!
//! Implements a corner-point heuristic: candidate anchors are the container
//! origin plus, for every already-stowed item, the three extreme points
//! obtained by projecting from that item's far corner along each axis.
//! Candidates are evaluated floor-first and nearest to the access face, and
//! the first collision-free anchor wins. The search is pure and
//! deterministic; no rotation is modeled.

use std::cmp::Ordering;

use crate::config::PlannerConfig;
use crate::geometry::{collides_with_any, within_container};
use crate::model::{Dimensions, StowedItem};
use crate::types::{BoundingBox, Vec3};

/// Per-attempt packing failure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PackFailure {
    /// The item does not fit into the empty container on every axis.
    DimensionExceeded,
    /// No candidate anchor yields a collision-free position.
    NoSpace,
}

/// Finds a position for an item inside a container.
///
/// # Parameters
/// * `item` - Extents of the item to place
/// * `container` - Interior extents of the container
/// * `stowed` - Items already placed in the container
/// * `config` - Search bounds and tolerances
///
/// # Returns
/// The occupied bounding box on success, otherwise the failure kind.
pub fn find_placement(
    item: &Dimensions,
    container: &Dimensions,
    stowed: &[StowedItem],
    config: &PlannerConfig,
) -> Result<BoundingBox, PackFailure> {
    let item_extent = item.as_vec3();
    let container_extent = container.as_vec3();

    if !item_extent.fits_within(&container_extent, config.general_epsilon) {
        return Err(PackFailure::DimensionExceeded);
    }

    let occupied: Vec<BoundingBox> = stowed.iter().map(|s| s.position).collect();
    let mut checks = 0usize;

    for anchor in candidate_anchors(item, container, stowed, config) {
        checks += 1;
        if checks > config.max_candidate_checks {
            break;
        }

        let candidate = BoundingBox::from_origin_and_extent(anchor, item_extent);
        if !within_container(&candidate, &container_extent) {
            continue;
        }
        if collides_with_any(&candidate, &occupied) {
            continue;
        }
        return Ok(candidate);
    }

    Err(PackFailure::NoSpace)
}

/// Generates the ordered candidate anchors for an item in a container.
///
/// Starts at the container origin; every stowed item contributes the three
/// corner points projected from its far corner along each axis, clamped so
/// the item stays within container bounds. The list is sorted by
/// (height, depth, width) ascending and deduplicated, which biases toward
/// stable, reachable placements.
pub(crate) fn candidate_anchors(
    item: &Dimensions,
    container: &Dimensions,
    stowed: &[StowedItem],
    config: &PlannerConfig,
) -> Vec<Vec3> {
    let eps = config.general_epsilon;
    let max_anchor = container.as_vec3() - item.as_vec3();

    let clamp = |anchor: Vec3| {
        Vec3::new(
            anchor.x.min(max_anchor.x).max(0.0),
            anchor.y.min(max_anchor.y).max(0.0),
            anchor.z.min(max_anchor.z).max(0.0),
        )
    };

    let mut anchors = vec![Vec3::zero()];
    for s in stowed {
        let b = &s.position;
        anchors.push(clamp(Vec3::new(b.max.x, b.min.y, b.min.z)));
        anchors.push(clamp(Vec3::new(b.min.x, b.max.y, b.min.z)));
        anchors.push(clamp(Vec3::new(b.min.x, b.min.y, b.max.z)));
    }

    anchors.sort_by(|a, b| compare_anchors(a, b, eps));
    anchors.dedup_by(|a, b| {
        (a.x - b.x).abs() < eps && (a.y - b.y).abs() < eps && (a.z - b.z).abs() < eps
    });
    anchors
}

/// Floor first, then nearest to the access face, then leftmost.
fn compare_anchors(a: &Vec3, b: &Vec3, eps: f64) -> Ordering {
    match compare_with_epsilon(a.z, b.z, eps) {
        Ordering::Equal => {}
        other => return other,
    }
    match compare_with_epsilon(a.y, b.y, eps) {
        Ordering::Equal => {}
        other => return other,
    }
    compare_with_epsilon(a.x, b.x, eps)
}

fn compare_with_epsilon(a: f64, b: f64, eps: f64) -> Ordering {
    if (a - b).abs() <= eps {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;

    fn dims(w: f64, d: f64, h: f64) -> Dimensions {
        Dimensions::new(w, d, h).unwrap()
    }

    fn test_item(id: &str, d: Dimensions) -> Item {
        Item {
            id: id.to_string(),
            name: id.to_string(),
            dimensions: d,
            mass: 1.0,
            priority: Some(1),
            expiry: None,
            usage_limit: 1,
            remaining_uses: None,
            preferred_zone: None,
            is_waste: false,
            waste_reason: None,
            container_id: None,
            position: None,
        }
    }

    fn stow(id: &str, d: Dimensions, origin: Vec3) -> StowedItem {
        StowedItem {
            item: test_item(id, d),
            position: BoundingBox::from_origin_and_extent(origin, d.as_vec3()),
        }
    }

    #[test]
    fn empty_container_places_at_origin() {
        let config = PlannerConfig::default();
        let placed = find_placement(
            &dims(40.0, 40.0, 40.0),
            &dims(100.0, 100.0, 100.0),
            &[],
            &config,
        )
        .expect("must fit");

        assert_eq!(placed.min, Vec3::zero());
        assert_eq!(placed.max, Vec3::new(40.0, 40.0, 40.0));
    }

    #[test]
    fn oversized_item_fails_with_dimension_exceeded() {
        let config = PlannerConfig::default();
        let result = find_placement(
            &dims(120.0, 40.0, 40.0),
            &dims(100.0, 100.0, 100.0),
            &[],
            &config,
        );
        assert_eq!(result, Err(PackFailure::DimensionExceeded));
    }

    #[test]
    fn second_item_goes_beside_not_on_top() {
        let config = PlannerConfig::default();
        let container = dims(30.0, 30.0, 30.0);
        let stowed = vec![stow("ITM-1", dims(10.0, 10.0, 10.0), Vec3::zero())];

        let placed = find_placement(&dims(10.0, 10.0, 10.0), &container, &stowed, &config)
            .expect("must fit");

        // Floor-level anchor beside the first box beats the stacked anchor.
        assert_eq!(placed.min, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn fills_the_floor_before_stacking() {
        let config = PlannerConfig::default();
        let container = dims(20.0, 20.0, 20.0);
        let unit = dims(10.0, 10.0, 10.0);

        let mut stowed = Vec::new();
        let mut minima = Vec::new();
        for i in 0..5 {
            let placed = find_placement(&unit, &container, &stowed, &config).expect("must fit");
            minima.push(placed.min);
            stowed.push(stow(&format!("ITM-{i}"), unit, placed.min));
        }

        // The first four placements tile the floor; the fifth starts layer two.
        assert!(minima[..4].iter().all(|p| p.z.abs() < 1e-9));
        assert!(minima[4].z > 0.0);
    }

    #[test]
    fn full_container_reports_no_space() {
        let config = PlannerConfig::default();
        let container = dims(10.0, 10.0, 10.0);
        let stowed = vec![stow("ITM-1", dims(10.0, 10.0, 10.0), Vec3::zero())];

        let result = find_placement(&dims(10.0, 10.0, 10.0), &container, &stowed, &config);
        assert_eq!(result, Err(PackFailure::NoSpace));
    }

    #[test]
    fn placements_never_overlap_and_stay_in_bounds() {
        let config = PlannerConfig::default();
        let container = dims(50.0, 40.0, 30.0);
        let sizes = [
            dims(20.0, 20.0, 10.0),
            dims(30.0, 10.0, 10.0),
            dims(10.0, 10.0, 30.0),
            dims(25.0, 20.0, 10.0),
            dims(10.0, 20.0, 10.0),
        ];

        let mut stowed: Vec<StowedItem> = Vec::new();
        for (i, size) in sizes.iter().enumerate() {
            if let Ok(placed) = find_placement(size, &container, &stowed, &config) {
                assert!(within_container(&placed, &container.as_vec3()));
                for s in &stowed {
                    assert!(
                        !placed.intersects(&s.position),
                        "placement {} overlaps {}",
                        i,
                        s.item.id
                    );
                }
                stowed.push(stow(&format!("ITM-{i}"), *size, placed.min));
            }
        }
        assert!(!stowed.is_empty());
    }

    #[test]
    fn search_is_deterministic() {
        let config = PlannerConfig::default();
        let container = dims(50.0, 50.0, 50.0);
        let stowed = vec![
            stow("ITM-1", dims(20.0, 20.0, 20.0), Vec3::zero()),
            stow("ITM-2", dims(10.0, 30.0, 10.0), Vec3::new(20.0, 0.0, 0.0)),
        ];

        let a = find_placement(&dims(15.0, 15.0, 15.0), &container, &stowed, &config);
        let b = find_placement(&dims(15.0, 15.0, 15.0), &container, &stowed, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn candidate_cap_bounds_the_search() {
        let config = PlannerConfig::builder().max_candidate_checks(1).build();
        let container = dims(30.0, 30.0, 30.0);
        let stowed = vec![stow("ITM-1", dims(10.0, 10.0, 10.0), Vec3::zero())];

        // Only the origin anchor is evaluated, which collides; the capped
        // search reports NoSpace instead of scanning further corners.
        let result = find_placement(&dims(10.0, 10.0, 10.0), &container, &stowed, &config);
        assert_eq!(result, Err(PackFailure::NoSpace));
    }

    #[test]
    fn anchors_are_floor_first_and_front_first() {
        let config = PlannerConfig::default();
        let container = dims(30.0, 30.0, 30.0);
        let stowed = vec![stow("ITM-1", dims(10.0, 10.0, 10.0), Vec3::zero())];

        let anchors = candidate_anchors(&dims(10.0, 10.0, 10.0), &container, &stowed, &config);
        assert_eq!(anchors[0], Vec3::zero());
        assert_eq!(anchors[1], Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(anchors[2], Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(anchors[3], Vec3::new(0.0, 0.0, 10.0));
    }
}
