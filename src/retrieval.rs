//! Minimum-disturbance retrieval planning.
//!
//! An item is blocked by every stowed item whose footprint (width/height
//! plane) overlaps its own and that sits strictly closer to the access face.
//! The plan removes blockers front to back, retrieves the target, and puts
//! the blockers back in reverse order so the container ends up as it began,
//! minus the target.

use crate::error::PlanError;
use crate::geometry::footprint_overlaps;
use crate::model::{Container, RetrievalAction, RetrievalStep, StowedItem};

/// Plans the retrieval of one item from a container.
///
/// # Parameters
/// * `item_id` - Item to retrieve
/// * `container` - Occupancy snapshot of the container holding it
///
/// # Returns
/// Ordered steps (1-based), or `PlanError::ItemNotPlaced` when the item has
/// no recorded position in the container.
pub fn plan_retrieval(item_id: &str, container: &Container) -> Result<Vec<RetrievalStep>, PlanError> {
    let target = container
        .find_stowed(item_id)
        .ok_or_else(|| PlanError::ItemNotPlaced(item_id.to_string()))?;

    let mut blockers: Vec<&StowedItem> = container
        .stowed
        .iter()
        .filter(|s| s.item.id != item_id)
        .filter(|s| footprint_overlaps(&s.position, &target.position))
        .filter(|s| s.position.min.y < target.position.min.y)
        .collect();

    // Front to back, so each removal is physically reachable.
    blockers.sort_by(|a, b| {
        a.position
            .min
            .y
            .partial_cmp(&b.position.min.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.item.id.cmp(&b.item.id))
    });

    let mut steps = Vec::with_capacity(blockers.len() * 2 + 1);
    let mut order: u32 = 0;
    let mut push = |steps: &mut Vec<RetrievalStep>, action, id: &str| {
        order += 1;
        steps.push(RetrievalStep {
            order,
            action,
            item_id: id.to_string(),
        });
    };

    for blocker in &blockers {
        push(&mut steps, RetrievalAction::Remove, &blocker.item.id);
        push(&mut steps, RetrievalAction::SetAside, &blocker.item.id);
    }
    push(&mut steps, RetrievalAction::Retrieve, item_id);
    for blocker in blockers.iter().rev() {
        push(&mut steps, RetrievalAction::PlaceBack, &blocker.item.id);
    }

    Ok(steps)
}

/// Number of items that must be moved to reach the target.
///
/// Useful for ranking retrieval candidates without materializing the steps.
pub fn disturbance_count(item_id: &str, container: &Container) -> Result<usize, PlanError> {
    let target = container
        .find_stowed(item_id)
        .ok_or_else(|| PlanError::ItemNotPlaced(item_id.to_string()))?;

    Ok(container
        .stowed
        .iter()
        .filter(|s| s.item.id != item_id)
        .filter(|s| footprint_overlaps(&s.position, &target.position))
        .filter(|s| s.position.min.y < target.position.min.y)
        .count())
}
