//! Placement planning across zones and containers.
//!
//! Items are allocated in priority order (ties broken by earlier expiry)
//! against an in-memory working copy of the supplied occupancy snapshot.
//! Preferred zones are tried first, ranked by free volume; when every zone
//! fails, the planner attempts to displace strictly-lower-priority items
//! before giving up on an item. Individual item failures never abort the
//! batch.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::PlannerConfig;
use crate::error::{PlanError, UnplacedReason};
use crate::geometry::within_container;
use crate::model::{
    Container, Item, Placement, RearrangementAction, RearrangementStep, StowedItem,
};
use crate::packer::{self, PackFailure};
use crate::types::BoundingBox;

/// Groups containers by zone identifier.
///
/// Pure, stateless partitioning over a container snapshot; rebuilt per call.
/// The underlying map is ordered so zone iteration is deterministic.
pub struct ZoneIndex {
    zones: BTreeMap<String, Vec<usize>>,
}

impl ZoneIndex {
    /// Builds the index over a container slice.
    pub fn build(containers: &[Container]) -> Self {
        let mut zones: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, container) in containers.iter().enumerate() {
            zones.entry(container.zone.clone()).or_default().push(idx);
        }
        Self { zones }
    }

    /// Container indices in a zone, empty when the zone is unknown.
    pub fn containers_in(&self, zone: &str) -> &[usize] {
        self.zones.get(zone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Zone identifiers in ascending order.
    pub fn zones(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }
}

/// An item the planner could not place, with the classified reason.
#[derive(Clone, Debug, PartialEq)]
pub struct UnplacedItem {
    pub item_id: String,
    pub reason: UnplacedReason,
}

/// Result of one placement planning call.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct PlacementPlan {
    pub placements: Vec<Placement>,
    pub unplaced: Vec<UnplacedItem>,
    pub rearrangements: Vec<RearrangementStep>,
}

impl PlacementPlan {
    /// Indicates whether every item received a position.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }
}

/// Events emitted while planning, suitable for live streaming.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlanEvent {
    /// An item received a position.
    #[serde(rename_all = "camelCase")]
    ItemPlaced {
        item_id: String,
        container_id: String,
        position: BoundingBox,
    },
    /// An item could not be placed anywhere.
    #[serde(rename_all = "camelCase")]
    ItemUnplaced {
        item_id: String,
        reason_code: String,
        reason: String,
    },
    /// Lower-priority items were displaced to make room.
    #[serde(rename_all = "camelCase")]
    RearrangementPlanned {
        item_id: String,
        container_id: String,
        displaced: Vec<String>,
    },
    /// Planning finished.
    #[serde(rename_all = "camelCase")]
    Finished {
        placed: usize,
        unplaced: usize,
        rearrangements: usize,
    },
}

/// Plans placements for a batch of items against a container snapshot.
///
/// # Parameters
/// * `items` - Items to allocate
/// * `containers` - Occupancy snapshot the plan is computed against
/// * `config` - Defaults and search bounds
///
/// # Returns
/// A `PlacementPlan`; `Err(PlanError::InvalidInput)` only for malformed
/// input, never for individual unplaceable items.
pub fn plan_placement(
    items: Vec<Item>,
    containers: Vec<Container>,
    config: &PlannerConfig,
) -> Result<PlacementPlan, PlanError> {
    plan_placement_with_progress(items, containers, config, |_| {})
}

/// Like `plan_placement`, with a callback for every planning event.
///
/// The callback receives events in plan order and is suitable for feeding
/// an SSE or websocket stream.
pub fn plan_placement_with_progress(
    items: Vec<Item>,
    containers: Vec<Container>,
    config: &PlannerConfig,
    mut on_event: impl FnMut(&PlanEvent),
) -> Result<PlacementPlan, PlanError> {
    if items.is_empty() {
        return Err(PlanError::InvalidInput("item list is empty".to_string()));
    }
    if containers.is_empty() {
        return Err(PlanError::InvalidInput(
            "container list is empty".to_string(),
        ));
    }
    for item in &items {
        item.validate()
            .map_err(|err| PlanError::InvalidInput(err.to_string()))?;
    }
    for container in &containers {
        container
            .validate()
            .map_err(|err| PlanError::InvalidInput(err.to_string()))?;
    }

    let mut items = items;
    sort_for_allocation(&mut items, config);

    // Working occupancy copy; the authoritative snapshot stays untouched.
    let mut working = containers;
    let zone_index = ZoneIndex::build(&working);

    let mut plan = PlacementPlan::default();
    let mut rearrange_order: u32 = 0;

    for item in items {
        let attempt_order = container_attempt_order(&item, &working, &zone_index, config);

        let mut chosen: Option<(usize, BoundingBox)> = None;
        let mut any_fit_possible = false;

        for &idx in &attempt_order {
            let container = &working[idx];
            match packer::find_placement(
                &item.dimensions,
                &container.dimensions,
                &container.stowed,
                config,
            ) {
                Ok(position) => {
                    chosen = Some((idx, position));
                    break;
                }
                Err(PackFailure::NoSpace) => any_fit_possible = true,
                Err(PackFailure::DimensionExceeded) => {}
            }
        }

        if let Some((idx, position)) = chosen {
            accept_placement(&mut plan, &mut working, idx, &item, position, &mut on_event);
            continue;
        }

        if !any_fit_possible {
            // Too large for every container; rearranging cannot help.
            reject_item(&mut plan, &item, UnplacedReason::DimensionExceeded, &mut on_event);
            continue;
        }

        match plan_rearrangement(&item, &attempt_order, &working, config) {
            RearrangeOutcome::Found(candidate) => {
                apply_rearrangement(
                    &mut plan,
                    &mut working,
                    &item,
                    candidate,
                    &mut rearrange_order,
                    &mut on_event,
                );
            }
            RearrangeOutcome::Truncated => {
                reject_item(&mut plan, &item, UnplacedReason::NoSpace, &mut on_event);
            }
            RearrangeOutcome::Exhausted => {
                reject_item(&mut plan, &item, UnplacedReason::Unplaceable, &mut on_event);
            }
        }
    }

    on_event(&PlanEvent::Finished {
        placed: plan.placements.len(),
        unplaced: plan.unplaced.len(),
        rearrangements: plan.rearrangements.len(),
    });
    Ok(plan)
}

fn effective_priority(item: &Item, config: &PlannerConfig) -> i32 {
    item.priority.unwrap_or(config.default_priority)
}

fn preferred_zone<'a>(item: &'a Item, config: &'a PlannerConfig) -> &'a str {
    item.preferred_zone
        .as_deref()
        .unwrap_or(&config.default_zone)
}

/// Priority descending, then earlier expiry, then id for determinism.
fn sort_for_allocation(items: &mut [Item], config: &PlannerConfig) {
    items.sort_by(|a, b| {
        effective_priority(b, config)
            .cmp(&effective_priority(a, config))
            .then_with(|| match (a.expiry, b.expiry) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Preferred zone first, then remaining zones ascending; containers inside
/// a zone are ranked by free volume descending (id breaks ties).
fn container_attempt_order(
    item: &Item,
    working: &[Container],
    zone_index: &ZoneIndex,
    config: &PlannerConfig,
) -> Vec<usize> {
    let preferred = preferred_zone(item, config);

    let rank = |indices: &[usize]| {
        let mut ranked = indices.to_vec();
        ranked.sort_by(|&a, &b| {
            working[b]
                .free_volume()
                .partial_cmp(&working[a].free_volume())
                .unwrap_or(Ordering::Equal)
                .then_with(|| working[a].id.cmp(&working[b].id))
        });
        ranked
    };

    let mut order = rank(zone_index.containers_in(preferred));
    for zone in zone_index.zones() {
        if zone != preferred {
            order.extend(rank(zone_index.containers_in(zone)));
        }
    }
    order
}

fn accept_placement(
    plan: &mut PlacementPlan,
    working: &mut [Container],
    idx: usize,
    item: &Item,
    position: BoundingBox,
    on_event: &mut impl FnMut(&PlanEvent),
) {
    let container_id = working[idx].id.clone();
    plan.placements.push(Placement {
        item_id: item.id.clone(),
        container_id: container_id.clone(),
        position,
    });

    let mut stowed_item = item.clone();
    stowed_item.container_id = Some(container_id.clone());
    stowed_item.position = Some(position);
    working[idx].stowed.push(StowedItem {
        item: stowed_item,
        position,
    });

    on_event(&PlanEvent::ItemPlaced {
        item_id: item.id.clone(),
        container_id,
        position,
    });
}

fn reject_item(
    plan: &mut PlacementPlan,
    item: &Item,
    reason: UnplacedReason,
    on_event: &mut impl FnMut(&PlanEvent),
) {
    on_event(&PlanEvent::ItemUnplaced {
        item_id: item.id.clone(),
        reason_code: reason.code().to_string(),
        reason: reason.to_string(),
    });
    plan.unplaced.push(UnplacedItem {
        item_id: item.id.clone(),
        reason,
    });
}

/// A rearrangement candidate: where the item goes and who has to move.
struct RearrangementCandidate {
    container_idx: usize,
    position: BoundingBox,
    blocker_ids: Vec<String>,
}

/// Result of the displacement search.
enum RearrangeOutcome {
    /// A position whose blockers can all be displaced.
    Found(RearrangementCandidate),
    /// The full candidate space was searched; nothing is displaceable.
    Exhausted,
    /// The candidate cap stopped the search before it completed.
    Truncated,
}

/// Searches the attempt order for a position whose colliders all carry a
/// strictly lower priority than the incoming item.
fn plan_rearrangement(
    item: &Item,
    attempt_order: &[usize],
    working: &[Container],
    config: &PlannerConfig,
) -> RearrangeOutcome {
    let incoming_priority = effective_priority(item, config);
    let item_extent = item.dimensions.as_vec3();
    let mut truncated = false;

    for &idx in attempt_order {
        let container = &working[idx];
        let container_extent = container.dimensions.as_vec3();
        if !item_extent.fits_within(&container_extent, config.general_epsilon) {
            continue;
        }

        let anchors = packer::candidate_anchors(
            &item.dimensions,
            &container.dimensions,
            &container.stowed,
            config,
        );
        let mut checks = 0usize;

        for anchor in anchors {
            checks += 1;
            if checks > config.max_candidate_checks {
                truncated = true;
                break;
            }

            let candidate = BoundingBox::from_origin_and_extent(anchor, item_extent);
            if !within_container(&candidate, &container_extent) {
                continue;
            }

            let blockers: Vec<&StowedItem> = container
                .stowed
                .iter()
                .filter(|s| candidate.intersects(&s.position))
                .collect();
            if blockers.is_empty() {
                // A free slot would have been taken by the regular search.
                continue;
            }

            let all_lower = blockers
                .iter()
                .all(|s| effective_priority(&s.item, config) < incoming_priority);
            if all_lower {
                return RearrangeOutcome::Found(RearrangementCandidate {
                    container_idx: idx,
                    position: candidate,
                    blocker_ids: blockers.iter().map(|s| s.item.id.clone()).collect(),
                });
            }
        }
    }
    if truncated {
        RearrangeOutcome::Truncated
    } else {
        RearrangeOutcome::Exhausted
    }
}

fn apply_rearrangement(
    plan: &mut PlacementPlan,
    working: &mut [Container],
    item: &Item,
    candidate: RearrangementCandidate,
    rearrange_order: &mut u32,
    on_event: &mut impl FnMut(&PlanEvent),
) {
    let container_id = working[candidate.container_idx].id.clone();

    // Displace blockers to the virtual holding area; the caller decides
    // where they go afterwards.
    for blocker_id in &candidate.blocker_ids {
        working[candidate.container_idx]
            .stowed
            .retain(|s| &s.item.id != blocker_id);
        *rearrange_order += 1;
        plan.rearrangements.push(RearrangementStep {
            order: *rearrange_order,
            action: RearrangementAction::Displace,
            item_id: blocker_id.clone(),
            from_container: Some(container_id.clone()),
            to_container: None,
            position: None,
        });
    }

    *rearrange_order += 1;
    plan.rearrangements.push(RearrangementStep {
        order: *rearrange_order,
        action: RearrangementAction::Place,
        item_id: item.id.clone(),
        from_container: None,
        to_container: Some(container_id.clone()),
        position: Some(candidate.position),
    });

    on_event(&PlanEvent::RearrangementPlanned {
        item_id: item.id.clone(),
        container_id,
        displaced: candidate.blocker_ids.clone(),
    });

    accept_placement(
        plan,
        working,
        candidate.container_idx,
        item,
        candidate.position,
        on_event,
    );
}
