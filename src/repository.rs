//! Storage abstraction for items and container occupancy.
//!
//! Planning works on snapshots; committing a plan uses optimistic
//! concurrency. Each container carries an occupancy version that bumps on
//! every mutation, and a commit only applies when the versions the plan was
//! computed against are still current. Commits are all-or-nothing.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Container, Item, Placement, StowedItem};
use crate::types::BoundingBox;

/// Commit failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommitError {
    /// A touched container changed since the plan's snapshot was taken.
    #[error("Occupancy of container '{container_id}' changed since planning")]
    Conflict { container_id: String },
    /// A placement references a container the store does not know.
    #[error("Unknown container '{0}'")]
    UnknownContainer(String),
    /// A placement references an item the store does not know.
    #[error("Unknown item '{0}'")]
    UnknownItem(String),
}

/// Access to items and container occupancy.
pub trait StowageRepository {
    /// Items that have no recorded container.
    fn fetch_unassigned_items(&self) -> Vec<Item>;

    /// Containers, optionally filtered by zone.
    fn fetch_containers(&self, zone: Option<&str>) -> Vec<Container>;

    /// Occupancy of a single container, `None` when unknown.
    fn fetch_container_items(&self, container_id: &str) -> Option<Vec<StowedItem>>;

    /// Current occupancy version of a container, `None` when unknown.
    fn occupancy_version(&self, container_id: &str) -> Option<u64>;

    /// Applies a batch of placements atomically.
    ///
    /// `expected_versions` must hold the occupancy version of every container
    /// the batch touches, as observed when the plan was computed. A missing
    /// or stale entry fails the whole batch with `CommitError::Conflict` and
    /// leaves the store untouched.
    fn commit_placements(
        &mut self,
        placements: &[Placement],
        expected_versions: &BTreeMap<String, u64>,
    ) -> Result<(), CommitError>;
}

/// Map-backed repository, the default store for a single-process deployment.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    items: BTreeMap<String, Item>,
    containers: BTreeMap<String, Container>,
    versions: BTreeMap<String, u64>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an item.
    pub fn insert_item(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    /// Adds or replaces a container, resetting its occupancy version.
    pub fn insert_container(&mut self, container: Container) {
        self.versions.insert(container.id.clone(), 0);
        self.containers.insert(container.id.clone(), container);
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn container(&self, id: &str) -> Option<&Container> {
        self.containers.get(id)
    }

    /// Moves an item into a container and reports every container it was
    /// removed from on the way.
    fn place_into(&mut self, item_id: &str, container_id: &str, position: BoundingBox) -> Vec<String> {
        // An item moves, it never duplicates.
        let mut sources = Vec::new();
        for (id, container) in self.containers.iter_mut() {
            let before = container.stowed.len();
            container.stowed.retain(|s| s.item.id != item_id);
            if container.stowed.len() != before {
                sources.push(id.clone());
            }
        }

        let item = self
            .items
            .get_mut(item_id)
            .expect("existence checked before mutation");
        item.container_id = Some(container_id.to_string());
        item.position = Some(position);
        let stowed = StowedItem {
            item: item.clone(),
            position,
        };

        self.containers
            .get_mut(container_id)
            .expect("existence checked before mutation")
            .stowed
            .push(stowed);
        sources
    }
}

impl StowageRepository for InMemoryRepository {
    fn fetch_unassigned_items(&self) -> Vec<Item> {
        self.items
            .values()
            .filter(|item| item.container_id.is_none())
            .cloned()
            .collect()
    }

    fn fetch_containers(&self, zone: Option<&str>) -> Vec<Container> {
        self.containers
            .values()
            .filter(|container| zone.is_none_or(|z| container.zone == z))
            .cloned()
            .collect()
    }

    fn fetch_container_items(&self, container_id: &str) -> Option<Vec<StowedItem>> {
        self.containers
            .get(container_id)
            .map(|container| container.stowed.clone())
    }

    fn occupancy_version(&self, container_id: &str) -> Option<u64> {
        self.versions.get(container_id).copied()
    }

    fn commit_placements(
        &mut self,
        placements: &[Placement],
        expected_versions: &BTreeMap<String, u64>,
    ) -> Result<(), CommitError> {
        // Validate everything before mutating anything.
        for placement in placements {
            let item = self
                .items
                .get(&placement.item_id)
                .ok_or_else(|| CommitError::UnknownItem(placement.item_id.clone()))?;
            let current = self
                .versions
                .get(&placement.container_id)
                .ok_or_else(|| CommitError::UnknownContainer(placement.container_id.clone()))?;
            match expected_versions.get(&placement.container_id) {
                Some(expected) if expected == current => {}
                _ => {
                    return Err(CommitError::Conflict {
                        container_id: placement.container_id.clone(),
                    });
                }
            }
            // The source container loses the item; when the caller's
            // snapshot covers it, that snapshot must be current too.
            if let Some(source_id) = &item.container_id {
                if let Some(expected) = expected_versions.get(source_id) {
                    if self.versions.get(source_id) != Some(expected) {
                        return Err(CommitError::Conflict {
                            container_id: source_id.clone(),
                        });
                    }
                }
            }
        }

        let mut touched: BTreeSet<String> = BTreeSet::new();
        for placement in placements {
            let sources =
                self.place_into(&placement.item_id, &placement.container_id, placement.position);
            touched.extend(sources);
            touched.insert(placement.container_id.clone());
        }
        for container_id in &touched {
            if let Some(version) = self.versions.get_mut(container_id) {
                *version += 1;
            }
        }
        Ok(())
    }
}
