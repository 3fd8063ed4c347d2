//! Data model for cargo stowage planning.
//!
//! This module defines the domain structures shared by all planners:
//! - `Item`: a cargo item with dimensions, mass, priority, and lifecycle data
//! - `Container`: a storage container with zone and current occupancy
//! - `Placement`, `RearrangementStep`, `RetrievalStep`, `MoveStep`,
//!   `ReturnStep`: transient planner outputs
//! - `ReturnManifest`: the weight-bounded waste return document
//!
//! Items and containers are owned by the external repository; plan outputs
//! exist only for the duration of one planning call.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{BoundingBox, Vec3};

/// Validation error for domain data.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid mass: {0}")]
    InvalidMass(String),
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

/// Helper to validate a single dimension value.
fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Helper to validate a mass value (zero is allowed for massless records).
fn validate_mass(value: f64) -> Result<(), ValidationError> {
    if value < 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidMass(format!(
            "Mass must be non-negative, got: {}",
            value
        )));
    }
    Ok(())
}

fn validate_id(value: &str, name: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::InvalidId(format!(
            "{} must not be empty",
            name
        )));
    }
    Ok(())
}

/// Physical extents of an item or container.
///
/// # Fields
/// * `width` - Extent along the x axis
/// * `depth` - Extent along the y axis (away from the access face)
/// * `height` - Extent along the z axis
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    #[schema(example = 40.0)]
    pub width: f64,
    #[schema(example = 40.0)]
    pub depth: f64,
    #[schema(example = 40.0)]
    pub height: f64,
}

impl Dimensions {
    /// Creates new dimensions with validation.
    ///
    /// # Returns
    /// `Ok(Dimensions)` for positive finite values, otherwise
    /// `Err(ValidationError)`
    ///
    /// # Examples
    /// ```
    /// use stowage::model::Dimensions;
    ///
    /// assert!(Dimensions::new(10.0, 20.0, 30.0).is_ok());
    /// assert!(Dimensions::new(-10.0, 20.0, 30.0).is_err());
    /// ```
    pub fn new(width: f64, depth: f64, height: f64) -> Result<Self, ValidationError> {
        let dims = Self {
            width,
            depth,
            height,
        };
        dims.validate()?;
        Ok(dims)
    }

    /// Validates that every extent is positive and finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimension(self.width, "Width")?;
        validate_dimension(self.depth, "Depth")?;
        validate_dimension(self.height, "Height")?;
        Ok(())
    }

    /// Calculates the volume as width × depth × height.
    pub fn volume(&self) -> f64 {
        self.width * self.depth * self.height
    }

    /// Converts the extents to a `Vec3` (x = width, y = depth, z = height).
    #[inline]
    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.width, self.depth, self.height)
    }
}

/// Reason an item counts as waste.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum WasteReason {
    /// The expiry timestamp has passed.
    Expired,
    /// The remaining use count reached zero.
    UsesExhausted,
}

impl std::fmt::Display for WasteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WasteReason::Expired => write!(f, "Expired"),
            WasteReason::UsesExhausted => write!(f, "Out of uses"),
        }
    }
}

/// A cargo item.
///
/// # Fields
/// * `id` - Unique item identifier
/// * `dimensions` - Physical extents (no rotation is modeled)
/// * `mass` - Mass in kg, non-negative
/// * `priority` - Higher = more important; absent falls back to the
///   configured lowest priority
/// * `expiry` - Optional expiry timestamp
/// * `usage_limit` / `remaining_uses` - Use-count lifecycle
/// * `preferred_zone` - Zone the item should be stowed in if possible
/// * `container_id` / `position` - Current assignment, if any
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[schema(example = "ITM-001")]
    pub id: String,
    pub name: String,
    pub dimensions: Dimensions,
    #[schema(example = 5.0)]
    pub mass: f64,
    #[serde(default)]
    #[schema(nullable = true, example = 9)]
    pub priority: Option<i32>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub expiry: Option<DateTime<Utc>>,
    pub usage_limit: u32,
    #[serde(default)]
    #[schema(nullable = true)]
    pub remaining_uses: Option<u32>,
    #[serde(default)]
    #[schema(nullable = true, example = "A")]
    pub preferred_zone: Option<String>,
    #[serde(default)]
    pub is_waste: bool,
    #[serde(default)]
    #[schema(nullable = true)]
    pub waste_reason: Option<WasteReason>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub container_id: Option<String>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub position: Option<BoundingBox>,
}

impl Item {
    /// Validates identifier, dimensions, and mass.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(&self.id, "Item id")?;
        self.dimensions.validate()?;
        validate_mass(self.mass)?;
        Ok(())
    }

    /// Volume of the item's bounding extents.
    pub fn volume(&self) -> f64 {
        self.dimensions.volume()
    }

    /// Remaining uses, defaulting to the full usage limit when unset.
    pub fn uses_left(&self) -> u32 {
        self.remaining_uses.unwrap_or(self.usage_limit)
    }

    /// Determines whether the item counts as waste at the given instant.
    ///
    /// An explicit `waste_reason` wins; otherwise expiry and use count are
    /// evaluated.
    pub fn waste_state(&self, now: DateTime<Utc>) -> Option<WasteReason> {
        if let Some(reason) = self.waste_reason {
            return Some(reason);
        }
        if let Some(expiry) = self.expiry {
            if expiry <= now {
                return Some(WasteReason::Expired);
            }
        }
        if self.uses_left() == 0 {
            return Some(WasteReason::UsesExhausted);
        }
        None
    }
}

/// An item together with its position inside a container.
///
/// # Fields
/// * `item` - The stowed item
/// * `position` - Occupied bounding box in container-local coordinates
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StowedItem {
    pub item: Item,
    pub position: BoundingBox,
}

/// A storage container.
///
/// # Fields
/// * `id` - Unique container identifier
/// * `zone` - Zone the container belongs to
/// * `dimensions` - Interior extents; the access face spans the full
///   width/height plane at depth 0
/// * `stowed` - Currently placed items with positions
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[schema(example = "CONT-A1")]
    pub id: String,
    #[schema(example = "A")]
    pub zone: String,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub stowed: Vec<StowedItem>,
}

impl Container {
    /// Creates a new empty container with validation.
    pub fn new(
        id: impl Into<String>,
        zone: impl Into<String>,
        dimensions: Dimensions,
    ) -> Result<Self, ValidationError> {
        let container = Self {
            id: id.into(),
            zone: zone.into(),
            dimensions,
            stowed: Vec::new(),
        };
        container.validate()?;
        Ok(container)
    }

    /// Validates identifier, zone, and dimensions.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(&self.id, "Container id")?;
        validate_id(&self.zone, "Container zone")?;
        self.dimensions.validate()?;
        Ok(())
    }

    /// Total interior volume.
    pub fn volume(&self) -> f64 {
        self.dimensions.volume()
    }

    /// Sum of the bounding-box volumes of all stowed items.
    pub fn used_volume(&self) -> f64 {
        self.stowed.iter().map(|s| s.position.volume()).sum()
    }

    /// Remaining unoccupied volume.
    pub fn free_volume(&self) -> f64 {
        self.volume() - self.used_volume()
    }

    /// Finds a stowed item by id.
    pub fn find_stowed(&self, item_id: &str) -> Option<&StowedItem> {
        self.stowed.iter().find(|s| s.item.id == item_id)
    }
}

/// A planned item-to-container assignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub item_id: String,
    pub container_id: String,
    pub position: BoundingBox,
}

/// Action of a single rearrangement step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum RearrangementAction {
    /// Remove a lower-priority item to the virtual holding area.
    Displace,
    /// Place an item at its planned position.
    Place,
}

/// One step of a rearrangement sequence.
///
/// While an item is in transit (displaced but not yet re-placed),
/// `to_container` and `position` stay empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RearrangementStep {
    pub order: u32,
    pub action: RearrangementAction,
    pub item_id: String,
    #[schema(nullable = true)]
    pub from_container: Option<String>,
    #[schema(nullable = true)]
    pub to_container: Option<String>,
    #[schema(nullable = true)]
    pub position: Option<BoundingBox>,
}

/// Action of a single retrieval step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum RetrievalAction {
    /// Take a blocking item out of the container.
    Remove,
    /// Park the removed blocker next to the opening.
    SetAside,
    /// Extract the target item.
    Retrieve,
    /// Put a blocker back at its original position.
    PlaceBack,
}

/// One step of a retrieval sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalStep {
    pub order: u32,
    pub action: RetrievalAction,
    pub item_id: String,
}

/// A flat item movement from a source container to a destination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveStep {
    pub order: u32,
    pub item_id: String,
    pub from_container: String,
    pub to_container: String,
}

/// Action of a grouped waste-return step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ReturnAction {
    /// Travel to the next source container.
    MoveToContainer,
    /// Extract one waste item there.
    Retrieve,
    /// Carry the extracted item to the undocking container.
    MoveToUndocking,
}

/// One step of a grouped waste-return sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStep {
    pub order: u32,
    pub action: ReturnAction,
    #[schema(nullable = true)]
    pub item_id: Option<String>,
    pub container_id: String,
}

/// A selected waste item inside a return manifest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItem {
    pub item_id: String,
    pub name: String,
    pub mass: f64,
    pub reason: WasteReason,
}

/// Manifest for a weight-bounded waste return.
///
/// # Fields
/// * `container_id` - Destination (undocking) container
/// * `date` - Scheduled return date
/// * `items` - Selected waste items with mass and reason
/// * `total_mass` / `total_volume` - Aggregates over the selection
/// * `weight_limit` - The budget the selection was planned against
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnManifest {
    pub container_id: String,
    pub date: NaiveDate,
    pub items: Vec<ReturnItem>,
    pub total_mass: f64,
    pub total_volume: f64,
    pub weight_limit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            name: format!("Item {id}"),
            dimensions: Dimensions::new(10.0, 10.0, 10.0).unwrap(),
            mass: 5.0,
            priority: Some(5),
            expiry: None,
            usage_limit: 10,
            remaining_uses: None,
            preferred_zone: Some("A".to_string()),
            is_waste: false,
            waste_reason: None,
            container_id: None,
            position: None,
        }
    }

    #[test]
    fn dimensions_validation() {
        assert!(Dimensions::new(10.0, 20.0, 30.0).is_ok());
        assert!(Dimensions::new(0.0, 20.0, 30.0).is_err());
        assert!(Dimensions::new(10.0, f64::NAN, 30.0).is_err());
        assert!(Dimensions::new(10.0, 20.0, f64::INFINITY).is_err());
    }

    #[test]
    fn item_validation_rejects_negative_mass() {
        let mut it = item("ITM-1");
        assert!(it.validate().is_ok());
        it.mass = -1.0;
        assert!(it.validate().is_err());
    }

    #[test]
    fn zero_mass_is_allowed() {
        let mut it = item("ITM-1");
        it.mass = 0.0;
        assert!(it.validate().is_ok());
    }

    #[test]
    fn empty_id_is_rejected() {
        let mut it = item(" ");
        assert!(it.validate().is_err());
        it.id = "ITM-1".to_string();
        assert!(it.validate().is_ok());
    }

    #[test]
    fn uses_left_falls_back_to_limit() {
        let mut it = item("ITM-1");
        assert_eq!(it.uses_left(), 10);
        it.remaining_uses = Some(3);
        assert_eq!(it.uses_left(), 3);
    }

    #[test]
    fn waste_state_from_expiry_and_uses() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        let mut fresh = item("ITM-1");
        fresh.expiry = Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(fresh.waste_state(now), None);

        let mut expired = item("ITM-2");
        expired.expiry = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(expired.waste_state(now), Some(WasteReason::Expired));

        let mut exhausted = item("ITM-3");
        exhausted.remaining_uses = Some(0);
        assert_eq!(exhausted.waste_state(now), Some(WasteReason::UsesExhausted));

        let mut flagged = item("ITM-4");
        flagged.waste_reason = Some(WasteReason::Expired);
        assert_eq!(flagged.waste_state(now), Some(WasteReason::Expired));
    }

    #[test]
    fn container_volume_accounting() {
        let mut container =
            Container::new("CONT-1", "A", Dimensions::new(100.0, 100.0, 100.0).unwrap()).unwrap();
        assert!((container.free_volume() - 1_000_000.0).abs() < 1e-9);

        container.stowed.push(StowedItem {
            item: item("ITM-1"),
            position: BoundingBox::from_origin_and_extent(
                Vec3::zero(),
                Vec3::new(10.0, 10.0, 10.0),
            ),
        });
        assert!((container.used_volume() - 1000.0).abs() < 1e-9);
        assert!((container.free_volume() - 999_000.0).abs() < 1e-9);
        assert!(container.find_stowed("ITM-1").is_some());
        assert!(container.find_stowed("ITM-2").is_none());
    }

    #[test]
    fn item_round_trips_through_json() {
        let json = r#"{
            "id": "ITM-9",
            "name": "Food pack",
            "dimensions": {"width": 10.0, "depth": 10.0, "height": 20.0},
            "mass": 5.0,
            "priority": 80,
            "usageLimit": 30,
            "preferredZone": "A"
        }"#;
        let parsed: Item = serde_json::from_str(json).expect("valid item JSON");
        assert_eq!(parsed.priority, Some(80));
        assert_eq!(parsed.preferred_zone.as_deref(), Some("A"));
        assert_eq!(parsed.uses_left(), 30);
        assert!(parsed.position.is_none());
        assert!(!parsed.is_waste);
    }
}
