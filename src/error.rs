//! Error taxonomy for planning calls.
//!
//! Call-level problems short-circuit and surface as a single `PlanError`.
//! Per-item problems never abort a batch; they are aggregated into the plan
//! result as `UnplacedReason` / `RejectedReason` entries with stable codes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fatal error for a single planning call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    /// Malformed input (missing dimensions, empty lists, bad parameters).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Retrieval was requested for an item that has no recorded position.
    #[error("Item '{0}' is not placed in the given container")]
    ItemNotPlaced(String),
    /// Return planning was called without any waste candidates.
    #[error("No waste items available for return")]
    NoWasteItems,
    /// Every waste candidate individually exceeds the weight limit.
    #[error("No waste item fits within the weight limit")]
    NoItemsFit,
}

/// Reason an item could not be placed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum UnplacedReason {
    /// The item does not fit inside any container even when empty.
    DimensionExceeded,
    /// The bounded candidate search ended before a free position was found.
    NoSpace,
    /// No zone or container yielded a slot, even after rearrangement.
    Unplaceable,
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::DimensionExceeded => "dimension_exceeded",
            UnplacedReason::NoSpace => "no_space",
            UnplacedReason::Unplaceable => "unplaceable",
        }
    }
}

impl std::fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplacedReason::DimensionExceeded => {
                write!(f, "Item exceeds the dimensions of every container")
            }
            UnplacedReason::NoSpace => {
                write!(f, "No free position found in any container")
            }
            UnplacedReason::Unplaceable => {
                write!(f, "No placement possible, even after rearrangement")
            }
        }
    }
}

/// Reason a waste candidate was rejected from a return manifest.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum RejectedReason {
    /// Adding the item would exceed the remaining weight budget.
    WeightLimitExceeded,
}

impl RejectedReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectedReason::WeightLimitExceeded => "weight_limit_exceeded",
        }
    }
}

impl std::fmt::Display for RejectedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectedReason::WeightLimitExceeded => {
                write!(f, "Item mass exceeds the remaining weight budget")
            }
        }
    }
}
