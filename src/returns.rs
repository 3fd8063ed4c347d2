//! Weight-bounded waste-return planning.
//!
//! Waste candidates are selected heaviest first until the weight budget is
//! spent; a configurable fill ratio keeps a safety margin below the hard
//! limit. The resulting plan carries the manifest, per-item moves toward the
//! undocking container, and a grouped step sequence that visits each source
//! container once.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::PlannerConfig;
use crate::error::{PlanError, RejectedReason};
use crate::model::{
    Item, MoveStep, ReturnAction, ReturnItem, ReturnManifest, ReturnStep,
};

/// A waste candidate that did not make the manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct RejectedItem {
    pub item_id: String,
    pub reason: RejectedReason,
}

/// Result of one return planning call.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnPlan {
    pub manifest: ReturnManifest,
    pub moves: Vec<MoveStep>,
    pub steps: Vec<ReturnStep>,
    pub rejected: Vec<RejectedItem>,
}

/// Plans a waste return into an undocking container.
///
/// # Parameters
/// * `container_id` - Undocking (destination) container
/// * `weight_limit` - Hard mass budget in kilograms
/// * `waste_items` - Candidates, each carrying its source container
/// * `date` - Scheduled return date for the manifest
/// * `config` - Fill ratio and defaults
///
/// # Returns
/// A `ReturnPlan`, or an error when the input is malformed, no candidates
/// exist, or none fits the budget.
pub fn plan_return(
    container_id: &str,
    weight_limit: f64,
    waste_items: Vec<Item>,
    date: NaiveDate,
    config: &PlannerConfig,
) -> Result<ReturnPlan, PlanError> {
    if !weight_limit.is_finite() || weight_limit <= 0.0 {
        return Err(PlanError::InvalidInput(
            "weight limit must be a positive number".to_string(),
        ));
    }
    if container_id.trim().is_empty() {
        return Err(PlanError::InvalidInput(
            "undocking container id must not be empty".to_string(),
        ));
    }
    if waste_items.is_empty() {
        return Err(PlanError::NoWasteItems);
    }
    for item in &waste_items {
        item.validate()
            .map_err(|err| PlanError::InvalidInput(err.to_string()))?;
        if item.container_id.is_none() {
            return Err(PlanError::InvalidInput(format!(
                "waste item '{}' has no source container",
                item.id
            )));
        }
        if item.waste_reason.is_none() {
            return Err(PlanError::InvalidInput(format!(
                "item '{}' is not flagged as waste",
                item.id
            )));
        }
    }

    let mut candidates = waste_items;
    // Heaviest first packs the budget greedily; id breaks ties.
    candidates.sort_by(|a, b| {
        b.mass
            .partial_cmp(&a.mass)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let fill_threshold = weight_limit * config.return_fill_ratio;
    let mut selected: Vec<Item> = Vec::new();
    let mut rejected: Vec<RejectedItem> = Vec::new();
    let mut total_mass = 0.0;

    for item in candidates {
        let fits_budget = total_mass + item.mass <= weight_limit + config.general_epsilon;
        let below_threshold = total_mass < fill_threshold;
        if fits_budget && below_threshold {
            total_mass += item.mass;
            selected.push(item);
        } else {
            rejected.push(RejectedItem {
                item_id: item.id,
                reason: RejectedReason::WeightLimitExceeded,
            });
        }
    }

    if selected.is_empty() {
        return Err(PlanError::NoItemsFit);
    }

    let total_volume = selected.iter().map(Item::volume).sum();
    let manifest = ReturnManifest {
        container_id: container_id.to_string(),
        date,
        items: selected
            .iter()
            .map(|item| ReturnItem {
                item_id: item.id.clone(),
                name: item.name.clone(),
                mass: item.mass,
                reason: item.waste_reason.unwrap_or(crate::model::WasteReason::Expired),
            })
            .collect(),
        total_mass,
        total_volume,
        weight_limit,
    };

    let mut moves = Vec::with_capacity(selected.len());
    for (i, item) in selected.iter().enumerate() {
        moves.push(MoveStep {
            order: (i + 1) as u32,
            item_id: item.id.clone(),
            from_container: item.container_id.clone().unwrap_or_default(),
            to_container: container_id.to_string(),
        });
    }

    let steps = grouped_steps(container_id, &selected);

    Ok(ReturnPlan {
        manifest,
        moves,
        steps,
        rejected,
    })
}

/// Groups the collection walk by source container, visiting each once.
fn grouped_steps(undocking_id: &str, selected: &[Item]) -> Vec<ReturnStep> {
    let mut by_source: BTreeMap<String, Vec<&Item>> = BTreeMap::new();
    for item in selected {
        let source = item.container_id.clone().unwrap_or_default();
        by_source.entry(source).or_default().push(item);
    }

    let mut steps = Vec::new();
    let mut order: u32 = 0;
    for (source, items) in &by_source {
        order += 1;
        steps.push(ReturnStep {
            order,
            action: ReturnAction::MoveToContainer,
            item_id: None,
            container_id: source.clone(),
        });
        for item in items {
            order += 1;
            steps.push(ReturnStep {
                order,
                action: ReturnAction::Retrieve,
                item_id: Some(item.id.clone()),
                container_id: source.clone(),
            });
            order += 1;
            steps.push(ReturnStep {
                order,
                action: ReturnAction::MoveToUndocking,
                item_id: Some(item.id.clone()),
                container_id: undocking_id.to_string(),
            });
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dimensions, WasteReason};

    fn waste(id: &str, mass: f64, source: &str) -> Item {
        Item {
            id: id.to_string(),
            name: format!("Waste {id}"),
            dimensions: Dimensions::new(10.0, 10.0, 10.0).unwrap(),
            mass,
            priority: Some(1),
            expiry: None,
            usage_limit: 1,
            remaining_uses: Some(0),
            preferred_zone: None,
            is_waste: true,
            waste_reason: Some(WasteReason::UsesExhausted),
            container_id: Some(source.to_string()),
            position: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
    }

    #[test]
    fn selects_heaviest_first_within_the_budget() {
        let config = PlannerConfig::default();
        let plan = plan_return(
            "CONT-UND",
            100.0,
            vec![
                waste("ITM-1", 40.0, "CONT-A1"),
                waste("ITM-2", 55.0, "CONT-A1"),
                waste("ITM-3", 30.0, "CONT-B1"),
            ],
            date(),
            &config,
        )
        .expect("valid input");

        // 55 + 40 = 95 hits the fill threshold; 30 no longer fits.
        let ids: Vec<&str> = plan.manifest.items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["ITM-2", "ITM-1"]);
        assert!((plan.manifest.total_mass - 95.0).abs() < 1e-9);
        assert_eq!(plan.rejected.len(), 1);
        assert_eq!(plan.rejected[0].item_id, "ITM-3");
        assert_eq!(plan.rejected[0].reason, RejectedReason::WeightLimitExceeded);
    }

    #[test]
    fn second_item_breaching_the_limit_is_rejected() {
        let config = PlannerConfig::default();
        let plan = plan_return(
            "CONT-UND",
            1000.0,
            vec![
                waste("ITM-1", 600.0, "CONT-A1"),
                waste("ITM-2", 500.0, "CONT-A1"),
            ],
            date(),
            &config,
        )
        .expect("valid input");

        assert_eq!(plan.manifest.items.len(), 1);
        assert_eq!(plan.manifest.items[0].item_id, "ITM-1");
        assert!((plan.manifest.total_mass - 600.0).abs() < 1e-9);
        assert_eq!(plan.rejected.len(), 1);
        assert_eq!(plan.rejected[0].item_id, "ITM-2");
        assert_eq!(plan.rejected[0].reason, RejectedReason::WeightLimitExceeded);
    }

    #[test]
    fn total_mass_never_exceeds_the_limit() {
        let config = PlannerConfig::default();
        let items: Vec<Item> = (0..10)
            .map(|i| waste(&format!("ITM-{i}"), 7.0 + i as f64, "CONT-A1"))
            .collect();

        let plan = plan_return("CONT-UND", 50.0, items, date(), &config).expect("valid input");
        assert!(plan.manifest.total_mass <= 50.0 + 1e-9);
        assert_eq!(plan.manifest.weight_limit, 50.0);
    }

    #[test]
    fn fill_ratio_keeps_a_safety_margin() {
        let config = PlannerConfig::default();
        let plan = plan_return(
            "CONT-UND",
            100.0,
            vec![
                waste("ITM-1", 95.0, "CONT-A1"),
                waste("ITM-2", 5.0, "CONT-A1"),
            ],
            date(),
            &config,
        )
        .expect("valid input");

        // After 95 kg the threshold is reached; the 5 kg item is rejected
        // even though the hard limit would allow it.
        assert_eq!(plan.manifest.items.len(), 1);
        assert_eq!(plan.rejected.len(), 1);
        assert_eq!(plan.rejected[0].item_id, "ITM-2");
    }

    #[test]
    fn invalid_weight_limit_is_rejected() {
        let config = PlannerConfig::default();
        for limit in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                plan_return(
                    "CONT-UND",
                    limit,
                    vec![waste("ITM-1", 1.0, "CONT-A1")],
                    date(),
                    &config
                ),
                Err(PlanError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn empty_candidate_list_reports_no_waste() {
        let config = PlannerConfig::default();
        assert!(matches!(
            plan_return("CONT-UND", 100.0, vec![], date(), &config),
            Err(PlanError::NoWasteItems)
        ));
    }

    #[test]
    fn nothing_fitting_reports_no_items_fit() {
        let config = PlannerConfig::default();
        assert!(matches!(
            plan_return(
                "CONT-UND",
                10.0,
                vec![waste("ITM-HEAVY", 50.0, "CONT-A1")],
                date(),
                &config
            ),
            Err(PlanError::NoItemsFit)
        ));
    }

    #[test]
    fn candidate_without_source_container_is_invalid() {
        let config = PlannerConfig::default();
        let mut orphan = waste("ITM-1", 5.0, "CONT-A1");
        orphan.container_id = None;
        assert!(matches!(
            plan_return("CONT-UND", 100.0, vec![orphan], date(), &config),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn steps_visit_each_source_container_once() {
        let config = PlannerConfig::default();
        let plan = plan_return(
            "CONT-UND",
            100.0,
            vec![
                waste("ITM-1", 10.0, "CONT-B1"),
                waste("ITM-2", 20.0, "CONT-A1"),
                waste("ITM-3", 15.0, "CONT-A1"),
            ],
            date(),
            &config,
        )
        .expect("valid input");

        let visits: Vec<&str> = plan
            .steps
            .iter()
            .filter(|s| s.action == ReturnAction::MoveToContainer)
            .map(|s| s.container_id.as_str())
            .collect();
        assert_eq!(visits, vec!["CONT-A1", "CONT-B1"]);

        // Every selected item gets a Retrieve at its source and a
        // MoveToUndocking at the destination.
        for item in &plan.manifest.items {
            assert!(plan.steps.iter().any(|s| {
                s.action == ReturnAction::Retrieve && s.item_id.as_deref() == Some(&item.item_id)
            }));
            assert!(plan.steps.iter().any(|s| {
                s.action == ReturnAction::MoveToUndocking
                    && s.item_id.as_deref() == Some(&item.item_id)
                    && s.container_id == "CONT-UND"
            }));
        }

        let orders: Vec<u32> = plan.steps.iter().map(|s| s.order).collect();
        let expected: Vec<u32> = (1..=orders.len() as u32).collect();
        assert_eq!(orders, expected);
    }

    #[test]
    fn moves_point_from_source_to_undocking() {
        let config = PlannerConfig::default();
        let plan = plan_return(
            "CONT-UND",
            100.0,
            vec![waste("ITM-1", 10.0, "CONT-A1")],
            date(),
            &config,
        )
        .expect("valid input");

        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].order, 1);
        assert_eq!(plan.moves[0].from_container, "CONT-A1");
        assert_eq!(plan.moves[0].to_container, "CONT-UND");
    }
}
