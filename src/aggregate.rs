// nutrack-engine/src/aggregate.rs
//! Nutrient totals, RDA percentages, and calorie-goal projection.
//!
//! Everything here is a pure function over caller-owned lines and maps;
//! nothing is cached or persisted. Aggregation is best effort: a food whose
//! vector cannot be fetched contributes zero and never aborts the rest.

use crate::catalog::NutrientReading;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Nutrient id of energy in kcal in the reference catalog.
pub const CALORIE_NUTRIENT_ID: i64 = 208;

/// Summed amounts keyed by nutrient id. Ids never seen are absent, not zero.
pub type NutrientTotals = HashMap<i64, f64>;

/// One line of a meal or daily log: a food at a gram quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealLine {
    pub food_id: i64,
    pub food_name: String,
    pub grams: f64,
    pub meal_label: Option<String>,
}

/// Anything that can produce a per-100g nutrient vector for a food id.
pub trait NutrientSource {
    fn nutrient_vector(&self, food_id: i64) -> Result<Vec<NutrientReading>>;
}

/// Scale each line's per-100g vector by grams/100 and accumulate.
/// Non-positive gram quantities contribute nothing.
pub fn aggregate(lines: &[MealLine], source: &impl NutrientSource) -> NutrientTotals {
    let mut totals = NutrientTotals::new();
    for line in lines {
        if line.grams <= 0.0 {
            continue;
        }
        let vector = match source.nutrient_vector(line.food_id) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    food_id = line.food_id,
                    "nutrient vector unavailable, counting zero contribution: {e}"
                );
                continue;
            }
        };
        let scale = line.grams / 100.0;
        for nutrient in vector {
            *totals.entry(nutrient.id).or_insert(0.0) += nutrient.amount * scale;
        }
    }
    totals
}

/// Percent of RDA per nutrient. Nutrients without a defined (positive) RDA
/// are omitted from the result, not reported as zero.
pub fn percentage_of_rda(
    totals: &NutrientTotals,
    rda: &HashMap<i64, f64>,
) -> HashMap<i64, f64> {
    totals
        .iter()
        .filter_map(|(id, total)| match rda.get(id) {
            Some(target) if *target > 0.0 => Some((*id, (total / target) * 100.0)),
            _ => None,
        })
        .collect()
}

/// Rescale a day's totals as if calorie intake hit `goal_kcal` exactly.
///
/// Returns the multiplier and the projected totals. When the current calorie
/// total or the goal is not positive there is nothing to project and the
/// multiplier is 1.0.
pub fn project(
    totals: &NutrientTotals,
    goal_kcal: f64,
    calorie_id: i64,
) -> (f64, NutrientTotals) {
    let current_kcal = totals.get(&calorie_id).copied().unwrap_or(0.0);
    let multiplier = if current_kcal > 0.0 && goal_kcal > 0.0 {
        goal_kcal / current_kcal
    } else {
        1.0
    };
    let projected = totals
        .iter()
        .map(|(id, value)| (*id, value * multiplier))
        .collect();
    (multiplier, projected)
}

/// Where a percentage-of-RDA value falls relative to the target.
/// The thresholds are a stable contract; rendering them is the UI's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RdaBand {
    Under,
    Approaching,
    OnTarget,
    Over,
}

impl RdaBand {
    pub fn for_percent(percent: f64) -> Self {
        if percent < 50.0 {
            Self::Under
        } else if percent > 150.0 {
            Self::Over
        } else if percent >= 100.0 {
            Self::OnTarget
        } else {
            Self::Approaching
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Under => "under",
            Self::Approaching => "approaching",
            Self::OnTarget => "on-target",
            Self::Over => "over",
        }
    }
}
