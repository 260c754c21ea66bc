//! Lot reconciliation: folds the purchase lots entered for each material into
//! one average unit price and checks the entered amount against what the
//! recipe needs.

use std::collections::HashMap;

use super::entities::{Lot, Material, PriceTable, Recipe};
use super::evaluation::CalculationError;

/// How the entered lot quantities compare to the needed quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LotStatus {
    /// Entered exactly what is needed.
    Exact,
    /// Entered less than needed. Calculation may proceed.
    Under,
    /// Entered more than needed, or a negative total. Blocks calculation.
    Over,
}

impl LotStatus {
    pub fn blocks_calculation(&self) -> bool {
        matches!(self, LotStatus::Over)
    }

    pub fn label(&self) -> &'static str {
        match self {
            LotStatus::Exact => "ok",
            LotStatus::Under => "under",
            LotStatus::Over => "over",
        }
    }
}

/// Classify the entered quantities against `needed`.
pub fn classify(needed: i64, lot_quantities: &[i64]) -> LotStatus {
    classify_total(needed, total_quantity(lot_quantities.iter().copied()))
}

/// Exact sum of the entered quantities. Widened so large rows cannot wrap.
fn total_quantity(quantities: impl Iterator<Item = i64>) -> i128 {
    quantities.map(i128::from).sum()
}

fn classify_total(needed: i64, entered: i128) -> LotStatus {
    let needed = i128::from(needed);
    if entered == needed {
        LotStatus::Exact
    } else if (0..needed).contains(&entered) {
        LotStatus::Under
    } else {
        LotStatus::Over
    }
}

/// Quantity-weighted average unit price over the usable lots.
///
/// Rows with a non-positive quantity or a negative price are left out of both
/// sums. No usable rows means an average of zero.
pub fn weighted_average_price(lots: &[Lot]) -> f64 {
    let (total_cost, total_qty) = lots
        .iter()
        .filter(|lot| lot.is_usable())
        .fold((0.0, 0_i128), |(cost, qty), lot| {
            (
                cost + lot.unit_price * lot.quantity as f64,
                qty + i128::from(lot.quantity),
            )
        });

    if total_qty > 0 {
        total_cost / total_qty as f64
    } else {
        0.0
    }
}

/// Result of checking one drop/buy material.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialCheck {
    pub material_name: String,
    pub needed: i64,
    /// Sum of every entered quantity, usable or not, clamped to `i64`.
    pub entered: i64,
    pub status: LotStatus,
    pub average_price: f64,
}

impl MaterialCheck {
    pub fn evaluate(material: &Material, lots: &[Lot], batches: i64) -> Self {
        let needed = material.needed_quantity(batches);
        let entered = total_quantity(lots.iter().map(|lot| lot.quantity));
        Self {
            material_name: material.material_name.clone(),
            needed,
            entered: clamp_to_i64(entered),
            status: classify_total(needed, entered),
            average_price: weighted_average_price(lots),
        }
    }

    pub fn shortfall(&self) -> i64 {
        self.needed.saturating_sub(self.entered).max(0)
    }
}

fn clamp_to_i64(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Reconciliation of every drop/buy material of a recipe.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reconciliation {
    pub checks: Vec<MaterialCheck>,
}

impl Reconciliation {
    /// Check every purchasable material of `recipe` against its lots. A
    /// material without an entry in `lots` is treated as having none.
    pub fn run(recipe: &Recipe, lots: &HashMap<String, Vec<Lot>>, batches: i64) -> Self {
        let checks = recipe
            .purchasable_materials()
            .map(|material| {
                let entered = lots
                    .get(&material.material_name)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                MaterialCheck::evaluate(material, entered, batches)
            })
            .collect();
        Self { checks }
    }

    pub fn check(&self, material_name: &str) -> Option<&MaterialCheck> {
        self.checks
            .iter()
            .find(|check| check.material_name == material_name)
    }

    /// First over-allocated material, in recipe order.
    pub fn first_blocking(&self) -> Option<&MaterialCheck> {
        self.checks
            .iter()
            .find(|check| check.status.blocks_calculation())
    }

    pub fn under_allocated(&self) -> impl Iterator<Item = &MaterialCheck> {
        self.checks
            .iter()
            .filter(|check| check.status == LotStatus::Under)
    }

    pub fn is_calculable(&self) -> bool {
        self.first_blocking().is_none()
    }

    pub fn ensure_calculable(&self) -> Result<(), CalculationError> {
        match self.first_blocking() {
            Some(check) => Err(CalculationError::OverAllocated {
                material: check.material_name.clone(),
                entered: check.entered,
                needed: check.needed,
            }),
            None => Ok(()),
        }
    }

    /// Average unit price per material, as consumed by the pricing engine.
    pub fn market_prices(&self) -> PriceTable {
        self.checks
            .iter()
            .map(|check| (check.material_name.clone(), check.average_price))
            .collect()
    }
}
