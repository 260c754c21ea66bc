//! Pricing engine: material cost, revenue and profit for a number of craft
//! batches.
//!
//! Every entry point comes in two flavours. The `try_*` functions return a
//! typed [`CalculationError`] for invalid top-level input; the `compute_*`
//! functions keep the lenient contract of logging a warning and returning a
//! zero result instead.

use thiserror::Error;
use tracing::warn;

use super::entities::{sanitized_amount, MaterialType, PriceTable, Recipe};

#[derive(Clone, Debug, PartialEq, Error)]
pub enum CalculationError {
    #[error("recipe '{0}' has no materials")]
    EmptyRecipe(String),
    #[error("invalid batch count: {0}")]
    InvalidBatches(i64),
    #[error("invalid market sell price: {0}")]
    InvalidSellPrice(f64),
    #[error("lot quantity for '{material}' ({entered}) exceeds what is needed ({needed})")]
    OverAllocated {
        material: String,
        entered: i64,
        needed: i64,
    },
    #[error("material '{0}' is not part of this recipe")]
    UnknownMaterial(String),
    #[error("material '{0}' is not bought on the market")]
    NotPurchasable(String),
    #[error("material '{0}' is not a profession material")]
    NotProfession(String),
    #[error("no such lot")]
    UnknownLot,
    #[error("the first lot of '{0}' cannot be removed")]
    FirstLotRequired(String),
}

/// Total material cost of `batches` crafts.
///
/// Drop and buy materials are priced from `market_prices`; a missing or
/// negative price counts as zero. Profession materials cost nothing unless
/// `profession_costs` holds a valid unit cost for them.
pub fn try_crafting_cost(
    recipe: &Recipe,
    market_prices: &PriceTable,
    batches: i64,
    profession_costs: &PriceTable,
) -> Result<f64, CalculationError> {
    if recipe.materials.is_empty() {
        return Err(CalculationError::EmptyRecipe(recipe.name.clone()));
    }
    if batches <= 0 {
        return Err(CalculationError::InvalidBatches(batches));
    }

    let mut total_cost = 0.0;
    for material in &recipe.materials {
        let needed = material.needed_quantity(batches) as f64;
        let name = material.material_name.as_str();

        match material.material_type {
            MaterialType::Drop | MaterialType::Buy => {
                let unit_price = match market_prices.valid(name) {
                    Some(price) => price,
                    None => {
                        warn!(
                            material = name,
                            price = ?market_prices.get(name),
                            "invalid or missing market unit price, using 0"
                        );
                        0.0
                    }
                };
                total_cost += needed * unit_price;
            }
            MaterialType::Profession => {
                if let Some(unit_cost) = profession_costs.valid(name) {
                    total_cost += needed * unit_cost;
                }
            }
        }
    }

    Ok(total_cost)
}

/// Lenient form of [`try_crafting_cost`]: invalid input yields `0.0`.
pub fn compute_crafting_cost(
    recipe: Option<&Recipe>,
    market_prices: &PriceTable,
    batches: i64,
    profession_costs: &PriceTable,
) -> f64 {
    let Some(recipe) = recipe else {
        warn!(batches, "no recipe for cost calculation");
        return 0.0;
    };

    try_crafting_cost(recipe, market_prices, batches, profession_costs).unwrap_or_else(|error| {
        warn!(recipe = %recipe.name, batches, %error, "invalid cost calculation input");
        0.0
    })
}

/// Already aggregated sale totals for all batches.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SellTotals {
    pub market: Option<f64>,
}

impl SellTotals {
    pub fn market(total: f64) -> Self {
        Self {
            market: Some(total),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProfitBreakdown {
    pub profit_market: f64,
    pub profit_npc: f64,
    pub total_revenue_market: f64,
    pub total_revenue_npc: f64,
}

/// Revenue and profit on both sale channels. Profit may be negative.
pub fn try_profit(
    total_cost: f64,
    recipe: &Recipe,
    sell_totals: SellTotals,
    batches: i64,
) -> Result<ProfitBreakdown, CalculationError> {
    if batches <= 0 {
        return Err(CalculationError::InvalidBatches(batches));
    }

    let total_revenue_market = sell_totals.market.map(sanitized_amount).unwrap_or(0.0);
    let total_revenue_npc = recipe.npc_total(batches);

    Ok(ProfitBreakdown {
        profit_market: total_revenue_market - total_cost,
        profit_npc: total_revenue_npc - total_cost,
        total_revenue_market,
        total_revenue_npc,
    })
}

/// Lenient form of [`try_profit`]: invalid input yields an all-zero result.
pub fn compute_profit(
    total_cost: f64,
    recipe: Option<&Recipe>,
    sell_totals: SellTotals,
    batches: i64,
) -> ProfitBreakdown {
    let Some(recipe) = recipe else {
        warn!(batches, "no recipe for profit calculation");
        return ProfitBreakdown::default();
    };

    try_profit(total_cost, recipe, sell_totals, batches).unwrap_or_else(|error| {
        warn!(recipe = %recipe.name, batches, %error, "invalid profit calculation input");
        ProfitBreakdown::default()
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CalculationResult {
    pub total_cost: f64,
    pub total_revenue_market: f64,
    pub total_revenue_npc: f64,
    pub profit_market: f64,
    pub profit_npc: f64,
}

impl CalculationResult {
    pub fn from_parts(total_cost: f64, profit: ProfitBreakdown) -> Self {
        Self {
            total_cost,
            total_revenue_market: profit.total_revenue_market,
            total_revenue_npc: profit.total_revenue_npc,
            profit_market: profit.profit_market,
            profit_npc: profit.profit_npc,
        }
    }
}

/// Cost and profit in one pass.
pub fn try_calculate(
    recipe: &Recipe,
    market_prices: &PriceTable,
    profession_costs: &PriceTable,
    sell_totals: SellTotals,
    batches: i64,
) -> Result<CalculationResult, CalculationError> {
    let total_cost = try_crafting_cost(recipe, market_prices, batches, profession_costs)?;
    let profit = try_profit(total_cost, recipe, sell_totals, batches)?;
    Ok(CalculationResult::from_parts(total_cost, profit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Material;

    fn recipe(materials: Vec<Material>) -> Recipe {
        Recipe {
            id: 1,
            name: "Health Potion".into(),
            quantity_produced: 1,
            npc_sell_price: 100.0,
            materials,
        }
    }

    fn material(name: &str, quantity: u32, material_type: MaterialType) -> Material {
        Material {
            material_name: name.into(),
            quantity,
            material_type,
            default_npc_price: 0.0,
        }
    }

    #[test]
    fn non_positive_batches_yield_zero() {
        let recipe = recipe(vec![material("Herb", 2, MaterialType::Buy)]);
        let prices: PriceTable = [("Herb", 5.0)].into_iter().collect();

        for batches in [0, -3] {
            assert_eq!(
                compute_crafting_cost(Some(&recipe), &prices, batches, &PriceTable::new()),
                0.0
            );
            assert_eq!(
                compute_profit(10.0, Some(&recipe), SellTotals::market(50.0), batches),
                ProfitBreakdown::default()
            );
        }
        assert_eq!(
            try_crafting_cost(&recipe, &prices, 0, &PriceTable::new()),
            Err(CalculationError::InvalidBatches(0))
        );
    }

    #[test]
    fn missing_recipe_yields_zero() {
        assert_eq!(
            compute_crafting_cost(None, &PriceTable::new(), 2, &PriceTable::new()),
            0.0
        );
        assert_eq!(
            compute_profit(5.0, None, SellTotals::market(9.0), 2),
            ProfitBreakdown::default()
        );
    }

    #[test]
    fn empty_recipe_is_rejected() {
        let recipe = recipe(Vec::new());
        assert_eq!(
            try_crafting_cost(&recipe, &PriceTable::new(), 1, &PriceTable::new()),
            Err(CalculationError::EmptyRecipe("Health Potion".into()))
        );
        assert_eq!(
            compute_crafting_cost(Some(&recipe), &PriceTable::new(), 1, &PriceTable::new()),
            0.0
        );
    }

    #[test]
    fn profession_material_is_free_without_override() {
        let recipe = recipe(vec![material("Essence", 2, MaterialType::Profession)]);
        let mut market = PriceTable::new();
        market.insert("Essence", 1_000.0);

        let cost = try_crafting_cost(&recipe, &market, 3, &PriceTable::new()).unwrap();
        assert_eq!(cost, 0.0);

        let overrides: PriceTable = [("Essence", 7.0)].into_iter().collect();
        let cost = try_crafting_cost(&recipe, &market, 3, &overrides).unwrap();
        assert_eq!(cost, 42.0);
    }

    #[test]
    fn invalid_profession_override_is_ignored() {
        let recipe = recipe(vec![material("Essence", 2, MaterialType::Profession)]);
        let overrides: PriceTable = [("Essence", -4.0)].into_iter().collect();
        assert_eq!(
            try_crafting_cost(&recipe, &PriceTable::new(), 1, &overrides).unwrap(),
            0.0
        );
    }

    #[test]
    fn market_materials_ignore_profession_overrides() {
        let recipe = recipe(vec![material("Herb", 4, MaterialType::Drop)]);
        let overrides: PriceTable = [("Herb", 50.0)].into_iter().collect();
        assert_eq!(
            try_crafting_cost(&recipe, &PriceTable::new(), 1, &overrides).unwrap(),
            0.0
        );
    }

    #[test]
    fn negative_market_price_counts_as_zero() {
        let recipe = recipe(vec![
            material("Herb", 1, MaterialType::Buy),
            material("Vial", 1, MaterialType::Buy),
        ]);
        let prices: PriceTable = [("Herb", -10.0), ("Vial", 3.0)].into_iter().collect();
        assert_eq!(
            try_crafting_cost(&recipe, &prices, 2, &PriceTable::new()).unwrap(),
            6.0
        );
    }

    #[test]
    fn profit_can_be_negative() {
        let recipe = recipe(vec![material("Herb", 1, MaterialType::Buy)]);
        let profit = try_profit(450.0, &recipe, SellTotals::market(300.0), 2).unwrap();
        assert_eq!(profit.total_revenue_npc, 200.0);
        assert_eq!(profit.total_revenue_market, 300.0);
        assert_eq!(profit.profit_npc, -250.0);
        assert_eq!(profit.profit_market, -150.0);
    }

    #[test]
    fn missing_market_total_counts_as_zero() {
        let recipe = recipe(vec![material("Herb", 1, MaterialType::Buy)]);
        let profit = try_profit(20.0, &recipe, SellTotals::default(), 1).unwrap();
        assert_eq!(profit.total_revenue_market, 0.0);
        assert_eq!(profit.profit_market, -20.0);
    }
}
