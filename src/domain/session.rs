use std::collections::HashMap;

use tracing::{debug, warn};

use super::entities::{Lot, LotId, Material, MaterialType, PriceTable, Recipe};
use super::evaluation::{
    try_crafting_cost, try_profit, CalculationError, CalculationResult, SellTotals,
};
use super::lots::{LotStatus, Reconciliation};
use super::report::CalculationReport;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LotEntry {
    pub id: LotId,
    pub lot: Lot,
}

impl LotEntry {
    fn new(lot: Lot) -> Self {
        Self {
            id: LotId::new(),
            lot,
        }
    }
}

/// Live values shown while the user edits a session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionPreview {
    pub batches: i64,
    pub total_items: i64,
    pub npc_total: f64,
    pub materials: Vec<MaterialPreview>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialPreview {
    pub material_name: String,
    pub material_type: MaterialType,
    pub needed: i64,
    /// Lot check for drop/buy materials; profession materials have none.
    pub status: Option<LotStatus>,
}

/// Input state of one profitability calculation for a loaded recipe.
///
/// Each drop/buy material starts with a single one-unit lot at price zero.
/// Profession materials carry no cost until a cost is enabled for them.
#[derive(Clone, Debug)]
pub struct CalculationSession {
    recipe: Recipe,
    batches: i64,
    lots: HashMap<String, Vec<LotEntry>>,
    profession_costs: HashMap<String, f64>,
    market_sell_price: f64,
}

impl CalculationSession {
    pub fn new(recipe: Recipe) -> Self {
        let lots = recipe
            .purchasable_materials()
            .map(|m| (m.material_name.clone(), vec![LotEntry::new(Lot::default())]))
            .collect();

        Self {
            recipe,
            batches: 1,
            lots,
            profession_costs: HashMap::new(),
            market_sell_price: 0.0,
        }
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn batches(&self) -> i64 {
        self.batches
    }

    pub fn set_desired_batches(&mut self, batches: i64) {
        self.batches = batches;
    }

    pub fn market_sell_price(&self) -> f64 {
        self.market_sell_price
    }

    /// Market price for one whole batch.
    pub fn set_market_sell_price(&mut self, price: f64) {
        self.market_sell_price = price;
    }

    pub fn lots(&self, material_name: &str) -> Result<&[LotEntry], CalculationError> {
        self.purchasable(material_name)?;
        Ok(self
            .lots
            .get(material_name)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Append a `{0, 1}` lot and return its id.
    pub fn add_lot(&mut self, material_name: &str) -> Result<LotId, CalculationError> {
        self.push_lot(material_name, Lot::default())
    }

    /// Append a lot with the given values and return its id.
    pub fn push_lot(&mut self, material_name: &str, lot: Lot) -> Result<LotId, CalculationError> {
        self.purchasable(material_name)?;
        let entry = LotEntry::new(lot);
        self.lots
            .entry(material_name.to_string())
            .or_default()
            .push(entry);
        Ok(entry.id)
    }

    pub fn update_lot(
        &mut self,
        material_name: &str,
        id: LotId,
        lot: Lot,
    ) -> Result<(), CalculationError> {
        let entry = self
            .lots_mut(material_name)?
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(CalculationError::UnknownLot)?;
        entry.lot = lot;
        Ok(())
    }

    /// Drop a lot. The first lot of a material stays.
    pub fn remove_lot(&mut self, material_name: &str, id: LotId) -> Result<Lot, CalculationError> {
        let entries = self.lots_mut(material_name)?;
        let index = entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(CalculationError::UnknownLot)?;
        if index == 0 {
            return Err(CalculationError::FirstLotRequired(material_name.to_string()));
        }
        Ok(entries.remove(index).lot)
    }

    /// Start pricing a profession material, at zero until set.
    pub fn enable_profession_cost(&mut self, material_name: &str) -> Result<(), CalculationError> {
        self.profession(material_name)?;
        self.profession_costs
            .entry(material_name.to_string())
            .or_insert(0.0);
        Ok(())
    }

    pub fn set_profession_cost(
        &mut self,
        material_name: &str,
        unit_cost: f64,
    ) -> Result<(), CalculationError> {
        self.profession(material_name)?;
        self.profession_costs
            .insert(material_name.to_string(), unit_cost);
        Ok(())
    }

    /// Stop pricing a profession material. The entered cost is discarded.
    pub fn disable_profession_cost(&mut self, material_name: &str) -> Result<(), CalculationError> {
        self.profession(material_name)?;
        self.profession_costs.remove(material_name);
        Ok(())
    }

    pub fn profession_cost(&self, material_name: &str) -> Option<f64> {
        self.profession_costs.get(material_name).copied()
    }

    pub fn reconcile(&self) -> Reconciliation {
        let lots: HashMap<String, Vec<Lot>> = self
            .lots
            .iter()
            .map(|(name, entries)| {
                (
                    name.clone(),
                    entries.iter().map(|entry| entry.lot).collect(),
                )
            })
            .collect();
        Reconciliation::run(&self.recipe, &lots, self.batches)
    }

    pub fn preview(&self) -> SessionPreview {
        let reconciliation = self.reconcile();
        let materials = self
            .recipe
            .materials
            .iter()
            .map(|material| MaterialPreview {
                material_name: material.material_name.clone(),
                material_type: material.material_type,
                needed: material.needed_quantity(self.batches),
                status: reconciliation
                    .check(&material.material_name)
                    .map(|check| check.status),
            })
            .collect();

        SessionPreview {
            batches: self.batches,
            total_items: self.recipe.total_items(self.batches),
            npc_total: self.recipe.npc_total(self.batches),
            materials,
        }
    }

    /// Profession costs that take part in the calculation.
    pub fn profession_price_table(&self) -> PriceTable {
        self.profession_costs
            .iter()
            .filter(|(_, cost)| cost.is_finite() && **cost >= 0.0)
            .map(|(name, cost)| (name.clone(), *cost))
            .collect()
    }

    /// Validate the inputs and price the session.
    pub fn calculate(&self) -> Result<CalculationReport, CalculationError> {
        if self.batches <= 0 {
            return Err(CalculationError::InvalidBatches(self.batches));
        }

        let reconciliation = self.reconcile();
        reconciliation.ensure_calculable()?;
        for check in reconciliation.under_allocated() {
            warn!(
                material = %check.material_name,
                entered = check.entered,
                needed = check.needed,
                "lots cover less than needed; pricing the full amount at the lot average"
            );
        }

        let profession_costs = self.profession_price_table();
        debug!(?profession_costs, "collected profession costs");
        let market_prices = reconciliation.market_prices();

        let sell_price = self.market_sell_price;
        if !sell_price.is_finite() || sell_price < 0.0 {
            return Err(CalculationError::InvalidSellPrice(sell_price));
        }

        let total_cost =
            try_crafting_cost(&self.recipe, &market_prices, self.batches, &profession_costs)?;
        let sell_totals = SellTotals::market(sell_price * self.batches as f64);
        let profit = try_profit(total_cost, &self.recipe, sell_totals, self.batches)?;

        Ok(CalculationReport::new(
            &self.recipe,
            self.batches,
            CalculationResult::from_parts(total_cost, profit),
        )
        .with_under_allocated(reconciliation.checks))
    }

    fn material(&self, material_name: &str) -> Result<&Material, CalculationError> {
        self.recipe
            .material(material_name)
            .ok_or_else(|| CalculationError::UnknownMaterial(material_name.to_string()))
    }

    fn purchasable(&self, material_name: &str) -> Result<&Material, CalculationError> {
        let material = self.material(material_name)?;
        if material.material_type.is_purchasable() {
            Ok(material)
        } else {
            Err(CalculationError::NotPurchasable(material_name.to_string()))
        }
    }

    fn profession(&self, material_name: &str) -> Result<&Material, CalculationError> {
        let material = self.material(material_name)?;
        if material.material_type == MaterialType::Profession {
            Ok(material)
        } else {
            Err(CalculationError::NotProfession(material_name.to_string()))
        }
    }

    fn lots_mut(&mut self, material_name: &str) -> Result<&mut Vec<LotEntry>, CalculationError> {
        self.purchasable(material_name)?;
        Ok(self.lots.entry(material_name.to_string()).or_default())
    }
}
