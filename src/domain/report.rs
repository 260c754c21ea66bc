use std::fmt;

use super::entities::Recipe;
use super::evaluation::CalculationResult;
use super::lots::{LotStatus, MaterialCheck};
use crate::util::format::{
    format_currency_with, format_decimal, format_percent, DEFAULT_DECIMAL_MARK,
    DEFAULT_THOUSANDS_SEPARATOR,
};

/// Whether selling on a channel pays off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfitVerdict {
    Profitable,
    BreakEven,
    Loss,
}

impl ProfitVerdict {
    pub fn from_profit(profit: f64) -> Self {
        if profit > 0.0 {
            ProfitVerdict::Profitable
        } else if profit < 0.0 {
            ProfitVerdict::Loss
        } else {
            ProfitVerdict::BreakEven
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProfitVerdict::Profitable => "worth it",
            ProfitVerdict::BreakEven => "break-even",
            ProfitVerdict::Loss => "not worth it",
        }
    }
}

/// Market profit relative to material cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MarketMargin {
    Percent(f64),
    /// Free materials and a positive profit.
    Unbounded,
    /// Free materials and no profit.
    Undefined,
}

impl MarketMargin {
    pub fn new(total_cost: f64, profit_market: f64) -> Self {
        if total_cost > 0.0 {
            MarketMargin::Percent(profit_market / total_cost * 100.0)
        } else if profit_market > 0.0 {
            MarketMargin::Unbounded
        } else {
            MarketMargin::Undefined
        }
    }
}

impl fmt::Display for MarketMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketMargin::Percent(value) => f.write_str(&format_percent(*value)),
            MarketMargin::Unbounded => f.write_str("∞%"),
            MarketMargin::Undefined => f.write_str("- %"),
        }
    }
}

/// Market profit earned per unit of the recipe's first profession material.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfessionYield {
    pub material_name: String,
    pub total_quantity: i64,
    /// `None` when the recipe needs none of it at this batch count.
    pub profit_per_unit: Option<f64>,
}

/// Everything shown after a successful calculation.
#[derive(Clone, Debug, PartialEq)]
pub struct CalculationReport {
    pub recipe_name: String,
    pub batches: i64,
    pub total_items: i64,
    pub result: CalculationResult,
    pub verdict_market: ProfitVerdict,
    pub verdict_npc: ProfitVerdict,
    pub market_margin: MarketMargin,
    pub profession_yield: Option<ProfessionYield>,
    /// Drop/buy materials priced from fewer units than needed.
    pub under_allocated: Vec<MaterialCheck>,
    pub thousands_separator: char,
}

impl CalculationReport {
    pub fn new(recipe: &Recipe, batches: i64, result: CalculationResult) -> Self {
        let profession_yield = recipe.first_profession_material().map(|material| {
            let total_quantity = material.needed_quantity(batches);
            ProfessionYield {
                material_name: material.material_name.clone(),
                total_quantity,
                profit_per_unit: (total_quantity > 0)
                    .then(|| result.profit_market / total_quantity as f64),
            }
        });

        Self {
            recipe_name: recipe.name.clone(),
            batches,
            total_items: recipe.total_items(batches),
            result,
            verdict_market: ProfitVerdict::from_profit(result.profit_market),
            verdict_npc: ProfitVerdict::from_profit(result.profit_npc),
            market_margin: MarketMargin::new(result.total_cost, result.profit_market),
            profession_yield,
            under_allocated: Vec::new(),
            thousands_separator: DEFAULT_THOUSANDS_SEPARATOR,
        }
    }

    pub fn with_under_allocated(mut self, checks: Vec<MaterialCheck>) -> Self {
        self.under_allocated = checks
            .into_iter()
            .filter(|check| check.status == LotStatus::Under)
            .collect();
        self
    }

    pub fn with_thousands_separator(mut self, separator: char) -> Self {
        self.thousands_separator = separator;
        self
    }

    fn amount(&self, value: f64) -> String {
        format_currency_with(value, self.thousands_separator)
    }
}

impl fmt::Display for CalculationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.result;
        writeln!(
            f,
            "=== {} x{} ({} items) ===",
            self.recipe_name,
            self.batches,
            self.amount(self.total_items as f64)
        )?;
        writeln!(f, "Material cost:   {}", self.amount(r.total_cost))?;
        writeln!(f, "Market revenue:  {}", self.amount(r.total_revenue_market))?;
        writeln!(f, "NPC revenue:     {}", self.amount(r.total_revenue_npc))?;
        writeln!(
            f,
            "Market profit:   {} ({}) ({})",
            self.amount(r.profit_market),
            self.verdict_market.label(),
            self.market_margin
        )?;
        writeln!(
            f,
            "NPC profit:      {} ({})",
            self.amount(r.profit_npc),
            self.verdict_npc.label()
        )?;

        if let Some(profession) = &self.profession_yield {
            let value = profession
                .profit_per_unit
                .map(|v| format_decimal(v, self.thousands_separator, DEFAULT_DECIMAL_MARK))
                .unwrap_or_else(|| "N/A".to_string());
            writeln!(
                f,
                "Profit per {}:  {}",
                profession.material_name, value
            )?;
        }

        for check in &self.under_allocated {
            writeln!(
                f,
                "warning: {} priced from {} of {} needed",
                check.material_name,
                self.amount(check.entered as f64),
                self.amount(check.needed as f64)
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Material, MaterialType};

    fn recipe() -> Recipe {
        Recipe {
            id: 3,
            name: "Mana Potion".into(),
            quantity_produced: 5,
            npc_sell_price: 100.0,
            materials: vec![
                Material {
                    material_name: "Crystal".into(),
                    quantity: 2,
                    material_type: MaterialType::Buy,
                    default_npc_price: 4.0,
                },
                Material {
                    material_name: "Alchemy Dust".into(),
                    quantity: 4,
                    material_type: MaterialType::Profession,
                    default_npc_price: 0.0,
                },
            ],
        }
    }

    #[test]
    fn verdicts_follow_profit_sign() {
        assert_eq!(ProfitVerdict::from_profit(0.5), ProfitVerdict::Profitable);
        assert_eq!(ProfitVerdict::from_profit(0.0), ProfitVerdict::BreakEven);
        assert_eq!(ProfitVerdict::from_profit(-1.0), ProfitVerdict::Loss);
    }

    #[test]
    fn margin_handles_free_materials() {
        assert_eq!(MarketMargin::new(200.0, 50.0), MarketMargin::Percent(25.0));
        assert_eq!(MarketMargin::new(0.0, 50.0), MarketMargin::Unbounded);
        assert_eq!(MarketMargin::new(0.0, 0.0), MarketMargin::Undefined);
        assert_eq!(MarketMargin::new(0.0, -3.0), MarketMargin::Undefined);
        assert_eq!(MarketMargin::Percent(25.0).to_string(), "25.0%");
    }

    #[test]
    fn report_derives_profession_yield_and_items() {
        let result = CalculationResult {
            total_cost: 80.0,
            total_revenue_market: 180.0,
            total_revenue_npc: 200.0,
            profit_market: 100.0,
            profit_npc: 120.0,
        };
        let report = CalculationReport::new(&recipe(), 2, result);
        assert_eq!(report.total_items, 10);
        let profession = report.profession_yield.as_ref().unwrap();
        assert_eq!(profession.material_name, "Alchemy Dust");
        assert_eq!(profession.total_quantity, 8);
        assert_eq!(profession.profit_per_unit, Some(12.5));

        let text = report.to_string();
        assert!(text.contains("Material cost:   80"));
        assert!(text.contains("Market profit:   100 (worth it) (125.0%)"));
        assert!(text.contains("Profit per Alchemy Dust:  12,5"));
    }
}
