//! Recipe model, lot reconciliation and the pricing engine.

pub mod entities;
pub mod evaluation;
pub mod lots;
pub mod report;
pub mod session;

pub use entities::{Lot, LotId, Material, MaterialType, PriceTable, Recipe, RecipeDraft, RecipeId};
pub use evaluation::{
    compute_crafting_cost, compute_profit, try_calculate, try_crafting_cost, try_profit,
    CalculationError, CalculationResult, ProfitBreakdown, SellTotals,
};
pub use lots::{classify, weighted_average_price, LotStatus, MaterialCheck, Reconciliation};
pub use report::{CalculationReport, MarketMargin, ProfessionYield, ProfitVerdict};
pub use session::{CalculationSession, LotEntry, MaterialPreview, SessionPreview};
