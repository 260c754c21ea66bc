//! Recipe management and crafting profitability.
//!
//! [`domain`] holds the pure pricing engine and lot reconciliation,
//! [`infra`] the recipe API client and [`util`] formatting and settings.

pub mod domain;
pub mod infra;
pub mod util;

pub use domain::{
    classify, compute_crafting_cost, compute_profit, weighted_average_price, CalculationError,
    CalculationReport, CalculationResult, CalculationSession, Lot, LotStatus, Material,
    MaterialType, PriceTable, Recipe, RecipeDraft, SellTotals,
};
pub use util::format::format_currency;
