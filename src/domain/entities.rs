use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for recipes returned by the recipe API.
pub type RecipeId = i64;

/// How a material enters a recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    /// Self-produced input, free unless the user prices it explicitly.
    Profession,
    /// Monster drop, bought from other players on the market.
    Drop,
    /// Bought on the market.
    Buy,
}

impl MaterialType {
    pub fn name(&self) -> &'static str {
        match self {
            MaterialType::Profession => "profession",
            MaterialType::Drop => "drop",
            MaterialType::Buy => "buy",
        }
    }

    /// Drop and buy materials are priced from market lots.
    pub fn is_purchasable(&self) -> bool {
        matches!(self, MaterialType::Drop | MaterialType::Buy)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub material_name: String,
    /// Amount needed for a single batch.
    pub quantity: u32,
    pub material_type: MaterialType,
    /// NPC vendor price, shown for reference only.
    #[serde(default)]
    pub default_npc_price: f64,
}

impl Material {
    /// Total amount of this material consumed by `batches` crafts,
    /// saturating at the bounds of `i64`.
    pub fn needed_quantity(&self, batches: i64) -> i64 {
        i64::from(self.quantity).saturating_mul(batches)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    /// Units yielded by one craft batch.
    pub quantity_produced: u32,
    /// NPC vendor price for one whole batch.
    #[serde(default)]
    pub npc_sell_price: f64,
    #[serde(default)]
    pub materials: Vec<Material>,
}

impl Recipe {
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.material_name == name)
    }

    pub fn purchasable_materials(&self) -> impl Iterator<Item = &Material> {
        self.materials
            .iter()
            .filter(|m| m.material_type.is_purchasable())
    }

    pub fn first_profession_material(&self) -> Option<&Material> {
        self.materials
            .iter()
            .find(|m| m.material_type == MaterialType::Profession)
    }

    /// Units produced by `batches` crafts. A recipe stored with a zero yield
    /// counts as yielding one unit per batch.
    pub fn total_items(&self, batches: i64) -> i64 {
        batches.saturating_mul(i64::from(self.quantity_produced.max(1)))
    }

    /// NPC revenue for `batches` crafts.
    pub fn npc_total(&self, batches: i64) -> f64 {
        sanitized_amount(self.npc_sell_price) * batches as f64
    }

    pub fn to_draft(&self) -> RecipeDraft {
        RecipeDraft {
            name: self.name.clone(),
            quantity_produced: self.quantity_produced,
            npc_sell_price: self.npc_sell_price,
            materials: self.materials.clone(),
        }
    }
}

/// Body of create and update requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    pub quantity_produced: u32,
    #[serde(default)]
    pub npc_sell_price: f64,
    #[serde(default)]
    pub materials: Vec<Material>,
}

/// Identifier of a single lot row inside a calculation session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LotId(Uuid);

impl LotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LotId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One purchase of a material at a given unit price.
///
/// Values are kept as entered: a row may hold a negative price or a
/// non-positive quantity until the user fixes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lot {
    pub unit_price: f64,
    pub quantity: i64,
}

impl Lot {
    pub fn new(unit_price: f64, quantity: i64) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    /// Whether the row takes part in price averaging.
    pub fn is_usable(&self) -> bool {
        self.quantity > 0 && self.unit_price.is_finite() && self.unit_price >= 0.0
    }
}

impl Default for Lot {
    fn default() -> Self {
        Self {
            unit_price: 0.0,
            quantity: 1,
        }
    }
}

/// Unit prices keyed by material name. A miss reads as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    entries: HashMap<String, f64>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, material_name: impl Into<String>, unit_price: f64) {
        self.entries.insert(material_name.into(), unit_price);
    }

    pub fn remove(&mut self, material_name: &str) -> Option<f64> {
        self.entries.remove(material_name)
    }

    /// Raw entry, as entered.
    pub fn get(&self, material_name: &str) -> Option<f64> {
        self.entries.get(material_name).copied()
    }

    /// Entry if it is a usable unit price (finite and non-negative).
    pub fn valid(&self, material_name: &str) -> Option<f64> {
        self.get(material_name)
            .filter(|price| price.is_finite() && *price >= 0.0)
    }

    pub fn get_or_zero(&self, material_name: &str) -> f64 {
        self.valid(material_name).unwrap_or(0.0)
    }

    pub fn contains(&self, material_name: &str) -> bool {
        self.entries.contains_key(material_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.entries.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut table = PriceTable::new();
        for (name, price) in iter {
            table.insert(name, price);
        }
        table
    }
}

/// Non-finite amounts read as zero.
pub(crate) fn sanitized_amount(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_type_uses_lowercase_wire_names() {
        let json = r#"{"material_name":"Iron Ore","quantity":3,"material_type":"drop","default_npc_price":12}"#;
        let material: Material = serde_json::from_str(json).unwrap();
        assert_eq!(material.material_type, MaterialType::Drop);
        assert_eq!(
            serde_json::to_value(MaterialType::Profession).unwrap(),
            serde_json::json!("profession")
        );
    }

    #[test]
    fn price_table_misses_and_invalid_entries_read_as_zero() {
        let mut table = PriceTable::new();
        table.insert("Wood", 4.5);
        table.insert("Stone", -2.0);
        table.insert("Glass", f64::NAN);

        assert_eq!(table.get_or_zero("Wood"), 4.5);
        assert_eq!(table.get_or_zero("Stone"), 0.0);
        assert_eq!(table.get_or_zero("Glass"), 0.0);
        assert_eq!(table.get_or_zero("Clay"), 0.0);
        assert!(table.contains("Stone"));
        assert_eq!(table.valid("Stone"), None);
    }

    #[test]
    fn zero_yield_recipe_counts_one_item_per_batch() {
        let recipe = Recipe {
            id: 1,
            name: "Plank".into(),
            quantity_produced: 0,
            npc_sell_price: 10.0,
            materials: Vec::new(),
        };
        assert_eq!(recipe.total_items(4), 4);
        assert_eq!(recipe.npc_total(4), 40.0);
    }

    #[test]
    fn default_lot_is_one_unit_at_zero() {
        let lot = Lot::default();
        assert_eq!(lot, Lot::new(0.0, 1));
        assert!(lot.is_usable());
        assert!(!Lot::new(3.0, 0).is_usable());
        assert!(!Lot::new(-1.0, 2).is_usable());
    }
}
