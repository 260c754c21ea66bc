//! Profession materials stay free unless the user prices them.

use craft_profit_calculator::domain::{
    try_crafting_cost, CalculationSession, Lot, MarketMargin, Material, MaterialType, PriceTable,
    Recipe,
};

fn recipe() -> Recipe {
    Recipe {
        id: 5,
        name: "Enchanted Staff".into(),
        quantity_produced: 2,
        npc_sell_price: 50.0,
        materials: vec![
            Material {
                material_name: "Runic Dust".into(),
                quantity: 2,
                material_type: MaterialType::Profession,
                default_npc_price: 0.0,
            },
            Material {
                material_name: "Oak Branch".into(),
                quantity: 1,
                material_type: MaterialType::Buy,
                default_npc_price: 3.0,
            },
        ],
    }
}

#[test]
fn override_contributes_quantity_times_batches_times_cost() {
    let recipe = recipe();
    let market: PriceTable = [("Oak Branch", 0.0)].into_iter().collect();

    let without = try_crafting_cost(&recipe, &market, 3, &PriceTable::new()).unwrap();
    assert_eq!(without, 0.0);

    let overrides: PriceTable = [("Runic Dust", 7.0)].into_iter().collect();
    let with = try_crafting_cost(&recipe, &market, 3, &overrides).unwrap();
    assert_eq!(with, 42.0);
}

#[test]
fn session_only_counts_enabled_costs() {
    let mut session = CalculationSession::new(recipe());
    session.set_desired_batches(3);
    session.set_market_sell_price(40.0);
    let oak = session.lots("Oak Branch").unwrap()[0].id;
    session.update_lot("Oak Branch", oak, Lot::new(4.0, 3)).unwrap();

    let free = session.calculate().unwrap();
    assert_eq!(free.result.total_cost, 12.0);
    assert_eq!(free.total_items, 6);

    session.set_profession_cost("Runic Dust", 7.0).unwrap();
    let priced = session.calculate().unwrap();
    assert_eq!(priced.result.total_cost, 54.0);
    assert_eq!(priced.result.total_revenue_market, 120.0);
    assert_eq!(priced.result.profit_market, 66.0);

    let profession = priced.profession_yield.unwrap();
    assert_eq!(profession.total_quantity, 6);
    assert_eq!(profession.profit_per_unit, Some(11.0));

    session.disable_profession_cost("Runic Dust").unwrap();
    assert_eq!(session.calculate().unwrap().result.total_cost, 12.0);
}

#[test]
fn negative_override_is_ignored() {
    let mut session = CalculationSession::new(recipe());
    session.set_profession_cost("Runic Dust", -5.0).unwrap();
    let oak = session.lots("Oak Branch").unwrap()[0].id;
    session.update_lot("Oak Branch", oak, Lot::new(0.0, 1)).unwrap();
    session.set_market_sell_price(10.0);

    let report = session.calculate().unwrap();
    assert_eq!(report.result.total_cost, 0.0);
    assert_eq!(report.market_margin, MarketMargin::Unbounded);
}
