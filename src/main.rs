//! Craft Profit Calculator
//!
//! Command line front end for the recipe API and the profitability engine.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use craft_profit_calculator::domain::{
    CalculationSession, Lot, LotStatus, MaterialType, RecipeDraft, RecipeId,
};
use craft_profit_calculator::infra::recipes::{CacheStatus, RecipeClient};
use craft_profit_calculator::util::format::format_currency_with;
use craft_profit_calculator::util::settings::{
    load_settings, save_settings, settings_file, stored_settings, Settings,
};
use craft_profit_calculator::util::version::{version_label, APP_NAME};

#[derive(Parser)]
#[command(name = "craft-profit")]
#[command(about = "Recipe manager and crafting profitability calculator")]
struct Cli {
    /// Recipe API base URL (overrides settings and CRAFT_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all recipes
    List,

    /// Show a recipe and its materials
    Show { id: RecipeId },

    /// Calculate crafting cost and profit for a recipe
    Calc {
        id: RecipeId,

        /// Number of craft batches
        #[arg(short, long, default_value = "1")]
        batches: i64,

        /// Market sell price for one batch
        #[arg(short, long, default_value = "0")]
        sell_price: f64,

        /// Purchase lot as NAME=PRICE:QTY (repeatable)
        #[arg(short, long = "lot")]
        lots: Vec<String>,

        /// Unit cost for a profession material as NAME=COST (repeatable)
        #[arg(short, long = "profession-cost")]
        profession_costs: Vec<String>,
    },

    /// Create a recipe from a JSON file
    Create { file: PathBuf },

    /// Replace a recipe with the contents of a JSON file
    Update { id: RecipeId, file: PathBuf },

    /// Delete a recipe
    Delete { id: RecipeId },

    /// Show the active settings, optionally writing the stored ones to disk
    Config {
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = load_settings().with_api_url(cli.api_url.as_deref());

    let client = RecipeClient::with_base_url(&settings.api_base_url)
        .context("invalid API base URL")?
        .with_ttl(settings.listing_ttl());
    let sep = settings.thousands_separator;

    match cli.command {
        Commands::List => {
            let payload = client.fetch_items().await?;
            if payload.status == CacheStatus::Stale {
                println!("(showing a stale copy, the API did not answer)");
            }
            if payload.data.is_empty() {
                println!("No recipes registered.");
            } else {
                println!("{:>6}  {:<32} {:>14}", "ID", "Recipe", "NPC (batch)");
                println!("{}", "-".repeat(54));
                for recipe in payload.data {
                    println!(
                        "{:>6}  {:<32} {:>14}",
                        recipe.id,
                        recipe.name,
                        format_currency_with(recipe.npc_sell_price, sep)
                    );
                }
            }
        }

        Commands::Show { id } => {
            let recipe = client
                .fetch_recipe(id)
                .await?
                .ok_or_else(|| anyhow!("recipe {id} not found"))?;
            println!("Recipe: {}", recipe.name);
            println!("  ID: {}", recipe.id);
            println!("  Yield per batch: {}", recipe.quantity_produced);
            println!(
                "  NPC price per batch: {}",
                format_currency_with(recipe.npc_sell_price, sep)
            );
            println!("  Materials:");
            for m in &recipe.materials {
                println!(
                    "    {}x {} ({}, NPC ref {})",
                    m.quantity,
                    m.material_name,
                    m.material_type.name(),
                    format_currency_with(m.default_npc_price, sep)
                );
            }
        }

        Commands::Calc {
            id,
            batches,
            sell_price,
            lots,
            profession_costs,
        } => {
            let recipe = client
                .fetch_recipe(id)
                .await?
                .ok_or_else(|| anyhow!("recipe {id} not found"))?;

            let mut session = CalculationSession::new(recipe);
            session.set_desired_batches(batches);
            session.set_market_sell_price(sell_price);
            apply_lots(&mut session, &lots)?;
            for raw in &profession_costs {
                let (name, cost) = parse_profession_cost(raw)?;
                session.set_profession_cost(name, cost)?;
            }

            print_preview(&session, &settings);

            match session.calculate() {
                Ok(report) => println!("\n{}", report.with_thousands_separator(sep)),
                Err(err) => bail!("cannot calculate: {err}"),
            }
        }

        Commands::Create { file } => {
            let draft = read_draft(&file)?;
            let ack = client.create_item(&draft).await?;
            println!(
                "{} (id {})",
                ack.message.as_deref().unwrap_or("Recipe created"),
                ack.id.map(|id| id.to_string()).unwrap_or_else(|| "?".into())
            );
        }

        Commands::Update { id, file } => {
            let draft = read_draft(&file)?;
            let ack = client.update_item(id, &draft).await?;
            println!("{}", ack.message.as_deref().unwrap_or("Recipe updated"));
        }

        Commands::Delete { id } => {
            let ack = client.delete_item(id).await?;
            println!("{}", ack.message.as_deref().unwrap_or("Recipe deleted"));
        }

        Commands::Config { save } => {
            println!("{} {}", APP_NAME, version_label());
            println!("  API: {}", settings.api_base_url);
            println!("  Listing TTL: {}s", settings.listing_ttl_secs);
            println!("  Thousands separator: '{}'", settings.thousands_separator);
            if save {
                // --api-url and CRAFT_API_URL apply to this run only.
                let path = save_settings(&stored_settings())?;
                println!("Settings written to {}", path.display());
            } else if let Some(path) = settings_file() {
                println!("  File: {}", path.display());
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// The first `--lot` for a material replaces its seeded lot; later ones add rows.
fn apply_lots(session: &mut CalculationSession, raw_lots: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for raw in raw_lots {
        let (name, lot) = parse_lot(raw)?;
        let first_for_material = seen.insert(name.to_string());
        let seeded = session.lots(name)?.first().map(|entry| entry.id);
        match seeded {
            Some(id) if first_for_material => session.update_lot(name, id, lot)?,
            _ => {
                session.push_lot(name, lot)?;
            }
        }
    }
    Ok(())
}

fn parse_lot(raw: &str) -> Result<(&str, Lot)> {
    let (name, rest) = raw
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("lot '{raw}' must look like NAME=PRICE:QTY"))?;
    let (price, qty) = rest
        .split_once(':')
        .ok_or_else(|| anyhow!("lot '{raw}' must look like NAME=PRICE:QTY"))?;
    let price: f64 = price
        .trim()
        .parse()
        .with_context(|| format!("invalid price in lot '{raw}'"))?;
    let qty: i64 = qty
        .trim()
        .parse()
        .with_context(|| format!("invalid quantity in lot '{raw}'"))?;
    Ok((name.trim(), Lot::new(price, qty)))
}

fn parse_profession_cost(raw: &str) -> Result<(&str, f64)> {
    let (name, cost) = raw
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("profession cost '{raw}' must look like NAME=COST"))?;
    let cost: f64 = cost
        .trim()
        .parse()
        .with_context(|| format!("invalid cost in '{raw}'"))?;
    Ok((name.trim(), cost))
}

fn read_draft(path: &Path) -> Result<RecipeDraft> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let draft: RecipeDraft = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    if draft.name.trim().is_empty() {
        bail!("recipe name must not be empty");
    }
    if draft.materials.iter().any(|m| m.quantity == 0) {
        bail!("material quantities must be positive");
    }
    Ok(draft)
}

fn print_preview(session: &CalculationSession, settings: &Settings) {
    let sep = settings.thousands_separator;
    let preview = session.preview();
    println!(
        "{} x{} -> {} items, NPC total {}",
        session.recipe().name,
        preview.batches,
        format_currency_with(preview.total_items as f64, sep),
        format_currency_with(preview.npc_total, sep)
    );
    for material in &preview.materials {
        let marker = match (material.material_type, material.status) {
            (MaterialType::Profession, _) => match session.profession_cost(&material.material_name) {
                Some(cost) => format!("profession, {} each", format_currency_with(cost, sep)),
                None => "profession".to_string(),
            },
            (_, Some(LotStatus::Exact)) => "lots ok".to_string(),
            (_, Some(LotStatus::Under)) => "lots under".to_string(),
            (_, Some(LotStatus::Over)) => "lots OVER".to_string(),
            (_, None) => String::new(),
        };
        println!(
            "  {}x {} [{}]",
            format_currency_with(material.needed as f64, sep),
            material.material_name,
            marker
        );
    }
}
