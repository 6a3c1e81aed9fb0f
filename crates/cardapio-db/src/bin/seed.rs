//! # Demo Menu Seeder
//!
//! Populates the database with a small burger-shop menu and prints the
//! priced result as JSON.
//!
//! ## Usage
//! ```bash
//! # Seed ./data/cardapio.db (default path)
//! cargo run -p cardapio-db --bin seed
//!
//! # Specify database path and log level
//! CARDAPIO_DATABASE_PATH=./data/demo.db RUST_LOG=debug cargo run -p cardapio-db --bin seed
//! ```
//!
//! ## Seeded Records
//! - 7 ingredients (one of them packaging)
//! - 5 fixed expenses across all categories
//! - Productive capacity and markup configuration
//! - 3 products with recipes and popularity levels
//! - 1 combo with all three products
//!
//! A database that already holds products is left untouched; only the
//! report is printed. The report starts with each channel's markup factor
//! and how healthy it is, followed by the dashboard as JSON.

use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cardapio_core::capacity::HourlyCost;
use cardapio_core::combo::ComboLine;
use cardapio_core::engineering::{MenuDashboard, MenuEngineering};
use cardapio_core::money::format_percent;
use cardapio_core::{
    ExpenseCategory, IngredientKind, IngredientUnit, MarkupConfig, MarkupFactor, MarkupScenario, Money, Product,
    ProductiveCapacity,
};
use cardapio_db::{AppConfig, Database, NewIngredient, PricingService, ServiceResult};

#[derive(Debug, Serialize)]
struct SeedReport {
    dashboard: MenuDashboard,
    hourly_cost: HourlyCost,
    engineering: MenuEngineering,
    products: Vec<Product>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(path = %config.database_path.display(), basis = %config.price_basis, "Opening database");
    let db = Database::new(config.db_config()).await?;
    let service = PricingService::new(db, config.pricing_settings());

    if service.stats().await?.product_count == 0 {
        println!("Seeding demo menu...");
        seed(&service).await?;
    } else {
        println!("Database already has products, skipping seed");
    }

    print_markup(&service).await?;

    let report = SeedReport {
        dashboard: service.dashboard().await?,
        hourly_cost: service.hourly_cost().await?,
        engineering: service.menu_engineering().await?,
        products: service.database().products().list().await?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    service.database().close().await;
    Ok(())
}

async fn seed(service: &PricingService) -> ServiceResult<()> {
    let ingredient = |name: &str, unit, cents, kind| NewIngredient {
        name: name.to_string(),
        unit,
        unit_cost: Money::from_cents(cents),
        kind,
        supplier: None,
    };

    let bun = service
        .add_ingredient(ingredient("Pão brioche", IngredientUnit::Un, 150, IngredientKind::Raw))
        .await?;
    let beef = service
        .add_ingredient(ingredient("Carne moída", IngredientUnit::Kg, 3290, IngredientKind::Raw))
        .await?;
    let cheddar = service
        .add_ingredient(ingredient("Queijo cheddar", IngredientUnit::Kg, 4590, IngredientKind::Raw))
        .await?;
    let potato = service
        .add_ingredient(ingredient("Batata", IngredientUnit::Kg, 690, IngredientKind::Raw))
        .await?;
    let oil = service
        .add_ingredient(ingredient("Óleo", IngredientUnit::L, 990, IngredientKind::Raw))
        .await?;
    let soda = service
        .add_ingredient(ingredient("Refrigerante lata", IngredientUnit::Un, 350, IngredientKind::Raw))
        .await?;
    let box_ = service
        .add_ingredient(ingredient("Caixa delivery", IngredientUnit::Un, 120, IngredientKind::Packaging))
        .await?;
    println!("  6 ingredients and 1 packaging item");

    for (name, category, cents) in [
        ("Aluguel", ExpenseCategory::Occupancy, 350_000),
        ("Energia", ExpenseCategory::Occupancy, 80_000),
        ("Salários", ExpenseCategory::Staff, 900_000),
        ("Contador", ExpenseCategory::Admin, 60_000),
        ("Tarifas bancárias", ExpenseCategory::Financial, 15_000),
    ] {
        service.add_expense(name, category, Money::from_cents(cents)).await?;
    }
    println!("  5 fixed expenses");

    service
        .save_capacity(ProductiveCapacity {
            employees: 3,
            hours_per_day: 8.0,
            days_per_month: 26.0,
            productivity_factor: 0.75,
            ..ProductiveCapacity::default()
        })
        .await?;

    let mut markup = MarkupConfig::default();
    markup.target_revenue_cents = 6_000_000;
    service.save_markup_config(markup).await?;
    println!("  capacity and markup configuration");

    let mut products = Vec::new();
    for (name, yield_portions, defined_cents, items) in [
        (
            "X-Burger",
            1,
            Some(2890),
            vec![(&bun.id, 1.0), (&beef.id, 0.15), (&cheddar.id, 0.03), (&box_.id, 1.0)],
        ),
        ("Batata frita", 4, None, vec![(&potato.id, 1.0), (&oil.id, 0.1)]),
        ("Refrigerante", 1, Some(700), vec![(&soda.id, 1.0)]),
    ] {
        let mut editor = service.open_editor(None).await?;
        editor.set_name(name)?;
        editor.set_yield(Some(yield_portions))?;
        editor.set_defined_price(defined_cents.map(Money::from_cents))?;
        for (ingredient_id, quantity) in items {
            editor.add_item(ingredient_id.as_str(), quantity)?;
        }
        products.push(service.save_product(&mut editor).await?);
    }
    println!("  {} products", products.len());

    service.set_popularity(&products[0].id, Some(9)).await?;
    service.set_popularity(&products[1].id, Some(7)).await?;
    service.set_popularity(&products[2].id, Some(4)).await?;

    let lines: Vec<ComboLine> = products
        .iter()
        .map(|product| ComboLine {
            product_id: product.id.clone(),
            quantity: 1,
        })
        .collect();
    let (combo, totals) = service
        .save_combo(None, "Combo X-Burger", Money::from_cents(3990), &lines)
        .await?;
    println!(
        "  combo '{}' costing {} (margin {})",
        combo.name,
        totals.total_cost,
        format_percent(totals.margin)
    );

    Ok(())
}

async fn print_markup(service: &PricingService) -> ServiceResult<()> {
    let markup = service.resolved_markup().await?;
    println!(
        "Fixed costs: {} allocated, {} of delivery revenue",
        markup.allocated_fixed_cost,
        format_percent(markup.delivery_fixed_cost_pct)
    );
    for (channel, factor) in [
        ("store", markup.store),
        ("delivery", markup.delivery),
        ("weighted", markup.weighted),
    ] {
        let label = MarkupScenario::classify_factor(factor).label();
        match factor {
            MarkupFactor::Factor(value) => println!("  {:<9} {:.4}  {}", channel, value, label),
            MarkupFactor::Blocked { total_pct } => println!(
                "  {:<9} blocked ({} of the price)  {}",
                channel,
                format_percent(total_pct),
                label
            ),
        }
    }
    Ok(())
}
