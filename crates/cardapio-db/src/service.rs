//! # Pricing Service
//!
//! Loads the pricing inputs from storage, runs the `cardapio-core`
//! formulas and writes the derived fields back.
//!
//! ## Cost Cascade
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Repricing Cascade                               │
//! │                                                                         │
//! │  update_ingredient ──► products using it ──► combos containing them     │
//! │                                                                         │
//! │  save_markup_config ─┐                                                  │
//! │  add/update/delete   ├──► refresh stored factors ──► reprice_all        │
//! │  fixed expense ──────┘         │                                        │
//! │                                └── blocked? MarkupBlocked, nothing      │
//! │                                    is written                           │
//! │                                                                         │
//! │  save_product ──► recipe + derived fields (one transaction)             │
//! │               └─► combos containing the product                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every timed operation is recorded in the injected [`SharedMonitor`].

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cardapio_core::allocation::{resolve, ResolvedMarkup};
use cardapio_core::capacity::HourlyCost;
use cardapio_core::combo::{validate_combo, ComboLine, ComboTotals};
use cardapio_core::editor::{PricingContext, ProductEditor, SaveRequest};
use cardapio_core::engineering::{average_margin, MenuDashboard, MenuEngineering, MenuStats};
use cardapio_core::expenses::{total_fixed_expenses, ExpenseSummary};
use cardapio_core::monitor::{OperationMetrics, PerformanceMonitor, SharedMonitor};
use cardapio_core::pricing::{compute_derived_product_fields, PricingSettings, ProductDraft};
use cardapio_core::recipe::{persistable_lines, IngredientCosts};
use cardapio_core::validation::{
    validate_ingredient, validate_markup_config, validate_money, validate_name, validate_popularity,
};
use cardapio_core::{
    Category, Combo, CoreError, ExpenseCategory, FixedExpense, Ingredient, IngredientKind, IngredientUnit,
    MarkupConfig, Money, Product, ProductiveCapacity, SINGLETON_ID,
};

use crate::error::{DbError, ServiceResult};
use crate::pool::Database;
use crate::repository::generate_id;
use crate::repository::premises::ExpenseChange;

/// How many records a repricing pass rewrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepriceReport {
    pub products: usize,
    pub combos: usize,
}

/// Form input for a new ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub unit: IngredientUnit,
    pub unit_cost: Money,
    pub kind: IngredientKind,
    pub supplier: Option<String>,
}

/// Pricing operations over the back-office database.
///
/// ## Usage
/// ```rust,ignore
/// let service = PricingService::new(db, config.pricing_settings());
///
/// let mut editor = service.open_editor(None).await?;
/// editor.set_name("X-Burger")?;
/// editor.set_yield(Some(1))?;
/// editor.add_item(&beef.id, 0.15)?;
/// let product = service.save_product(&mut editor).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PricingService {
    db: Database,
    settings: PricingSettings,
    monitor: SharedMonitor,
}

impl PricingService {
    /// Creates a service with its own performance monitor.
    pub fn new(db: Database, settings: PricingSettings) -> Self {
        Self::with_monitor(db, settings, PerformanceMonitor::shared())
    }

    /// Creates a service recording timings into `monitor`.
    pub fn with_monitor(db: Database, settings: PricingSettings, monitor: SharedMonitor) -> Self {
        PricingService { db, settings, monitor }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> PricingSettings {
        self.settings
    }

    /// Handle to the monitor this service records into.
    pub fn monitor(&self) -> SharedMonitor {
        self.monitor.clone()
    }

    /// Timings recorded for `operation` so far.
    pub fn metrics(&self, operation: &str) -> OperationMetrics {
        match self.monitor.lock() {
            Ok(monitor) => monitor.metrics(operation),
            Err(_) => OperationMetrics::default(),
        }
    }

    fn record(&self, operation: &str, started: Instant) {
        let elapsed = started.elapsed();
        if let Ok(mut monitor) = self.monitor.lock() {
            monitor.record(operation, elapsed);
        }
        debug!(operation, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "Operation finished");
    }

    // =========================================================================
    // Pricing Inputs
    // =========================================================================

    /// Channel factors resolved from the stored configuration and expenses.
    pub async fn resolved_markup(&self) -> ServiceResult<ResolvedMarkup> {
        let premises = self.db.premises();
        let config = premises.markup_config().await?;
        let expenses = premises.list_expenses().await?;
        Ok(resolve(&config, total_fixed_expenses(&expenses)))
    }

    /// Current ingredient costs and markup, ready for an editor.
    pub async fn pricing_context(&self) -> ServiceResult<PricingContext> {
        let ingredients = self.db.ingredients().list().await?;
        let markup = self.resolved_markup().await?;

        Ok(PricingContext {
            costs: IngredientCosts::from_ingredients(&ingredients),
            markup,
            settings: self.settings,
        })
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Opens an editor for a stored product, or for a new one with `None`.
    pub async fn open_editor(&self, product_id: Option<&str>) -> ServiceResult<ProductEditor> {
        let context = self.pricing_context().await?;

        let Some(id) = product_id else {
            return Ok(ProductEditor::new(context));
        };

        let products = self.db.products();
        let product = products
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;
        let lines = products.recipe_lines(id).await?;

        Ok(ProductEditor::load(&product, &lines, context))
    }

    /// Saves the editor's draft and moves the editor to its outcome state.
    ///
    /// ## Flow
    /// ```text
    /// begin_save ── invalid ──► Failed (nothing written)
    ///     │
    ///     ▼
    /// persist ── error ──► fail_save ──► Failed (draft kept)
    ///     │
    ///     ▼
    /// complete_save ──► Persisted
    /// ```
    pub async fn save_product(&self, editor: &mut ProductEditor) -> ServiceResult<Product> {
        let request = editor.begin_save()?;

        match self.persist_product(request).await {
            Ok(product) => {
                editor.complete_save(product.id.clone())?;
                Ok(product)
            }
            Err(err) => {
                warn!(error = %err, "Product save failed");
                editor.fail_save(err.to_string())?;
                Err(err)
            }
        }
    }

    /// Writes a validated save request.
    ///
    /// Derived fields are recomputed against the current costs and markup,
    /// so a request built from a stale editor still stores fresh values.
    pub async fn persist_product(&self, request: SaveRequest) -> ServiceResult<Product> {
        let started = Instant::now();
        let context = self.pricing_context().await?;
        let derived = compute_derived_product_fields(
            &request.draft,
            &context.costs,
            &context.markup,
            context.settings,
        );

        if let Some(missing) = derived.missing_ingredients.first() {
            return Err(CoreError::IngredientNotFound(missing.clone()).into());
        }

        let now = Utc::now();
        let products = self.db.products();
        let mut product = match &request.product_id {
            Some(id) => products
                .get_by_id(id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(id.clone()))?,
            None => new_product(now),
        };

        product.name = request.draft.name.clone();
        product.category_id = request.draft.category_id.clone();
        product.defined_price_cents = request.draft.defined_price.map(|price| price.cents());
        product.popularity_level = request.draft.popularity_level;
        product.updated_at = now;
        derived.apply_to(&mut product);

        let lines = persistable_lines(&request.draft.items);
        products.save_with_recipe(&product, &lines).await?;

        let combos = self.combos_containing(&[product.id.clone()]).await?;
        let combos_repriced = self.reprice_combos(combos).await?;

        info!(
            product_id = %product.id,
            lines = lines.len(),
            cost_per_portion = %derived.cost_per_portion,
            source = ?derived.price_source,
            combos_repriced,
            "Product saved"
        );
        self.record("save_product", started);
        Ok(product)
    }

    /// Sets a product's popularity (0-10) for menu engineering.
    pub async fn set_popularity(&self, product_id: &str, level: Option<i64>) -> ServiceResult<()> {
        validate_popularity(level)?;
        self.db.products().set_popularity(product_id, level).await?;
        Ok(())
    }

    /// Deletes a product and refreshes the combos that contained it.
    pub async fn delete_product(&self, product_id: &str) -> ServiceResult<RepriceReport> {
        let combos = self.combos_containing(&[product_id.to_string()]).await?;
        self.db.products().delete(product_id).await?;
        let combos = self.reprice_combos(combos).await?;

        info!(product_id = %product_id, combos, "Product deleted");
        Ok(RepriceReport { products: 0, combos })
    }

    /// Creates a menu category.
    pub async fn create_category(&self, name: &str) -> ServiceResult<Category> {
        let name = validate_name("name", name)?;
        Ok(self.db.products().insert_category(&name).await?)
    }

    // =========================================================================
    // Ingredients
    // =========================================================================

    /// Validates and stores a new ingredient.
    pub async fn add_ingredient(&self, input: NewIngredient) -> ServiceResult<Ingredient> {
        let now = Utc::now();
        let ingredient = Ingredient {
            id: generate_id(),
            name: input.name.trim().to_string(),
            unit: input.unit,
            unit_cost_cents: input.unit_cost.cents(),
            kind: input.kind,
            supplier: input.supplier,
            created_at: now,
            updated_at: now,
        };
        validate_ingredient(&ingredient)?;

        Ok(self.db.ingredients().insert(&ingredient).await?)
    }

    /// Updates an ingredient and reprices every product that uses it,
    /// then every combo containing those products.
    pub async fn update_ingredient(&self, mut ingredient: Ingredient) -> ServiceResult<RepriceReport> {
        let started = Instant::now();
        validate_ingredient(&ingredient)?;

        ingredient.name = ingredient.name.trim().to_string();
        ingredient.updated_at = Utc::now();
        self.db.ingredients().update(&ingredient).await?;

        let affected = self.db.products().list_using_ingredient(&ingredient.id).await?;
        let context = self.pricing_context().await?;
        let repriced = self.reprice_products(affected, &context).await?;
        let combos = self.combos_containing(&repriced).await?;
        let report = RepriceReport {
            products: repriced.len(),
            combos: self.reprice_combos(combos).await?,
        };

        info!(
            ingredient_id = %ingredient.id,
            unit_cost = %ingredient.unit_cost(),
            products = report.products,
            combos = report.combos,
            "Ingredient updated"
        );
        self.record("update_ingredient", started);
        Ok(report)
    }

    /// Deletes an ingredient no recipe uses; fails with `InUse` otherwise.
    pub async fn delete_ingredient(&self, ingredient_id: &str) -> ServiceResult<()> {
        self.db.ingredients().delete(ingredient_id).await?;
        info!(ingredient_id = %ingredient_id, "Ingredient deleted");
        Ok(())
    }

    // =========================================================================
    // Markup Configuration & Fixed Expenses
    // =========================================================================

    /// Validates the configuration, refreshes its derived factors and
    /// reprices the whole menu.
    ///
    /// ## Returns
    /// * `Err(MarkupBlocked)` - A channel's percentages reach 100%; nothing is written
    pub async fn save_markup_config(&self, mut config: MarkupConfig) -> ServiceResult<(MarkupConfig, RepriceReport)> {
        let started = Instant::now();
        validate_markup_config(&config)?;

        let expenses = self.db.premises().list_expenses().await?;
        config.id = SINGLETON_ID.to_string();
        config.recompute(total_fixed_expenses(&expenses))?;
        config.updated_at = Utc::now();

        self.db.premises().save_markup_config(&config).await?;
        let report = self.reprice_all().await?;

        info!(
            store = config.store_markup,
            delivery = config.delivery_markup,
            weighted = config.weighted_markup,
            products = report.products,
            "Markup configuration saved"
        );
        self.record("save_markup_config", started);
        Ok((config, report))
    }

    /// Adds a fixed expense. The new total flows into the delivery markup.
    pub async fn add_expense(
        &self,
        name: &str,
        category: ExpenseCategory,
        monthly_value: Money,
    ) -> ServiceResult<(FixedExpense, RepriceReport)> {
        let name = validate_name("name", name)?;
        validate_money("monthly_value", monthly_value)?;

        let expense = FixedExpense {
            id: generate_id(),
            name,
            category,
            monthly_value_cents: monthly_value.cents(),
            created_at: Utc::now(),
        };

        let mut expenses = self.db.premises().list_expenses().await?;
        expenses.push(expense.clone());
        let config = self.markup_for_expenses(&expenses).await?;

        let report = self
            .store_expense_and_reprice(ExpenseChange::Insert(&expense), &config)
            .await?;
        Ok((expense, report))
    }

    /// Updates a fixed expense and reprices the menu.
    pub async fn update_expense(&self, mut expense: FixedExpense) -> ServiceResult<RepriceReport> {
        expense.name = validate_name("name", &expense.name)?;
        validate_money("monthly_value", expense.monthly_value())?;

        let mut expenses = self.db.premises().list_expenses().await?;
        let slot = expenses
            .iter_mut()
            .find(|stored| stored.id == expense.id)
            .ok_or_else(|| DbError::not_found("FixedExpense", &expense.id))?;
        *slot = expense.clone();
        let config = self.markup_for_expenses(&expenses).await?;

        self.store_expense_and_reprice(ExpenseChange::Update(&expense), &config)
            .await
    }

    /// Deletes a fixed expense and reprices the menu.
    pub async fn delete_expense(&self, expense_id: &str) -> ServiceResult<RepriceReport> {
        let mut expenses = self.db.premises().list_expenses().await?;
        let before = expenses.len();
        expenses.retain(|stored| stored.id != expense_id);
        if expenses.len() == before {
            return Err(DbError::not_found("FixedExpense", expense_id).into());
        }
        let config = self.markup_for_expenses(&expenses).await?;

        self.store_expense_and_reprice(ExpenseChange::Delete(expense_id), &config)
            .await
    }

    /// Stored configuration with its factors refreshed for `expenses`.
    ///
    /// Fails before anything is written when the new total blocks a channel.
    async fn markup_for_expenses(&self, expenses: &[FixedExpense]) -> ServiceResult<MarkupConfig> {
        let mut config = self.db.premises().markup_config().await?;
        config.recompute(total_fixed_expenses(expenses))?;
        config.updated_at = Utc::now();
        Ok(config)
    }

    /// Writes the expense and the refreshed factors together, then reprices.
    async fn store_expense_and_reprice(
        &self,
        change: ExpenseChange<'_>,
        config: &MarkupConfig,
    ) -> ServiceResult<RepriceReport> {
        self.db.premises().apply_expense_change(change, config).await?;
        self.reprice_all().await
    }

    /// Fixed expenses per category.
    pub async fn expense_summary(&self) -> ServiceResult<ExpenseSummary> {
        let expenses = self.db.premises().list_expenses().await?;
        Ok(ExpenseSummary::from_expenses(&expenses))
    }

    // =========================================================================
    // Productive Capacity
    // =========================================================================

    /// Validates and stores the capacity premises, returning the hourly view.
    pub async fn save_capacity(&self, mut capacity: ProductiveCapacity) -> ServiceResult<HourlyCost> {
        capacity.validate()?;
        capacity.id = SINGLETON_ID.to_string();
        capacity.updated_at = Utc::now();
        self.db.premises().save_capacity(&capacity).await?;

        let summary = self.expense_summary().await?;
        Ok(HourlyCost::compute(&capacity, &summary))
    }

    /// Productive hours and cost per hour under the stored premises.
    pub async fn hourly_cost(&self) -> ServiceResult<HourlyCost> {
        let capacity = self.db.premises().capacity().await?;
        let summary = self.expense_summary().await?;
        Ok(HourlyCost::compute(&capacity, &summary))
    }

    // =========================================================================
    // Combos
    // =========================================================================

    /// Validates and stores a combo with its computed cost and margin.
    pub async fn save_combo(
        &self,
        combo_id: Option<&str>,
        name: &str,
        total_price: Money,
        lines: &[ComboLine],
    ) -> ServiceResult<(Combo, ComboTotals)> {
        validate_combo(name, total_price, lines)?;

        let products = self.db.products().list().await?;
        let totals = ComboTotals::compute(lines, &products, total_price);
        if let Some(missing) = totals.missing_products.first() {
            return Err(CoreError::ProductNotFound(missing.clone()).into());
        }

        let now = Utc::now();
        let combos = self.db.combos();
        let mut combo = match combo_id {
            Some(id) => combos
                .get_by_id(id)
                .await?
                .ok_or_else(|| DbError::not_found("Combo", id))?,
            None => Combo {
                id: generate_id(),
                name: String::new(),
                total_price_cents: 0,
                total_cost_cents: None,
                combo_margin: None,
                created_at: now,
                updated_at: now,
            },
        };

        combo.name = name.trim().to_string();
        combo.total_price_cents = total_price.cents();
        combo.total_cost_cents = Some(totals.total_cost.cents());
        combo.combo_margin = Some(totals.margin);
        combo.updated_at = now;
        combos.save_with_items(&combo, lines).await?;

        info!(combo_id = %combo.id, total_cost = %totals.total_cost, margin = totals.margin, "Combo saved");
        Ok((combo, totals))
    }

    // =========================================================================
    // Repricing
    // =========================================================================

    /// Recomputes every product and every combo.
    pub async fn reprice_all(&self) -> ServiceResult<RepriceReport> {
        let started = Instant::now();
        let context = self.pricing_context().await?;

        let products = self.db.products().list().await?;
        let repriced = self.reprice_products(products, &context).await?;
        let combos = self.db.combos().list().await?;
        let report = RepriceReport {
            products: repriced.len(),
            combos: self.reprice_combos(combos).await?,
        };

        info!(products = report.products, combos = report.combos, "Menu repriced");
        self.record("reprice_all", started);
        Ok(report)
    }

    /// Rewrites the derived fields of `products`; returns their ids.
    async fn reprice_products(&self, products: Vec<Product>, context: &PricingContext) -> ServiceResult<Vec<String>> {
        let repo = self.db.products();
        let mut repriced = Vec::with_capacity(products.len());

        for mut product in products {
            let lines = repo.recipe_lines(&product.id).await?;
            let draft = ProductDraft::from_product(&product, &lines);
            let derived =
                compute_derived_product_fields(&draft, &context.costs, &context.markup, context.settings);

            if !derived.missing_ingredients.is_empty() {
                warn!(
                    product_id = %product.id,
                    missing = ?derived.missing_ingredients,
                    "Recipe references unknown ingredients"
                );
            }

            derived.apply_to(&mut product);
            repo.update_derived(&product).await?;
            repriced.push(product.id);
        }

        Ok(repriced)
    }

    /// Rewrites cost and margin of `combos`; returns how many.
    async fn reprice_combos(&self, combos: Vec<Combo>) -> ServiceResult<usize> {
        if combos.is_empty() {
            return Ok(0);
        }

        let products = self.db.products().list().await?;
        let repo = self.db.combos();

        for combo in &combos {
            let lines: Vec<ComboLine> = repo.items(&combo.id).await?.iter().map(ComboLine::from).collect();
            let totals = ComboTotals::compute(&lines, &products, combo.total_price());
            repo.update_totals(&combo.id, totals.total_cost.cents(), totals.margin)
                .await?;
        }

        Ok(combos.len())
    }

    async fn combos_containing(&self, product_ids: &[String]) -> ServiceResult<Vec<Combo>> {
        let repo = self.db.combos();
        let mut combos = BTreeMap::new();

        for product_id in product_ids {
            for combo in repo.list_containing_product(product_id).await? {
                combos.entry(combo.id.clone()).or_insert(combo);
            }
        }

        Ok(combos.into_values().collect())
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Star / Puzzle / Plow Horse / Dog classification of the menu.
    pub async fn menu_engineering(&self) -> ServiceResult<MenuEngineering> {
        let products = self.db.products().list().await?;
        Ok(MenuEngineering::from_products(&products))
    }

    /// Dashboard counters.
    pub async fn stats(&self) -> ServiceResult<MenuStats> {
        let products = self.db.products().list().await?;
        self.stats_for(&products).await
    }

    /// Counters, margin and popularity bands, and the margin leaders.
    pub async fn dashboard(&self) -> ServiceResult<MenuDashboard> {
        let products = self.db.products().list().await?;
        let stats = self.stats_for(&products).await?;
        Ok(MenuDashboard::new(stats, &products))
    }

    async fn stats_for(&self, products: &[Product]) -> ServiceResult<MenuStats> {
        Ok(MenuStats {
            product_count: products.len() as i64,
            ingredient_count: self.db.ingredients().count().await?,
            combo_count: self.db.combos().count().await?,
            average_margin: average_margin(products),
        })
    }
}

fn new_product(now: chrono::DateTime<Utc>) -> Product {
    Product {
        id: generate_id(),
        name: String::new(),
        category_id: None,
        yield_portions: 1,
        defined_price_cents: None,
        suggested_price_cents: None,
        total_recipe_cost_cents: None,
        cost_per_portion_cents: None,
        margin: None,
        popularity_level: None,
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::pool::DbConfig;
    use cardapio_core::editor::EditorState;
    use cardapio_core::engineering::{Band, MenuClass};
    use cardapio_core::pricing::{PriceBasis, RoundingRule};
    use cardapio_core::MAX_COMBO_QUANTITY;

    const EPS: f64 = 1e-9;

    /// Store basis: with the default configuration and no expenses the
    /// factor is 1 / (1 - 0.49).
    async fn store_priced_service() -> PricingService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        PricingService::new(
            db,
            PricingSettings {
                basis: PriceBasis::Store,
                rounding: RoundingRule::None,
            },
        )
    }

    async fn add_ingredient(service: &PricingService, name: &str, unit_cost_cents: i64) -> Ingredient {
        service
            .add_ingredient(NewIngredient {
                name: name.to_string(),
                unit: IngredientUnit::Kg,
                unit_cost: Money::from_cents(unit_cost_cents),
                kind: IngredientKind::Raw,
                supplier: None,
            })
            .await
            .unwrap()
    }

    async fn create_product(
        service: &PricingService,
        name: &str,
        items: &[(&str, f64)],
        defined_price_cents: Option<i64>,
    ) -> Product {
        let mut editor = service.open_editor(None).await.unwrap();
        editor.set_name(name).unwrap();
        editor.set_yield(Some(1)).unwrap();
        editor
            .set_defined_price(defined_price_cents.map(Money::from_cents))
            .unwrap();
        for (ingredient_id, quantity) in items {
            editor.add_item(*ingredient_id, *quantity).unwrap();
        }
        service.save_product(&mut editor).await.unwrap()
    }

    #[tokio::test]
    async fn test_editor_save_flow() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;

        let mut editor = service.open_editor(None).await.unwrap();
        editor.add_item(&beef.id, 0.5).unwrap();

        // No name, no yield: rejected before anything is written
        let err = service.save_product(&mut editor).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(matches!(editor.state(), EditorState::Failed { .. }));
        assert_eq!(service.stats().await.unwrap().product_count, 0);

        editor.set_name("  Hambúrguer ").unwrap();
        assert_eq!(editor.state(), &EditorState::Editing);
        editor.set_yield(Some(1)).unwrap();
        let product = service.save_product(&mut editor).await.unwrap();

        assert_eq!(editor.state(), &EditorState::Persisted);
        assert_eq!(editor.product_id(), Some(product.id.as_str()));
        assert_eq!(product.name, "Hambúrguer");
        assert_eq!(product.total_recipe_cost_cents, Some(500));
        assert_eq!(product.cost_per_portion_cents, Some(500));
        // 500 / 0.51 = 980.39
        assert_eq!(product.suggested_price_cents, Some(980));
        assert!((product.margin.unwrap() - 480.0 / 980.0).abs() < EPS);

        let stored = service.database().products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.suggested_price_cents, Some(980));
        assert_eq!(stored.yield_portions, 1);
        assert_eq!(service.metrics("save_product").count, 1);
    }

    #[tokio::test]
    async fn test_defined_price_wins_over_suggested() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;
        let product = create_product(&service, "Hambúrguer", &[(&beef.id, 0.5)], None).await;

        let mut editor = service.open_editor(Some(&product.id)).await.unwrap();
        assert_eq!(editor.draft().items.len(), 1);
        editor.set_defined_price(Some(Money::from_cents(1500))).unwrap();
        let repriced = service.save_product(&mut editor).await.unwrap();

        assert_eq!(repriced.id, product.id);
        assert_eq!(repriced.defined_price_cents, Some(1500));
        assert_eq!(repriced.suggested_price_cents, Some(980));
        assert!((repriced.margin.unwrap() - 1000.0 / 1500.0).abs() < EPS);

        let lines = service.database().products().recipe_lines(&product.id).await.unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_and_placeholder_lines() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;
        let cheese = add_ingredient(&service, "Queijo", 4000).await;

        let product = create_product(
            &service,
            "Hambúrguer",
            &[(&beef.id, 0.2), (&cheese.id, 0.0), (&beef.id, 0.3)],
            None,
        )
        .await;

        // Last quantity wins; the zero-quantity row is not stored
        assert_eq!(product.total_recipe_cost_cents, Some(300));
        let lines = service.database().products().recipe_lines(&product.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].ingredient_id, beef.id);
        assert!((lines[0].quantity_used - 0.3).abs() < EPS);
    }

    #[tokio::test]
    async fn test_missing_open_editor_is_not_found() {
        let service = store_priced_service().await;
        let err = service.open_editor(Some("missing")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_ingredient_update_cascades_to_products_and_combos() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;
        let bread = add_ingredient(&service, "Pão", 800).await;
        let burger = create_product(&service, "Hambúrguer", &[(&beef.id, 0.5)], None).await;
        let toast = create_product(&service, "Torrada", &[(&bread.id, 0.1)], None).await;

        let (combo, totals) = service
            .save_combo(
                None,
                "Dupla",
                Money::from_cents(2490),
                &[ComboLine {
                    product_id: burger.id.clone(),
                    quantity: 2,
                }],
            )
            .await
            .unwrap();
        assert_eq!(totals.total_cost, Money::from_cents(1000));

        let mut pricier = beef.clone();
        pricier.unit_cost_cents = 2000;
        let report = service.update_ingredient(pricier).await.unwrap();
        assert_eq!(report, RepriceReport { products: 1, combos: 1 });

        let products = service.database().products();
        let burger = products.get_by_id(&burger.id).await.unwrap().unwrap();
        assert_eq!(burger.cost_per_portion_cents, Some(1000));
        // 1000 / 0.51 = 1960.78
        assert_eq!(burger.suggested_price_cents, Some(1961));

        let untouched = products.get_by_id(&toast.id).await.unwrap().unwrap();
        assert_eq!(untouched.cost_per_portion_cents, Some(80));

        let combo = service.database().combos().get_by_id(&combo.id).await.unwrap().unwrap();
        assert_eq!(combo.total_cost_cents, Some(2000));
        assert!((combo.combo_margin.unwrap() - 490.0 / 2490.0).abs() < EPS);
    }

    #[tokio::test]
    async fn test_delete_ingredient_in_use() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;
        let salt = add_ingredient(&service, "Sal", 200).await;
        create_product(&service, "Hambúrguer", &[(&beef.id, 0.5)], None).await;

        let err = service.delete_ingredient(&beef.id).await.unwrap_err();
        let notification = err.notification();
        assert_eq!(notification.code, ErrorCode::InUse);
        assert_eq!(
            notification.message,
            format!("Ingredient {} is used by 1 recipe line(s)", beef.id)
        );

        service.delete_ingredient(&salt.id).await.unwrap();
        assert_eq!(service.stats().await.unwrap().ingredient_count, 1);
    }

    #[tokio::test]
    async fn test_blocked_markup_is_not_saved() {
        let service = store_priced_service().await;

        let mut config = MarkupConfig::default();
        config.fixed_cost_pct = 0.5;
        config.tax_pct = 0.3;
        config.desired_margin_pct = 0.25;

        let err = service.save_markup_config(config).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MarkupBlocked);

        let stored = service.database().premises().markup_config().await.unwrap();
        assert!((stored.fixed_cost_pct - 0.30).abs() < EPS);
        assert!(stored.store_markup.is_finite());
    }

    #[tokio::test]
    async fn test_markup_change_reprices_menu() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;
        let burger = create_product(&service, "Hambúrguer", &[(&beef.id, 0.5)], None).await;

        let mut config = MarkupConfig::default();
        config.desired_margin_pct = 0.20;
        config.set_delivery_mix(0.4);
        let (saved, report) = service.save_markup_config(config).await.unwrap();

        assert_eq!(report.products, 1);
        assert!((saved.store_markup - 1.0 / 0.41).abs() < 1e-9);
        assert!((saved.sales_mix_store_pct - 0.6).abs() < EPS);

        let burger = service.database().products().get_by_id(&burger.id).await.unwrap().unwrap();
        // 500 / 0.41 = 1219.51
        assert_eq!(burger.suggested_price_cents, Some(1220));
        assert_eq!(service.metrics("reprice_all").count, 1);
    }

    #[tokio::test]
    async fn test_expenses_feed_delivery_markup() {
        let service = store_priced_service().await;

        let (rent, _) = service
            .add_expense("Aluguel", ExpenseCategory::Occupancy, Money::from_cents(300_000))
            .await
            .unwrap();

        // 30% of R$ 3.000,00 over R$ 10.000,00 of delivery revenue
        let config = service.database().premises().markup_config().await.unwrap();
        assert!((config.delivery_fixed_cost_pct - 0.09).abs() < EPS);
        assert!((config.delivery_markup - 1.0 / 0.54).abs() < 1e-9);

        // R$ 100.000,00 more would allocate 309% of the target revenue
        let err = service
            .add_expense("Reforma", ExpenseCategory::Occupancy, Money::from_cents(10_000_000))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MarkupBlocked);
        assert_eq!(service.expense_summary().await.unwrap().total, Money::from_cents(300_000));

        service.delete_expense(&rent.id).await.unwrap();
        let config = service.database().premises().markup_config().await.unwrap();
        assert!(config.delivery_fixed_cost_pct.abs() < EPS);

        let err = service.delete_expense(&rent.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_update_expense() {
        let service = store_priced_service().await;
        let (mut rent, _) = service
            .add_expense("Aluguel", ExpenseCategory::Occupancy, Money::from_cents(300_000))
            .await
            .unwrap();

        rent.monthly_value_cents = 500_000;
        service.update_expense(rent.clone()).await.unwrap();

        let summary = service.expense_summary().await.unwrap();
        assert_eq!(summary.total, Money::from_cents(500_000));
        let config = service.database().premises().markup_config().await.unwrap();
        assert!((config.delivery_fixed_cost_pct - 0.15).abs() < EPS);

        // Stored factors keep matching the stored expense total
        let err = service
            .update_expense(FixedExpense {
                id: "missing".to_string(),
                monthly_value_cents: 900_000,
                ..rent
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(service.expense_summary().await.unwrap().total, Money::from_cents(500_000));
        let unchanged = service.database().premises().markup_config().await.unwrap();
        assert!((unchanged.delivery_fixed_cost_pct - 0.15).abs() < EPS);
        assert!((unchanged.delivery_markup - config.delivery_markup).abs() < EPS);
    }

    #[tokio::test]
    async fn test_hourly_cost() {
        let service = store_priced_service().await;
        service
            .add_expense("Salários", ExpenseCategory::Staff, Money::from_cents(640_000))
            .await
            .unwrap();

        let capacity = ProductiveCapacity {
            employees: 2,
            hours_per_day: 8.0,
            days_per_month: 25.0,
            productivity_factor: 0.8,
            ..ProductiveCapacity::default()
        };
        let hourly = service.save_capacity(capacity).await.unwrap();
        assert!((hourly.productive_hours - 320.0).abs() < EPS);
        assert_eq!(hourly.cost_per_hour, Some(Money::from_cents(2000)));
        assert_eq!(hourly.fixed_cost_per_hour, Some(Money::from_cents(2000)));

        assert_eq!(service.hourly_cost().await.unwrap(), hourly);

        let invalid = ProductiveCapacity {
            productivity_factor: 1.5,
            ..ProductiveCapacity::default()
        };
        let err = service.save_capacity(invalid).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_combo_validation() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;
        let burger = create_product(&service, "Hambúrguer", &[(&beef.id, 0.5)], None).await;
        let line = ComboLine {
            product_id: burger.id.clone(),
            quantity: 1,
        };

        let err = service
            .save_combo(None, "Combo", Money::zero(), &[line.clone()])
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = service
            .save_combo(
                None,
                "Combo",
                Money::from_cents(1000),
                &[ComboLine {
                    product_id: "missing".to_string(),
                    quantity: 1,
                }],
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = service
            .save_combo(
                None,
                "Combo",
                Money::from_cents(1000),
                &[ComboLine {
                    quantity: MAX_COMBO_QUANTITY + 1,
                    ..line.clone()
                }],
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(service.stats().await.unwrap().combo_count, 0);
    }

    #[tokio::test]
    async fn test_save_rejects_recipe_quantity_beyond_limit() {
        let service = store_priced_service().await;
        let bun = add_ingredient(&service, "Pão", 150).await;

        let mut editor = service.open_editor(None).await.unwrap();
        editor.set_name("X-Gigante").unwrap();
        editor.set_yield(Some(1)).unwrap();
        editor.add_item(bun.id.as_str(), 1e18).unwrap();

        let err = service.save_product(&mut editor).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(service.stats().await.unwrap().product_count, 0);
    }

    #[tokio::test]
    async fn test_delete_product_reprices_combos() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;
        let burger = create_product(&service, "Hambúrguer", &[(&beef.id, 0.5)], None).await;
        let fries = create_product(&service, "Fritas", &[(&beef.id, 0.2)], None).await;

        let (combo, totals) = service
            .save_combo(
                None,
                "Combo",
                Money::from_cents(2000),
                &[
                    ComboLine {
                        product_id: burger.id.clone(),
                        quantity: 1,
                    },
                    ComboLine {
                        product_id: fries.id.clone(),
                        quantity: 1,
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(totals.total_cost, Money::from_cents(700));

        let report = service.delete_product(&fries.id).await.unwrap();
        assert_eq!(report.combos, 1);

        let combo = service.database().combos().get_by_id(&combo.id).await.unwrap().unwrap();
        assert_eq!(combo.total_cost_cents, Some(500));
    }

    #[tokio::test]
    async fn test_menu_engineering_and_stats() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;
        let star = create_product(&service, "Hambúrguer", &[(&beef.id, 0.5)], Some(1500)).await;
        let dog = create_product(&service, "Almôndega", &[(&beef.id, 0.5)], None).await;

        service.set_popularity(&star.id, Some(8)).await.unwrap();
        let err = service.set_popularity(&dog.id, Some(11)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let matrix = service.menu_engineering().await.unwrap();
        assert_eq!(matrix.stars, 1);
        assert_eq!(matrix.dogs, 1);
        let stars: Vec<&str> = matrix.of_class(MenuClass::Star).map(|e| e.name.as_str()).collect();
        assert_eq!(stars, vec!["Hambúrguer"]);

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.product_count, 2);
        assert_eq!(stats.ingredient_count, 1);
        let expected = (1000.0 / 1500.0 + 480.0 / 980.0) / 2.0;
        assert!((stats.average_margin.unwrap() - expected).abs() < EPS);
    }

    #[tokio::test]
    async fn test_dashboard_bands_and_indicators() {
        let service = store_priced_service().await;
        let beef = add_ingredient(&service, "Carne moída", 1000).await;
        // 1000 / 1500 → 0.67 margin; suggested 980 → 0.49
        let rich = create_product(&service, "Hambúrguer", &[(&beef.id, 0.5)], Some(1500)).await;
        let thin = create_product(&service, "Almôndega", &[(&beef.id, 0.5)], None).await;
        service.set_popularity(&rich.id, Some(8)).await.unwrap();
        service.set_popularity(&thin.id, Some(5)).await.unwrap();

        let dashboard = service.dashboard().await.unwrap();
        assert_eq!(dashboard.stats.product_count, 2);
        assert_eq!(dashboard.margin_bands.total, 2);
        assert_eq!(dashboard.margin_bands.count(Band::High), 1);
        assert_eq!(dashboard.margin_bands.count(Band::Medium), 1);
        assert_eq!(dashboard.margin_bands.count(Band::Low), 0);
        assert_eq!(dashboard.popularity_bands.count(Band::High), 1);
        assert_eq!(dashboard.popularity_bands.count(Band::Medium), 1);

        let indicators = dashboard.indicators;
        assert_eq!(indicators.highest_margin.unwrap().product_id, rich.id);
        assert_eq!(indicators.lowest_positive_margin.unwrap().product_id, thin.id);
    }

    #[tokio::test]
    async fn test_categories() {
        let service = store_priced_service().await;
        let drinks = service.create_category(" Bebidas ").await.unwrap();
        assert_eq!(drinks.name, "Bebidas");

        let err = service.create_category("Bebidas").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = service.create_category("   ").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}
