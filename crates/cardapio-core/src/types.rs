//! # Domain Types
//!
//! Records the back office reads from and writes to storage.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │   Ingredient    │◄──│   RecipeLine    │──►│    Product      │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  unit (kg, ml)  │   │  quantity_used  │   │  yield_portions │        │
//! │  │  unit_cost      │   │                 │   │  cost/portion * │        │
//! │  │  kind           │   │                 │   │  margin *       │        │
//! │  └─────────────────┘   └─────────────────┘   └────────▲────────┘        │
//! │                                                       │                 │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────┴────────┐        │
//! │  │  FixedExpense   │   │  MarkupConfig   │   │   ComboItem     │        │
//! │  │  category       │   │  (singleton)    │   │   quantity      │        │
//! │  │  monthly_value  │   │  % → factors *  │   │   → Combo       │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! │                                                                         │
//! │  * derived fields: recomputed from their inputs, never hand-edited      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - Monetary columns end in `_cents` and hold centavos; accessors return [`Money`].
//! - Percentages are fractions (0.09 = 9%) even where forms display 0-100.
//! - Every record has a UUID v4 `id`; singletons use [`SINGLETON_ID`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Identifier of singleton premise rows (capacity, markup configuration).
pub const SINGLETON_ID: &str = "default";

// =============================================================================
// Ingredient
// =============================================================================

/// Purchase unit of an ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum IngredientUnit {
    Kg,
    G,
    #[serde(rename = "L")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "L"))]
    L,
    Ml,
    /// Unit (piece counted one by one).
    Un,
    /// Box.
    Cx,
    /// Pack.
    Pc,
}

impl Default for IngredientUnit {
    fn default() -> Self {
        IngredientUnit::Kg
    }
}

/// Whether an ingredient goes into the food or into its packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum IngredientKind {
    Raw,
    Packaging,
}

impl Default for IngredientKind {
    fn default() -> Self {
        IngredientKind::Raw
    }
}

/// A purchasable input with a cost per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub unit: IngredientUnit,
    /// Cost of one `unit` in centavos.
    pub unit_cost_cents: i64,
    pub kind: IngredientKind,
    pub supplier: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    /// Returns the unit cost as Money.
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }
}

// =============================================================================
// Recipe Line (ficha técnica entry)
// =============================================================================

/// One ingredient of a product's recipe.
///
/// At most one line exists per `(product_id, ingredient_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RecipeLine {
    pub id: String,
    pub product_id: String,
    pub ingredient_id: String,
    /// Quantity in the ingredient's unit, always > 0 once persisted.
    pub quantity_used: f64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Category & Product
// =============================================================================

/// Menu category (e.g. "Burgers", "Drinks").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sellable product and its derived pricing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category_id: Option<String>,

    /// Portions one recipe batch produces (rendimento), ≥ 1.
    pub yield_portions: i64,

    /// Price typed in by the owner. Wins over the suggested price.
    pub defined_price_cents: Option<i64>,

    /// cost_per_portion × markup, possibly rounded.
    pub suggested_price_cents: Option<i64>,

    /// Σ quantity × unit cost over the recipe.
    pub total_recipe_cost_cents: Option<i64>,

    /// total_recipe_cost / yield_portions.
    pub cost_per_portion_cents: Option<i64>,

    /// (price - cost_per_portion) / price, as a fraction.
    pub margin: Option<f64>,

    /// Sales popularity on a 0-10 scale (menu engineering).
    pub popularity_level: Option<i64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the owner-defined price, if any.
    #[inline]
    pub fn defined_price(&self) -> Option<Money> {
        self.defined_price_cents.map(Money::from_cents)
    }

    /// Returns the suggested price, if one could be computed.
    #[inline]
    pub fn suggested_price(&self) -> Option<Money> {
        self.suggested_price_cents.map(Money::from_cents)
    }

    /// Returns the cost per portion (zero when never computed).
    #[inline]
    pub fn cost_per_portion(&self) -> Money {
        Money::from_cents(self.cost_per_portion_cents.unwrap_or(0))
    }

    /// Returns the total recipe cost (zero when never computed).
    #[inline]
    pub fn total_recipe_cost(&self) -> Money {
        Money::from_cents(self.total_recipe_cost_cents.unwrap_or(0))
    }

    /// Price the product actually sells for: defined price when positive,
    /// otherwise the suggested price.
    pub fn effective_price(&self) -> Option<Money> {
        match self.defined_price() {
            Some(price) if price.is_positive() => Some(price),
            _ => self.suggested_price(),
        }
    }
}

// =============================================================================
// Fixed Expenses
// =============================================================================

/// Grouping of monthly fixed expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    /// Rent, condo fees, utilities.
    Occupancy,
    /// Salaries and labor charges.
    Staff,
    /// Accounting, software, office.
    Admin,
    /// Bank fees, interest.
    Financial,
}

impl ExpenseCategory {
    /// All categories in display order.
    pub const ALL: [ExpenseCategory; 4] = [
        ExpenseCategory::Occupancy,
        ExpenseCategory::Staff,
        ExpenseCategory::Admin,
        ExpenseCategory::Financial,
    ];
}

impl Default for ExpenseCategory {
    fn default() -> Self {
        ExpenseCategory::Occupancy
    }
}

/// A recurring monthly fixed cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct FixedExpense {
    pub id: String,
    pub name: String,
    pub category: ExpenseCategory,
    pub monthly_value_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl FixedExpense {
    /// Returns the monthly value as Money.
    #[inline]
    pub fn monthly_value(&self) -> Money {
        Money::from_cents(self.monthly_value_cents)
    }
}

// =============================================================================
// Productive Capacity (singleton)
// =============================================================================

/// Staffing premises used to derive productive hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductiveCapacity {
    pub id: String,
    pub employees: i64,
    pub hours_per_day: f64,
    pub days_per_month: f64,
    /// Share of paid hours that is actually productive (0-1).
    pub productivity_factor: f64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Default for ProductiveCapacity {
    /// Form defaults: no staff yet, 8h days, 22 working days, 75% productive.
    fn default() -> Self {
        ProductiveCapacity {
            id: SINGLETON_ID.to_string(),
            employees: 0,
            hours_per_day: 8.0,
            days_per_month: 22.0,
            productivity_factor: 0.75,
            updated_at: Utc::now(),
        }
    }
}

// =============================================================================
// Markup Configuration (singleton)
// =============================================================================

/// How total fixed expenses are charged to the delivery channel (rateio).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMethod {
    /// A fixed share of the monthly fixed expenses.
    FixedPercent,
    /// Share proportional to the channel's revenue participation.
    RevenueShare,
}

impl Default for AllocationMethod {
    fn default() -> Self {
        AllocationMethod::FixedPercent
    }
}

/// Markup premises and the factors derived from them.
///
/// Input fields are edited in forms; `store_markup`, `delivery_markup`,
/// `weighted_markup` and `delivery_fixed_cost_pct` are derived by
/// [`MarkupConfig::recompute`](crate::allocation) and only persisted on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MarkupConfig {
    pub id: String,

    /// Fixed costs as a share of store revenue.
    pub fixed_cost_pct: f64,
    /// Taxes on revenue.
    pub tax_pct: f64,
    /// Generic delivery fee, used when no marketplace fee is configured.
    pub delivery_fee_pct: f64,
    /// Profit margin the owner wants to keep.
    pub desired_margin_pct: f64,
    /// Target monthly revenue of the delivery channel, in centavos.
    pub target_revenue_cents: i64,

    /// Derived: 1 / (1 - store percentages).
    pub store_markup: f64,
    /// Derived: 1 / (1 - delivery percentages).
    pub delivery_markup: f64,
    /// Derived: store × mix + delivery × (1 - mix).
    pub weighted_markup: f64,

    /// Share of sales made in the store. Always 1 - `sales_mix_delivery_pct`.
    pub sales_mix_store_pct: f64,
    /// Share of sales made through delivery.
    pub sales_mix_delivery_pct: f64,

    pub marketplace_fee_pct: Option<f64>,
    pub packaging_pct: Option<f64>,
    pub other_delivery_costs_pct: Option<f64>,

    pub fixed_cost_allocation_method: AllocationMethod,
    /// Share of total fixed expenses charged to delivery.
    pub fixed_cost_allocation_pct: f64,
    /// Derived: allocated fixed cost / delivery target revenue.
    pub delivery_fixed_cost_pct: f64,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl MarkupConfig {
    /// Returns the target revenue as Money.
    #[inline]
    pub fn target_revenue(&self) -> Money {
        Money::from_cents(self.target_revenue_cents)
    }
}

impl Default for MarkupConfig {
    /// Business defaults: fixed 30%, taxes 9%, delivery fee 15%, margin 10%,
    /// target revenue R$ 10.000,00, 70/30 store/delivery mix, marketplace 15%,
    /// packaging 3%, 30% of fixed expenses charged to delivery.
    ///
    /// Derived factors are filled in assuming no fixed expenses registered yet.
    fn default() -> Self {
        let mut config = MarkupConfig {
            id: SINGLETON_ID.to_string(),
            fixed_cost_pct: 0.30,
            tax_pct: 0.09,
            delivery_fee_pct: 0.15,
            desired_margin_pct: 0.10,
            target_revenue_cents: 1_000_000,
            store_markup: 0.0,
            delivery_markup: 0.0,
            weighted_markup: 0.0,
            sales_mix_store_pct: 0.7,
            sales_mix_delivery_pct: 0.3,
            marketplace_fee_pct: Some(0.15),
            packaging_pct: Some(0.03),
            other_delivery_costs_pct: Some(0.0),
            fixed_cost_allocation_method: AllocationMethod::FixedPercent,
            fixed_cost_allocation_pct: 0.30,
            delivery_fixed_cost_pct: 0.0,
            updated_at: Utc::now(),
        };
        config.refresh_derived(Money::zero());
        config
    }
}

// =============================================================================
// Combos
// =============================================================================

/// A bundle of products sold for one price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Combo {
    pub id: String,
    pub name: String,
    pub total_price_cents: i64,
    /// Σ product cost_per_portion × quantity.
    pub total_cost_cents: Option<i64>,
    pub combo_margin: Option<f64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Combo {
    /// Returns the combo's sale price.
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

/// A product inside a combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ComboItem {
    pub id: String,
    pub combo_id: String,
    pub product_id: String,
    pub quantity: i64,
}
