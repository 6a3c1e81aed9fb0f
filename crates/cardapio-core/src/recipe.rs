//! # Recipe Cost Aggregation
//!
//! Computes what one batch of a recipe (ficha técnica) costs and what each
//! portion of it costs.
//!
//! ## Algorithm
//! ```text
//! items (as typed, may repeat)          costs (ingredient_id → unit cost)
//!        │                                        │
//!        ▼                                        │
//! dedupe_last_wins ── one entry per ingredient    │
//!        │                                        │
//!        ▼                                        ▼
//! skip quantity ≤ 0 ──► line_cost = unit_cost × quantity (rounded)
//!        │
//!        ▼
//! total_cost = Σ line_cost
//! cost_per_portion = total_cost ÷ effective_yield   (yield < 1 → 1)
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Ingredient, RecipeLine};

/// One ingredient entry of a recipe being edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeItem {
    pub ingredient_id: String,
    /// Quantity in the ingredient's unit. Zero is a blank form row.
    pub quantity: f64,
}

impl RecipeItem {
    pub fn new(ingredient_id: impl Into<String>, quantity: f64) -> Self {
        RecipeItem {
            ingredient_id: ingredient_id.into(),
            quantity,
        }
    }

    /// Whether the line is worth persisting.
    #[inline]
    pub fn is_persistable(&self) -> bool {
        self.quantity.is_finite() && self.quantity > 0.0 && !self.ingredient_id.trim().is_empty()
    }
}

impl From<&RecipeLine> for RecipeItem {
    fn from(line: &RecipeLine) -> Self {
        RecipeItem::new(line.ingredient_id.clone(), line.quantity_used)
    }
}

/// Collapses repeated ingredients into one entry.
///
/// The quantity of the LAST occurrence wins; the entry keeps the position
/// of the first occurrence.
///
/// ## Example
/// ```rust
/// use cardapio_core::recipe::{dedupe_last_wins, RecipeItem};
///
/// let items = vec![
///     RecipeItem::new("bun", 1.0),
///     RecipeItem::new("beef", 0.15),
///     RecipeItem::new("bun", 2.0),
/// ];
/// let unique = dedupe_last_wins(&items);
/// assert_eq!(unique, vec![RecipeItem::new("bun", 2.0), RecipeItem::new("beef", 0.15)]);
/// ```
pub fn dedupe_last_wins(items: &[RecipeItem]) -> Vec<RecipeItem> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(items.len());
    let mut unique: Vec<RecipeItem> = Vec::with_capacity(items.len());

    for item in items {
        match positions.get(item.ingredient_id.as_str()) {
            Some(&index) => unique[index].quantity = item.quantity,
            None => {
                positions.insert(item.ingredient_id.as_str(), unique.len());
                unique.push(item.clone());
            }
        }
    }

    unique
}

/// Deduplicated lines with a positive quantity, ready to be stored.
pub fn persistable_lines(items: &[RecipeItem]) -> Vec<RecipeItem> {
    dedupe_last_wins(items)
        .into_iter()
        .filter(RecipeItem::is_persistable)
        .collect()
}

/// Yield used for division: values below 1 (or unset) count as 1.
#[inline]
pub fn effective_yield(yield_portions: Option<i64>) -> i64 {
    match yield_portions {
        Some(portions) if portions >= 1 => portions,
        _ => 1,
    }
}

// =============================================================================
// Cost Lookup
// =============================================================================

/// Unit cost per ingredient id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientCosts {
    costs: HashMap<String, Money>,
}

impl IngredientCosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ingredients<'a>(ingredients: impl IntoIterator<Item = &'a Ingredient>) -> Self {
        let costs = ingredients
            .into_iter()
            .map(|ingredient| (ingredient.id.clone(), ingredient.unit_cost()))
            .collect();
        IngredientCosts { costs }
    }

    pub fn insert(&mut self, ingredient_id: impl Into<String>, unit_cost: Money) {
        self.costs.insert(ingredient_id.into(), unit_cost);
    }

    #[inline]
    pub fn get(&self, ingredient_id: &str) -> Option<Money> {
        self.costs.get(ingredient_id).copied()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Cost contribution of one recipe line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeCostLine {
    pub ingredient_id: String,
    pub quantity: f64,
    pub unit_cost: Money,
    pub line_cost: Money,
}

/// Result of aggregating a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeCost {
    pub total_cost: Money,
    pub cost_per_portion: Money,
    /// Yield actually used for the division.
    pub yield_portions: i64,
    pub lines: Vec<RecipeCostLine>,
    /// Ingredient ids absent from the cost lookup. They contribute nothing.
    pub missing_ingredients: Vec<String>,
}

/// Aggregates a recipe into total and per-portion cost.
///
/// ## Example
/// ```rust
/// use cardapio_core::money::Money;
/// use cardapio_core::recipe::{aggregate_recipe_cost, IngredientCosts, RecipeItem};
///
/// let mut costs = IngredientCosts::new();
/// costs.insert("a", Money::from_cents(150));
/// costs.insert("b", Money::from_cents(300));
///
/// let items = [RecipeItem::new("a", 2.0), RecipeItem::new("b", 1.0)];
/// let cost = aggregate_recipe_cost(&items, &costs, Some(4));
/// assert_eq!(cost.total_cost, Money::from_cents(600));
/// assert_eq!(cost.cost_per_portion, Money::from_cents(150));
/// ```
pub fn aggregate_recipe_cost(
    items: &[RecipeItem],
    costs: &IngredientCosts,
    yield_portions: Option<i64>,
) -> RecipeCost {
    let mut lines = Vec::with_capacity(items.len());
    let mut missing_ingredients = Vec::new();

    for item in dedupe_last_wins(items) {
        if !item.is_persistable() {
            continue;
        }
        match costs.get(&item.ingredient_id) {
            Some(unit_cost) => lines.push(RecipeCostLine {
                line_cost: unit_cost.multiply_quantity(item.quantity),
                unit_cost,
                quantity: item.quantity,
                ingredient_id: item.ingredient_id,
            }),
            None => missing_ingredients.push(item.ingredient_id),
        }
    }

    let total_cost: Money = lines.iter().map(|line| line.line_cost).sum();
    let portions = effective_yield(yield_portions);
    let cost_per_portion = total_cost.divide(portions).unwrap_or(total_cost);

    RecipeCost {
        total_cost,
        cost_per_portion,
        yield_portions: portions,
        lines,
        missing_ingredients,
    }
}
