//! # Price and Margin Reconciliation
//!
//! Derives suggested prices and the realized margin of a product.
//!
//! ## Which Price Counts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  defined_price > 0 ?                                                    │
//! │     │ yes                        │ no                                   │
//! │     ▼                            ▼                                      │
//! │  margin against defined     suggested = cost × markup(basis)            │
//! │                                  │                                      │
//! │                                  ├── factor  → margin against suggested │
//! │                                  └── blocked → no price, no margin      │
//! │                                                                         │
//! │  margin = (price - cost_per_portion) / price      (price 0 → 0)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every derived field is recomputed by [`compute_derived_product_fields`]
//! after any mutation; nothing here is incremental.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::ResolvedMarkup;
use crate::error::ValidationError;
use crate::markup::MarkupFactor;
use crate::money::Money;
use crate::recipe::{aggregate_recipe_cost, IngredientCosts, RecipeItem};
use crate::types::{Product, RecipeLine};

/// Margin of a sale as a fraction of its price.
///
/// ## Example
/// ```rust
/// use cardapio_core::money::Money;
/// use cardapio_core::pricing::margin_for;
///
/// assert_eq!(margin_for(Money::from_cents(300), Money::from_cents(150)), 0.5);
/// assert_eq!(margin_for(Money::zero(), Money::from_cents(150)), 0.0);
/// ```
pub fn margin_for(price: Money, cost: Money) -> f64 {
    if !price.is_positive() {
        return 0.0;
    }
    (price - cost).cents() as f64 / price.cents() as f64
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Markup factor used for the main suggested price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    Weighted,
    Store,
    Delivery,
}

impl Default for PriceBasis {
    fn default() -> Self {
        PriceBasis::Weighted
    }
}

impl FromStr for PriceBasis {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weighted" => Ok(PriceBasis::Weighted),
            "store" => Ok(PriceBasis::Store),
            "delivery" => Ok(PriceBasis::Delivery),
            other => Err(ValidationError::InvalidFormat {
                field: "price_basis".to_string(),
                reason: format!("unknown basis '{}'", other),
            }),
        }
    }
}

impl fmt::Display for PriceBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceBasis::Weighted => "weighted",
            PriceBasis::Store => "store",
            PriceBasis::Delivery => "delivery",
        };
        f.write_str(name)
    }
}

/// Psychological rounding applied to suggested prices.
///
/// Never applied to a price the owner typed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RoundingRule {
    /// Keep the computed centavos.
    None,
    /// R$ 25,37 → R$ 25,90.
    #[serde(rename = "cents_90")]
    Cents90,
    /// R$ 25,37 → R$ 25,00; R$ 25,50 → R$ 26,00.
    Whole,
    /// R$ 25,37 → R$ 25,00; R$ 25,62 → R$ 25,50.
    Half,
}

impl RoundingRule {
    /// Rounds a price. Zero and negative prices pass through unchanged, and
    /// a rule that would round a positive price down to zero is skipped.
    ///
    /// ## Example
    /// ```rust
    /// use cardapio_core::money::Money;
    /// use cardapio_core::pricing::RoundingRule;
    ///
    /// assert_eq!(RoundingRule::Cents90.apply(Money::from_cents(2537)).cents(), 2590);
    /// assert_eq!(RoundingRule::Whole.apply(Money::from_cents(2550)).cents(), 2600);
    /// assert_eq!(RoundingRule::Half.apply(Money::from_cents(2562)).cents(), 2550);
    /// ```
    pub fn apply(&self, price: Money) -> Money {
        let cents = price.cents();
        if cents <= 0 {
            return price;
        }

        let floor = (cents / 100) * 100;
        let rounded = match self {
            RoundingRule::None => cents,
            RoundingRule::Cents90 => floor.saturating_add(90),
            RoundingRule::Whole => (cents.saturating_add(50) / 100).saturating_mul(100),
            RoundingRule::Half => {
                if cents - floor >= 50 {
                    floor.saturating_add(50)
                } else {
                    floor
                }
            }
        };

        if rounded <= 0 {
            price
        } else {
            Money::from_cents(rounded)
        }
    }
}

impl Default for RoundingRule {
    fn default() -> Self {
        RoundingRule::None
    }
}

impl FromStr for RoundingRule {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(RoundingRule::None),
            "cents_90" | "cents90" => Ok(RoundingRule::Cents90),
            "whole" => Ok(RoundingRule::Whole),
            "half" => Ok(RoundingRule::Half),
            other => Err(ValidationError::InvalidFormat {
                field: "rounding_rule".to_string(),
                reason: format!("unknown rule '{}'", other),
            }),
        }
    }
}

/// Basis and rounding used when deriving prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingSettings {
    pub basis: PriceBasis,
    pub rounding: RoundingRule,
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Which price the margin was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Defined,
    Suggested,
    /// No defined price and the markup is blocked.
    Unpriced,
}

/// Suggested price and margin for one cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub suggested_price: Option<Money>,
    pub margin: Option<f64>,
    pub price_source: PriceSource,
}

/// Reconciles a cost against an optional defined price.
///
/// The suggested price is always computed when the markup allows it, even
/// if a defined price wins for the margin.
pub fn reconcile(
    cost_per_portion: Money,
    defined_price: Option<Money>,
    markup: MarkupFactor,
    rounding: RoundingRule,
) -> Reconciliation {
    let suggested_price = markup
        .apply(cost_per_portion)
        .map(|price| rounding.apply(price));

    match (defined_price, suggested_price) {
        (Some(defined), _) if defined.is_positive() => Reconciliation {
            suggested_price,
            margin: Some(margin_for(defined, cost_per_portion)),
            price_source: PriceSource::Defined,
        },
        (_, Some(suggested)) => Reconciliation {
            suggested_price,
            margin: Some(margin_for(suggested, cost_per_portion)),
            price_source: PriceSource::Suggested,
        },
        (_, None) => Reconciliation {
            suggested_price: None,
            margin: None,
            price_source: PriceSource::Unpriced,
        },
    }
}

// =============================================================================
// Derived Product Fields
// =============================================================================

/// Working copy of a product being edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDraft {
    pub name: String,
    pub category_id: Option<String>,
    pub yield_portions: Option<i64>,
    pub defined_price: Option<Money>,
    pub popularity_level: Option<i64>,
    pub items: Vec<RecipeItem>,
}

impl ProductDraft {
    /// Loads a stored product and its recipe lines into a draft.
    pub fn from_product(product: &Product, lines: &[RecipeLine]) -> Self {
        ProductDraft {
            name: product.name.clone(),
            category_id: product.category_id.clone(),
            yield_portions: Some(product.yield_portions),
            defined_price: product.defined_price(),
            popularity_level: product.popularity_level,
            items: lines.iter().map(RecipeItem::from).collect(),
        }
    }
}

/// Every field derived from a product's inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DerivedProductFields {
    pub total_recipe_cost: Money,
    pub cost_per_portion: Money,
    pub yield_portions: i64,
    /// Suggested price under the configured basis.
    pub suggested_price: Option<Money>,
    pub store_suggested_price: Option<Money>,
    pub delivery_suggested_price: Option<Money>,
    pub margin: Option<f64>,
    pub price_source: PriceSource,
    pub missing_ingredients: Vec<String>,
}

impl DerivedProductFields {
    /// Writes the derived values into a product record.
    pub fn apply_to(&self, product: &mut Product) {
        product.yield_portions = self.yield_portions;
        product.total_recipe_cost_cents = Some(self.total_recipe_cost.cents());
        product.cost_per_portion_cents = Some(self.cost_per_portion.cents());
        product.suggested_price_cents = self.suggested_price.map(|price| price.cents());
        product.margin = self.margin;
    }
}

/// Recomputes cost, suggested prices and margin from scratch.
///
/// ## Example
/// ```rust
/// use cardapio_core::allocation::resolve;
/// use cardapio_core::money::Money;
/// use cardapio_core::pricing::{compute_derived_product_fields, PricingSettings, ProductDraft};
/// use cardapio_core::recipe::{IngredientCosts, RecipeItem};
/// use cardapio_core::MarkupConfig;
///
/// let mut costs = IngredientCosts::new();
/// costs.insert("bun", Money::from_cents(120));
///
/// let draft = ProductDraft {
///     name: "Pão na chapa".to_string(),
///     yield_portions: Some(1),
///     items: vec![RecipeItem::new("bun", 1.0)],
///     ..ProductDraft::default()
/// };
/// let markup = resolve(&MarkupConfig::default(), Money::zero());
/// let derived = compute_derived_product_fields(&draft, &costs, &markup, PricingSettings::default());
/// assert_eq!(derived.cost_per_portion, Money::from_cents(120));
/// assert!(derived.suggested_price.unwrap() > derived.cost_per_portion);
/// ```
pub fn compute_derived_product_fields(
    draft: &ProductDraft,
    costs: &IngredientCosts,
    markup: &ResolvedMarkup,
    settings: PricingSettings,
) -> DerivedProductFields {
    let recipe = aggregate_recipe_cost(&draft.items, costs, draft.yield_portions);
    let reconciliation = reconcile(
        recipe.cost_per_portion,
        draft.defined_price,
        markup.for_basis(settings.basis),
        settings.rounding,
    );
    let channel_price = |factor: MarkupFactor| {
        factor
            .apply(recipe.cost_per_portion)
            .map(|price| settings.rounding.apply(price))
    };

    DerivedProductFields {
        total_recipe_cost: recipe.total_cost,
        cost_per_portion: recipe.cost_per_portion,
        yield_portions: recipe.yield_portions,
        suggested_price: reconciliation.suggested_price,
        store_suggested_price: channel_price(markup.store),
        delivery_suggested_price: channel_price(markup.delivery),
        margin: reconciliation.margin,
        price_source: reconciliation.price_source,
        missing_ingredients: recipe.missing_ingredients,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::resolve;
    use crate::markup::SalesMix;
    use crate::types::MarkupConfig;

    const EPS: f64 = 1e-9;

    fn fixed_markup(store: f64, delivery: f64, weighted: f64) -> ResolvedMarkup {
        ResolvedMarkup {
            allocated_fixed_cost: Money::zero(),
            delivery_fixed_cost_pct: 0.0,
            store: MarkupFactor::Factor(store),
            delivery: MarkupFactor::Factor(delivery),
            weighted: MarkupFactor::Factor(weighted),
            mix: SalesMix::default(),
        }
    }

    #[test]
    fn test_margin_with_defined_price() {
        let result = reconcile(
            Money::from_cents(150),
            Some(Money::from_cents(300)),
            MarkupFactor::Factor(2.5),
            RoundingRule::None,
        );
        assert_eq!(result.price_source, PriceSource::Defined);
        assert!((result.margin.unwrap() - 0.5).abs() < EPS);
        assert_eq!(result.suggested_price, Some(Money::from_cents(375)));
    }

    #[test]
    fn test_margin_with_suggested_price() {
        let result = reconcile(Money::from_cents(150), None, MarkupFactor::Factor(2.0), RoundingRule::None);
        assert_eq!(result.price_source, PriceSource::Suggested);
        assert_eq!(result.suggested_price, Some(Money::from_cents(300)));
        assert!((result.margin.unwrap() - 0.5).abs() < EPS);
    }

    #[test]
    fn test_zero_defined_price_falls_back_to_suggested() {
        let result = reconcile(
            Money::from_cents(150),
            Some(Money::zero()),
            MarkupFactor::Factor(2.0),
            RoundingRule::None,
        );
        assert_eq!(result.price_source, PriceSource::Suggested);
    }

    #[test]
    fn test_blocked_markup_leaves_product_unpriced() {
        let blocked = MarkupFactor::Blocked { total_pct: 1.1 };
        let result = reconcile(Money::from_cents(150), None, blocked, RoundingRule::None);
        assert_eq!(result.suggested_price, None);
        assert_eq!(result.margin, None);
        assert_eq!(result.price_source, PriceSource::Unpriced);

        let defined = reconcile(Money::from_cents(150), Some(Money::from_cents(200)), blocked, RoundingRule::None);
        assert_eq!(defined.suggested_price, None);
        assert!((defined.margin.unwrap() - 0.25).abs() < EPS);
    }

    #[test]
    fn test_zero_cost_zero_price_margin_is_zero() {
        let result = reconcile(Money::zero(), None, MarkupFactor::Factor(2.0), RoundingRule::Cents90);
        assert_eq!(result.suggested_price, Some(Money::zero()));
        assert_eq!(result.margin, Some(0.0));
    }

    #[test]
    fn test_rounding_rules() {
        let price = Money::from_cents(2537);
        assert_eq!(RoundingRule::None.apply(price), price);
        assert_eq!(RoundingRule::Cents90.apply(price).cents(), 2590);
        assert_eq!(RoundingRule::Whole.apply(price).cents(), 2500);
        assert_eq!(RoundingRule::Half.apply(price).cents(), 2500);
        assert_eq!(RoundingRule::Half.apply(Money::from_cents(2550)).cents(), 2550);
        assert_eq!(RoundingRule::Whole.apply(Money::from_cents(30)).cents(), 30);
        assert_eq!(RoundingRule::Cents90.apply(Money::zero()), Money::zero());

        let ceiling = Money::from_cents(i64::MAX);
        for rule in [RoundingRule::Cents90, RoundingRule::Whole, RoundingRule::Half] {
            assert!(rule.apply(ceiling).is_positive());
        }
    }

    #[test]
    fn test_parse_settings() {
        assert_eq!("store".parse::<PriceBasis>().unwrap(), PriceBasis::Store);
        assert_eq!(" Weighted ".parse::<PriceBasis>().unwrap(), PriceBasis::Weighted);
        assert!("retail".parse::<PriceBasis>().is_err());
        assert_eq!("cents_90".parse::<RoundingRule>().unwrap(), RoundingRule::Cents90);
        assert_eq!(
            serde_json::to_string(&RoundingRule::Cents90).unwrap(),
            "\"cents_90\""
        );
    }

    #[test]
    fn test_derived_fields_reference_product() {
        let mut costs = IngredientCosts::new();
        costs.insert("a", Money::from_cents(150));
        costs.insert("b", Money::from_cents(300));
        let draft = ProductDraft {
            name: "Prato".to_string(),
            yield_portions: Some(4),
            items: vec![RecipeItem::new("a", 2.0), RecipeItem::new("b", 1.0)],
            ..ProductDraft::default()
        };

        let derived = compute_derived_product_fields(
            &draft,
            &costs,
            &fixed_markup(2.0, 3.0, 2.0),
            PricingSettings::default(),
        );
        assert_eq!(derived.total_recipe_cost, Money::from_cents(600));
        assert_eq!(derived.cost_per_portion, Money::from_cents(150));
        assert_eq!(derived.suggested_price, Some(Money::from_cents(300)));
        assert_eq!(derived.store_suggested_price, Some(Money::from_cents(300)));
        assert_eq!(derived.delivery_suggested_price, Some(Money::from_cents(450)));
        assert!((derived.margin.unwrap() - 0.5).abs() < EPS);

        let by_delivery = compute_derived_product_fields(
            &draft,
            &costs,
            &fixed_markup(2.0, 3.0, 2.0),
            PricingSettings {
                basis: PriceBasis::Delivery,
                rounding: RoundingRule::None,
            },
        );
        assert_eq!(by_delivery.suggested_price, Some(Money::from_cents(450)));
    }

    #[test]
    fn test_derived_fields_zero_yield_does_not_panic() {
        let mut costs = IngredientCosts::new();
        costs.insert("a", Money::from_cents(150));
        let draft = ProductDraft {
            name: "Prato".to_string(),
            yield_portions: Some(0),
            items: vec![RecipeItem::new("a", 2.0)],
            ..ProductDraft::default()
        };
        let markup = resolve(&MarkupConfig::default(), Money::zero());
        let derived = compute_derived_product_fields(&draft, &costs, &markup, PricingSettings::default());
        assert_eq!(derived.yield_portions, 1);
        assert_eq!(derived.cost_per_portion, Money::from_cents(300));
    }

    #[test]
    fn test_apply_to_product() {
        let now = chrono::Utc::now();
        let mut product = Product {
            id: "p1".to_string(),
            name: "Prato".to_string(),
            category_id: None,
            yield_portions: 0,
            defined_price_cents: None,
            suggested_price_cents: None,
            total_recipe_cost_cents: None,
            cost_per_portion_cents: None,
            margin: None,
            popularity_level: None,
            created_at: now,
            updated_at: now,
        };
        let mut costs = IngredientCosts::new();
        costs.insert("a", Money::from_cents(150));
        let draft = ProductDraft::from_product(&product, &[]);
        let derived = compute_derived_product_fields(
            &ProductDraft {
                items: vec![RecipeItem::new("a", 1.0)],
                ..draft
            },
            &costs,
            &fixed_markup(2.0, 2.0, 2.0),
            PricingSettings::default(),
        );
        derived.apply_to(&mut product);
        assert_eq!(product.yield_portions, 1);
        assert_eq!(product.cost_per_portion_cents, Some(150));
        assert_eq!(product.suggested_price_cents, Some(300));
        assert_eq!(product.margin, Some(0.5));
    }
}
