//! # Validation Module
//!
//! Input validation for the back office forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form (TypeScript)                                             │
//! │  ├── Required markers, numeric inputs                                   │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Business rules (yield ≥ 1, percentages are fractions)              │
//! │  └── Fails BEFORE any storage call is issued                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL / CHECK constraints                                       │
//! │  ├── UNIQUE (product_id, ingredient_id)                                 │
//! │  └── Foreign keys (RESTRICT on ingredients)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cardapio_core::validation::{validate_fraction, validate_yield};
//!
//! assert_eq!(validate_yield(Some(4)).unwrap(), 4);
//! assert!(validate_yield(None).is_err());
//! assert!(validate_fraction("tax_pct", 9.0).is_err()); // 9% is 0.09
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::ProductDraft;
use crate::types::{Ingredient, MarkupConfig};
use crate::{MAX_COMBO_QUANTITY, MAX_POPULARITY_LEVEL, MAX_RECIPE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted name for products, ingredients, categories, expenses.
pub const MAX_NAME_LENGTH: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LENGTH`] characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(name.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the yield (rendimento) and returns it.
///
/// ## Rules
/// - Required when saving
/// - Must be at least 1
///
/// ## Save Workflow
/// ```text
/// Editing ──save──► validate_yield(Some(0)) ── Err(MustBePositive)
///                                               │
///                                               ▼
///                                   no storage call, Editing resumes
/// ```
pub fn validate_yield(yield_portions: Option<i64>) -> ValidationResult<i64> {
    match yield_portions {
        None => Err(ValidationError::required("yield_portions")),
        Some(portions) if portions < 1 => Err(ValidationError::MustBePositive {
            field: "yield_portions".to_string(),
        }),
        Some(portions) => Ok(portions),
    }
}

/// Validates a recipe quantity.
///
/// ## Rules
/// - Must be a finite number
/// - Zero is accepted (placeholder row, dropped on save)
/// - Must not exceed [`MAX_RECIPE_QUANTITY`]
///
/// ## Example
/// ```rust
/// use cardapio_core::validation::validate_quantity;
///
/// assert!(validate_quantity(0.125).is_ok());
/// assert!(validate_quantity(0.0).is_ok());
/// assert!(validate_quantity(-1.0).is_err());
/// assert!(validate_quantity(1e18).is_err());
/// ```
pub fn validate_quantity(quantity: f64) -> ValidationResult<()> {
    if !quantity.is_finite() {
        return Err(ValidationError::NotFinite {
            field: "quantity_used".to_string(),
        });
    }
    if quantity < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity_used".to_string(),
        });
    }
    if quantity > MAX_RECIPE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity_used".to_string(),
            min: 0.0,
            max: MAX_RECIPE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates how many units of a product a combo line holds (1 to
/// [`MAX_COMBO_QUANTITY`]).
pub fn validate_combo_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_COMBO_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1.0,
            max: MAX_COMBO_QUANTITY as f64,
        });
    }
    Ok(())
}

/// Validates a monetary amount that may be zero but never negative.
pub fn validate_money(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a percentage stored as a fraction (0 to 1).
///
/// ## Example
/// ```rust
/// use cardapio_core::validation::validate_fraction;
///
/// assert!(validate_fraction("tax_pct", 0.09).is_ok());
/// assert!(validate_fraction("tax_pct", 1.0).is_ok());
/// assert!(validate_fraction("tax_pct", -0.01).is_err());
/// ```
pub fn validate_fraction(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}

/// Validates an optional popularity level (0 to 10).
pub fn validate_popularity(level: Option<i64>) -> ValidationResult<()> {
    match level {
        Some(level) if !(0..=MAX_POPULARITY_LEVEL).contains(&level) => Err(ValidationError::OutOfRange {
            field: "popularity_level".to_string(),
            min: 0.0,
            max: MAX_POPULARITY_LEVEL as f64,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Record Validators
// =============================================================================

/// Validates a product draft before saving. Returns the trimmed name and yield.
///
/// Recipe rows with zero quantity are placeholders and are not rejected here;
/// they are dropped when the lines are persisted.
pub fn validate_product_draft(draft: &ProductDraft) -> ValidationResult<(String, i64)> {
    let name = validate_name("name", &draft.name)?;
    let yield_portions = validate_yield(draft.yield_portions)?;

    if let Some(price) = draft.defined_price {
        validate_money("defined_price", price)?;
    }
    validate_popularity(draft.popularity_level)?;

    for item in &draft.items {
        validate_quantity(item.quantity)?;
    }

    Ok((name, yield_portions))
}

/// Validates an ingredient before saving.
pub fn validate_ingredient(ingredient: &Ingredient) -> ValidationResult<()> {
    validate_name("name", &ingredient.name)?;
    validate_money("unit_cost", ingredient.unit_cost())?;
    Ok(())
}

/// Validates the input percentages of a markup configuration.
///
/// Whether the percentages leave room for a price is checked separately
/// when the factors are resolved.
pub fn validate_markup_config(config: &MarkupConfig) -> ValidationResult<()> {
    let fractions = [
        ("fixed_cost_pct", Some(config.fixed_cost_pct)),
        ("tax_pct", Some(config.tax_pct)),
        ("delivery_fee_pct", Some(config.delivery_fee_pct)),
        ("desired_margin_pct", Some(config.desired_margin_pct)),
        ("sales_mix_store_pct", Some(config.sales_mix_store_pct)),
        ("fixed_cost_allocation_pct", Some(config.fixed_cost_allocation_pct)),
        ("marketplace_fee_pct", config.marketplace_fee_pct),
        ("packaging_pct", config.packaging_pct),
        ("other_delivery_costs_pct", config.other_delivery_costs_pct),
    ];
    for (field, value) in fractions {
        if let Some(value) = value {
            validate_fraction(field, value)?;
        }
    }

    validate_money("target_revenue", config.target_revenue())?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
