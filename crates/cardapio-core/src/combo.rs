//! # Combo Pricing
//!
//! A combo bundles products for one price. Its cost is the sum of each
//! product's cost per portion times the quantity in the combo.
//!
//! ```text
//! total_cost = Σ product.cost_per_portion × quantity
//! list_price = Σ product.defined_price × quantity    (no price → 0)
//! margin     = (price - total_cost) / price
//!              price = combo price if > 0, else list_price, else margin 0
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::pricing::margin_for;
use crate::types::{ComboItem, Product};
use crate::validation::validate_combo_quantity;

/// A product and how many of it go into the combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ComboLine {
    pub product_id: String,
    pub quantity: i64,
}

impl From<&ComboItem> for ComboLine {
    fn from(item: &ComboItem) -> Self {
        ComboLine {
            product_id: item.product_id.clone(),
            quantity: item.quantity,
        }
    }
}

/// Cost, list price and margin of a combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ComboTotals {
    pub total_cost: Money,
    /// What the items cost when bought separately.
    pub list_price: Money,
    /// `list_price - combo price` (negative when the combo costs more).
    pub discount: Money,
    pub margin: f64,
    /// Product ids that were not found.
    pub missing_products: Vec<String>,
}

impl ComboTotals {
    /// Computes totals against the products the combo references.
    pub fn compute(lines: &[ComboLine], products: &[Product], combo_price: Money) -> Self {
        let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut total_cost = Money::zero();
        let mut list_price = Money::zero();
        let mut missing_products = Vec::new();

        for line in lines.iter().filter(|line| line.quantity > 0) {
            match by_id.get(line.product_id.as_str()) {
                Some(product) => {
                    total_cost += product.cost_per_portion() * line.quantity;
                    list_price += product.defined_price().unwrap_or_default() * line.quantity;
                }
                None => missing_products.push(line.product_id.clone()),
            }
        }

        let margin = if combo_price.is_positive() {
            margin_for(combo_price, total_cost)
        } else {
            margin_for(list_price, total_cost)
        };

        ComboTotals {
            total_cost,
            list_price,
            discount: list_price - combo_price,
            margin,
            missing_products,
        }
    }
}

/// Checks a combo before it is saved: it needs a name, a positive price
/// and line quantities within [`MAX_COMBO_QUANTITY`](crate::MAX_COMBO_QUANTITY).
pub fn validate_combo(name: &str, total_price: Money, lines: &[ComboLine]) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::required("name"));
    }
    if !total_price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "total_price".to_string(),
        });
    }
    for line in lines {
        validate_combo_quantity(line.quantity)?;
    }
    Ok(())
}
