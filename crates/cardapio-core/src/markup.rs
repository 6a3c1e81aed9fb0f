//! # Markup Formulas
//!
//! Divisor formulas turning the percentages charged on a sale into a
//! multiplicative factor over cost.
//!
//! ## The Divisor Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   price = cost × markup                                                 │
//! │   markup = 1 / (1 - Σ percentages charged on the price)                 │
//! │                                                                         │
//! │   Σ = 0.49  ──►  1 / 0.51  = 1.9608        Factor(1.9608)               │
//! │   Σ = 0.99  ──►  1 / 0.01  = 100.0         Factor(100.0)                │
//! │   Σ = 1.00  ──►  1 / 0     = ∞             Blocked { total_pct: 1.00 }  │
//! │   Σ = 1.05  ──►  1 / -0.05 = -20 (!!)      Blocked { total_pct: 1.05 }  │
//! │                                                                         │
//! │   Once the percentages reach 100% of the price, no price covers them.   │
//! │   The factor is Blocked and never used as a number downstream.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::{MARKUP_ACCEPTABLE_MIN, MARKUP_HEALTHY_MIN};

// =============================================================================
// Markup Factor
// =============================================================================

/// Result of a markup formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum MarkupFactor {
    /// A usable, finite factor.
    Factor(f64),
    /// The charged percentages sum to 1 or more.
    Blocked { total_pct: f64 },
}

impl MarkupFactor {
    /// Builds a factor from the sum of charged percentages.
    ///
    /// ## Example
    /// ```rust
    /// use cardapio_core::markup::MarkupFactor;
    ///
    /// assert_eq!(MarkupFactor::from_total_pct(0.5), MarkupFactor::Factor(2.0));
    /// assert!(MarkupFactor::from_total_pct(1.0).is_blocked());
    /// ```
    pub fn from_total_pct(total_pct: f64) -> Self {
        if !total_pct.is_finite() || total_pct >= 1.0 {
            return MarkupFactor::Blocked { total_pct };
        }
        MarkupFactor::Factor(1.0 / (1.0 - total_pct))
    }

    /// Returns the factor, or `None` when blocked.
    #[inline]
    pub fn value(&self) -> Option<f64> {
        match self {
            MarkupFactor::Factor(value) => Some(*value),
            MarkupFactor::Blocked { .. } => None,
        }
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        matches!(self, MarkupFactor::Blocked { .. })
    }

    /// Applies the factor to a cost. Blocked factors price nothing.
    pub fn apply(&self, cost: Money) -> Option<Money> {
        self.value().map(|factor| cost.apply_factor(factor))
    }

    /// Classifies the factor into a pricing scenario.
    #[inline]
    pub fn scenario(&self) -> MarkupScenario {
        MarkupScenario::classify_factor(*self)
    }
}

// =============================================================================
// Formulas
// =============================================================================

/// Store (dine-in / counter) markup.
///
/// `1 / (1 - (fixed_cost_pct + tax_pct + profit_margin_pct))`
///
/// ## Example
/// ```rust
/// use cardapio_core::markup::store_markup;
///
/// let factor = store_markup(0.30, 0.09, 0.10).value().unwrap();
/// assert!((factor - 1.0 / 0.51).abs() < 1e-12);
/// ```
pub fn store_markup(fixed_cost_pct: f64, tax_pct: f64, profit_margin_pct: f64) -> MarkupFactor {
    MarkupFactor::from_total_pct(fixed_cost_pct + tax_pct + profit_margin_pct)
}

/// Percentages charged on a delivery sale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryMarkupParams {
    /// Fixed costs allocated to delivery, over delivery revenue.
    pub fixed_cost_pct_delivery: f64,
    pub tax_pct: f64,
    /// Marketplace commission (iFood and the like).
    pub marketplace_fee_pct: f64,
    pub packaging_pct: f64,
    pub other_costs_pct: f64,
    pub profit_margin_pct: f64,
}

impl DeliveryMarkupParams {
    /// Sum of all six components.
    pub fn total_pct(&self) -> f64 {
        self.fixed_cost_pct_delivery
            + self.tax_pct
            + self.marketplace_fee_pct
            + self.packaging_pct
            + self.other_costs_pct
            + self.profit_margin_pct
    }
}

/// Delivery markup: `1 / (1 - Σ params)`.
pub fn delivery_markup(params: &DeliveryMarkupParams) -> MarkupFactor {
    MarkupFactor::from_total_pct(params.total_pct())
}

/// Blends the channel factors by the share of sales made in the store.
///
/// `store × store_mix + delivery × (1 - store_mix)`. Blocked when either
/// channel is blocked.
///
/// ## Example
/// ```rust
/// use cardapio_core::markup::{weighted_markup, MarkupFactor};
///
/// let blended = weighted_markup(MarkupFactor::Factor(2.0), MarkupFactor::Factor(2.5), 0.7);
/// assert!((blended.value().unwrap() - 2.15).abs() < 1e-12);
/// ```
pub fn weighted_markup(store: MarkupFactor, delivery: MarkupFactor, store_mix: f64) -> MarkupFactor {
    match (store, delivery) {
        (MarkupFactor::Factor(s), MarkupFactor::Factor(d)) => {
            let mix = SalesMix::new(store_mix);
            MarkupFactor::Factor(s * mix.store() + d * mix.delivery())
        }
        (MarkupFactor::Blocked { total_pct }, _) | (_, MarkupFactor::Blocked { total_pct }) => {
            MarkupFactor::Blocked { total_pct }
        }
    }
}

// =============================================================================
// Sales Mix
// =============================================================================

/// Split of sales between store and delivery.
///
/// Only the store share is stored; the delivery share is always its
/// complement, so the two can never drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesMix {
    store: f64,
}

impl SalesMix {
    /// Creates a mix from the store share, clamped to [0, 1].
    pub fn new(store: f64) -> Self {
        let store = if store.is_finite() { store.clamp(0.0, 1.0) } else { 1.0 };
        SalesMix { store }
    }

    /// Creates a mix from the delivery share.
    pub fn from_delivery(delivery: f64) -> Self {
        let delivery = if delivery.is_finite() { delivery.clamp(0.0, 1.0) } else { 0.0 };
        SalesMix::new(1.0 - delivery)
    }

    #[inline]
    pub fn store(&self) -> f64 {
        self.store
    }

    #[inline]
    pub fn delivery(&self) -> f64 {
        1.0 - self.store
    }
}

impl Default for SalesMix {
    fn default() -> Self {
        SalesMix::new(0.7)
    }
}

// =============================================================================
// Scenario Classification
// =============================================================================

/// How healthy a markup factor is. Reporting only, never used to price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MarkupScenario {
    /// Below 1.8: loss risk.
    Insufficient,
    /// 1.8 up to (not including) 2.7.
    Acceptable,
    /// 2.7 and above.
    Healthy,
}

impl MarkupScenario {
    /// Classifies a raw factor. Bounds are inclusive on the lower side.
    pub fn classify(factor: f64) -> Self {
        if factor >= MARKUP_HEALTHY_MIN {
            MarkupScenario::Healthy
        } else if factor >= MARKUP_ACCEPTABLE_MIN {
            MarkupScenario::Acceptable
        } else {
            MarkupScenario::Insufficient
        }
    }

    /// Classifies a formula result; a blocked factor is insufficient.
    pub fn classify_factor(factor: MarkupFactor) -> Self {
        match factor {
            MarkupFactor::Factor(value) => MarkupScenario::classify(value),
            MarkupFactor::Blocked { .. } => MarkupScenario::Insufficient,
        }
    }

    /// Short label shown next to the factor.
    pub fn label(&self) -> &'static str {
        match self {
            MarkupScenario::Insufficient => "Insuficiente - risco de prejuízo",
            MarkupScenario::Acceptable => "Aceitável",
            MarkupScenario::Healthy => "Saudável",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_store_markup_reference_values() {
        let factor = store_markup(0.3, 0.09, 0.1).value().unwrap();
        assert!((factor - 1.0 / (1.0 - 0.49)).abs() < EPS);
        assert!((factor - 1.9608).abs() < 1e-4);
    }

    #[test]
    fn test_store_markup_blocked_at_and_above_one() {
        let over = store_markup(0.5, 0.3, 0.25);
        assert_eq!(over.value(), None);
        match over {
            MarkupFactor::Blocked { total_pct } => assert!((total_pct - 1.05).abs() < EPS),
            other => panic!("expected blocked, got {:?}", other),
        }

        assert!(store_markup(0.5, 0.25, 0.25).is_blocked());
        assert!(store_markup(f64::NAN, 0.1, 0.1).is_blocked());
    }

    #[test]
    fn test_blocked_never_yields_a_number() {
        for total in [1.0, 1.01, 1.5, 10.0, f64::INFINITY] {
            let factor = MarkupFactor::from_total_pct(total);
            assert!(factor.is_blocked());
            assert_eq!(factor.apply(Money::from_cents(1000)), None);
        }
    }

    #[test]
    fn test_delivery_markup_sums_all_components() {
        let params = DeliveryMarkupParams {
            fixed_cost_pct_delivery: 0.09,
            tax_pct: 0.09,
            marketplace_fee_pct: 0.15,
            packaging_pct: 0.03,
            other_costs_pct: 0.04,
            profit_margin_pct: 0.10,
        };
        assert!((params.total_pct() - 0.5).abs() < EPS);
        assert!((delivery_markup(&params).value().unwrap() - 2.0).abs() < EPS);

        let blocked = DeliveryMarkupParams {
            marketplace_fee_pct: 0.70,
            ..params
        };
        assert!((blocked.total_pct() - 1.05).abs() < EPS);
        assert!(delivery_markup(&blocked).is_blocked());

        let just_below = DeliveryMarkupParams {
            marketplace_fee_pct: 0.6,
            ..params
        };
        assert!((delivery_markup(&just_below).value().unwrap() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_delivery_markup_blocked_at_exactly_one() {
        // Binary fractions so the sum is exactly 1.0
        let whole = DeliveryMarkupParams {
            fixed_cost_pct_delivery: 0.25,
            tax_pct: 0.25,
            marketplace_fee_pct: 0.25,
            packaging_pct: 0.125,
            other_costs_pct: 0.0625,
            profit_margin_pct: 0.0625,
        };
        assert_eq!(whole.total_pct(), 1.0);
        assert_eq!(delivery_markup(&whole), MarkupFactor::Blocked { total_pct: 1.0 });

        let under = DeliveryMarkupParams {
            profit_margin_pct: 0.0,
            ..whole
        };
        assert!((delivery_markup(&under).value().unwrap() - 16.0).abs() < EPS);
    }

    #[test]
    fn test_weighted_markup_linearity() {
        let blended = weighted_markup(MarkupFactor::Factor(2.0), MarkupFactor::Factor(2.5), 0.7);
        assert!((blended.value().unwrap() - 2.15).abs() < EPS);

        for mix in [0.0, 0.1, 0.33, 0.5, 0.7, 1.0] {
            let same = weighted_markup(MarkupFactor::Factor(2.2), MarkupFactor::Factor(2.2), mix);
            assert!((same.value().unwrap() - 2.2).abs() < EPS);
        }
    }

    #[test]
    fn test_weighted_markup_blocked_propagates() {
        let blocked = MarkupFactor::Blocked { total_pct: 1.2 };
        assert!(weighted_markup(blocked, MarkupFactor::Factor(2.0), 0.7).is_blocked());
        assert!(weighted_markup(MarkupFactor::Factor(2.0), blocked, 0.7).is_blocked());
    }

    #[test]
    fn test_sales_mix_complement() {
        let mix = SalesMix::new(0.7);
        assert!((mix.store() + mix.delivery() - 1.0).abs() < EPS);
        assert!((SalesMix::from_delivery(0.25).store() - 0.75).abs() < EPS);
        assert_eq!(SalesMix::new(1.4).store(), 1.0);
        assert_eq!(SalesMix::new(-0.2).delivery(), 1.0);
    }

    #[test]
    fn test_scenario_boundaries() {
        assert_eq!(MarkupScenario::classify(1.8), MarkupScenario::Acceptable);
        assert_eq!(MarkupScenario::classify(2.7), MarkupScenario::Healthy);
        assert_eq!(MarkupScenario::classify(1.79999), MarkupScenario::Insufficient);
        assert_eq!(MarkupScenario::classify(2.69999), MarkupScenario::Acceptable);
        assert_eq!(
            MarkupScenario::classify_factor(MarkupFactor::Blocked { total_pct: 1.0 }),
            MarkupScenario::Insufficient
        );
    }

    #[test]
    fn test_factor_serialization() {
        let json = serde_json::to_string(&MarkupFactor::Factor(2.0)).unwrap();
        assert_eq!(json, r#"{"status":"factor","value":2.0}"#);
        let json = serde_json::to_string(&MarkupFactor::Blocked { total_pct: 1.5 }).unwrap();
        assert_eq!(json, r#"{"status":"blocked","value":{"total_pct":1.5}}"#);
    }
}
