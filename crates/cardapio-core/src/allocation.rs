//! # Fixed-Cost Allocation and Markup Resolution
//!
//! Turns the markup premises plus the current fixed-expense total into
//! channel markup factors.
//!
//! ## Resolution Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Σ FixedExpense ──► allocate_fixed_costs(method, allocation_pct)        │
//! │                          │  allocated (R$)                              │
//! │                          ▼                                              │
//! │  target_revenue ──► fixed_cost_pct_on_revenue  = allocated / revenue    │
//! │                          │  delivery_fixed_cost_pct                     │
//! │                          ▼                                              │
//! │  store:    fixed_cost_pct + tax + margin                 ──► factor     │
//! │  delivery: delivery_fixed + tax + marketplace                           │
//! │            + packaging + other + margin                  ──► factor     │
//! │  weighted: store × mix + delivery × (1 - mix)            ──► factor     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any change to target revenue, allocation percentage or the expense total
//! requires resolving again; nothing here caches.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::markup::{delivery_markup, store_markup, weighted_markup, DeliveryMarkupParams, MarkupFactor, SalesMix};
use crate::money::Money;
use crate::pricing::PriceBasis;
use crate::types::{AllocationMethod, MarkupConfig};

/// Share of the monthly fixed expenses charged to the delivery channel.
///
/// `allocation_pct` is a fraction (0.30 = 30%).
///
/// ## Note
/// `RevenueShare` is computed exactly like `FixedPercent`. A revenue-scaled
/// rule (channel revenue / total revenue) has not been specified by the
/// business yet, so both arms stay identical until it is.
pub fn allocate_fixed_costs(total_fixed: Money, method: AllocationMethod, allocation_pct: f64) -> Money {
    match method {
        AllocationMethod::FixedPercent => total_fixed.apply_factor(allocation_pct),
        AllocationMethod::RevenueShare => total_fixed.apply_factor(allocation_pct),
    }
}

/// Allocated fixed cost as a fraction of the channel's target revenue.
///
/// Returns 0 when the revenue is zero or negative.
#[inline]
pub fn fixed_cost_pct_on_revenue(allocated: Money, channel_revenue: Money) -> f64 {
    allocated.ratio_of(channel_revenue)
}

// =============================================================================
// Resolved Markup
// =============================================================================

/// Channel factors resolved from a configuration and an expense total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedMarkup {
    pub allocated_fixed_cost: Money,
    pub delivery_fixed_cost_pct: f64,
    pub store: MarkupFactor,
    pub delivery: MarkupFactor,
    pub weighted: MarkupFactor,
    pub mix: SalesMix,
}

impl ResolvedMarkup {
    /// Factor used to price under the given basis.
    pub fn for_basis(&self, basis: PriceBasis) -> MarkupFactor {
        match basis {
            PriceBasis::Weighted => self.weighted,
            PriceBasis::Store => self.store,
            PriceBasis::Delivery => self.delivery,
        }
    }

    /// Fails with `MarkupBlocked` when either channel is blocked.
    pub fn ensure_priceable(&self) -> CoreResult<()> {
        for (channel, factor) in [("store", self.store), ("delivery", self.delivery)] {
            if let MarkupFactor::Blocked { total_pct } = factor {
                return Err(CoreError::MarkupBlocked {
                    channel: channel.to_string(),
                    total_pct,
                });
            }
        }
        Ok(())
    }
}

/// Percentages charged on a delivery sale under this configuration.
///
/// The marketplace fee falls back to the generic delivery fee when unset.
pub fn delivery_params(config: &MarkupConfig, delivery_fixed_cost_pct: f64) -> DeliveryMarkupParams {
    DeliveryMarkupParams {
        fixed_cost_pct_delivery: delivery_fixed_cost_pct,
        tax_pct: config.tax_pct,
        marketplace_fee_pct: config.marketplace_fee_pct.unwrap_or(config.delivery_fee_pct),
        packaging_pct: config.packaging_pct.unwrap_or(0.0),
        other_costs_pct: config.other_delivery_costs_pct.unwrap_or(0.0),
        profit_margin_pct: config.desired_margin_pct,
    }
}

/// Resolves every channel factor from the configuration inputs.
///
/// Derived fields already stored on `config` are ignored.
pub fn resolve(config: &MarkupConfig, total_fixed: Money) -> ResolvedMarkup {
    let allocated = allocate_fixed_costs(
        total_fixed,
        config.fixed_cost_allocation_method,
        config.fixed_cost_allocation_pct,
    );
    let delivery_fixed_cost_pct = fixed_cost_pct_on_revenue(allocated, config.target_revenue());

    let store = store_markup(config.fixed_cost_pct, config.tax_pct, config.desired_margin_pct);
    let delivery = delivery_markup(&delivery_params(config, delivery_fixed_cost_pct));
    let mix = SalesMix::new(config.sales_mix_store_pct);

    ResolvedMarkup {
        allocated_fixed_cost: allocated,
        delivery_fixed_cost_pct,
        store,
        delivery,
        weighted: weighted_markup(store, delivery, mix.store()),
        mix,
    }
}

impl MarkupConfig {
    /// Resolves the factors and writes the finite ones into the derived fields.
    ///
    /// Blocked factors leave their stored field untouched; use
    /// [`MarkupConfig::recompute`] before persisting.
    pub fn refresh_derived(&mut self, total_fixed: Money) -> ResolvedMarkup {
        let resolved = resolve(self, total_fixed);

        self.sales_mix_store_pct = resolved.mix.store();
        self.sales_mix_delivery_pct = resolved.mix.delivery();
        self.delivery_fixed_cost_pct = resolved.delivery_fixed_cost_pct;
        if let Some(store) = resolved.store.value() {
            self.store_markup = store;
        }
        if let Some(delivery) = resolved.delivery.value() {
            self.delivery_markup = delivery;
        }
        if let Some(weighted) = resolved.weighted.value() {
            self.weighted_markup = weighted;
        }

        resolved
    }

    /// Refreshes the derived fields, failing when a channel is blocked.
    pub fn recompute(&mut self, total_fixed: Money) -> CoreResult<ResolvedMarkup> {
        let resolved = self.refresh_derived(total_fixed);
        resolved.ensure_priceable()?;
        Ok(resolved)
    }

    /// Sets the store share of sales; the delivery share follows.
    pub fn set_store_mix(&mut self, store_pct: f64) {
        let mix = SalesMix::new(store_pct);
        self.sales_mix_store_pct = mix.store();
        self.sales_mix_delivery_pct = mix.delivery();
    }

    /// Sets the delivery share of sales; the store share follows.
    pub fn set_delivery_mix(&mut self, delivery_pct: f64) {
        let mix = SalesMix::from_delivery(delivery_pct);
        self.sales_mix_store_pct = mix.store();
        self.sales_mix_delivery_pct = mix.delivery();
    }
}
