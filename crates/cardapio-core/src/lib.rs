//! # cardapio-core: Pure Pricing Logic for Cardapio
//!
//! This crate is the calculation heart of the back office. Ingredient costs
//! flow through recipes (fichas técnicas) into a cost per portion, markup
//! premises turn that cost into suggested prices, and margins are reconciled
//! against any price the owner typed in.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cost Cascade                                     │
//! │                                                                         │
//! │  Ingredient.unit_cost ──┐                                               │
//! │                         ▼                                               │
//! │  RecipeLine.quantity ──► recipe::aggregate_recipe_cost                  │
//! │                         │   total_cost, cost_per_portion (÷ yield)      │
//! │                         ▼                                               │
//! │  FixedExpense total ──► allocation::resolve ──► markup factors          │
//! │  MarkupConfig %     ──┘   store / delivery / weighted                   │
//! │                         │                                               │
//! │                         ▼                                               │
//! │  pricing::compute_derived_product_fields                                │
//! │      suggested_price = cost_per_portion × markup                        │
//! │      margin = (price - cost) / price   (defined price wins)             │
//! │                                                                         │
//! │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in centavos, BRL and percent formatting
//! - [`types`] - Domain records (Ingredient, Product, MarkupConfig, ...)
//! - [`markup`] - Markup divisor formulas and scenario classification
//! - [`allocation`] - Fixed-cost allocation and markup resolution
//! - [`recipe`] - Recipe cost aggregation
//! - [`pricing`] - Suggested price and margin reconciliation
//! - [`capacity`] - Productive hours and cost per hour
//! - [`expenses`] - Fixed expense totals and breakdown
//! - [`combo`] - Combo cost and margin
//! - [`engineering`] - Menu-engineering matrix
//! - [`editor`] - Product editing state machine
//! - [`validation`] - Input validation
//! - [`monitor`] - Injected performance monitor
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use cardapio_core::markup::store_markup;
//!
//! // 30% fixed costs, 9% taxes, 10% profit
//! let factor = store_markup(0.30, 0.09, 0.10);
//! let value = factor.value().unwrap();
//! assert!((value - 1.9608).abs() < 1e-4);
//!
//! // Percentages that eat the whole price are blocked, never negative
//! assert!(store_markup(0.5, 0.3, 0.25).is_blocked());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod capacity;
pub mod combo;
pub mod editor;
pub mod engineering;
pub mod error;
pub mod expenses;
pub mod markup;
pub mod money;
pub mod monitor;
pub mod pricing;
pub mod recipe;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use markup::{MarkupFactor, MarkupScenario};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Markup factors below this value put the business at risk of loss.
pub const MARKUP_ACCEPTABLE_MIN: f64 = 1.8;

/// Markup factors at or above this value are considered healthy.
pub const MARKUP_HEALTHY_MIN: f64 = 2.7;

/// Margin threshold separating high-margin items in the menu-engineering matrix.
pub const ENGINEERING_MARGIN_THRESHOLD: f64 = 0.5;

/// Popularity level (0-10 scale) separating popular items in the matrix.
pub const ENGINEERING_POPULARITY_THRESHOLD: i64 = 7;

/// Maximum popularity level accepted on a product.
pub const MAX_POPULARITY_LEVEL: i64 = 10;

/// Largest quantity of one ingredient a recipe line may use (in the
/// ingredient's unit).
pub const MAX_RECIPE_QUANTITY: f64 = 100_000.0;

/// Largest number of units of one product a combo line may hold.
pub const MAX_COMBO_QUANTITY: i64 = 999;

/// Margins at or above this fall in the high band of the dashboard chart.
pub const MARGIN_BAND_HIGH_MIN: f64 = 0.5;

/// Margins at or above this (and below the high band) are medium.
pub const MARGIN_BAND_MEDIUM_MIN: f64 = 0.3;

/// Popularity levels at or above this fall in the high band.
pub const POPULARITY_BAND_HIGH_MIN: i64 = 8;

/// Popularity levels at or above this (and below the high band) are medium.
pub const POPULARITY_BAND_MEDIUM_MIN: i64 = 5;
