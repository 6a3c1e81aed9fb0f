//! # Product Editor
//!
//! State machine for one product being edited. Every mutation recomputes
//! the derived fields explicitly through
//! [`compute_derived_product_fields`]; there is no implicit reactivity.
//!
//! ## States
//! ```text
//! Idle ──mutate──► Editing ──begin_save──► Saving ──complete_save──► Persisted
//!                   ▲  ▲                     │                          │
//!                   │  │                 fail_save                      │
//!                   │  │                     ▼                          │
//!                   │  └──────mutate────── Failed                       │
//!                   └──────────────────────mutate───────────────────────┘
//! ```
//!
//! Validation errors in `begin_save` go straight to Failed without a
//! storage call. Nothing mutates while Saving.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::ResolvedMarkup;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{compute_derived_product_fields, DerivedProductFields, PricingSettings, ProductDraft};
use crate::recipe::{persistable_lines, IngredientCosts, RecipeItem};
use crate::types::{Product, RecipeLine};
use crate::validation::validate_product_draft;

/// Everything the formulas need besides the draft itself.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingContext {
    pub costs: IngredientCosts,
    pub markup: ResolvedMarkup,
    pub settings: PricingSettings,
}

/// Where the editor is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditorState {
    Idle,
    Editing,
    Saving,
    Persisted,
    Failed { error: String },
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EditorState::Idle => "idle",
            EditorState::Editing => "editing",
            EditorState::Saving => "saving",
            EditorState::Persisted => "persisted",
            EditorState::Failed { .. } => "failed",
        };
        f.write_str(name)
    }
}

/// A validated draft handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaveRequest {
    /// `None` for a product not stored yet.
    pub product_id: Option<String>,
    /// Trimmed name, validated yield, and only persistable recipe lines.
    pub draft: ProductDraft,
    pub derived: DerivedProductFields,
}

/// Editing session for one product.
#[derive(Debug, Clone)]
pub struct ProductEditor {
    state: EditorState,
    product_id: Option<String>,
    draft: ProductDraft,
    context: PricingContext,
    derived: DerivedProductFields,
}

impl ProductEditor {
    /// Starts editing a new product.
    pub fn new(context: PricingContext) -> Self {
        Self::with_draft(None, ProductDraft::default(), context)
    }

    /// Starts editing a stored product.
    pub fn load(product: &Product, lines: &[RecipeLine], context: PricingContext) -> Self {
        Self::with_draft(
            Some(product.id.clone()),
            ProductDraft::from_product(product, lines),
            context,
        )
    }

    fn with_draft(product_id: Option<String>, draft: ProductDraft, context: PricingContext) -> Self {
        let derived = compute_derived_product_fields(&draft, &context.costs, &context.markup, context.settings);
        ProductEditor {
            state: EditorState::Idle,
            product_id,
            draft,
            context,
            derived,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn draft(&self) -> &ProductDraft {
        &self.draft
    }

    pub fn derived(&self) -> &DerivedProductFields {
        &self.derived
    }

    pub fn product_id(&self) -> Option<&str> {
        self.product_id.as_deref()
    }

    /// Whether a save is in flight.
    pub fn is_busy(&self) -> bool {
        self.state == EditorState::Saving
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn mutate(&mut self, action: &str, change: impl FnOnce(&mut ProductDraft, &mut PricingContext)) -> CoreResult<()> {
        self.ensure_not_saving(action)?;
        change(&mut self.draft, &mut self.context);
        self.state = EditorState::Editing;
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.derived = compute_derived_product_fields(
            &self.draft,
            &self.context.costs,
            &self.context.markup,
            self.context.settings,
        );
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> CoreResult<()> {
        let name = name.into();
        self.mutate("edit name", |draft, _| draft.name = name)
    }

    pub fn set_category(&mut self, category_id: Option<String>) -> CoreResult<()> {
        self.mutate("edit category", |draft, _| draft.category_id = category_id)
    }

    pub fn set_yield(&mut self, yield_portions: Option<i64>) -> CoreResult<()> {
        self.mutate("edit yield", |draft, _| draft.yield_portions = yield_portions)
    }

    pub fn set_defined_price(&mut self, price: Option<Money>) -> CoreResult<()> {
        self.mutate("edit price", |draft, _| draft.defined_price = price)
    }

    pub fn set_popularity(&mut self, level: Option<i64>) -> CoreResult<()> {
        self.mutate("edit popularity", |draft, _| draft.popularity_level = level)
    }

    /// Appends a recipe row. A repeated ingredient collapses on recompute.
    pub fn add_item(&mut self, ingredient_id: impl Into<String>, quantity: f64) -> CoreResult<()> {
        let item = RecipeItem::new(ingredient_id, quantity);
        self.mutate("add ingredient", |draft, _| draft.items.push(item))
    }

    /// Changes the quantity of the row at `index`. Out-of-range indexes are ignored.
    pub fn set_item_quantity(&mut self, index: usize, quantity: f64) -> CoreResult<()> {
        self.mutate("edit quantity", |draft, _| {
            if let Some(item) = draft.items.get_mut(index) {
                item.quantity = quantity;
            }
        })
    }

    pub fn remove_item(&mut self, index: usize) -> CoreResult<()> {
        self.mutate("remove ingredient", |draft, _| {
            if index < draft.items.len() {
                draft.items.remove(index);
            }
        })
    }

    /// Swaps in new costs or markup (e.g. after the configuration was saved).
    pub fn set_context(&mut self, context: PricingContext) -> CoreResult<()> {
        self.mutate("refresh pricing", |_, current| *current = context)
    }

    // =========================================================================
    // Saving
    // =========================================================================

    /// Validates the draft and moves to Saving.
    ///
    /// On validation failure the editor moves to Failed and no request is
    /// produced.
    pub fn begin_save(&mut self) -> CoreResult<SaveRequest> {
        self.ensure_not_saving("save")?;

        let (name, yield_portions) = match validate_product_draft(&self.draft) {
            Ok(valid) => valid,
            Err(err) => {
                self.state = EditorState::Failed {
                    error: err.to_string(),
                };
                return Err(err.into());
            }
        };

        let draft = ProductDraft {
            name,
            yield_portions: Some(yield_portions),
            items: persistable_lines(&self.draft.items),
            ..self.draft.clone()
        };
        self.state = EditorState::Saving;

        Ok(SaveRequest {
            product_id: self.product_id.clone(),
            derived: self.derived.clone(),
            draft,
        })
    }

    /// Storage accepted the save.
    pub fn complete_save(&mut self, product_id: impl Into<String>) -> CoreResult<()> {
        self.ensure_saving("complete save")?;
        self.product_id = Some(product_id.into());
        self.state = EditorState::Persisted;
        Ok(())
    }

    /// Storage rejected the save; the draft is kept for a retry.
    pub fn fail_save(&mut self, error: impl Into<String>) -> CoreResult<()> {
        self.ensure_saving("fail save")?;
        self.state = EditorState::Failed { error: error.into() };
        Ok(())
    }

    fn ensure_not_saving(&self, action: &str) -> CoreResult<()> {
        if self.is_busy() {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn ensure_saving(&self, action: &str) -> CoreResult<()> {
        if !self.is_busy() {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn invalid(&self, action: &str) -> CoreError {
        CoreError::InvalidEditorState {
            state: self.state.to_string(),
            action: action.to_string(),
        }
    }
}
