//! # Error Types
//!
//! Domain-specific error types for cardapio-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cardapio-core errors (this file)                                       │
//! │  ├── CoreError        - Pricing rule violations                         │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  cardapio-db errors (separate crate)                                    │
//! │  ├── DbError          - Database operation failures                     │
//! │  └── ServiceError     - CoreError | DbError, what callers see           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → notification        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages carry the ids, channel and totals involved so they can be shown
//! to the user as they are.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Pricing and editing failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Ingredient cannot be found.
    #[error("Ingredient not found: {0}")]
    IngredientNotFound(String),

    /// The percentages charged to a channel consume the whole sale price.
    ///
    /// ## When This Occurs
    /// ```text
    /// fixed 50% + tax 30% + margin 25% = 105%
    ///      │
    ///      ▼
    /// 1 / (1 - 1.05) would be negative
    ///      │
    ///      ▼
    /// MarkupBlocked { channel: "store", total_pct: 1.05 }
    /// ```
    #[error("Markup for {channel} is blocked: charged percentages sum to {total_pct:.4} (must stay below 1)")]
    MarkupBlocked { channel: String, total_pct: f64 },

    /// The product editor was asked to do something its current state forbids.
    ///
    /// ## When This Occurs
    /// - Saving twice without waiting for the first save to finish
    /// - Reporting a save result while not saving
    #[error("Editor is {state}, cannot {action}")]
    InvalidEditorState { state: String, action: String },

    /// Bad input; nothing was computed or stored.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Form input rejected before saving.
///
/// These errors block a save locally: no storage call is issued and no
/// record is touched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value is not a finite number.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Invalid format (e.g., an unknown price basis).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result alias for the core crate.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::MarkupBlocked {
            channel: "store".to_string(),
            total_pct: 1.05,
        };
        assert_eq!(
            err.to_string(),
            "Markup for store is blocked: charged percentages sum to 1.0500 (must stay below 1)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("name").to_string(), "name is required");

        let err = ValidationError::OutOfRange {
            field: "tax_pct".to_string(),
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(err.to_string(), "tax_pct must be between 0 and 1");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("yield_portions").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
