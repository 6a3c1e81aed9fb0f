//! # Repository Module
//!
//! Database repository implementations for the Cardapio back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  PricingService                                                         │
//! │       │                                                                 │
//! │       │  db.products().save_with_recipe(&product, &lines)               │
//! │       ▼                                                                 │
//! │  ProductRepository                                                      │
//! │  ├── list / get_by_id / delete                                          │
//! │  ├── recipe_lines(product_id)                                           │
//! │  ├── save_with_recipe  ← one transaction                                │
//! │  └── update_derived                                                     │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories move records in and out of storage. They never compute
//! prices; that belongs to `cardapio-core` and is orchestrated by the
//! service.
//!
//! ## Available Repositories
//!
//! - [`IngredientRepository`](ingredient::IngredientRepository) - Ingredients and the delete guard
//! - [`ProductRepository`](product::ProductRepository) - Products, categories and recipe lines
//! - [`PremisesRepository`](premises::PremisesRepository) - Fixed expenses, capacity, markup configuration
//! - [`ComboRepository`](combo::ComboRepository) - Combos and their items

use uuid::Uuid;

pub mod combo;
pub mod ingredient;
pub mod premises;
pub mod product;

/// Generates a new record ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
