//! # cardapio-db: Storage and Pricing Service for Cardapio
//!
//! Persists the back-office records in SQLite (sqlx, async) and drives the
//! `cardapio-core` formulas over them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cardapio Data Flow                               │
//! │                                                                         │
//! │  Back-office form (product editor, markup settings, expenses)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   cardapio-db (THIS CRATE)                      │    │
//! │  │                                                                 │    │
//! │  │   ┌────────────────────────────────────────────────────────┐    │    │
//! │  │   │  PricingService (service.rs)                           │    │    │
//! │  │   │  save_product · update_ingredient · reprice_all        │    │    │
//! │  │   └────────────────────────────────────────────────────────┘    │    │
//! │  │        │                      │                                 │    │
//! │  │        ▼                      ▼                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐    │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │    │    │
//! │  │   │   (pool.rs)   │    │ ingredient    │    │  (embedded)  │    │    │
//! │  │   │               │◄───│ product       │    │ 001_initial  │    │    │
//! │  │   │ SqlitePool    │    │ premises      │    │ _schema.sql  │    │    │
//! │  │   │               │    │ combo         │    │              │    │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database                             │    │
//! │  │   ./data/cardapio.db (CARDAPIO_DATABASE_PATH)                   │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and service error types
//! - [`repository`] - Repository implementations
//! - [`service`] - Save and repricing flows
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cardapio_db::{AppConfig, Database, PricingService};
//!
//! let config = AppConfig::from_env()?;
//! let db = Database::new(config.db_config()).await?;
//! let service = PricingService::new(db, config.pricing_settings());
//!
//! let report = service.reprice_all().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult, ErrorCode, Notification, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};
pub use service::{NewIngredient, PricingService, RepriceReport};

// Repository re-exports for convenience
pub use repository::combo::ComboRepository;
pub use repository::ingredient::IngredientRepository;
pub use repository::premises::{ExpenseChange, PremisesRepository};
pub use repository::product::ProductRepository;
