//! # Database and Service Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          ValidationError / MarkupBlocked    │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError ← adds context             CoreError                           │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │               ServiceError ← what PricingService returns                │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │               Notification { code, message } ← shown to the user        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures are never retried here; the message is surfaced and the user
//! may try again.

use cardapio_core::{CoreError, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Storage failures, with the constraint or entity involved.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row with this id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE constraint refused the write.
    ///
    /// ## When This Occurs
    /// - Two recipe lines for the same (product, ingredient)
    /// - Duplicate category name
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A foreign key refused the write or delete.
    ///
    /// ## When This Occurs
    /// - Recipe line pointing at a missing ingredient
    /// - Deleting an ingredient still used by a recipe (RESTRICT)
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A record cannot be deleted while others reference it.
    ///
    /// Raised by the pre-delete reference count, before SQLite would refuse.
    #[error("{entity} {id} is used by {references} recipe line(s)")]
    InUse {
        entity: String,
        id: String,
        references: i64,
    },

    /// The database could not be opened, or the pool was closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other SQLite error.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Driver failure outside SQLite itself.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// `NotFound` for `entity` with `id`.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// `UniqueViolation` naming the field and the rejected value.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Classifies sqlx errors by the SQLite constraint they report.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → UniqueViolation / ForeignKeyViolation / QueryFailed
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>[, <table>.<column>]"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("database is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result alias for repository calls.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Service Error
// =============================================================================

/// Errors returned by [`PricingService`](crate::service::PricingService).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

/// Machine-readable category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    /// Markup percentages leave no room for a price.
    MarkupBlocked,
    /// Record still referenced elsewhere.
    InUse,
    DatabaseError,
    Internal,
}

/// What the user sees when an operation fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Core(CoreError::ProductNotFound(_))
            | ServiceError::Core(CoreError::IngredientNotFound(_))
            | ServiceError::Db(DbError::NotFound { .. }) => ErrorCode::NotFound,
            ServiceError::Core(CoreError::Validation(_))
            | ServiceError::Db(DbError::UniqueViolation { .. })
            | ServiceError::Db(DbError::ForeignKeyViolation { .. }) => ErrorCode::ValidationError,
            ServiceError::Core(CoreError::MarkupBlocked { .. }) => ErrorCode::MarkupBlocked,
            ServiceError::Db(DbError::InUse { .. }) => ErrorCode::InUse,
            ServiceError::Core(CoreError::InvalidEditorState { .. }) => ErrorCode::Internal,
            ServiceError::Db(_) => ErrorCode::DatabaseError,
        }
    }

    /// Notification carrying the raw error message.
    pub fn notification(&self) -> Notification {
        Notification {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_use_message() {
        let err = DbError::InUse {
            entity: "Ingredient".to_string(),
            id: "abc".to_string(),
            references: 2,
        };
        assert_eq!(err.to_string(), "Ingredient abc is used by 2 recipe line(s)");
    }

    #[test]
    fn test_service_error_codes() {
        let blocked: ServiceError = CoreError::MarkupBlocked {
            channel: "delivery".to_string(),
            total_pct: 1.02,
        }
        .into();
        assert_eq!(blocked.code(), ErrorCode::MarkupBlocked);

        let invalid: ServiceError = ValidationError::required("name").into();
        let notification = invalid.notification();
        assert_eq!(notification.code, ErrorCode::ValidationError);
        assert_eq!(notification.message, "Validation error: name is required");

        let missing: ServiceError = DbError::not_found("Product", "p1").into();
        assert_eq!(missing.code(), ErrorCode::NotFound);
        assert_eq!(missing.to_string(), "Product not found: p1");
    }

    #[test]
    fn test_notification_serializes_code() {
        let notification = Notification {
            code: ErrorCode::InUse,
            message: "x".to_string(),
        };
        let json = serde_json::to_string(&notification).unwrap();
        assert_eq!(json, r#"{"code":"IN_USE","message":"x"}"#);
    }
}
