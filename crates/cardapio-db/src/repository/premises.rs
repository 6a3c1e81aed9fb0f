//! # Premises Repository
//!
//! Database operations for the inputs of the markup resolver: fixed
//! expenses, the productive capacity singleton and the markup
//! configuration singleton.
//!
//! Singletons are stored under [`SINGLETON_ID`]. Reading a singleton that
//! was never saved returns its default instead of an error.
//!
//! ## Expense Changes
//! ```text
//! BEGIN
//!   INSERT / UPDATE / DELETE fixed_expenses   (0 rows → NotFound, rollback)
//!   UPSERT markup_config                      (factors for the new total)
//! COMMIT
//! ```
//! The stored factors always match the expense total they were derived from.

use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use cardapio_core::{FixedExpense, MarkupConfig, ProductiveCapacity, SINGLETON_ID};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A write to the fixed expenses table.
#[derive(Debug, Clone, Copy)]
pub enum ExpenseChange<'a> {
    Insert(&'a FixedExpense),
    Update(&'a FixedExpense),
    Delete(&'a str),
}

impl ExpenseChange<'_> {
    fn expense_id(&self) -> &str {
        match self {
            ExpenseChange::Insert(expense) | ExpenseChange::Update(expense) => &expense.id,
            ExpenseChange::Delete(id) => *id,
        }
    }

    fn query(&self) -> SqliteQuery<'_> {
        match self {
            ExpenseChange::Insert(expense) => insert_expense_query(expense),
            ExpenseChange::Update(expense) => update_expense_query(expense),
            ExpenseChange::Delete(id) => sqlx::query("DELETE FROM fixed_expenses WHERE id = ?1").bind(*id),
        }
    }
}

/// Repository for expenses, capacity and markup configuration.
#[derive(Debug, Clone)]
pub struct PremisesRepository {
    pool: SqlitePool,
}

impl PremisesRepository {
    /// Creates a new PremisesRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PremisesRepository { pool }
    }

    // =========================================================================
    // Fixed Expenses
    // =========================================================================

    /// Lists fixed expenses grouped by category, then by name.
    pub async fn list_expenses(&self) -> DbResult<Vec<FixedExpense>> {
        let expenses = sqlx::query_as::<_, FixedExpense>(
            r#"
            SELECT id, name, category, monthly_value_cents, created_at
            FROM fixed_expenses
            ORDER BY category, name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Applies an expense change and stores the markup configuration derived
    /// from the resulting total, in one transaction.
    ///
    /// Updating or deleting a missing expense fails with `NotFound` and
    /// leaves both tables untouched.
    pub async fn apply_expense_change(&self, change: ExpenseChange<'_>, config: &MarkupConfig) -> DbResult<()> {
        debug!(
            change = ?change,
            store_markup = config.store_markup,
            delivery_markup = config.delivery_markup,
            "Applying fixed expense change"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let result = change.query().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("FixedExpense", change.expense_id()));
        }

        upsert_markup_query(config).execute(&mut *tx).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    // =========================================================================
    // Productive Capacity
    // =========================================================================

    /// Returns the stored capacity, or the form defaults when never saved.
    pub async fn capacity(&self) -> DbResult<ProductiveCapacity> {
        let capacity = sqlx::query_as::<_, ProductiveCapacity>(
            r#"
            SELECT id, employees, hours_per_day, days_per_month, productivity_factor, updated_at
            FROM productive_capacity
            WHERE id = ?1
            "#,
        )
        .bind(SINGLETON_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(capacity.unwrap_or_default())
    }

    /// Inserts or replaces the capacity singleton.
    pub async fn save_capacity(&self, capacity: &ProductiveCapacity) -> DbResult<()> {
        debug!(employees = capacity.employees, "Saving productive capacity");

        sqlx::query(
            r#"
            INSERT INTO productive_capacity (
                id, employees, hours_per_day, days_per_month, productivity_factor, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                employees = excluded.employees,
                hours_per_day = excluded.hours_per_day,
                days_per_month = excluded.days_per_month,
                productivity_factor = excluded.productivity_factor,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(SINGLETON_ID)
        .bind(capacity.employees)
        .bind(capacity.hours_per_day)
        .bind(capacity.days_per_month)
        .bind(capacity.productivity_factor)
        .bind(capacity.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Markup Configuration
    // =========================================================================

    /// Returns the stored markup configuration, or the business defaults
    /// when never saved.
    pub async fn markup_config(&self) -> DbResult<MarkupConfig> {
        let config = sqlx::query_as::<_, MarkupConfig>(
            r#"
            SELECT
                id, fixed_cost_pct, tax_pct, delivery_fee_pct, desired_margin_pct,
                target_revenue_cents, store_markup, delivery_markup, weighted_markup,
                sales_mix_store_pct, sales_mix_delivery_pct,
                marketplace_fee_pct, packaging_pct, other_delivery_costs_pct,
                fixed_cost_allocation_method, fixed_cost_allocation_pct,
                delivery_fixed_cost_pct, updated_at
            FROM markup_config
            WHERE id = ?1
            "#,
        )
        .bind(SINGLETON_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(config.unwrap_or_default())
    }

    /// Inserts or replaces the markup configuration singleton.
    ///
    /// The caller is responsible for refreshing the derived factors first.
    pub async fn save_markup_config(&self, config: &MarkupConfig) -> DbResult<()> {
        debug!(
            store_markup = config.store_markup,
            delivery_markup = config.delivery_markup,
            weighted_markup = config.weighted_markup,
            "Saving markup configuration"
        );

        upsert_markup_query(config).execute(&self.pool).await?;

        Ok(())
    }
}


// =============================================================================
// Statements
// =============================================================================

fn insert_expense_query(expense: &FixedExpense) -> SqliteQuery<'_> {
    sqlx::query(
        r#"
        INSERT INTO fixed_expenses (id, name, category, monthly_value_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&expense.id)
    .bind(&expense.name)
    .bind(expense.category)
    .bind(expense.monthly_value_cents)
    .bind(expense.created_at)
}

fn update_expense_query(expense: &FixedExpense) -> SqliteQuery<'_> {
    sqlx::query(
        r#"
        UPDATE fixed_expenses SET
            name = ?2,
            category = ?3,
            monthly_value_cents = ?4
        WHERE id = ?1
        "#,
    )
    .bind(&expense.id)
    .bind(&expense.name)
    .bind(expense.category)
    .bind(expense.monthly_value_cents)
}

fn upsert_markup_query(config: &MarkupConfig) -> SqliteQuery<'static> {
    sqlx::query(
        r#"
        INSERT INTO markup_config (
            id, fixed_cost_pct, tax_pct, delivery_fee_pct, desired_margin_pct,
            target_revenue_cents, store_markup, delivery_markup, weighted_markup,
            sales_mix_store_pct, sales_mix_delivery_pct,
            marketplace_fee_pct, packaging_pct, other_delivery_costs_pct,
            fixed_cost_allocation_method, fixed_cost_allocation_pct,
            delivery_fixed_cost_pct, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        ON CONFLICT(id) DO UPDATE SET
            fixed_cost_pct = excluded.fixed_cost_pct,
            tax_pct = excluded.tax_pct,
            delivery_fee_pct = excluded.delivery_fee_pct,
            desired_margin_pct = excluded.desired_margin_pct,
            target_revenue_cents = excluded.target_revenue_cents,
            store_markup = excluded.store_markup,
            delivery_markup = excluded.delivery_markup,
            weighted_markup = excluded.weighted_markup,
            sales_mix_store_pct = excluded.sales_mix_store_pct,
            sales_mix_delivery_pct = excluded.sales_mix_delivery_pct,
            marketplace_fee_pct = excluded.marketplace_fee_pct,
            packaging_pct = excluded.packaging_pct,
            other_delivery_costs_pct = excluded.other_delivery_costs_pct,
            fixed_cost_allocation_method = excluded.fixed_cost_allocation_method,
            fixed_cost_allocation_pct = excluded.fixed_cost_allocation_pct,
            delivery_fixed_cost_pct = excluded.delivery_fixed_cost_pct,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(SINGLETON_ID)
    .bind(config.fixed_cost_pct)
    .bind(config.tax_pct)
    .bind(config.delivery_fee_pct)
    .bind(config.desired_margin_pct)
    .bind(config.target_revenue_cents)
    .bind(config.store_markup)
    .bind(config.delivery_markup)
    .bind(config.weighted_markup)
    .bind(config.sales_mix_store_pct)
    .bind(config.sales_mix_delivery_pct)
    .bind(config.marketplace_fee_pct)
    .bind(config.packaging_pct)
    .bind(config.other_delivery_costs_pct)
    .bind(config.fixed_cost_allocation_method)
    .bind(config.fixed_cost_allocation_pct)
    .bind(config.delivery_fixed_cost_pct)
    .bind(config.updated_at)
}
