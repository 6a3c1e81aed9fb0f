//! # Ingredient Repository
//!
//! Database operations for ingredients.
//!
//! ## Delete Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Deleting an Ingredient                               │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    SELECT COUNT(*) FROM recipe_lines WHERE ingredient_id = ?            │
//! │       │                                                                 │
//! │       ├── > 0 ──► ROLLBACK, DbError::InUse { references }               │
//! │       │                                                                 │
//! │       └── = 0 ──► DELETE FROM ingredients WHERE id = ?                  │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The ON DELETE RESTRICT foreign key backs the count up if a line       │
//! │  slips in from another connection.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use cardapio_core::Ingredient;

/// Repository for ingredient database operations.
#[derive(Debug, Clone)]
pub struct IngredientRepository {
    pool: SqlitePool,
}

impl IngredientRepository {
    /// Creates a new IngredientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        IngredientRepository { pool }
    }

    /// Lists every ingredient sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, unit, unit_cost_cents, kind, supplier, created_at, updated_at
            FROM ingredients
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = ingredients.len(), "Listed ingredients");
        Ok(ingredients)
    }

    /// Gets an ingredient by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Ingredient))` - Ingredient found
    /// * `Ok(None)` - Ingredient not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, unit, unit_cost_cents, kind, supplier, created_at, updated_at
            FROM ingredients
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ingredient)
    }

    /// Inserts a new ingredient (id generated beforehand).
    pub async fn insert(&self, ingredient: &Ingredient) -> DbResult<Ingredient> {
        debug!(name = %ingredient.name, "Inserting ingredient");

        sqlx::query(
            r#"
            INSERT INTO ingredients (
                id, name, unit, unit_cost_cents, kind, supplier, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(ingredient.unit)
        .bind(ingredient.unit_cost_cents)
        .bind(ingredient.kind)
        .bind(&ingredient.supplier)
        .bind(ingredient.created_at)
        .bind(ingredient.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(ingredient.clone())
    }

    /// Updates an existing ingredient.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Ingredient doesn't exist
    pub async fn update(&self, ingredient: &Ingredient) -> DbResult<()> {
        debug!(id = %ingredient.id, unit_cost_cents = ingredient.unit_cost_cents, "Updating ingredient");

        let result = sqlx::query(
            r#"
            UPDATE ingredients SET
                name = ?2,
                unit = ?3,
                unit_cost_cents = ?4,
                kind = ?5,
                supplier = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&ingredient.id)
        .bind(&ingredient.name)
        .bind(ingredient.unit)
        .bind(ingredient.unit_cost_cents)
        .bind(ingredient.kind)
        .bind(&ingredient.supplier)
        .bind(ingredient.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", &ingredient.id));
        }

        Ok(())
    }

    /// Counts the recipe lines referencing an ingredient.
    pub async fn count_references(&self, id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_lines WHERE ingredient_id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Deletes an ingredient no recipe uses.
    ///
    /// ## Returns
    /// * `Ok(())` - Ingredient deleted
    /// * `Err(DbError::InUse)` - At least one recipe line references it
    /// * `Err(DbError::NotFound)` - Ingredient doesn't exist
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting ingredient");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let references: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipe_lines WHERE ingredient_id = ?1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if references > 0 {
            warn!(id = %id, references, "Ingredient still in use, delete refused");
            return Err(DbError::InUse {
                entity: "Ingredient".to_string(),
                id: id.to_string(),
                references,
            });
        }

        let result = sqlx::query("DELETE FROM ingredients WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Ingredient", id));
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Counts ingredients (for menu stats).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::generate_id;
    use cardapio_core::{IngredientKind, IngredientUnit};
    use chrono::Utc;

    fn ingredient(name: &str, unit: IngredientUnit, unit_cost_cents: i64) -> Ingredient {
        let now = Utc::now();
        Ingredient {
            id: generate_id(),
            name: name.to_string(),
            unit,
            unit_cost_cents,
            kind: IngredientKind::Raw,
            supplier: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ingredients();

        let mut milk = ingredient("Leite", IngredientUnit::L, 529);
        milk.supplier = Some("Laticínios Boa Vista".to_string());
        repo.insert(&milk).await.unwrap();

        let stored = repo.get_by_id(&milk.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Leite");
        assert_eq!(stored.unit, IngredientUnit::L);
        assert_eq!(stored.unit_cost_cents, 529);
        assert_eq!(stored.supplier.as_deref(), Some("Laticínios Boa Vista"));

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ingredients();

        for name in ["queijo", "Alface", "pão"] {
            repo.insert(&ingredient(name, IngredientUnit::Un, 100)).await.unwrap();
        }

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["Alface", "pão", "queijo"]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .ingredients()
            .update(&ingredient("Sal", IngredientUnit::Kg, 300))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_unused_ingredient() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.ingredients();
        let salt = ingredient("Sal", IngredientUnit::Kg, 300);
        repo.insert(&salt).await.unwrap();

        assert_eq!(repo.count_references(&salt.id).await.unwrap(), 0);
        repo.delete(&salt.id).await.unwrap();
        assert!(repo.get_by_id(&salt.id).await.unwrap().is_none());

        let err = repo.delete(&salt.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
