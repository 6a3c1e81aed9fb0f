//! # Combo Repository
//!
//! Database operations for combos and their items.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use cardapio_core::combo::ComboLine;
use cardapio_core::{Combo, ComboItem};

/// Repository for combo database operations.
#[derive(Debug, Clone)]
pub struct ComboRepository {
    pool: SqlitePool,
}

impl ComboRepository {
    /// Creates a new ComboRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ComboRepository { pool }
    }

    /// Lists every combo sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Combo>> {
        let combos = sqlx::query_as::<_, Combo>(
            r#"
            SELECT id, name, total_price_cents, total_cost_cents, combo_margin, created_at, updated_at
            FROM combos
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(combos)
    }

    /// Gets a combo by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Combo>> {
        let combo = sqlx::query_as::<_, Combo>(
            r#"
            SELECT id, name, total_price_cents, total_cost_cents, combo_margin, created_at, updated_at
            FROM combos
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(combo)
    }

    /// Lists the items of a combo.
    pub async fn items(&self, combo_id: &str) -> DbResult<Vec<ComboItem>> {
        let items = sqlx::query_as::<_, ComboItem>(
            "SELECT id, combo_id, product_id, quantity FROM combo_items WHERE combo_id = ?1 ORDER BY rowid",
        )
        .bind(combo_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists the combos containing a product.
    pub async fn list_containing_product(&self, product_id: &str) -> DbResult<Vec<Combo>> {
        let combos = sqlx::query_as::<_, Combo>(
            r#"
            SELECT id, name, total_price_cents, total_cost_cents, combo_margin, created_at, updated_at
            FROM combos
            WHERE id IN (SELECT combo_id FROM combo_items WHERE product_id = ?1)
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(combos)
    }

    /// Stores a combo and replaces its items atomically.
    pub async fn save_with_items(&self, combo: &Combo, lines: &[ComboLine]) -> DbResult<Vec<ComboItem>> {
        debug!(id = %combo.id, items = lines.len(), "Saving combo");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO combos (
                id, name, total_price_cents, total_cost_cents, combo_margin, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                total_price_cents = excluded.total_price_cents,
                total_cost_cents = excluded.total_cost_cents,
                combo_margin = excluded.combo_margin,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&combo.id)
        .bind(&combo.name)
        .bind(combo.total_price_cents)
        .bind(combo.total_cost_cents)
        .bind(combo.combo_margin)
        .bind(combo.created_at)
        .bind(combo.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM combo_items WHERE combo_id = ?1")
            .bind(&combo.id)
            .execute(&mut *tx)
            .await?;

        let mut stored = Vec::with_capacity(lines.len());
        for line in lines {
            let item = ComboItem {
                id: generate_id(),
                combo_id: combo.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            };

            sqlx::query("INSERT INTO combo_items (id, combo_id, product_id, quantity) VALUES (?1, ?2, ?3, ?4)")
                .bind(&item.id)
                .bind(&item.combo_id)
                .bind(&item.product_id)
                .bind(item.quantity)
                .execute(&mut *tx)
                .await?;

            stored.push(item);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(stored)
    }

    /// Writes a combo's derived cost and margin.
    pub async fn update_totals(&self, id: &str, total_cost_cents: i64, combo_margin: f64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE combos SET total_cost_cents = ?2, combo_margin = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(total_cost_cents)
        .bind(combo_margin)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Combo", id));
        }

        Ok(())
    }

    /// Deletes a combo and its items.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting combo");

        let result = sqlx::query("DELETE FROM combos WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Combo", id));
        }

        Ok(())
    }

    /// Counts combos (for menu stats).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM combos")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cardapio_core::Product;

    async fn seed_product(db: &Database, name: &str) -> Product {
        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            name: name.to_string(),
            category_id: None,
            yield_portions: 1,
            defined_price_cents: Some(1500),
            suggested_price_cents: None,
            total_recipe_cost_cents: Some(500),
            cost_per_portion_cents: Some(500),
            margin: None,
            popularity_level: None,
            created_at: now,
            updated_at: now,
        };
        db.products().save_with_recipe(&product, &[]).await.unwrap();
        product
    }

    fn combo(name: &str, price_cents: i64) -> Combo {
        let now = Utc::now();
        Combo {
            id: generate_id(),
            name: name.to_string(),
            total_price_cents: price_cents,
            total_cost_cents: None,
            combo_margin: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_and_replace_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let burger = seed_product(&db, "X-Burger").await;
        let soda = seed_product(&db, "Refrigerante").await;
        let repo = db.combos();

        let lunch = combo("Combo almoço", 2490);
        repo.save_with_items(
            &lunch,
            &[
                ComboLine { product_id: burger.id.clone(), quantity: 1 },
                ComboLine { product_id: soda.id.clone(), quantity: 2 },
            ],
        )
        .await
        .unwrap();
        assert_eq!(repo.items(&lunch.id).await.unwrap().len(), 2);

        repo.save_with_items(&lunch, &[ComboLine { product_id: burger.id.clone(), quantity: 2 }])
            .await
            .unwrap();
        let items = repo.items(&lunch.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);

        let containing = repo.list_containing_product(&burger.id).await.unwrap();
        assert_eq!(containing.len(), 1);
        assert!(repo.list_containing_product(&soda.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_totals_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let burger = seed_product(&db, "X-Burger").await;
        let repo = db.combos();

        let solo = combo("Combo solo", 1990);
        repo.save_with_items(&solo, &[ComboLine { product_id: burger.id.clone(), quantity: 1 }])
            .await
            .unwrap();

        repo.update_totals(&solo.id, 500, 0.7487).await.unwrap();
        let loaded = repo.get_by_id(&solo.id).await.unwrap().unwrap();
        assert_eq!(loaded.total_cost_cents, Some(500));
        assert_eq!(repo.count().await.unwrap(), 1);

        // Deleting a product removes it from the combo
        db.products().delete(&burger.id).await.unwrap();
        assert!(repo.items(&solo.id).await.unwrap().is_empty());

        repo.delete(&solo.id).await.unwrap();
        assert!(repo.list().await.unwrap().is_empty());
        assert!(matches!(
            repo.update_totals(&solo.id, 0, 0.0).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
