//! # Product Repository
//!
//! Database operations for products, their recipe lines (ficha técnica)
//! and menu categories.
//!
//! ## Replacing a Recipe
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    save_with_recipe (one transaction)                   │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT INTO products ... ON CONFLICT(id) DO UPDATE                   │
//! │    DELETE FROM recipe_lines WHERE product_id = ?                        │
//! │    INSERT INTO recipe_lines ... (one per unique ingredient)             │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any failure rolls the whole save back: the product never ends up       │
//! │  with an empty or half-written recipe.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use cardapio_core::recipe::RecipeItem;
use cardapio_core::{Category, Product, RecipeLine};

/// Repository for product, recipe line and category operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_id("uuid-here").await?;
/// let lines = repo.recipe_lines("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Lists every product sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, category_id, yield_portions,
                defined_price_cents, suggested_price_cents,
                total_recipe_cost_cents, cost_per_portion_cents,
                margin, popularity_level, created_at, updated_at
            FROM products
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, category_id, yield_portions,
                defined_price_cents, suggested_price_cents,
                total_recipe_cost_cents, cost_per_portion_cents,
                margin, popularity_level, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists the products whose recipe uses an ingredient.
    ///
    /// ## Usage
    /// Called after an ingredient's unit cost changes, to reprice
    /// exactly the affected products.
    pub async fn list_using_ingredient(&self, ingredient_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                p.id, p.name, p.category_id, p.yield_portions,
                p.defined_price_cents, p.suggested_price_cents,
                p.total_recipe_cost_cents, p.cost_per_portion_cents,
                p.margin, p.popularity_level, p.created_at, p.updated_at
            FROM products p
            WHERE p.id IN (
                SELECT product_id FROM recipe_lines WHERE ingredient_id = ?1
            )
            ORDER BY p.name COLLATE NOCASE
            "#,
        )
        .bind(ingredient_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(ingredient_id = %ingredient_id, count = products.len(), "Products using ingredient");
        Ok(products)
    }

    /// Stores a product and replaces its recipe lines atomically.
    ///
    /// `lines` must already be deduplicated with positive quantities
    /// (see [`cardapio_core::recipe::persistable_lines`]).
    ///
    /// ## Returns
    /// * `Ok(Vec<RecipeLine>)` - The recipe lines now stored
    /// * `Err(DbError::ForeignKeyViolation)` - A line references a missing ingredient
    /// * `Err(DbError::UniqueViolation)` - Duplicate ingredient in `lines`
    pub async fn save_with_recipe(&self, product: &Product, lines: &[RecipeItem]) -> DbResult<Vec<RecipeLine>> {
        debug!(id = %product.id, lines = lines.len(), "Saving product with recipe");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category_id, yield_portions,
                defined_price_cents, suggested_price_cents,
                total_recipe_cost_cents, cost_per_portion_cents,
                margin, popularity_level, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category_id = excluded.category_id,
                yield_portions = excluded.yield_portions,
                defined_price_cents = excluded.defined_price_cents,
                suggested_price_cents = excluded.suggested_price_cents,
                total_recipe_cost_cents = excluded.total_recipe_cost_cents,
                cost_per_portion_cents = excluded.cost_per_portion_cents,
                margin = excluded.margin,
                popularity_level = excluded.popularity_level,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.yield_portions)
        .bind(product.defined_price_cents)
        .bind(product.suggested_price_cents)
        .bind(product.total_recipe_cost_cents)
        .bind(product.cost_per_portion_cents)
        .bind(product.margin)
        .bind(product.popularity_level)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM recipe_lines WHERE product_id = ?1")
            .bind(&product.id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let mut stored = Vec::with_capacity(lines.len());
        for item in lines {
            let line = RecipeLine {
                id: generate_id(),
                product_id: product.id.clone(),
                ingredient_id: item.ingredient_id.clone(),
                quantity_used: item.quantity,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO recipe_lines (id, product_id, ingredient_id, quantity_used, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&line.id)
            .bind(&line.product_id)
            .bind(&line.ingredient_id)
            .bind(line.quantity_used)
            .bind(line.created_at)
            .execute(&mut *tx)
            .await?;

            stored.push(line);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(stored)
    }

    /// Writes the derived pricing columns of a product.
    ///
    /// Inputs (name, yield, defined price) are left untouched.
    pub async fn update_derived(&self, product: &Product) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                suggested_price_cents = ?2,
                total_recipe_cost_cents = ?3,
                cost_per_portion_cents = ?4,
                margin = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(product.suggested_price_cents)
        .bind(product.total_recipe_cost_cents)
        .bind(product.cost_per_portion_cents)
        .bind(product.margin)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Sets the popularity level used by menu engineering.
    pub async fn set_popularity(&self, id: &str, level: Option<i64>) -> DbResult<()> {
        debug!(id = %id, level = ?level, "Setting popularity");

        let result = sqlx::query("UPDATE products SET popularity_level = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(level)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Deletes a product. Its recipe lines and combo items cascade.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products (for menu stats).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Recipe Lines
    // =========================================================================

    /// Lists the recipe lines of a product in insertion order.
    pub async fn recipe_lines(&self, product_id: &str) -> DbResult<Vec<RecipeLine>> {
        let lines = sqlx::query_as::<_, RecipeLine>(
            r#"
            SELECT id, product_id, ingredient_id, quantity_used, created_at
            FROM recipe_lines
            WHERE product_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Lists categories sorted by name.
    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Creates a category.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - A category with this name exists
    pub async fn insert_category(&self, name: &str) -> DbResult<Category> {
        let category = Category {
            id: generate_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("category name", name),
                other => other,
            })?;

        Ok(category)
    }

    /// Deletes a category. Its products become uncategorized.
    pub async fn delete_category(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cardapio_core::{Ingredient, IngredientKind, IngredientUnit};

    async fn seed_ingredient(db: &Database, name: &str, unit_cost_cents: i64) -> Ingredient {
        let now = Utc::now();
        let ingredient = Ingredient {
            id: generate_id(),
            name: name.to_string(),
            unit: IngredientUnit::Kg,
            unit_cost_cents,
            kind: IngredientKind::Raw,
            supplier: None,
            created_at: now,
            updated_at: now,
        };
        db.ingredients().insert(&ingredient).await.unwrap()
    }

    fn product(name: &str) -> Product {
        let now = Utc::now();
        Product {
            id: generate_id(),
            name: name.to_string(),
            category_id: None,
            yield_portions: 1,
            defined_price_cents: None,
            suggested_price_cents: None,
            total_recipe_cost_cents: None,
            cost_per_portion_cents: None,
            margin: None,
            popularity_level: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_with_recipe_replaces_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let beef = seed_ingredient(&db, "Carne", 4590).await;
        let cheese = seed_ingredient(&db, "Queijo", 3990).await;
        let repo = db.products();

        let burger = product("X-Burger");
        repo.save_with_recipe(
            &burger,
            &[RecipeItem::new(&beef.id, 0.15), RecipeItem::new(&cheese.id, 0.03)],
        )
        .await
        .unwrap();
        assert_eq!(repo.recipe_lines(&burger.id).await.unwrap().len(), 2);

        let mut renamed = burger.clone();
        renamed.name = "X-Salada".to_string();
        let stored = repo
            .save_with_recipe(&renamed, &[RecipeItem::new(&beef.id, 0.18)])
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);

        let lines = repo.recipe_lines(&burger.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].ingredient_id, beef.id);
        assert!((lines[0].quantity_used - 0.18).abs() < 1e-12);

        let loaded = repo.get_by_id(&burger.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "X-Salada");
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_recipe_save_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let beef = seed_ingredient(&db, "Carne", 4590).await;
        let repo = db.products();

        let burger = product("X-Burger");
        repo.save_with_recipe(&burger, &[RecipeItem::new(&beef.id, 0.15)])
            .await
            .unwrap();

        // Unknown ingredient: the foreign key rejects the second line
        let err = repo
            .save_with_recipe(
                &burger,
                &[RecipeItem::new(&beef.id, 0.2), RecipeItem::new("no-such-ingredient", 1.0)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let lines = repo.recipe_lines(&burger.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!((lines[0].quantity_used - 0.15).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_ingredient_in_use_cannot_be_deleted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let beef = seed_ingredient(&db, "Carne", 4590).await;
        let burger = product("X-Burger");
        db.products()
            .save_with_recipe(&burger, &[RecipeItem::new(&beef.id, 0.15)])
            .await
            .unwrap();

        let err = db.ingredients().delete(&beef.id).await.unwrap_err();
        match err {
            DbError::InUse { references, .. } => assert_eq!(references, 1),
            other => panic!("expected InUse, got {other:?}"),
        }

        let users = db.products().list_using_ingredient(&beef.id).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, burger.id);

        // Deleting the product cascades to its lines and frees the ingredient
        db.products().delete(&burger.id).await.unwrap();
        db.ingredients().delete(&beef.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_derived_and_popularity() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let mut fries = product("Batata frita");
        repo.save_with_recipe(&fries, &[]).await.unwrap();

        fries.cost_per_portion_cents = Some(450);
        fries.total_recipe_cost_cents = Some(450);
        fries.suggested_price_cents = Some(990);
        fries.margin = Some(0.5454);
        repo.update_derived(&fries).await.unwrap();
        repo.set_popularity(&fries.id, Some(8)).await.unwrap();

        let loaded = repo.get_by_id(&fries.id).await.unwrap().unwrap();
        assert_eq!(loaded.suggested_price_cents, Some(990));
        assert_eq!(loaded.cost_per_portion_cents, Some(450));
        assert_eq!(loaded.popularity_level, Some(8));

        let err = repo.set_popularity("missing", Some(1)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_categories() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let drinks = repo.insert_category("Bebidas").await.unwrap();
        repo.insert_category("Lanches").await.unwrap();

        let err = repo.insert_category("Bebidas").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let mut juice = product("Suco de laranja");
        juice.category_id = Some(drinks.id.clone());
        repo.save_with_recipe(&juice, &[]).await.unwrap();

        repo.delete_category(&drinks.id).await.unwrap();
        let loaded = repo.get_by_id(&juice.id).await.unwrap().unwrap();
        assert_eq!(loaded.category_id, None);

        let names: Vec<String> = repo
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Lanches"]);
    }
}
