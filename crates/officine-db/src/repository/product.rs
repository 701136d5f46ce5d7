//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Stock Quantity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock_quantity is an aggregate of the product's lots.        │
//! │                                                                         │
//! │  ❌ Never written by update():  catalog edits leave it alone           │
//! │  ✅ Only moved by the ledger, as a delta, in the same transaction      │
//! │     as the lot change and its movement:                                │
//! │       UPDATE products SET stock_quantity = stock_quantity + ?          │
//! │                                                                         │
//! │  Σ lots.quantity == products.stock_quantity == Σ movements.delta       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use officine_core::{new_id, Product};

const PRODUCT_COLUMNS: &str = r#"
    id, pharmacy_id, name, category,
    purchase_price_cents, sale_price_cents,
    stock_quantity, low_stock_threshold, is_active,
    created_at, updated_at
"#;

/// Fields needed to add a product to the catalog. Stock starts at zero and
/// only the ledger moves it.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub pharmacy_id: String,
    pub name: String,
    pub category: Option<String>,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    pub low_stock_threshold: i64,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product with zero stock.
    pub async fn create(&self, new: NewProduct) -> DbResult<Product> {
        debug!(pharmacy_id = %new.pharmacy_id, name = %new.name, "Inserting product");

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            pharmacy_id: new.pharmacy_id,
            name: new.name,
            category: new.category,
            purchase_price_cents: new.purchase_price_cents,
            sale_price_cents: new.sale_price_cents,
            stock_quantity: 0,
            low_stock_threshold: new.low_stock_threshold,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, pharmacy_id, name, category,
                purchase_price_cents, sale_price_cents,
                stock_quantity, low_stock_threshold, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.pharmacy_id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.stock_quantity)
        .bind(product.low_stock_threshold)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// All products of a pharmacy, by name.
    pub async fn list(&self, pharmacy_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE pharmacy_id = ?1 ORDER BY name, id",
            PRODUCT_COLUMNS
        ))
        .bind(pharmacy_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Active products at or below their threshold.
    pub async fn list_low_stock(&self, pharmacy_id: &str) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        list_low_stock(&mut conn, pharmacy_id).await
    }

    /// Updates catalog fields (name, category, prices, threshold, active flag).
    ///
    /// `stock_quantity` is left untouched.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                purchase_price_cents = ?4,
                sale_price_cents = ?5,
                low_stock_threshold = ?6,
                is_active = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.low_stock_threshold)
        .bind(product.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }
}

// =============================================================================
// Connection-level queries (usable inside a transaction)
// =============================================================================

/// Gets a product of `pharmacy_id`; products of other pharmacies are
/// reported as missing.
pub(crate) async fn find_in_pharmacy(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
    id: &str,
) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = ?1 AND pharmacy_id = ?2",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .bind(pharmacy_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(product)
}

pub(crate) async fn list_low_stock(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
) -> DbResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        r#"
        SELECT {} FROM products
        WHERE pharmacy_id = ?1
          AND is_active = 1
          AND stock_quantity <= low_stock_threshold
        ORDER BY name, id
        "#,
        PRODUCT_COLUMNS
    ))
    .bind(pharmacy_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(products)
}

/// Moves the aggregate stock by `delta`.
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
) -> DbResult<()> {
    debug!(id = %id, delta = %delta, "Updating product stock");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?2,
            updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::test_support::fixture;

    #[tokio::test]
    async fn test_update_never_touches_stock() {
        let fx = fixture().await;
        fx.receive(&fx.product, "L1", 30, 8).await;

        let mut product = fx.reload(&fx.product).await;
        product.name = "Doliprane 1000mg cpr".to_string();
        product.stock_quantity = 999;
        fx.db.products().update(&product).await.unwrap();

        let reloaded = fx.reload(&fx.product).await;
        assert_eq!(reloaded.name, "Doliprane 1000mg cpr");
        assert_eq!(reloaded.stock_quantity, 8);
    }

    #[tokio::test]
    async fn test_low_stock_listing_is_inclusive_and_skips_inactive() {
        let fx = fixture().await;
        // threshold 5, stock 0
        let mut inactive = fx.add_product("Retired", 5, 100).await;
        inactive.is_active = false;
        fx.db.products().update(&inactive).await.unwrap();
        let at_threshold = fx.add_product("At threshold", 3, 100).await;
        fx.receive(&at_threshold, "T1", 60, 3).await;

        let low = fx.db.products().list_low_stock(&fx.pharmacy.id).await.unwrap();
        let names: Vec<&str> = low.iter().map(|p| p.name.as_str()).collect();

        assert!(names.contains(&"At threshold"));
        assert!(names.contains(&fx.product.name.as_str()));
        assert!(!names.contains(&"Retired"));
    }
}
