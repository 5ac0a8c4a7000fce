//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Filter Semantics
//! Product filters combine with OR; a deliberate asymmetry against the
//! customer repository's AND. `filter({ prod_name: "a", fs_sku: "b" })`
//! returns the union of name matches and SKU matches. The id filter matches
//! exactly; name/SKU/category match partially.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::fields::{numeric, push_filter_clause, text, FieldSpec, JsonMap};
use khata_core::{validation, NewProduct, Product};

/// Filterable fields (OR-combined).
const FILTER_FIELDS: &[FieldSpec] = &[
    numeric("id"),
    text("prod_name"),
    text("fs_sku"),
    text("category_name"),
];

const SELECT: &str = "SELECT id, fs_sku, fs_prod_id, fs_variation_id, fs_category_id, \
                      category_name, prod_name, price, stock, last_updated, sp_synced \
                      FROM products";

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

    /// Finds products matching ANY provided filter (OR).
    ///
    /// Allow-list: id (exact), prod_name / fs_sku / category_name (partial).
    /// An empty (or all-null) filter map degrades to a full scan.
    pub async fn find_by_filters(&self, filters: &JsonMap) -> DbResult<Vec<Product>> {
        debug!(filters = filters.len(), "Filtering products");

        let mut qb: QueryBuilder<'static, Sqlite> = QueryBuilder::new(SELECT);
        push_filter_clause(&mut qb, "product", FILTER_FIELDS, filters, " OR ")?;

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Filter returned products");
        Ok(products)
    }

    /// Lists every product.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(SELECT)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// * `DbError::Precondition` - price is not positive
    /// * `DbError::UniqueViolation` - SKU or another external id exists
    pub async fn create(&self, product: &NewProduct) -> DbResult<Product> {
        validation::validate_business_key("fs_sku", &product.fs_sku)?;
        validation::validate_price(product.price)?;

        debug!(sku = %product.fs_sku, "Inserting product");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO products (fs_sku, fs_prod_id, fs_variation_id, fs_category_id, \
             category_name, prod_name, price, stock) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&product.fs_sku)
        .bind(&product.fs_prod_id)
        .bind(&product.fs_variation_id)
        .bind(&product.fs_category_id)
        .bind(&product.category_name)
        .bind(&product.prod_name)
        .bind(product.price)
        .bind(product.stock)
        .execute(&mut *tx)
        .await?;

        let created = sqlx::query_as::<_, Product>(&format!("{SELECT} WHERE id = ?1"))
            .bind(result.last_insert_rowid())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Sets a product's stock level, keyed by SKU.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no product with that SKU
    pub async fn update_stock(&self, sku: &str, stock: i64) -> DbResult<()> {
        debug!(sku = %sku, stock, "Updating stock");

        let result = sqlx::query("UPDATE products SET stock = ?2 WHERE fs_sku = ?1")
            .bind(sku)
            .bind(stock)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", sku));
        }

        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
