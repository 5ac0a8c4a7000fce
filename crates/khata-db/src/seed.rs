//! # First-Run Seed
//!
//! Demo data inserted once, on the first launch of a fresh install.
//!
//! ## First-Run Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      First-Run Seeding                                  │
//! │                                                                         │
//! │  Startup                                                               │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  flags.first_run()?  ── false ──► skip                                 │
//! │    │ true                                                               │
//! │    ▼                                                                    │
//! │  seed_demo_data(db)   ← keyed on the demo identifiers, so a crash      │
//! │    │                    between seed and flag write just re-runs        │
//! │    ▼                    harmlessly next launch                          │
//! │  flags.set_first_run(false)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The flag lives in a small key-value store outside the relational schema
//! (the boundary crate provides a JSON-file implementation); this module
//! only sees it through the [`BootstrapFlags`] trait.

use tracing::info;

use crate::error::{DbError, DbResult};
use crate::pool::Database;

/// External key of the demo customer.
pub const DEMO_CUSTOMER_KEY: &str = "demo-cust-001";
/// SKU of the demo product.
pub const DEMO_PRODUCT_SKU: &str = "DEMO-001";

/// The first-run flag store. Lives outside the database file, in the app's
/// key-value configuration store.
pub trait BootstrapFlags {
    /// Whether this install has never been seeded.
    fn first_run(&self) -> bool;

    /// Persists the flag.
    fn set_first_run(&mut self, value: bool) -> std::io::Result<()>;
}

/// Seeds one demo customer and one demo product.
///
/// Idempotent: both inserts are keyed on fixed demo identifiers and skip
/// themselves when a matching row already exists, so re-entry after a crash
/// cannot trip unique constraints.
pub async fn seed_demo_data(db: &Database) -> DbResult<()> {
    let mut tx = db.pool().begin().await?;

    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE fs_cust_id = ?1")
            .bind(DEMO_CUSTOMER_KEY)
            .fetch_one(&mut *tx)
            .await?;

    if existing == 0 {
        sqlx::query(
            "INSERT INTO customers (fs_cust_id, name, email, phone, address, state_name, district_name) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(DEMO_CUSTOMER_KEY)
        .bind("Demo Customer")
        .bind("demo@example.com")
        .bind("1234567890")
        .bind("123 Main St")
        .bind("Demo State")
        .bind("Demo District")
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "INSERT OR IGNORE INTO products \
         (fs_sku, fs_prod_id, fs_variation_id, fs_category_id, category_name, prod_name, price, stock) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(DEMO_PRODUCT_SKU)
    .bind("prod1")
    .bind("var1")
    .bind("cat1")
    .bind("Demo Category")
    .bind("Demo Product")
    .bind(100.0_f64)
    .bind(10_i64)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!("Demo data seeded");
    Ok(())
}

/// Seeds demo data once per install, gated by the first-run flag.
pub async fn seed_if_first_run(
    db: &Database,
    flags: &mut dyn BootstrapFlags,
) -> DbResult<()> {
    if !flags.first_run() {
        return Ok(());
    }

    seed_demo_data(db).await?;

    flags
        .set_first_run(false)
        .map_err(|e| DbError::Internal(format!("failed to persist first-run flag: {e}")))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;

    struct MemFlags {
        first_run: bool,
    }

    impl BootstrapFlags for MemFlags {
        fn first_run(&self) -> bool {
            self.first_run
        }

        fn set_first_run(&mut self, value: bool) -> std::io::Result<()> {
            self.first_run = value;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        seed_demo_data(&db).await.unwrap();
        // Re-entry (e.g. crash before the flag write) must not trip UNIQUEs
        seed_demo_data(&db).await.unwrap();

        let customers = db.customers().list_all().await.unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].fs_cust_id.as_deref(), Some(DEMO_CUSTOMER_KEY));

        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_first_run_flag_gates_and_clears() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut flags = MemFlags { first_run: true };

        seed_if_first_run(&db, &mut flags).await.unwrap();
        assert!(!flags.first_run);
        assert_eq!(db.customers().list_all().await.unwrap().len(), 1);

        // Cleared flag: no further seeding even on an empty table
        db.customers().delete(1).await.unwrap();
        seed_if_first_run(&db, &mut flags).await.unwrap();
        assert!(db.customers().list_all().await.unwrap().is_empty());
    }
}
