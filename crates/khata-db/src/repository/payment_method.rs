//! # Payment Method Repository
//!
//! Simple reference entity backing `transactions.payment_method`. Deleting a
//! method leaves existing transactions pointing at NULL (FK SET NULL).

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use khata_core::{PaymentMethod, ValidationError};

const SELECT: &str =
    "SELECT id, name, ac_no, last_updated, sp_synced FROM payment_methods";

/// Repository for payment method database operations.
#[derive(Debug, Clone)]
pub struct PaymentMethodRepository {
    pool: SqlitePool,
}

impl PaymentMethodRepository {
    /// Creates a new PaymentMethodRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentMethodRepository { pool }
    }

    /// Lists every payment method.
    pub async fn list_all(&self) -> DbResult<Vec<PaymentMethod>> {
        let methods = sqlx::query_as::<_, PaymentMethod>(SELECT)
            .fetch_all(&self.pool)
            .await?;

        Ok(methods)
    }

    /// Creates a payment method.
    pub async fn create(&self, name: &str, ac_no: &str) -> DbResult<PaymentMethod> {
        if name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }
        if ac_no.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "ac_no".to_string(),
            }
            .into());
        }

        debug!(name = %name, "Creating payment method");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO payment_methods (name, ac_no) VALUES (?1, ?2)")
            .bind(name)
            .bind(ac_no)
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, PaymentMethod>(&format!("{SELECT} WHERE id = ?1"))
            .bind(result.last_insert_rowid())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    /// Deletes a payment method. Transactions referencing it fall back to
    /// NULL rather than blocking the delete.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM payment_methods WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PaymentMethod", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
