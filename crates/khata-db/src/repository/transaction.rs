//! # Transaction Repository
//!
//! Database operations for payment/refund/adjustment transactions.
//!
//! Transactions are created independently against an existing invoice and
//! affect the owning customer's credit balance only while `completed`; the
//! balance engine applies or reverses the effect exactly once per status
//! transition. The owning invoice is fixed at creation; `invoice_id` is
//! immutable through update, which keeps the engine's customer resolution
//! unambiguous.

use sqlx::SqlitePool;
use tracing::debug;

use crate::balance;
use crate::error::{DbError, DbResult};
use crate::repository::fields::{build_insert, build_update, numeric, text, FieldSpec, JsonMap};
use khata_core::{validation, Transaction, ValidationError};

/// Fields a caller may supply on creation.
const INSERT_FIELDS: &[FieldSpec] = &[
    text("transaction_id"),
    numeric("invoice_id"),
    numeric("payment_method"),
    text("transaction_date"),
    numeric("amount"),
    text("transaction_type"),
    text("status"),
    text("narration"),
];

/// Fields a caller may change.
const UPDATE_FIELDS: &[FieldSpec] = &[
    numeric("payment_method"),
    text("transaction_date"),
    numeric("amount"),
    text("transaction_type"),
    text("status"),
    text("narration"),
];

const IMMUTABLE_FIELDS: &[&str] = &["id", "transaction_id", "invoice_id", "created_at"];

const SELECT: &str = "SELECT id, transaction_id, invoice_id, payment_method, \
                      transaction_date, amount, transaction_type, status, narration, \
                      created_at, last_updated, sp_synced FROM transactions";

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Records a transaction against an existing invoice.
    ///
    /// `transaction_id` (non-empty), `invoice_id`, and `amount` are required
    /// before any write begins. A transaction arriving already `completed`
    /// settles the customer's credit balance in the same transaction scope.
    pub async fn create(&self, data: &JsonMap) -> DbResult<Transaction> {
        match data.get("transaction_id") {
            Some(serde_json::Value::String(key)) => {
                validation::validate_business_key("transaction_id", key)?
            }
            _ => {
                return Err(ValidationError::Required {
                    field: "transaction_id".to_string(),
                }
                .into())
            }
        }
        if !matches!(data.get("invoice_id"), Some(v) if v.is_number()) {
            return Err(ValidationError::Required {
                field: "invoice_id".to_string(),
            }
            .into());
        }
        match data.get("amount").and_then(|v| v.as_f64()) {
            Some(amount) => validation::validate_amount("amount", amount)?,
            None => {
                return Err(ValidationError::Required {
                    field: "amount".to_string(),
                }
                .into())
            }
        }

        debug!("Recording transaction");

        let mut tx = self.pool.begin().await?;

        let mut qb = build_insert("transactions", "transaction", INSERT_FIELDS, data)?;
        let result = qb.build().execute(&mut *tx).await?;
        let pk = result.last_insert_rowid();

        balance::transaction_inserted(&mut tx, pk).await?;

        let created = sqlx::query_as::<_, Transaction>(&format!("{SELECT} WHERE id = ?1"))
            .bind(pk)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(id = created.id, "Transaction recorded");
        Ok(created)
    }

    /// Updates a transaction's mutable fields and settles the balance delta:
    /// the old row's effect is reversed (if it was completed), then the new
    /// row's applied (if it is completed).
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no transaction with that id
    /// * `DbError::Precondition` - empty update set or immutable field
    pub async fn update(&self, id: i64, updates: &JsonMap) -> DbResult<(u64, Transaction)> {
        debug!(id, fields = updates.len(), "Updating transaction");

        let mut qb = build_update("transactions", "transaction", UPDATE_FIELDS, IMMUTABLE_FIELDS, updates)?;
        qb.push(" WHERE id = ").push_bind(id);

        let mut tx = self.pool.begin().await?;

        let old = balance::fetch_transaction_image(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Transaction", id))?;

        let changes = qb.build().execute(&mut *tx).await?.rows_affected();

        balance::transaction_updated(&mut tx, &old).await?;

        let updated = sqlx::query_as::<_, Transaction>(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((changes, updated))
    }

    /// Deletes a transaction, reversing its balance effect if it was
    /// completed. Returns the removed-row count (0 for a miss).
    pub async fn delete(&self, id: i64) -> DbResult<u64> {
        debug!(id, "Deleting transaction");

        let mut tx = self.pool.begin().await?;

        let Some(old) = balance::fetch_transaction_image(&mut tx, id).await? else {
            return Ok(0);
        };

        let changes = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        balance::transaction_deleted(&mut tx, &old).await?;

        tx.commit().await?;

        Ok(changes)
    }

    /// Lists all transactions recorded against an invoice.
    pub async fn list_for_invoice(&self, invoice_pk: i64) -> DbResult<Vec<Transaction>> {
        let transactions =
            sqlx::query_as::<_, Transaction>(&format!("{SELECT} WHERE invoice_id = ?1 ORDER BY id"))
                .bind(invoice_pk)
                .fetch_all(&self.pool)
                .await?;

        Ok(transactions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
