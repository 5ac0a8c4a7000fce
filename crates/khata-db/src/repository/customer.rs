//! # Customer Repository
//!
//! Database operations for customers.
//!
//! ## Contract Notes
//! - Filtering is conjunctive (AND) over an allow-listed field set; string
//!   fields match partially, numeric fields exactly. Unknown keys error
//!   naming the key; null values are skipped (the permissive contract).
//! - `delete` reads the row first so the caller gets it back. A missing row
//!   is NOT an error here; it returns `None`, and the boundary reports
//!   `success: false` with empty data. Invoice lookups, by contrast, treat
//!   missing rows as errors. The asymmetry is deliberate and callers rely
//!   on it.
//! - Balances are written by the balance engine only; `credit_balance` /
//!   `debit_balance` stay updatable here solely for administrative
//!   correction.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::fields::{
    build_insert, build_update, numeric, push_filter_clause, text, FieldSpec, JsonMap,
};
use khata_core::{validation, Customer, ValidationError};

/// Filterable fields (AND-combined).
const FILTER_FIELDS: &[FieldSpec] = &[
    numeric("id"),
    text("name"),
    text("email"),
    text("phone"),
    numeric("credit_balance"),
    numeric("debit_balance"),
];

/// Fields a caller may supply on creation. Everything else comes from schema
/// defaults; balances in particular always start at 0.
const INSERT_FIELDS: &[FieldSpec] = &[
    text("fs_cust_id"),
    text("name"),
    text("email"),
    text("phone"),
    text("address"),
    text("state_name"),
    text("district_name"),
    text("country"),
    text("pincode"),
];

/// Fields a caller may change. Balance fields are allowed for administrative
/// correction only.
const UPDATE_FIELDS: &[FieldSpec] = &[
    text("name"),
    text("email"),
    text("phone"),
    text("address"),
    text("state_name"),
    text("district_name"),
    text("country"),
    text("pincode"),
    numeric("credit_balance"),
    numeric("debit_balance"),
];

/// Fields that can never be written through update.
const IMMUTABLE_FIELDS: &[&str] = &["id", "fs_cust_id", "created_at"];

const SELECT: &str = "SELECT id, fs_cust_id, name, email, phone, address, state_name, \
                      district_name, country, pincode, credit_balance, debit_balance, \
                      created_at, last_updated, sp_synced FROM customers";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Finds customers matching every provided filter (AND).
    ///
    /// Allow-list: id, name, email, phone, credit_balance, debit_balance.
    /// An empty (or all-null) filter map degrades to a full scan.
    pub async fn find_by_filters(&self, filters: &JsonMap) -> DbResult<Vec<Customer>> {
        debug!(filters = filters.len(), "Filtering customers");

        let mut qb: QueryBuilder<'static, Sqlite> = QueryBuilder::new(SELECT);
        push_filter_clause(&mut qb, "customer", FILTER_FIELDS, filters, " AND ")?;

        let customers = qb
            .build_query_as::<Customer>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = customers.len(), "Filter returned customers");
        Ok(customers)
    }

    /// Lists every customer (unconditioned full scan).
    pub async fn list_all(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(SELECT)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// Creates a customer from the provided fields only.
    ///
    /// `name` is required; every other field falls back to its schema
    /// default. Returns the freshly read row by generated id.
    pub async fn create(&self, data: &JsonMap) -> DbResult<Customer> {
        match data.get("name") {
            Some(serde_json::Value::String(name)) => validation::validate_name(name)?,
            _ => {
                return Err(ValidationError::Required {
                    field: "name".to_string(),
                }
                .into())
            }
        }

        debug!("Creating customer");

        let mut tx = self.pool.begin().await?;

        let mut qb = build_insert("customers", "customer", INSERT_FIELDS, data)?;
        let result = qb.build().execute(&mut *tx).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::QueryFailed(
                "customer insert changed no rows".to_string(),
            ));
        }

        let id = result.last_insert_rowid();
        let customer = sqlx::query_as::<_, Customer>(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(id = customer.id, "Customer created");
        Ok(customer)
    }

    /// Updates a customer's mutable fields.
    ///
    /// Rejects empty update sets and the immutable fields (id, fs_cust_id,
    /// created_at). Returns the change count and the updated rows; a change
    /// count of 0 means no matching row and is NOT an error.
    pub async fn update(&self, id: i64, updates: &JsonMap) -> DbResult<(u64, Vec<Customer>)> {
        debug!(id, fields = updates.len(), "Updating customer");

        let mut qb = build_update("customers", "customer", UPDATE_FIELDS, IMMUTABLE_FIELDS, updates)?;
        qb.push(" WHERE id = ").push_bind(id);

        let mut tx = self.pool.begin().await?;

        let changes = qb.build().execute(&mut *tx).await?.rows_affected();

        let rows = if changes > 0 {
            sqlx::query_as::<_, Customer>(&format!("{SELECT} WHERE id = ?1"))
                .bind(id)
                .fetch_all(&mut *tx)
                .await?
        } else {
            Vec::new()
        };

        tx.commit().await?;

        Ok((changes, rows))
    }

    /// Deletes a customer, cascading their invoices, items, and transactions.
    ///
    /// Returns the deleted row, or `None` when no row matched; a miss is a
    /// reportable outcome here, not an error.
    pub async fn delete(&self, id: i64) -> DbResult<Option<Customer>> {
        debug!(id, "Deleting customer");

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Customer>(&format!("{SELECT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            sqlx::query("DELETE FROM customers WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(existing)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn map(value: serde_json::Value) -> JsonMap {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_create_with_only_name_defaults_balances() {
        let db = test_db().await;

        let customer = db
            .customers()
            .create(&map(json!({ "name": "Demo Customer" })))
            .await
            .unwrap();

        assert_eq!(customer.name, "Demo Customer");
        assert_eq!(customer.credit_balance, 0.0);
        assert_eq!(customer.debit_balance, 0.0);
        assert_eq!(customer.email, None);
        assert_eq!(customer.country.as_deref(), Some("india"));
    }

    #[tokio::test]
    async fn test_create_without_name_is_rejected() {
        let db = test_db().await;

        let err = db
            .customers()
            .create(&map(json!({ "email": "x@y.z" })))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("name"), "{err}");
    }

    #[tokio::test]
    async fn test_filters_are_conjunctive_and_partial() {
        let db = test_db().await;
        let repo = db.customers();

        repo.create(&map(json!({ "name": "Asha Traders", "phone": "111" })))
            .await
            .unwrap();
        repo.create(&map(json!({ "name": "Asha Metals", "phone": "222" })))
            .await
            .unwrap();

        let hits = repo
            .find_by_filters(&map(json!({ "name": "Asha", "phone": "222" })))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Asha Metals");
    }

    #[tokio::test]
    async fn test_unknown_filter_key_errors_naming_key() {
        let db = test_db().await;

        let err = db
            .customers()
            .find_by_filters(&map(json!({ "aadhaar": "1234" })))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("aadhaar"), "{err}");
    }

    #[tokio::test]
    async fn test_update_empty_set_rejected_nonmatch_is_zero() {
        let db = test_db().await;
        let repo = db.customers();

        let err = repo.update(1, &map(json!({}))).await.unwrap_err();
        assert!(err.to_string().contains("no fields"), "{err}");

        // No matching row: valid outcome, zero changes
        let (changes, rows) = repo
            .update(999, &map(json!({ "name": "ghost" })))
            .await
            .unwrap();
        assert_eq!(changes, 0);
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_update_immutable_field_rejected() {
        let db = test_db().await;

        let err = db
            .customers()
            .update(1, &map(json!({ "fs_cust_id": "other" })))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("fs_cust_id"), "{err}");
    }

    #[tokio::test]
    async fn test_delete_returns_row_or_none() {
        let db = test_db().await;
        let repo = db.customers();

        let created = repo
            .create(&map(json!({ "name": "To Remove" })))
            .await
            .unwrap();

        let deleted = repo.delete(created.id).await.unwrap();
        assert_eq!(deleted.unwrap().name, "To Remove");

        assert!(repo.delete(created.id).await.unwrap().is_none());
    }
}
