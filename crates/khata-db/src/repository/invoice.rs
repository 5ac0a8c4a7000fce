//! # Invoice Repository
//!
//! Database operations for invoices and their line items.
//!
//! ## Invoice Write Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   One Write = One Transaction                           │
//! │                                                                         │
//! │  create(fields, items)                                                 │
//! │    BEGIN                                                               │
//! │    ├── INSERT invoice                                                  │
//! │    ├── balance: net_amount + customer debit/credit                     │
//! │    ├── INSERT item × N  (each: balance derives amount)                 │
//! │    │      └── any failure → ROLLBACK everything                        │
//! │    └── COMMIT, return invoice + items                                  │
//! │                                                                         │
//! │  update(key, fields, items)                                            │
//! │    BEGIN                                                               │
//! │    ├── capture old image                                               │
//! │    ├── UPDATE invoice fields (if any supplied)                         │
//! │    ├── balance: recompute net, settle debit/credit                     │
//! │    ├── reconcile items against the replacement list by item_id:        │
//! │    │     absent → DELETE, both → UPDATE price/qty, new → INSERT        │
//! │    └── COMMIT, return invoice + items                                  │
//! │                                                                         │
//! │  delete(key)                                                           │
//! │    BEGIN                                                               │
//! │    ├── capture old image                                               │
//! │    ├── DELETE invoice (items/transactions cascade via FK)              │
//! │    ├── balance: reverse debit (and credit if paid)                     │
//! │    └── COMMIT, return removed-row count                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lookups accept either identifier form: a numeric key is the surrogate id,
//! a string key is the business `invoice_id`. A missing invoice is an error
//! for lookups (unlike customer delete).

use sqlx::{Sqlite, SqlitePool};
use tracing::debug;

use crate::balance;
use crate::error::{DbError, DbResult};
use crate::repository::fields::{
    build_insert, build_update, numeric, text, FieldSpec, JsonMap,
};
use khata_core::{
    validation, Invoice, InvoiceItem, InvoiceKey, InvoiceWithItems, ValidationError,
};

/// Fields a caller may supply when creating an invoice. `net_amount` is
/// absent on purpose: it is derived, never accepted.
const INSERT_FIELDS: &[FieldSpec] = &[
    text("invoice_id"),
    numeric("cust_id"),
    text("status"),
    text("date"),
    numeric("total_amount"),
    numeric("add_on"),
    numeric("discount"),
    text("narration"),
    text("transport"),
    numeric("nugs"),
    text("place_of_supply"),
];

/// Fields a caller may change. Changing `cust_id` moves the invoice's
/// balance contributions between customers (handled by the balance engine).
const UPDATE_FIELDS: &[FieldSpec] = &[
    numeric("cust_id"),
    text("status"),
    text("date"),
    numeric("total_amount"),
    numeric("add_on"),
    numeric("discount"),
    text("narration"),
    text("transport"),
    numeric("nugs"),
    text("place_of_supply"),
];

const IMMUTABLE_FIELDS: &[&str] = &["id", "invoice_id", "created_at", "net_amount"];

/// Fields a caller may supply per line item.
const ITEM_INSERT_FIELDS: &[FieldSpec] = &[
    numeric("invoice_id"),
    numeric("item_id"),
    text("sku"),
    numeric("price"),
    numeric("qty"),
];

const SELECT_INVOICE: &str =
    "SELECT id, invoice_id, cust_id, status, date, total_amount, add_on, discount, \
     net_amount, narration, transport, nugs, place_of_supply, created_at, last_updated, \
     sp_synced FROM invoices";

const SELECT_ITEMS: &str =
    "SELECT id, invoice_id, item_id, sku, price, qty, amount, last_updated, sp_synced \
     FROM invoice_items WHERE invoice_id = ?1 ORDER BY id";

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Creates an invoice together with its line items, atomically.
    ///
    /// `invoice_id` (non-empty) and `cust_id` are required before any write
    /// begins. Any item failing to insert rolls back the invoice too.
    pub async fn create(&self, fields: &JsonMap, items: &[JsonMap]) -> DbResult<InvoiceWithItems> {
        match fields.get("invoice_id") {
            Some(serde_json::Value::String(key)) => {
                validation::validate_business_key("invoice_id", key)?
            }
            _ => {
                return Err(ValidationError::Required {
                    field: "invoice_id".to_string(),
                }
                .into())
            }
        }
        if !matches!(fields.get("cust_id"), Some(v) if v.is_number()) {
            return Err(ValidationError::Required {
                field: "cust_id".to_string(),
            }
            .into());
        }

        debug!(items = items.len(), "Creating invoice");

        let mut tx = self.pool.begin().await?;

        let mut qb = build_insert("invoices", "invoice", INSERT_FIELDS, fields)?;
        let result = qb.build().execute(&mut *tx).await?;
        let invoice_pk = result.last_insert_rowid();

        balance::invoice_inserted(&mut tx, invoice_pk).await?;

        for item in items {
            insert_item(&mut tx, invoice_pk, item).await?;
        }

        let created = fetch_with_items(&mut tx, invoice_pk).await?;
        tx.commit().await?;

        debug!(id = created.invoice.id, "Invoice created");
        Ok(created)
    }

    /// Looks an invoice up by surrogate id or business key, returning it
    /// merged with its current items. Missing invoices are an error.
    pub async fn get(&self, key: &InvoiceKey) -> DbResult<InvoiceWithItems> {
        let mut conn = self.pool.acquire().await?;

        let invoice_pk = resolve_key(&mut conn, key)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", key))?;

        fetch_with_items(&mut conn, invoice_pk).await
    }

    /// Updates invoice-level fields (when any are supplied) and reconciles
    /// the item list against `items`; all in one transaction.
    ///
    /// Reconciliation diffs by `item_id`: existing items absent from the new
    /// list are deleted; items present in both get price/qty applied (other
    /// fields on existing items are immutable through this path); items only
    /// in the new list are inserted.
    pub async fn update(
        &self,
        key: &InvoiceKey,
        fields: &JsonMap,
        items: &[JsonMap],
    ) -> DbResult<InvoiceWithItems> {
        debug!(key = %key, items = items.len(), "Updating invoice");

        let mut tx = self.pool.begin().await?;

        let invoice_pk = resolve_key(&mut tx, key)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", key))?;

        let old = balance::fetch_invoice_image(&mut tx, invoice_pk)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", key))?;

        let has_field_updates = fields.values().any(|v| !v.is_null());
        if has_field_updates {
            let mut qb = build_update("invoices", "invoice", UPDATE_FIELDS, IMMUTABLE_FIELDS, fields)?;
            qb.push(" WHERE id = ").push_bind(invoice_pk);
            qb.build().execute(&mut *tx).await?;

            balance::invoice_updated(&mut tx, &old).await?;
        }

        reconcile_items(&mut tx, invoice_pk, items).await?;

        let updated = fetch_with_items(&mut tx, invoice_pk).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// Deletes an invoice by either identifier form. Items and transactions
    /// cascade away via foreign keys; the invoice's own balance
    /// contributions are reversed (cascaded transactions' are not; the
    /// documented asymmetry). Returns the removed-row count.
    pub async fn delete(&self, key: &InvoiceKey) -> DbResult<u64> {
        debug!(key = %key, "Deleting invoice");

        let mut tx = self.pool.begin().await?;

        let Some(invoice_pk) = resolve_key(&mut tx, key).await? else {
            return Ok(0);
        };

        let old = balance::fetch_invoice_image(&mut tx, invoice_pk)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", key))?;

        let changes = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(invoice_pk)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        balance::invoice_deleted(&mut tx, &old).await?;

        tx.commit().await?;

        Ok(changes)
    }
}

// =============================================================================
// Internal Helpers
// =============================================================================

/// Resolves a lookup key to the surrogate id.
async fn resolve_key(
    conn: &mut sqlx::SqliteConnection,
    key: &InvoiceKey,
) -> DbResult<Option<i64>> {
    let id = match key {
        InvoiceKey::Id(id) => sqlx::query_scalar("SELECT id FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?,
        InvoiceKey::BusinessId(business_key) => {
            sqlx::query_scalar("SELECT id FROM invoices WHERE invoice_id = ?1")
                .bind(business_key)
                .fetch_optional(&mut *conn)
                .await?
        }
    };

    Ok(id)
}

/// Inserts one line item for `invoice_pk` and derives its amount. Aborts the
/// caller's transaction scope on the first failure.
async fn insert_item(
    conn: &mut sqlx::SqliteConnection,
    invoice_pk: i64,
    item: &JsonMap,
) -> DbResult<i64> {
    if !matches!(item.get("item_id"), Some(v) if v.is_number()) {
        return Err(ValidationError::Required {
            field: "item_id".to_string(),
        }
        .into());
    }
    if !matches!(item.get("sku"), Some(serde_json::Value::String(s)) if !s.trim().is_empty()) {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        }
        .into());
    }
    if let Some(qty) = item.get("qty").and_then(|v| v.as_i64()) {
        validation::validate_qty(qty)?;
    }

    // The owning invoice comes from the call, never from the payload
    let mut row = item.clone();
    row.insert("invoice_id".to_string(), serde_json::json!(invoice_pk));

    let mut qb = build_insert("invoice_items", "invoice_item", ITEM_INSERT_FIELDS, &row)?;
    let result = qb.build().execute(&mut *conn).await?;
    let item_pk = result.last_insert_rowid();

    balance::item_written(conn, item_pk).await?;

    Ok(item_pk)
}

/// Diffs the replacement item list against the stored items by `item_id` and
/// applies deletes, price/qty updates, and inserts.
async fn reconcile_items(
    conn: &mut sqlx::SqliteConnection,
    invoice_pk: i64,
    items: &[JsonMap],
) -> DbResult<()> {
    let existing: Vec<(i64, i64)> =
        sqlx::query_as("SELECT id, item_id FROM invoice_items WHERE invoice_id = ?1")
            .bind(invoice_pk)
            .fetch_all(&mut *conn)
            .await?;

    for item in items {
        let item_id = item.get("item_id").and_then(|v| v.as_i64()).ok_or_else(|| {
            DbError::from(ValidationError::Required {
                field: "item_id".to_string(),
            })
        })?;

        match existing.iter().find(|(_, existing_item)| *existing_item == item_id) {
            Some((row_pk, _)) => {
                // Existing line: only price/qty are writable through this path
                let price = item.get("price").and_then(|v| v.as_f64());
                let qty = item.get("qty").and_then(|v| v.as_i64());

                if price.is_none() && qty.is_none() {
                    continue;
                }
                if let Some(qty) = qty {
                    validation::validate_qty(qty)?;
                }

                let mut qb = sqlx::QueryBuilder::<Sqlite>::new("UPDATE invoice_items SET ");
                let mut sep = qb.separated(", ");
                if let Some(price) = price {
                    sep.push("price = ");
                    sep.push_bind_unseparated(price);
                }
                if let Some(qty) = qty {
                    sep.push("qty = ");
                    sep.push_bind_unseparated(qty);
                }
                drop(sep);
                qb.push(" WHERE id = ").push_bind(*row_pk);
                qb.build().execute(&mut *conn).await?;

                balance::item_written(conn, *row_pk).await?;
            }
            None => {
                insert_item(conn, invoice_pk, item).await?;
            }
        }
    }

    // Stored items missing from the replacement list are removed
    for (row_pk, item_id) in &existing {
        let kept = items
            .iter()
            .any(|item| item.get("item_id").and_then(|v| v.as_i64()) == Some(*item_id));
        if !kept {
            sqlx::query("DELETE FROM invoice_items WHERE id = ?1")
                .bind(row_pk)
                .execute(&mut *conn)
                .await?;
        }
    }

    Ok(())
}

/// Reads an invoice merged with its current items.
async fn fetch_with_items(
    conn: &mut sqlx::SqliteConnection,
    invoice_pk: i64,
) -> DbResult<InvoiceWithItems> {
    let invoice = sqlx::query_as::<_, Invoice>(&format!("{SELECT_INVOICE} WHERE id = ?1"))
        .bind(invoice_pk)
        .fetch_one(&mut *conn)
        .await?;

    let invoice_items = sqlx::query_as::<_, InvoiceItem>(SELECT_ITEMS)
        .bind(invoice_pk)
        .fetch_all(&mut *conn)
        .await?;

    Ok(InvoiceWithItems {
        invoice,
        invoice_items,
    })
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

    /// Seeds a customer and two products, returning (cust_id, prod_a, prod_b).
    async fn fixture(db: &Database) -> (i64, i64, i64) {
        let customer = db
            .customers()
            .create(&map(json!({ "name": "Fixture Customer" })))
            .await
            .unwrap();

        let a = db
            .products()
            .create(&khata_core::NewProduct {
                fs_sku: "SKU-A".into(),
                fs_prod_id: "P-A".into(),
                fs_variation_id: "V-A".into(),
                fs_category_id: "C-A".into(),
                category_name: "Widgets".into(),
                prod_name: "Widget A".into(),
                price: 10.0,
                stock: 100,
            })
            .await
            .unwrap();
        let b = db
            .products()
            .create(&khata_core::NewProduct {
                fs_sku: "SKU-B".into(),
                fs_prod_id: "P-B".into(),
                fs_variation_id: "V-B".into(),
                fs_category_id: "C-B".into(),
                category_name: "Widgets".into(),
                prod_name: "Widget B".into(),
                price: 25.0,
                stock: 100,
            })
            .await
            .unwrap();

        (customer.id, a.id, b.id)
    }

    #[tokio::test]
    async fn test_create_requires_invoice_id_and_cust_id() {
        let db = test_db().await;
        let repo = db.invoices();

        let err = repo
            .create(&map(json!({ "cust_id": 1 })), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invoice_id"), "{err}");

        let err = repo
            .create(&map(json!({ "invoice_id": "INV-1" })), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cust_id"), "{err}");
    }

    #[tokio::test]
    async fn test_create_round_trip_with_derived_amounts() {
        let db = test_db().await;
        let (cust_id, prod_a, prod_b) = fixture(&db).await;

        let created = db
            .invoices()
            .create(
                &map(json!({
                    "invoice_id": "INV-100",
                    "cust_id": cust_id,
                    "status": "unpaid",
                    "total_amount": 100.0,
                    "add_on": 10.0,
                    "discount": 5.0
                })),
                &[
                    map(json!({ "item_id": prod_a, "sku": "SKU-A", "price": 10.0, "qty": 5 })),
                    map(json!({ "item_id": prod_b, "sku": "SKU-B", "price": 25.0, "qty": 2 })),
                ],
            )
            .await
            .unwrap();

        assert_eq!(created.invoice.net_amount, 105.0);
        assert_eq!(created.invoice_items.len(), 2);

        let fetched = db.invoices().get(&InvoiceKey::from("INV-100")).await.unwrap();
        assert_eq!(fetched.invoice.id, created.invoice.id);

        let amounts: Vec<f64> = fetched.invoice_items.iter().map(|i| i.amount).collect();
        assert_eq!(amounts, vec![50.0, 50.0]);
    }

    #[tokio::test]
    async fn test_failing_item_rolls_back_invoice() {
        let db = test_db().await;
        let (cust_id, prod_a, _) = fixture(&db).await;

        // Second item references a SKU that doesn't exist → FK failure
        let err = db
            .invoices()
            .create(
                &map(json!({ "invoice_id": "INV-200", "cust_id": cust_id, "total_amount": 50.0 })),
                &[
                    map(json!({ "item_id": prod_a, "sku": "SKU-A", "price": 10.0, "qty": 1 })),
                    map(json!({ "item_id": 9999, "sku": "NO-SUCH", "price": 1.0, "qty": 1 })),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }), "{err}");

        // Nothing committed: neither the invoice nor the debit effect
        let missing = db.invoices().get(&InvoiceKey::from("INV-200")).await;
        assert!(missing.is_err());

        let customer = db
            .customers()
            .find_by_filters(&map(json!({ "id": cust_id })))
            .await
            .unwrap();
        assert_eq!(customer[0].debit_balance, 0.0);
    }

    #[tokio::test]
    async fn test_get_by_numeric_and_business_key() {
        let db = test_db().await;
        let (cust_id, prod_a, _) = fixture(&db).await;

        let created = db
            .invoices()
            .create(
                &map(json!({ "invoice_id": "INV-300", "cust_id": cust_id, "total_amount": 10.0 })),
                &[map(json!({ "item_id": prod_a, "sku": "SKU-A", "price": 10.0, "qty": 1 }))],
            )
            .await
            .unwrap();

        let by_id = db
            .invoices()
            .get(&InvoiceKey::Id(created.invoice.id))
            .await
            .unwrap();
        let by_key = db.invoices().get(&InvoiceKey::from("INV-300")).await.unwrap();
        assert_eq!(by_id.invoice.id, by_key.invoice.id);

        let err = db.invoices().get(&InvoiceKey::from("INV-999")).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_update_reconciles_items() {
        let db = test_db().await;
        let (cust_id, prod_a, prod_b) = fixture(&db).await;

        db.invoices()
            .create(
                &map(json!({ "invoice_id": "INV-400", "cust_id": cust_id, "total_amount": 60.0 })),
                &[
                    map(json!({ "item_id": prod_a, "sku": "SKU-A", "price": 10.0, "qty": 1 })),
                    map(json!({ "item_id": prod_b, "sku": "SKU-B", "price": 25.0, "qty": 2 })),
                ],
            )
            .await
            .unwrap();

        // Replacement list: prod_a updated, prod_b dropped
        let updated = db
            .invoices()
            .update(
                &InvoiceKey::from("INV-400"),
                &map(json!({})),
                &[map(json!({ "item_id": prod_a, "price": 12.0, "qty": 3 }))],
            )
            .await
            .unwrap();

        assert_eq!(updated.invoice_items.len(), 1);
        assert_eq!(updated.invoice_items[0].item_id, prod_a);
        assert_eq!(updated.invoice_items[0].amount, 36.0);
    }

    #[tokio::test]
    async fn test_delete_reports_removed_count() {
        let db = test_db().await;
        let (cust_id, prod_a, _) = fixture(&db).await;

        db.invoices()
            .create(
                &map(json!({ "invoice_id": "INV-500", "cust_id": cust_id, "total_amount": 10.0 })),
                &[map(json!({ "item_id": prod_a, "sku": "SKU-A", "price": 10.0, "qty": 1 }))],
            )
            .await
            .unwrap();

        assert_eq!(db.invoices().delete(&InvoiceKey::from("INV-500")).await.unwrap(), 1);
        assert_eq!(db.invoices().delete(&InvoiceKey::from("INV-500")).await.unwrap(), 0);
    }
}
