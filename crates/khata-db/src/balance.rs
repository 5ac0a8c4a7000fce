//! # Balance Engine
//!
//! Derived-value maintenance for invoices, invoice items, and customer
//! balances. These rules are ordinary functions rather than engine triggers,
//! so they stay portable across storage engines and visible to anyone
//! reading the repository code.
//!
//! ## Event → Effect Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Balance Engine Rules                              │
//! │                                                                         │
//! │  invoice inserted      net := total + add_on - discount                 │
//! │                        customer.debit += net                            │
//! │                        paid? customer.credit += net                     │
//! │                                                                         │
//! │  invoice updated       recompute net; debit += (new_net - old_net)      │
//! │                        unpaid→paid:  credit += new_net                  │
//! │                        paid→unpaid:  credit -= old_net                  │
//! │                        cust_id changed: reverse old customer with old   │
//! │                        values, apply new customer with new values       │
//! │                                                                         │
//! │  invoice deleted       debit -= net; paid? credit -= net                │
//! │                        (cascaded transactions are NOT reversed)         │
//! │                                                                         │
//! │  item written          amount := price * qty                            │
//! │                                                                         │
//! │  transaction insert    completed? credit += amount (payment/adjustment) │
//! │                                   credit -= amount (refund)             │
//! │  transaction update    old completed? reverse old effect FIRST          │
//! │                        new completed? apply new effect SECOND           │
//! │  transaction delete    completed? reverse its effect                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invocation Contract
//! Every function here runs on the SAME connection, inside the SAME
//! transaction, as the raw write that triggered it. A failure anywhere rolls
//! back the write and the balance adjustment together; no caller ever
//! observes a row whose derived values lag its source fields.
//!
//! Deleting an invoice cascades its transactions away without reversing
//! their credit contributions. Callers have relied on that asymmetry since
//! the first release and it is covered by an explicit test; do not "fix" it
//! here without a product decision.

use sqlx::SqliteConnection;

use crate::error::{DbError, DbResult};
use khata_core::{InvoiceStatus, TransactionStatus, TransactionType};

// =============================================================================
// Row Images
// =============================================================================

/// The slice of an invoice row the balance rules need. Captured by
/// repositories *before* a mutating statement so the old values survive the
/// write.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct InvoiceImage {
    pub id: i64,
    pub cust_id: i64,
    pub status: InvoiceStatus,
    pub total_amount: f64,
    pub add_on: f64,
    pub discount: f64,
    pub net_amount: f64,
}

impl InvoiceImage {
    fn is_paid(&self) -> bool {
        self.status.is_paid()
    }

    /// Net amount as dictated by the current source fields (which may differ
    /// from the stored `net_amount` until the engine writes it back).
    fn computed_net(&self) -> f64 {
        self.total_amount + self.add_on - self.discount
    }
}

/// The slice of a transaction row the balance rules need.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TransactionImage {
    pub id: i64,
    pub invoice_id: i64,
    pub amount: f64,
    pub transaction_type: Option<TransactionType>,
    pub status: TransactionStatus,
}

impl TransactionImage {
    /// Amount signed by direction: refunds pull credit back, everything else
    /// (payment, adjustment, untyped rows) adds credit.
    fn signed_amount(&self) -> f64 {
        match self.transaction_type {
            Some(TransactionType::Refund) => -self.amount,
            _ => self.amount,
        }
    }
}

/// Fetches the balance-relevant slice of an invoice row.
pub(crate) async fn fetch_invoice_image(
    conn: &mut SqliteConnection,
    id: i64,
) -> DbResult<Option<InvoiceImage>> {
    let image = sqlx::query_as::<_, InvoiceImage>(
        "SELECT id, cust_id, status, total_amount, add_on, discount, net_amount \
         FROM invoices WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(image)
}

/// Fetches the balance-relevant slice of a transaction row.
pub(crate) async fn fetch_transaction_image(
    conn: &mut SqliteConnection,
    id: i64,
) -> DbResult<Option<TransactionImage>> {
    let image = sqlx::query_as::<_, TransactionImage>(
        "SELECT id, invoice_id, amount, transaction_type, status \
         FROM transactions WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(image)
}

// =============================================================================
// Customer Balance Primitives
// =============================================================================

async fn adjust_debit(conn: &mut SqliteConnection, cust_id: i64, delta: f64) -> DbResult<()> {
    if delta == 0.0 {
        return Ok(());
    }

    sqlx::query("UPDATE customers SET debit_balance = debit_balance + ?1 WHERE id = ?2")
        .bind(delta)
        .bind(cust_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn adjust_credit(conn: &mut SqliteConnection, cust_id: i64, delta: f64) -> DbResult<()> {
    if delta == 0.0 {
        return Ok(());
    }

    sqlx::query("UPDATE customers SET credit_balance = credit_balance + ?1 WHERE id = ?2")
        .bind(delta)
        .bind(cust_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Invoice Rules
// =============================================================================

/// Rule: invoice inserted.
///
/// Writes `net_amount` from the source fields, adds it to the customer's
/// debit balance, and, if the invoice arrived already `paid`, to the
/// credit balance too.
pub(crate) async fn invoice_inserted(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    let row = fetch_invoice_image(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", id))?;

    let net = row.computed_net();

    sqlx::query("UPDATE invoices SET net_amount = ?1 WHERE id = ?2")
        .bind(net)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    adjust_debit(conn, row.cust_id, net).await?;
    if row.is_paid() {
        adjust_credit(conn, row.cust_id, net).await?;
    }

    Ok(())
}

/// Rule: invoice updated.
///
/// `old` is the image captured before the UPDATE statement ran. Recomputes
/// `net_amount`, then settles the customer balances:
///
/// - owner unchanged: debit moves by the net delta; an unpaid→paid flip adds
///   the new net to credit, paid→unpaid removes the pre-transition net
/// - owner changed: the old customer is fully reversed with old values and
///   the new customer fully applied with new values
pub(crate) async fn invoice_updated(
    conn: &mut SqliteConnection,
    old: &InvoiceImage,
) -> DbResult<()> {
    let new = fetch_invoice_image(conn, old.id)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", old.id))?;

    let new_net = new.computed_net();

    if new_net != new.net_amount {
        sqlx::query("UPDATE invoices SET net_amount = ?1 WHERE id = ?2")
            .bind(new_net)
            .bind(old.id)
            .execute(&mut *conn)
            .await?;
    }

    if old.cust_id != new.cust_id {
        // Reverse everything from the old owner with old values
        adjust_debit(conn, old.cust_id, -old.net_amount).await?;
        if old.is_paid() {
            adjust_credit(conn, old.cust_id, -old.net_amount).await?;
        }

        // Apply everything to the new owner with new values
        adjust_debit(conn, new.cust_id, new_net).await?;
        if new.is_paid() {
            adjust_credit(conn, new.cust_id, new_net).await?;
        }

        return Ok(());
    }

    adjust_debit(conn, old.cust_id, new_net - old.net_amount).await?;

    match (old.is_paid(), new.is_paid()) {
        (false, true) => adjust_credit(conn, old.cust_id, new_net).await?,
        // Paid→unpaid uses the pre-transition net amount
        (true, false) => adjust_credit(conn, old.cust_id, -old.net_amount).await?,
        _ => {}
    }

    Ok(())
}

/// Rule: invoice deleted.
///
/// Reverses the invoice's own balance contributions. Transactions removed by
/// the foreign-key cascade keep their credit contributions; the documented
/// asymmetry.
pub(crate) async fn invoice_deleted(
    conn: &mut SqliteConnection,
    old: &InvoiceImage,
) -> DbResult<()> {
    adjust_debit(conn, old.cust_id, -old.net_amount).await?;
    if old.is_paid() {
        adjust_credit(conn, old.cust_id, -old.net_amount).await?;
    }

    Ok(())
}

// =============================================================================
// Invoice Item Rule
// =============================================================================

/// Rule: item inserted or its price/qty updated.
///
/// `amount := price * qty`, recomputed from the row itself so it can never
/// drift from the source fields.
pub(crate) async fn item_written(conn: &mut SqliteConnection, item_id: i64) -> DbResult<()> {
    sqlx::query("UPDATE invoice_items SET amount = price * qty WHERE id = ?1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// =============================================================================
// Transaction Rules
// =============================================================================

/// Applies (sign = +1) or reverses (sign = -1) a completed transaction's
/// effect on the owning invoice's customer.
async fn settle_transaction(
    conn: &mut SqliteConnection,
    image: &TransactionImage,
    sign: f64,
) -> DbResult<()> {
    let cust_id: i64 = sqlx::query_scalar("SELECT cust_id FROM invoices WHERE id = ?1")
        .bind(image.invoice_id)
        .fetch_one(&mut *conn)
        .await?;

    adjust_credit(conn, cust_id, sign * image.signed_amount()).await
}

/// Rule: transaction inserted.
pub(crate) async fn transaction_inserted(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
    let row = fetch_transaction_image(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Transaction", id))?;

    if row.status.is_completed() {
        settle_transaction(conn, &row, 1.0).await?;
    }

    Ok(())
}

/// Rule: transaction updated.
///
/// Reverse-old fires strictly before apply-new, so a completed→completed
/// update with unchanged values nets to zero, and any combination of
/// status/type/amount changes lands on the correct final balance.
pub(crate) async fn transaction_updated(
    conn: &mut SqliteConnection,
    old: &TransactionImage,
) -> DbResult<()> {
    let new = fetch_transaction_image(conn, old.id)
        .await?
        .ok_or_else(|| DbError::not_found("Transaction", old.id))?;

    if old.status.is_completed() {
        settle_transaction(conn, old, -1.0).await?;
    }
    if new.status.is_completed() {
        settle_transaction(conn, &new, 1.0).await?;
    }

    Ok(())
}

/// Rule: transaction deleted (the row itself, not an invoice cascade).
pub(crate) async fn transaction_deleted(
    conn: &mut SqliteConnection,
    old: &TransactionImage,
) -> DbResult<()> {
    if old.status.is_completed() {
        settle_transaction(conn, old, -1.0).await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn image(amount: f64, ty: Option<TransactionType>) -> TransactionImage {
        TransactionImage {
            id: 1,
            invoice_id: 1,
            amount,
            transaction_type: ty,
            status: TransactionStatus::Completed,
        }
    }

    #[test]
    fn test_signed_amount_by_type() {
        assert_eq!(image(50.0, Some(TransactionType::Payment)).signed_amount(), 50.0);
        assert_eq!(
            image(50.0, Some(TransactionType::Adjustment)).signed_amount(),
            50.0
        );
        assert_eq!(image(50.0, Some(TransactionType::Refund)).signed_amount(), -50.0);
        // Untyped rows behave like payments
        assert_eq!(image(50.0, None).signed_amount(), 50.0);
    }

    #[test]
    fn test_computed_net() {
        let inv = InvoiceImage {
            id: 1,
            cust_id: 1,
            status: InvoiceStatus::Unpaid,
            total_amount: 100.0,
            add_on: 10.0,
            discount: 5.0,
            net_amount: 0.0,
        };
        assert_eq!(inv.computed_net(), 105.0);
    }
}
