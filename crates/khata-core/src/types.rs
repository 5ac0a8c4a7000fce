//! # Domain Types
//!
//! Core entity types for the Khata billing system.
//!
//! ## Dual-Key Identity Pattern
//! Invoices and transactions carry two identifiers:
//! - `id`: integer surrogate key assigned by the store, used for relations
//! - Business key (`invoice_id`, `transaction_id`): human-meaningful unique
//!   identifier supplied by the caller
//!
//! ## Derived Fields
//! `Invoice::net_amount`, `InvoiceItem::amount`, and the customer balances
//! (`credit_balance`, `debit_balance`) are maintained by the balance engine
//! in khata-db. Callers never write them directly; the repository layer
//! rejects attempts to do so.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Status Enums
// =============================================================================

/// Payment status of an invoice.
///
/// Stored as lowercase TEXT (`'unpaid'` / `'paid'`), matching the schema
/// CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Amount is still owed by the customer.
    Unpaid,
    /// Invoice has been settled; its net amount counts toward credit.
    Paid,
}

impl InvoiceStatus {
    /// Whether this status contributes the invoice's net amount to the
    /// customer's credit balance.
    #[inline]
    pub const fn is_paid(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

/// Kind of money movement a transaction represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money received from the customer.
    Payment,
    /// Money returned to the customer.
    Refund,
    /// Manual balance correction, treated like a payment.
    Adjustment,
}

/// Processing state of a transaction.
///
/// Only `Completed` transactions affect customer balances; transitions into
/// and out of `Completed` apply or reverse the effect exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Whether a transaction in this status has been applied to balances.
    #[inline]
    pub const fn is_completed(&self) -> bool {
        matches!(self, TransactionStatus::Completed)
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Pending
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer account with balance tracking.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    /// Surrogate key assigned by the store.
    pub id: i64,

    /// Optional external (sync) customer identifier.
    pub fs_cust_id: Option<String>,

    /// Display name. The only required field on creation.
    pub name: String,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub state_name: Option<String>,
    pub district_name: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,

    /// Cumulative amount credited via paid invoices and completed
    /// payment/adjustment transactions, net of refunds. Balance-engine owned.
    pub credit_balance: f64,

    /// Cumulative amount owed across all invoices. Balance-engine owned.
    pub debit_balance: f64,

    #[ts(as = "String")]
    pub created_at: NaiveDateTime,
    #[ts(as = "String")]
    pub last_updated: NaiveDateTime,

    /// Whether this row has been pushed to the remote sync target.
    pub sp_synced: bool,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for invoicing.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Stock Keeping Unit - unique business identifier.
    pub fs_sku: String,

    /// External product identifier.
    pub fs_prod_id: String,
    /// External variation identifier.
    pub fs_variation_id: String,
    /// External category identifier.
    pub fs_category_id: String,

    pub category_name: String,
    pub prod_name: String,

    /// Unit price. Must be positive (enforced by the schema).
    pub price: f64,

    /// Units on hand. Non-negative by convention, not enforced.
    pub stock: i64,

    #[ts(as = "String")]
    pub last_updated: NaiveDateTime,
    pub sp_synced: bool,
}

/// Input for creating a product. All identifier fields are required because
/// each carries a UNIQUE constraint.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub fs_sku: String,
    pub fs_prod_id: String,
    pub fs_variation_id: String,
    pub fs_category_id: String,
    pub category_name: String,
    pub prod_name: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
}

// =============================================================================
// Invoice
// =============================================================================

/// An invoice owed by a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: i64,

    /// Business key, e.g. `INV-2026-0042`. Unique, immutable.
    pub invoice_id: String,

    /// Owning customer (cascade delete).
    pub cust_id: i64,

    pub status: InvoiceStatus,

    #[ts(as = "String")]
    pub date: NaiveDateTime,

    pub total_amount: f64,
    pub add_on: f64,
    pub discount: f64,

    /// Derived: `total_amount + add_on - discount`. Balance-engine owned.
    pub net_amount: f64,

    pub narration: Option<String>,
    pub transport: Option<String>,
    /// Package/bundle count for logistics.
    pub nugs: i64,
    pub place_of_supply: Option<String>,

    #[ts(as = "String")]
    pub created_at: NaiveDateTime,
    #[ts(as = "String")]
    pub last_updated: NaiveDateTime,
    pub sp_synced: bool,
}

/// A line item belonging to exactly one invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceItem {
    pub id: i64,

    /// Owning invoice surrogate id (cascade delete).
    pub invoice_id: i64,

    /// Referenced product surrogate id. Reconciliation key within an invoice.
    pub item_id: i64,

    /// Referenced product SKU, frozen on the line.
    pub sku: String,

    pub price: f64,
    pub qty: i64,

    /// Derived: `price * qty`. Balance-engine owned.
    pub amount: f64,

    #[ts(as = "String")]
    pub last_updated: NaiveDateTime,
    pub sp_synced: bool,
}

/// An invoice merged with its current line items; the shape every invoice
/// operation returns across the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub invoice_items: Vec<InvoiceItem>,
}

/// Lookup key for invoice operations: the surrogate id when the caller
/// passes a number, the business `invoice_id` when it passes a string.
#[derive(Debug, Clone, PartialEq)]
pub enum InvoiceKey {
    Id(i64),
    BusinessId(String),
}

impl std::fmt::Display for InvoiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceKey::Id(id) => write!(f, "{id}"),
            InvoiceKey::BusinessId(key) => f.write_str(key),
        }
    }
}

impl From<i64> for InvoiceKey {
    fn from(id: i64) -> Self {
        InvoiceKey::Id(id)
    }
}

impl From<&str> for InvoiceKey {
    fn from(key: &str) -> Self {
        InvoiceKey::BusinessId(key.to_string())
    }
}

impl From<String> for InvoiceKey {
    fn from(key: String) -> Self {
        InvoiceKey::BusinessId(key)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A money movement recorded against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: i64,

    /// Business key, e.g. `TXN-2026-0108`. Unique, immutable.
    pub transaction_id: String,

    /// Owning invoice surrogate id (cascade delete). Immutable after
    /// creation; reassigning a transaction to another invoice is rejected.
    pub invoice_id: i64,

    /// Optional reference to a payment method (set NULL on method delete).
    pub payment_method: Option<i64>,

    #[ts(as = "String")]
    pub transaction_date: NaiveDateTime,

    pub amount: f64,

    /// Nullable in the schema; a missing type is treated as a payment by the
    /// balance engine.
    pub transaction_type: Option<TransactionType>,

    pub status: TransactionStatus,

    pub narration: Option<String>,

    #[ts(as = "String")]
    pub created_at: NaiveDateTime,
    #[ts(as = "String")]
    pub last_updated: NaiveDateTime,
    pub sp_synced: bool,
}

// =============================================================================
// Payment Method
// =============================================================================

/// A reference entity describing how a transaction was settled.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
    /// Account number the payment settles into.
    pub ac_no: String,
    #[ts(as = "String")]
    pub last_updated: NaiveDateTime,
    pub sp_synced: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
