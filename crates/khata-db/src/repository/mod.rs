//! # Repository Implementations
//!
//! One repository per entity, all sharing the same contract:
//!
//! - every multi-statement write runs inside a single transaction that rolls
//!   back completely on any failure
//! - the balance engine fires inside that same transaction, so derived
//!   values and balances share the rollback scope with the raw write
//! - partial-field inputs pass through explicit allow-lists ([`fields`])
//!   before any SQL is built
//!
//! ```text
//! repository/
//! ├── mod.rs            ◄─── You are here (exports)
//! ├── fields.rs         ◄─── Allow-listed dynamic SQL construction
//! ├── customer.rs       ◄─── Customer CRUD + AND filtering
//! ├── invoice.rs        ◄─── Invoice + line items, reconciliation
//! ├── product.rs        ◄─── Product CRUD + OR filtering
//! ├── transaction.rs    ◄─── Transactions with balance settlement
//! └── payment_method.rs ◄─── Payment method reference data
//! ```

pub(crate) mod fields;

pub mod customer;
pub mod invoice;
pub mod payment_method;
pub mod product;
pub mod transaction;

pub use fields::JsonMap;
