//! # khata-db: Database Layer for Khata
//!
//! This crate provides database access for the Khata billing system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Khata Data Flow                                 │
//! │                                                                         │
//! │  Bridge request ("create-invoice", [fields, items])                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     khata-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌──────────────┐    │   │
//! │  │   │   Database    │   │  Repositories │   │   Balance    │    │   │
//! │  │   │   (pool.rs)   │   │ customer.rs   │   │   Engine     │    │   │
//! │  │   │               │   │ invoice.rs    │   │ (balance.rs) │    │   │
//! │  │   │ SqlitePool    │◄──│ product.rs    │──►│ net_amount   │    │   │
//! │  │   │ 1 connection  │   │ transaction.rs│   │ debit/credit │    │   │
//! │  │   └───────────────┘   └───────────────┘   └──────────────┘    │   │
//! │  │           │                                                    │   │
//! │  │   ┌───────┴───────┐   ┌───────────────┐                       │   │
//! │  │   │  Migrations   │   │  First-run    │                       │   │
//! │  │   │  (embedded)   │   │  seed         │                       │   │
//! │  │   └───────────────┘   └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file at the per-user application-data location                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and the injectable [`Database`] handle
//! - [`migrations`] - Embedded schema provisioning
//! - [`balance`] - Derived-value maintenance (net amounts, customer balances)
//! - [`repository`] - Repository implementations per entity
//! - [`seed`] - First-run demo data
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use khata_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/khata.db")).await?;
//! let invoice = db.invoices().get(&"INV-001".into()).await?;
//! db.close().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

mod balance;

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::JsonMap;

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::payment_method::PaymentMethodRepository;
pub use repository::product::ProductRepository;
pub use repository::transaction::TransactionRepository;
