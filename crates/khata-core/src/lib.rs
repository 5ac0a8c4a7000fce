//! # khata-core: Pure Domain Types for Khata
//!
//! This crate is the foundation of the Khata billing system. It contains the
//! entity types, status enums, validation rules, and typed errors shared by
//! the database layer and the process boundary; with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Khata Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI Process (out of scope)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ IPC (JSON request/response)            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    khata-bridge                                 │   │
//! │  │     dispatch by operation name → uniform result envelope        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ khata-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐      ┌───────────┐      ┌───────────┐          │   │
//! │  │   │   types   │      │validation │      │   error   │          │   │
//! │  │   │ Customer  │      │   rules   │      │Validation │          │   │
//! │  │   │ Invoice   │      │  checks   │      │Validation │          │   │
//! │  │   └───────────┘      └───────────┘      └───────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE TYPES               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    khata-db (Database Layer)                    │   │
//! │  │        SQLite schema, balance engine, repositories              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity types (Customer, Invoice, InvoiceItem, Transaction, ...)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Types**: No I/O, no database, no network access here
//! 2. **Explicit Errors**: All errors are typed enums, never bare strings
//! 3. **Derived Values Stay Derived**: `net_amount`, `amount`, and the
//!    customer balances appear on entities as read-only outputs of the
//!    balance engine; nothing in this crate computes or mutates them

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use khata_core::Customer` instead of
// `use khata_core::types::Customer`

pub use error::ValidationError;
pub use types::*;
