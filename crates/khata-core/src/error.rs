//! # Error Types
//!
//! Domain-specific error types for khata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  khata-core errors (this file)                                         │
//! │  └── ValidationError  - Input/precondition failures                    │
//! │                                                                         │
//! │  khata-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │      (wraps ValidationError as its Precondition variant)               │
//! │                                                                         │
//! │  khata-bridge (boundary)                                               │
//! │  └── failure envelope - { success: false, error: "..." }               │
//! │                                                                         │
//! │  Flow: ValidationError → DbError → failure envelope → UI               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field name, key, id)
//! 3. Errors are enum variants, never String
//! 4. Precondition errors are checked before any write begins, so a caller
//!    seeing one can rely on zero partial effects

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input/precondition errors.
///
/// These are reported before any write begins; an operation failing with one
/// of these has had no effect on the database.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A key is not in the entity's allow-list.
    #[error("unknown {entity} field: {field}")]
    UnknownField { entity: String, field: String },

    /// A key names a field that cannot be written through this operation.
    #[error("{field} cannot be updated")]
    ImmutableField { field: String },

    /// An update was requested with no fields to change.
    #[error("no fields to update")]
    EmptyUpdate,

    /// A field value has the wrong shape for its column.
    #[error("{field} has invalid value: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Unit Tests
// =============================================================================
