//! # Validation Module
//!
//! Input validation for values crossing the process boundary.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Boundary adapter (khata-bridge)                              │
//! │  ├── Argument count/shape checks                                       │
//! │  └── JSON deserialization                                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + the per-entity field allow-lists               │
//! │  ├── Required business keys present                                    │
//! │  └── Value ranges (qty > 0, price > 0)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / CHECK constraints                             │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest business key accepted (`invoice_id`, `transaction_id`, SKUs).
pub const MAX_BUSINESS_KEY_LEN: usize = 64;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a business key (invoice_id, transaction_id, fs_sku).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most [`MAX_BUSINESS_KEY_LEN`] characters
pub fn validate_business_key(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_BUSINESS_KEY_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_BUSINESS_KEY_LEN,
        });
    }

    Ok(())
}

/// Validates a customer name.
pub fn validate_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity. Must be positive; the schema enforces the same
/// rule with a CHECK constraint.
pub fn validate_qty(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "qty".to_string(),
        });
    }

    Ok(())
}

/// Validates a product price. Must be positive; mirrors the schema CHECK.
pub fn validate_price(price: f64) -> ValidationResult<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a monetary amount supplied by a caller. Rejects NaN/infinity,
/// which would poison balance arithmetic.
pub fn validate_amount(field: &str, amount: f64) -> ValidationResult<()> {
    if !amount.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_business_key() {
        assert!(validate_business_key("invoice_id", "INV-001").is_ok());
        assert!(validate_business_key("invoice_id", "").is_err());
        assert!(validate_business_key("invoice_id", "   ").is_err());
        assert!(validate_business_key("invoice_id", &"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Demo Customer").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("  ").is_err());
    }

    #[test]
    fn test_validate_qty() {
        assert!(validate_qty(1).is_ok());
        assert!(validate_qty(999).is_ok());
        assert!(validate_qty(0).is_err());
        assert!(validate_qty(-3).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(100.0).is_ok());
        assert!(validate_price(0.0).is_err());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount("amount", 50.0).is_ok());
        assert!(validate_amount("amount", -50.0).is_ok());
        assert!(validate_amount("amount", f64::INFINITY).is_err());
    }
}
