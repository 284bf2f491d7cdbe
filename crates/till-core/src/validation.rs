//! # Validation Module
//!
//! Input validation utilities for Till.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Points                                  │
//! │                                                                         │
//! │  Constructors (types.rs, cart.rs)                                      │
//! │  ├── Product::new, Discount::fixed/percentage, PromotionRule           │
//! │  └── CartItem::new - quantity / free quantity bounds                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Registries (catalog.rs)                                               │
//! │  └── Duplicate ids / names, referenced products exist                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Ledger (cart.rs)                                                      │
//! │  └── Every mutation validated on a staged copy before commit           │
//! │                                                                         │
//! │  A value that exists has already passed every check in this file.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_quantity, validate_percentage};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_quantity(-1).is_err());
//! assert!(validate_percentage(101).is_err());
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted product or discount name.
pub const MAX_NAME_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product name, discount name).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LEN`] characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Product 1").is_ok());
/// assert!(validate_product_name("").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a cart quantity.
///
/// ## Rules
/// - Must not be negative (zero is allowed; a zero line is purged on commit)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::Negative {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates the free portion of a cart line.
///
/// ## Rules
/// - `0 <= free_qty <= qty`
///
/// ## User Workflow
/// ```text
/// update_by_relative(2, -4) on { quantity: 8, free_quantity: 5 }
///      │
///      ▼
/// validate_free_quantity(5, 4) ← THIS FUNCTION
///      │
///      └── 5 > 4 → Error: "free_quantity cannot be greater than quantity"
/// ```
pub fn validate_free_quantity(free_qty: i64, qty: i64) -> ValidationResult<()> {
    if free_qty < 0 {
        return Err(ValidationError::Negative {
            field: "free_quantity".to_string(),
        });
    }

    if free_qty > qty {
        return Err(ValidationError::Exceeds {
            field: "free_quantity".to_string(),
            limit: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a fixed discount amount or a percentage cap, in cents.
pub fn validate_discount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage discount amount.
///
/// ## Rules
/// - Whole percent between 0 and 100 inclusive
pub fn validate_percentage(percent: i64) -> ValidationResult<()> {
    if !(0..=100).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: "percentage".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates a promotion threshold or grant quantity.
///
/// ## Rules
/// - Must be at least 1 (a zero threshold would divide by zero, a zero
///   grant is not a promotion)
pub fn validate_promotion_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty < 1 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Converts the result of checked quantity arithmetic.
///
/// `None` means the sum or product left the `i64` range; that is reported
/// as `OutOfRange` so the staged write is rejected instead of wrapping.
///
/// ## Example
/// ```rust
/// use till_core::validation::checked_quantity;
///
/// assert_eq!(checked_quantity("quantity", 3i64.checked_add(4)).unwrap(), 7);
/// assert!(checked_quantity("quantity", i64::MAX.checked_add(1)).is_err());
/// ```
pub fn checked_quantity(field: &str, value: Option<i64>) -> ValidationResult<i64> {
    value.ok_or_else(|| ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    })
}

/// Next sequential id after `last`, failing once the id space is used up.
pub fn next_id(field: &str, last: u64) -> ValidationResult<u64> {
    last.checked_add(1).ok_or_else(|| ValidationError::Exceeds {
        field: field.to_string(),
        limit: u64::MAX.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Product 1").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(0).is_ok());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());
        assert!(validate_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_free_quantity() {
        assert!(validate_free_quantity(0, 0).is_ok());
        assert!(validate_free_quantity(5, 5).is_ok());
        assert!(validate_free_quantity(2, 5).is_ok());

        assert!(matches!(
            validate_free_quantity(6, 5),
            Err(ValidationError::Exceeds { .. })
        ));
        assert!(matches!(
            validate_free_quantity(-1, 5),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage(0).is_ok());
        assert!(validate_percentage(50).is_ok());
        assert!(validate_percentage(100).is_ok());
        assert!(validate_percentage(-1).is_err());
        assert!(validate_percentage(101).is_err());
    }

    #[test]
    fn test_checked_quantity() {
        assert_eq!(checked_quantity("quantity", Some(5)).unwrap(), 5);
        assert!(matches!(
            checked_quantity("quantity", i64::MAX.checked_mul(2)),
            Err(ValidationError::OutOfRange { min: 0, max: i64::MAX, .. })
        ));
    }

    #[test]
    fn test_next_id() {
        assert_eq!(next_id("product id", 0).unwrap(), 1);
        assert!(matches!(
            next_id("product id", u64::MAX),
            Err(ValidationError::Exceeds { .. })
        ));
    }

    #[test]
    fn test_validate_promotion_quantity() {
        assert!(validate_promotion_quantity("buy_quantity", 1).is_ok());
        assert!(validate_promotion_quantity("buy_quantity", 0).is_err());
        assert!(validate_promotion_quantity("get_quantity", -3).is_err());
    }
}
