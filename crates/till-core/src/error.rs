//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Lookup failures and cart rule violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-cli errors (separate crate)                                      │
//! │  └── CliError         - Config, seed file and I/O failures             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CliError → exit status            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, discount name, etc.)
//! 3. Errors are enum variants, never String
//! 4. Every error is raised before any state changes

use thiserror::Error;

use crate::types::{ProductId, PromotionId};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// The `*NotFound` variants and [`CoreError::ItemNotInCart`] form the
/// "not found" family; use [`CoreError::is_not_found`] to test for it.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id is not in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// No discount registered under this name.
    #[error("Discount not found: {0}")]
    DiscountNotFound(String),

    /// No promotion rule with this id.
    #[error("Promotion not found: {0}")]
    PromotionNotFound(PromotionId),

    /// The product exists in the catalog but has no line in the cart.
    ///
    /// ## When This Occurs
    /// - `update` / `update_by_relative` before the product was added
    /// - `remove` of a product that was never added (or already removed)
    #[error("Product {0} is not in the cart")]
    ItemNotInCart(ProductId),

    /// `add` was called for a product that already has a cart line.
    ///
    /// ## User Workflow
    /// ```text
    /// add(1) ──► OK (quantity 1)
    /// add(1) ──► ItemAlreadyInCart(1)
    ///              │
    ///              ▼
    /// caller switches to update(1, 2)
    /// ```
    #[error("Product {0} is already in the cart, update it instead")]
    ItemAlreadyInCart(ProductId),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for the NotFound family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ProductNotFound(_)
                | CoreError::DiscountNotFound(_)
                | CoreError::PromotionNotFound(_)
                | CoreError::ItemNotInCart(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by constructors and by the ledger before any mutation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// One field exceeds another it is bounded by.
    #[error("{field} cannot be greater than {limit}")]
    Exceeds { field: String, limit: String },

    /// Duplicate value (e.g., duplicate product id or discount name).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
