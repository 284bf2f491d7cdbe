//! # till-core: Cart, Promotion and Pricing Logic for Till
//!
//! This crate is the **heart** of Till. It keeps a shopping cart consistent
//! with "buy X get Y" promotions and prices it through a stack of discounts,
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    till-cli (runner binary)                     │   │
//! │  │    config ──► seed file ──► replay steps ──► print summary      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ direct calls                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  catalog  │  │   cart    │  │ reconcile │  │  pricing  │  │   │
//! │  │   │ products  │─►│  ledger   │─►│ grant +   │  │ subtotal  │  │   │
//! │  │   │ discounts │  │ mutations │  │ claw-back │  │ discounts │  │   │
//! │  │   │ promos    │  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   └───────────┘                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   error   │  │ validation│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO GLOBALS • SYNCHRONOUS                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Discount, PromotionRule)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`catalog`] - Product, discount and promotion registries
//! - [`cart`] - Cart ledger and mutation entry points
//! - [`reconcile`] - Promotion settlement pass
//! - [`pricing`] - Subtotal, discount stacking and totals
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Explicit Services**: The catalog is a value passed by reference, not a global
//! 2. **One Settlement Per Write**: Every external cart write is followed by exactly one flat settlement pass
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Atomic Writes**: A failed call leaves the cart exactly as it was
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::{Cart, Catalog, ItemOptions, NewDiscount, NewProduct, NewPromotion, ProductId};
//!
//! let mut catalog = Catalog::new();
//! catalog.add_products(vec![
//!     NewProduct::new("Product 1", 50).with_id(1),
//!     NewProduct::new("Product 2", 150).with_id(2),
//! ]).unwrap();
//! catalog.add_discount(NewDiscount::percentage("Half", 50)).unwrap();
//! catalog.add_promotion(NewPromotion::new(1, 2)).unwrap();
//!
//! let mut cart = Cart::new();
//! cart.add(&catalog, ProductId::new(1), ItemOptions::paid()).unwrap();
//! cart.update(&catalog, ProductId::new(1), 4, ItemOptions::paid()).unwrap();
//!
//! // Four paid units of product 1 earn four free units of product 2
//! assert_eq!(cart.get(ProductId::new(2)).unwrap().free_quantity(), 4);
//! assert_eq!(cart.subtotal(&catalog).unwrap().cents(), 200);
//!
//! cart.apply_discount(&catalog, "Half").unwrap();
//! assert_eq!(cart.total(&catalog).unwrap().cents(), 100);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod pricing;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use till_core::Money` instead of
// `use till_core::money::Money`

pub use cart::{Cart, CartItem, CartLedger, ItemOptions, LedgerSnapshot};
pub use catalog::{Catalog, DiscountRegistry, ProductCatalog, PromotionRegistry};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{apply_discount_stack, CartTotals};
pub use reconcile::{FreeAdjustment, Reconciler, Settlement};
pub use types::*;
