//! # Pricing
//!
//! Subtotal and discounted total derived from the settled ledger.
//!
//! ## Discount Stacking
//! ```text
//! subtotal = Σ (quantity - free_quantity) × price
//!
//! running = subtotal
//! for discount in applied (in application order):
//!     Fixed       running -= amount
//!     Percentage  running -= min(running × pct / 100, max_amount?)
//!
//! total = max(running, 0)
//! ```
//!
//! Each discount acts on the running total left by the ones before it, so
//! the order discounts were applied in changes the result:
//!
//! ```rust
//! use till_core::{apply_discount_stack, Discount, Money};
//!
//! let half = Discount::percentage("Half", 50, None).unwrap();
//! let flat = Discount::fixed("Flat", 250).unwrap();
//! let subtotal = Money::from_cents(25000);
//!
//! let a = apply_discount_stack(subtotal, &[half.clone(), flat.clone()]);
//! let b = apply_discount_stack(subtotal, &[flat, half]);
//! assert_eq!(a.cents(), 12250);
//! assert_eq!(b.cents(), 12375);
//! ```

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::cart::{Cart, CartItem};
use crate::catalog::Catalog;
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Discount;

/// Applies `discounts` in order to `subtotal` and floors the result at zero.
pub fn apply_discount_stack(subtotal: Money, discounts: &[Discount]) -> Money {
    let running = discounts.iter().fold(subtotal, |running, discount| {
        running.saturating_sub(discount.reduction(running))
    });
    running.non_negative()
}

/// Serializable summary of a settled cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartTotals {
    pub cart_id: Uuid,
    pub items: Vec<CartItem>,
    pub unique_count: usize,
    pub total_items: i64,
    pub subtotal: Money,
    pub discounts: Vec<String>,
    pub total: Money,
}

impl Cart {
    /// Sum of paid units times unit price. Free units are never charged.
    ///
    /// ## Errors
    /// - `ProductNotFound` if a line's product was removed from the catalog
    ///   after it was added
    /// - `OutOfRange` if a line total or the sum does not fit in an `i64`
    pub fn subtotal(&self, catalog: &Catalog) -> CoreResult<Money> {
        let mut subtotal = Money::zero();
        for item in self.items() {
            let product = catalog.product(item.product_id())?;
            subtotal = product
                .price()
                .checked_multiply_quantity(item.paid_quantity())
                .and_then(|line| subtotal.checked_add(line))
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: "subtotal".to_string(),
                    min: 0,
                    max: i64::MAX,
                })?;
        }
        Ok(subtotal.non_negative())
    }

    /// Subtotal after the applied discounts, in application order.
    pub fn total(&self, catalog: &Catalog) -> CoreResult<Money> {
        let subtotal = self.subtotal(catalog)?;
        Ok(apply_discount_stack(subtotal, &self.applied_discounts))
    }

    /// Applies a registered discount by name.
    ///
    /// The cart keeps its own copy, so later registry changes do not affect
    /// a discount that is already applied. Returns `false` when the discount
    /// was already applied.
    ///
    /// ## Errors
    /// `DiscountNotFound` if no discount has that name.
    pub fn apply_discount(&mut self, catalog: &Catalog, name: &str) -> CoreResult<bool> {
        let discount = catalog.discount(name)?;
        if self.applied_discounts.iter().any(|d| d.name() == name) {
            debug!(name = %name, "Discount already applied");
            return Ok(false);
        }

        debug!(name = %name, kind = %discount.kind(), amount = discount.amount(), "Applying discount");
        self.applied_discounts.push(discount.clone());
        Ok(true)
    }

    /// Removes an applied discount. Returns `false` if it was not applied.
    pub fn remove_discount(&mut self, name: &str) -> bool {
        let before = self.applied_discounts.len();
        self.applied_discounts.retain(|d| d.name() != name);
        let removed = self.applied_discounts.len() != before;
        debug!(name = %name, removed, "Removing discount");
        removed
    }

    /// Applied discounts in application order.
    pub fn applied_discounts(&self) -> &[Discount] {
        &self.applied_discounts
    }

    pub fn totals(&self, catalog: &Catalog) -> CoreResult<CartTotals> {
        Ok(CartTotals {
            cart_id: self.id(),
            items: self.items().to_vec(),
            unique_count: self.unique_count(),
            total_items: self.total_items_count(),
            subtotal: self.subtotal(catalog)?,
            discounts: self
                .applied_discounts
                .iter()
                .map(|d| d.name().to_string())
                .collect(),
            total: self.total(catalog)?,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
