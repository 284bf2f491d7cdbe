//! # Domain Types
//!
//! Core domain types used throughout Till.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Discount     │   │  PromotionRule  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  name (key)     │   │  id             │       │
//! │  │  name           │   │  kind           │   │  buy → get      │       │
//! │  │  price_cents    │   │  amount         │   │  buy/get qty    │       │
//! │  └─────────────────┘   │  max_amount     │   │  once           │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Bulk-load inputs: NewProduct, NewDiscount, NewPromotion               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Construction Pattern
//! Every domain value is built through a validating constructor and has no
//! public setters. "Editing" a value (e.g. a price change) produces a new,
//! re-validated value via the `with_*` methods.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;
use crate::validation::{
    checked_quantity, validate_discount_cents, validate_name, validate_percentage,
    validate_price_cents, validate_product_name, validate_promotion_quantity, ValidationResult,
};

// =============================================================================
// Identifiers
// =============================================================================

/// Catalog identity of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        ProductId(id)
    }

    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        ProductId(id)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry-allocated identity of a promotion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromotionId(u64);

impl PromotionId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        PromotionId(id)
    }

    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PromotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    id: ProductId,
    name: String,
    price_cents: i64,
}

impl Product {
    /// Creates a validated product.
    pub fn new(id: ProductId, name: impl Into<String>, price_cents: i64) -> ValidationResult<Self> {
        let name = name.into();
        validate_product_name(&name)?;
        validate_price_cents(price_cents)?;

        Ok(Product {
            id,
            name,
            price_cents,
        })
    }

    #[inline]
    pub fn id(&self) -> ProductId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn price_cents(&self) -> i64 {
        self.price_cents
    }

    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns a copy with a new price, validated.
    pub fn with_price(&self, price_cents: i64) -> ValidationResult<Self> {
        Product::new(self.id, self.name.clone(), price_cents)
    }

    /// Returns a copy with a new name, validated.
    pub fn with_name(&self, name: impl Into<String>) -> ValidationResult<Self> {
        Product::new(self.id, name, self.price_cents)
    }
}

/// Bulk-load input for a product: `{ id?, name, price }`.
///
/// A missing `id` is allocated by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    #[serde(default)]
    pub id: Option<ProductId>,
    pub name: String,
    #[serde(alias = "price")]
    pub price_cents: i64,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price_cents: i64) -> Self {
        NewProduct {
            id: None,
            name: name.into(),
            price_cents,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(ProductId::new(id));
        self
    }
}

// =============================================================================
// Discount
// =============================================================================

/// How a discount reduces the running total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Flat amount in cents.
    Fixed,
    /// Whole percent of the running total, optionally capped.
    Percentage,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountKind::Fixed => write!(f, "fixed"),
            DiscountKind::Percentage => write!(f, "percentage"),
        }
    }
}

/// A named discount that can be applied to a cart.
///
/// ## Invariants
/// - Fixed: `amount >= 0` cents and the cap equals the amount
/// - Percentage: `0 <= amount <= 100`, optional cap `>= 0` cents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discount {
    name: String,
    kind: DiscountKind,
    amount: i64,
    max_amount_cents: Option<i64>,
}

impl Discount {
    /// Creates a fixed discount of `amount_cents`.
    pub fn fixed(name: impl Into<String>, amount_cents: i64) -> ValidationResult<Self> {
        let name = name.into();
        validate_name("discount name", &name)?;
        validate_discount_cents("amount", amount_cents)?;

        Ok(Discount {
            name,
            kind: DiscountKind::Fixed,
            amount: amount_cents,
            max_amount_cents: Some(amount_cents),
        })
    }

    /// Creates a percentage discount, optionally capped at `max_amount_cents`.
    pub fn percentage(
        name: impl Into<String>,
        percent: i64,
        max_amount_cents: Option<i64>,
    ) -> ValidationResult<Self> {
        let name = name.into();
        validate_name("discount name", &name)?;
        validate_percentage(percent)?;
        if let Some(cap) = max_amount_cents {
            validate_discount_cents("max_amount", cap)?;
        }

        Ok(Discount {
            name,
            kind: DiscountKind::Percentage,
            amount: percent,
            max_amount_cents,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> DiscountKind {
        self.kind
    }

    /// Cents for a fixed discount, whole percent for a percentage discount.
    #[inline]
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// The cap on the absolute reduction. Always `Some(amount)` for fixed.
    #[inline]
    pub fn max_amount(&self) -> Option<Money> {
        self.max_amount_cents.map(Money::from_cents)
    }

    /// How much this discount takes off `running`.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::{Discount, Money};
    ///
    /// let half = Discount::percentage("Half", 50, None).unwrap();
    /// assert_eq!(half.reduction(Money::from_cents(25000)).cents(), 12500);
    ///
    /// let capped = Discount::percentage("All", 100, Some(500)).unwrap();
    /// assert_eq!(capped.reduction(Money::from_cents(1450)).cents(), 500);
    /// ```
    pub fn reduction(&self, running: Money) -> Money {
        match self.kind {
            DiscountKind::Fixed => Money::from_cents(self.amount),
            DiscountKind::Percentage => {
                let computed = running.percent_of(self.amount);
                match self.max_amount() {
                    Some(cap) => computed.min(cap),
                    None => computed,
                }
            }
        }
    }
}

impl TryFrom<NewDiscount> for Discount {
    type Error = crate::error::ValidationError;

    fn try_from(input: NewDiscount) -> ValidationResult<Self> {
        match input.kind {
            DiscountKind::Fixed => Discount::fixed(input.name, input.amount),
            DiscountKind::Percentage => {
                Discount::percentage(input.name, input.amount, input.max_amount)
            }
        }
    }
}

/// Bulk-load input for a discount: `{ name, kind, amount, max_amount? }`.
///
/// `max_amount` is ignored for fixed discounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDiscount {
    pub name: String,
    pub kind: DiscountKind,
    pub amount: i64,
    #[serde(default)]
    pub max_amount: Option<i64>,
}

impl NewDiscount {
    pub fn fixed(name: impl Into<String>, amount_cents: i64) -> Self {
        NewDiscount {
            name: name.into(),
            kind: DiscountKind::Fixed,
            amount: amount_cents,
            max_amount: None,
        }
    }

    pub fn percentage(name: impl Into<String>, percent: i64) -> Self {
        NewDiscount {
            name: name.into(),
            kind: DiscountKind::Percentage,
            amount: percent,
            max_amount: None,
        }
    }

    pub fn with_max_amount(mut self, cents: i64) -> Self {
        self.max_amount = Some(cents);
        self
    }
}

// =============================================================================
// Promotion Rule
// =============================================================================

/// A "buy X get Y" rule.
///
/// ## Grant Modes
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  REPEATING (once = false)                                              │
/// │    grant = floor((quantity - free_quantity) / buy_quantity)            │
/// │            × get_quantity                                              │
/// │    Only paid units of X count, so X's own freebies never earn more.    │
/// │                                                                         │
/// │  ONCE (once = true)                                                    │
/// │    grant = get_quantity   if quantity >= buy_quantity                  │
/// │          = 0              otherwise (previous grant is clawed back)    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionRule {
    id: PromotionId,
    buy_product_id: ProductId,
    get_product_id: ProductId,
    buy_quantity: i64,
    get_quantity: i64,
    once: bool,
}

impl PromotionRule {
    /// Creates a validated rule. Product existence is checked by the registry.
    pub fn new(id: PromotionId, input: &NewPromotion) -> ValidationResult<Self> {
        validate_promotion_quantity("buy_quantity", input.buy_quantity)?;
        validate_promotion_quantity("get_quantity", input.get_quantity)?;

        Ok(PromotionRule {
            id,
            buy_product_id: input.buy_product_id,
            get_product_id: input.get_product_id,
            buy_quantity: input.buy_quantity,
            get_quantity: input.get_quantity,
            once: input.once,
        })
    }

    #[inline]
    pub fn id(&self) -> PromotionId {
        self.id
    }

    #[inline]
    pub fn buy_product_id(&self) -> ProductId {
        self.buy_product_id
    }

    #[inline]
    pub fn get_product_id(&self) -> ProductId {
        self.get_product_id
    }

    #[inline]
    pub fn buy_quantity(&self) -> i64 {
        self.buy_quantity
    }

    #[inline]
    pub fn get_quantity(&self) -> i64 {
        self.get_quantity
    }

    #[inline]
    pub fn once(&self) -> bool {
        self.once
    }

    /// Whether a once rule's threshold is met by the raw line quantity.
    #[inline]
    pub fn threshold_met(&self, quantity: i64) -> bool {
        quantity >= self.buy_quantity
    }

    /// Free units of the target this rule grants for a trigger line holding
    /// `quantity` units, `free_quantity` of them promotional.
    ///
    /// ## Errors
    /// `OutOfRange` when a repeating grant does not fit in an `i64`.
    pub fn grant(&self, quantity: i64, free_quantity: i64) -> ValidationResult<i64> {
        if self.once {
            if self.threshold_met(quantity) {
                Ok(self.get_quantity)
            } else {
                Ok(0)
            }
        } else {
            let paid = quantity.saturating_sub(free_quantity).max(0);
            checked_quantity(
                "free_quantity",
                (paid / self.buy_quantity).checked_mul(self.get_quantity),
            )
        }
    }
}

fn default_one() -> i64 {
    1
}

/// Bulk-load input for a promotion rule:
/// `{ buy_product_id, get_product_id, buy_quantity?, get_quantity?, once? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPromotion {
    pub buy_product_id: ProductId,
    pub get_product_id: ProductId,
    #[serde(default = "default_one")]
    pub buy_quantity: i64,
    #[serde(default = "default_one")]
    pub get_quantity: i64,
    #[serde(default)]
    pub once: bool,
}

impl NewPromotion {
    /// Buy one of `buy`, get one of `get`, repeating.
    pub fn new(buy: u64, get: u64) -> Self {
        NewPromotion {
            buy_product_id: ProductId::new(buy),
            get_product_id: ProductId::new(get),
            buy_quantity: default_one(),
            get_quantity: default_one(),
            once: false,
        }
    }

    pub fn buy_quantity(mut self, qty: i64) -> Self {
        self.buy_quantity = qty;
        self
    }

    pub fn get_quantity(mut self, qty: i64) -> Self {
        self.get_quantity = qty;
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_product_validation() {
        let product = Product::new(ProductId::new(1), "Product 1", 50).unwrap();
        assert_eq!(product.price().cents(), 50);
        assert_eq!(product.name(), "Product 1");

        assert!(Product::new(ProductId::new(1), "", 50).is_err());
        assert!(Product::new(ProductId::new(1), "Product 1", -1).is_err());
    }

    #[test]
    fn test_product_edits_are_validated() {
        let product = Product::new(ProductId::new(1), "Product 1", 50).unwrap();

        let repriced = product.with_price(75).unwrap();
        assert_eq!(repriced.price_cents(), 75);
        assert_eq!(product.price_cents(), 50);

        assert!(product.with_price(-5).is_err());
        assert!(product.with_name("  ").is_err());
    }

    #[test]
    fn test_fixed_discount_cap_equals_amount() {
        let discount = Discount::fixed("Discount 2", 250).unwrap();
        assert_eq!(discount.kind(), DiscountKind::Fixed);
        assert_eq!(discount.max_amount(), Some(Money::from_cents(250)));
        assert_eq!(discount.reduction(Money::from_cents(50)).cents(), 250);

        assert!(matches!(
            Discount::fixed("Bad", -1),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn test_percentage_discount_range() {
        assert!(Discount::percentage("Zero", 0, None).is_ok());
        assert!(Discount::percentage("All", 100, None).is_ok());
        assert!(matches!(
            Discount::percentage("Too much", 101, None),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(Discount::percentage("Negative cap", 10, Some(-1)).is_err());
    }

    #[test]
    fn test_new_discount_conversion() {
        let input = NewDiscount::fixed("Flat", 500).with_max_amount(10);
        let discount = Discount::try_from(input).unwrap();
        // The cap of a fixed discount always tracks its amount
        assert_eq!(discount.max_amount(), Some(Money::from_cents(500)));

        let input = NewDiscount::percentage("Half", 50).with_max_amount(100);
        let discount = Discount::try_from(input).unwrap();
        assert_eq!(discount.reduction(Money::from_cents(1000)).cents(), 100);
    }

    #[test]
    fn test_promotion_defaults_from_json() {
        let input: NewPromotion =
            serde_json::from_str(r#"{"buy_product_id": 1, "get_product_id": 2}"#).unwrap();
        assert_eq!(input.buy_quantity, 1);
        assert_eq!(input.get_quantity, 1);
        assert!(!input.once);
    }

    #[test]
    fn test_promotion_quantities_must_be_positive() {
        let input = NewPromotion::new(1, 2).buy_quantity(0);
        assert!(PromotionRule::new(PromotionId::new(1), &input).is_err());

        let input = NewPromotion::new(1, 2).get_quantity(0);
        assert!(PromotionRule::new(PromotionId::new(1), &input).is_err());
    }

    #[test]
    fn test_repeating_grant_ignores_own_free_units() {
        let input = NewPromotion::new(1, 2).buy_quantity(2).get_quantity(3);
        let rule = PromotionRule::new(PromotionId::new(1), &input).unwrap();

        assert_eq!(rule.grant(1, 0).unwrap(), 0);
        assert_eq!(rule.grant(2, 0).unwrap(), 3);
        assert_eq!(rule.grant(5, 0).unwrap(), 6);
        // 5 units, 2 of them free: only 3 paid → one multiple
        assert_eq!(rule.grant(5, 2).unwrap(), 3);
    }

    #[test]
    fn test_once_grant_is_flat() {
        let input = NewPromotion::new(1, 2).buy_quantity(3).get_quantity(5).once();
        let rule = PromotionRule::new(PromotionId::new(1), &input).unwrap();

        assert_eq!(rule.grant(2, 0).unwrap(), 0);
        assert_eq!(rule.grant(3, 0).unwrap(), 5);
        assert_eq!(rule.grant(30, 0).unwrap(), 5);
    }

    #[test]
    fn test_repeating_grant_overflow() {
        let input = NewPromotion::new(1, 2).get_quantity(i64::MAX / 2);
        let rule = PromotionRule::new(PromotionId::new(1), &input).unwrap();

        assert_eq!(rule.grant(2, 0).unwrap(), i64::MAX / 2 * 2);
        assert!(matches!(
            rule.grant(3, 0),
            Err(ValidationError::OutOfRange { .. })
        ));

        // Once rules never scale
        let input = NewPromotion::new(1, 2).get_quantity(i64::MAX).once();
        let rule = PromotionRule::new(PromotionId::new(1), &input).unwrap();
        assert_eq!(rule.grant(i64::MAX, 0).unwrap(), i64::MAX);
    }

    #[test]
    fn test_new_product_price_alias() {
        let input: NewProduct =
            serde_json::from_str(r#"{"id": 3, "name": "Product 3", "price": 250}"#).unwrap();
        assert_eq!(input.id, Some(ProductId::new(3)));
        assert_eq!(input.price_cents, 250);
    }
}
