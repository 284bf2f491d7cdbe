//! # Catalog
//!
//! Read-mostly lookup tables the cart depends on.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            Catalog                                      │
//! │                                                                         │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐    │
//! │  │  ProductCatalog  │ │ DiscountRegistry │ │  PromotionRegistry   │    │
//! │  │                  │ │                  │ │                      │    │
//! │  │  id → Product    │ │  name → Discount │ │  ordered rules,      │    │
//! │  │  id allocation   │ │  (insert order)  │ │  queried by buy id   │    │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘    │
//! │                                                                         │
//! │  Constructed once, passed by reference to every cart operation.        │
//! │  `destroy()` resets everything for test isolation.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bulk Loads
//! Every `add_bulk` validates the whole batch (including duplicates inside
//! the batch) before inserting anything.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{
    Discount, NewDiscount, NewProduct, NewPromotion, Product, ProductId, PromotionId,
    PromotionRule,
};
use crate::validation::next_id;

// =============================================================================
// Product Catalog
// =============================================================================

/// Products keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: BTreeMap<ProductId, Product>,
    /// Highest id seen so far; allocation continues after it.
    last_id: u64,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one product, allocating an id when the input has none.
    pub fn add(&mut self, input: NewProduct) -> CoreResult<&Product> {
        let ids = self.add_bulk(vec![input])?;
        let id = ids[0];
        self.get(id)
    }

    /// Adds a batch of products atomically. Returns the ids in input order.
    pub fn add_bulk(&mut self, inputs: Vec<NewProduct>) -> CoreResult<Vec<ProductId>> {
        let mut last_id = self.last_id;
        let mut seen = BTreeSet::new();
        let mut staged = Vec::with_capacity(inputs.len());

        for input in inputs {
            let id = match input.id {
                Some(id) => id,
                None => ProductId::new(next_id("product id", last_id)?),
            };
            if self.products.contains_key(&id) || !seen.insert(id) {
                return Err(ValidationError::Duplicate {
                    field: "product id".to_string(),
                    value: id.to_string(),
                }
                .into());
            }
            last_id = last_id.max(id.get());
            staged.push(Product::new(id, input.name, input.price_cents)?);
        }

        let ids: Vec<ProductId> = staged.iter().map(Product::id).collect();
        for product in staged {
            debug!(id = %product.id(), name = %product.name(), price = %product.price(), "Adding product");
            self.products.insert(product.id(), product);
        }
        self.last_id = last_id;

        Ok(ids)
    }

    /// Gets a product by id.
    pub fn get(&self, id: ProductId) -> CoreResult<&Product> {
        self.products.get(&id).ok_or(CoreError::ProductNotFound(id))
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.products.contains_key(&id)
    }

    /// All products in id order.
    pub fn all(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Replaces the stored product with a re-priced, re-validated copy.
    pub fn set_price(&mut self, id: ProductId, price_cents: i64) -> CoreResult<&Product> {
        let updated = self.get(id)?.with_price(price_cents)?;
        debug!(id = %id, price = %updated.price(), "Updating product price");
        self.products.insert(id, updated);
        self.get(id)
    }

    /// Replaces the stored product with a renamed, re-validated copy.
    pub fn rename(&mut self, id: ProductId, name: impl Into<String>) -> CoreResult<&Product> {
        let updated = self.get(id)?.with_name(name)?;
        debug!(id = %id, name = %updated.name(), "Renaming product");
        self.products.insert(id, updated);
        self.get(id)
    }

    fn remove(&mut self, id: ProductId) -> CoreResult<Product> {
        self.products
            .remove(&id)
            .ok_or(CoreError::ProductNotFound(id))
    }

    fn clear(&mut self) {
        self.products.clear();
        self.last_id = 0;
    }
}

// =============================================================================
// Discount Registry
// =============================================================================

/// Discounts keyed by unique name, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct DiscountRegistry {
    discounts: Vec<Discount>,
}

impl DiscountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers one discount.
    pub fn add(&mut self, input: NewDiscount) -> CoreResult<&Discount> {
        self.add_bulk(vec![input])?;
        let last = self.discounts.len() - 1;
        Ok(&self.discounts[last])
    }

    /// Registers a batch of discounts atomically.
    pub fn add_bulk(&mut self, inputs: Vec<NewDiscount>) -> CoreResult<()> {
        let mut seen = HashSet::new();
        let mut staged = Vec::with_capacity(inputs.len());

        for input in inputs {
            let discount = Discount::try_from(input)?;
            if self.contains(discount.name()) || !seen.insert(discount.name().to_string()) {
                return Err(ValidationError::Duplicate {
                    field: "discount name".to_string(),
                    value: discount.name().to_string(),
                }
                .into());
            }
            staged.push(discount);
        }

        for discount in &staged {
            debug!(name = %discount.name(), kind = %discount.kind(), amount = discount.amount(), "Adding discount");
        }
        self.discounts.extend(staged);

        Ok(())
    }

    /// Gets a discount by name.
    pub fn get(&self, name: &str) -> CoreResult<&Discount> {
        self.discounts
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| CoreError::DiscountNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.discounts.iter().any(|d| d.name() == name)
    }

    /// Removes a discount from the registry. Carts keep their applied copy.
    pub fn remove(&mut self, name: &str) -> CoreResult<Discount> {
        let index = self
            .discounts
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| CoreError::DiscountNotFound(name.to_string()))?;
        debug!(name = %name, "Removing discount");
        Ok(self.discounts.remove(index))
    }

    pub fn all(&self) -> &[Discount] {
        &self.discounts
    }

    pub fn len(&self) -> usize {
        self.discounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discounts.is_empty()
    }

    fn clear(&mut self) {
        self.discounts.clear();
    }
}

// =============================================================================
// Promotion Registry
// =============================================================================

/// Ordered "buy X get Y" rules.
#[derive(Debug, Clone, Default)]
pub struct PromotionRegistry {
    rules: Vec<PromotionRule>,
    last_id: u64,
}

impl PromotionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule; both products must exist in `products`.
    pub fn add(&mut self, products: &ProductCatalog, input: NewPromotion) -> CoreResult<&PromotionRule> {
        self.add_bulk(products, vec![input])?;
        let last = self.rules.len() - 1;
        Ok(&self.rules[last])
    }

    /// Adds a batch of rules atomically. Returns the allocated ids.
    pub fn add_bulk(
        &mut self,
        products: &ProductCatalog,
        inputs: Vec<NewPromotion>,
    ) -> CoreResult<Vec<PromotionId>> {
        let mut last_id = self.last_id;
        let mut staged = Vec::with_capacity(inputs.len());

        for input in &inputs {
            products.get(input.buy_product_id)?;
            products.get(input.get_product_id)?;
            last_id = next_id("promotion id", last_id)?;
            staged.push(PromotionRule::new(PromotionId::new(last_id), input)?);
        }

        let ids = staged.iter().map(PromotionRule::id).collect();
        for rule in &staged {
            debug!(
                id = %rule.id(),
                buy = %rule.buy_product_id(),
                get = %rule.get_product_id(),
                buy_quantity = rule.buy_quantity(),
                get_quantity = rule.get_quantity(),
                once = rule.once(),
                "Adding promotion"
            );
        }
        self.rules.extend(staged);
        self.last_id = last_id;

        Ok(ids)
    }

    pub fn get(&self, id: PromotionId) -> CoreResult<&PromotionRule> {
        self.rules
            .iter()
            .find(|r| r.id() == id)
            .ok_or(CoreError::PromotionNotFound(id))
    }

    pub fn remove(&mut self, id: PromotionId) -> CoreResult<PromotionRule> {
        let index = self
            .rules
            .iter()
            .position(|r| r.id() == id)
            .ok_or(CoreError::PromotionNotFound(id))?;
        debug!(id = %id, "Removing promotion");
        Ok(self.rules.remove(index))
    }

    /// Rules triggered by `buy_product_id`, in registration order.
    pub fn rules_for(&self, buy_product_id: ProductId) -> impl Iterator<Item = &PromotionRule> {
        self.rules
            .iter()
            .filter(move |r| r.buy_product_id() == buy_product_id)
    }

    pub fn all(&self) -> &[PromotionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Drops every rule that references `product_id` on either side.
    fn remove_for_product(&mut self, product_id: ProductId) -> usize {
        let before = self.rules.len();
        self.rules
            .retain(|r| r.buy_product_id() != product_id && r.get_product_id() != product_id);
        before - self.rules.len()
    }

    fn clear(&mut self) {
        self.rules.clear();
        self.last_id = 0;
    }
}

// =============================================================================
// Catalog Bundle
// =============================================================================

/// The three registries a cart needs, owned together.
///
/// ## Usage
/// ```rust
/// use till_core::{Catalog, NewProduct, NewPromotion, ProductId};
///
/// let mut catalog = Catalog::new();
/// catalog.add_products(vec![
///     NewProduct::new("Product 1", 50).with_id(1),
///     NewProduct::new("Product 2", 150).with_id(2),
/// ]).unwrap();
/// catalog.add_promotion(NewPromotion::new(1, 2)).unwrap();
///
/// assert_eq!(catalog.promotions().rules_for(ProductId::new(1)).count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: ProductCatalog,
    discounts: DiscountRegistry,
    promotions: PromotionRegistry,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn products(&self) -> &ProductCatalog {
        &self.products
    }

    pub fn discounts(&self) -> &DiscountRegistry {
        &self.discounts
    }

    pub fn promotions(&self) -> &PromotionRegistry {
        &self.promotions
    }

    pub fn product(&self, id: ProductId) -> CoreResult<&Product> {
        self.products.get(id)
    }

    pub fn discount(&self, name: &str) -> CoreResult<&Discount> {
        self.discounts.get(name)
    }

    pub fn add_product(&mut self, input: NewProduct) -> CoreResult<&Product> {
        self.products.add(input)
    }

    pub fn add_products(&mut self, inputs: Vec<NewProduct>) -> CoreResult<Vec<ProductId>> {
        self.products.add_bulk(inputs)
    }

    pub fn set_price(&mut self, id: ProductId, price_cents: i64) -> CoreResult<&Product> {
        self.products.set_price(id, price_cents)
    }

    pub fn rename_product(&mut self, id: ProductId, name: impl Into<String>) -> CoreResult<&Product> {
        self.products.rename(id, name)
    }

    /// Removes a product and every promotion rule that references it.
    ///
    /// The catalog does not track carts. A cart that still holds a line for
    /// the product keeps it, and pricing that cart then fails with
    /// `ProductNotFound` until the line is removed. Remove the line from
    /// live carts before removing the product.
    pub fn remove_product(&mut self, id: ProductId) -> CoreResult<Product> {
        let product = self.products.remove(id)?;
        let dropped = self.promotions.remove_for_product(id);
        debug!(id = %id, dropped_promotions = dropped, "Removed product");
        Ok(product)
    }

    pub fn add_discount(&mut self, input: NewDiscount) -> CoreResult<&Discount> {
        self.discounts.add(input)
    }

    pub fn add_discounts(&mut self, inputs: Vec<NewDiscount>) -> CoreResult<()> {
        self.discounts.add_bulk(inputs)
    }

    pub fn remove_discount(&mut self, name: &str) -> CoreResult<Discount> {
        self.discounts.remove(name)
    }

    pub fn add_promotion(&mut self, input: NewPromotion) -> CoreResult<&PromotionRule> {
        self.promotions.add(&self.products, input)
    }

    pub fn add_promotions(&mut self, inputs: Vec<NewPromotion>) -> CoreResult<Vec<PromotionId>> {
        self.promotions.add_bulk(&self.products, inputs)
    }

    pub fn remove_promotion(&mut self, id: PromotionId) -> CoreResult<PromotionRule> {
        self.promotions.remove(id)
    }

    /// Clears every registry and resets id allocation.
    pub fn destroy(&mut self) {
        self.products.clear();
        self.discounts.clear();
        self.promotions.clear();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
