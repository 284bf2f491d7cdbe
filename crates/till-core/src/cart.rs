//! # Cart
//!
//! The cart ledger and the mutation entry points that drive settlement.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Caller                 Cart method              Ledger change          │
//! │  ──────                 ───────────              ─────────────          │
//! │                                                                         │
//! │  Scan product ────────► add() ─────────────────► push(qty 1)           │
//! │  Set quantity ────────► update() ──────────────► qty = n               │
//! │  +/- buttons ─────────► update_by_relative() ──► qty += d              │
//! │  Promotion write ─────► add_or_update_by_relative() ► create or adjust │
//! │  Remove line ─────────► remove() ──────────────► delete                │
//! │                                                                         │
//! │  Every write runs on a STAGED copy of the ledger:                       │
//! │                                                                         │
//! │    clone ──► mutate ──► settle (unless no_emit) ──► swap in            │
//! │                │              │                                         │
//! │                └── Err ───────┴──► live ledger untouched               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! After every completed call:
//! - `0 <= free_quantity <= quantity` on every item
//! - no item with `quantity == 0` is stored
//! - every stored product id existed in the catalog when it was written

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::{Catalog, ProductCatalog};
use crate::error::{CoreError, CoreResult};
use crate::reconcile::Reconciler;
use crate::types::{Discount, ProductId};
use crate::validation::{
    checked_quantity, validate_free_quantity, validate_quantity, ValidationResult,
};

/// Ledger contents as of the last settlement pass, keyed by product.
pub type LedgerSnapshot = BTreeMap<ProductId, CartItem>;

// =============================================================================
// Item Options
// =============================================================================

/// Option bag accepted by the ledger mutations.
///
/// - `is_free`: the quantity written is promotional (free) quantity
/// - `no_emit`: skip the settlement pass for this write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemOptions {
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub no_emit: bool,
}

impl ItemOptions {
    /// Regular paid write, settled.
    pub const fn paid() -> Self {
        ItemOptions {
            is_free: false,
            no_emit: false,
        }
    }

    /// Promotional write, settled.
    pub const fn free() -> Self {
        ItemOptions {
            is_free: true,
            no_emit: false,
        }
    }

    /// Same write without a settlement pass.
    pub const fn silent(self) -> Self {
        ItemOptions {
            is_free: self.is_free,
            no_emit: true,
        }
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    product_id: ProductId,
    quantity: i64,
    free_quantity: i64,
    added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a validated line.
    pub fn new(product_id: ProductId, quantity: i64, free_quantity: i64) -> ValidationResult<Self> {
        validate_quantity(quantity)?;
        validate_free_quantity(free_quantity, quantity)?;

        Ok(CartItem {
            product_id,
            quantity,
            free_quantity,
            added_at: Utc::now(),
        })
    }

    #[inline]
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    #[inline]
    pub fn free_quantity(&self) -> i64 {
        self.free_quantity
    }

    /// Units charged at checkout: `quantity - free_quantity`.
    #[inline]
    pub fn paid_quantity(&self) -> i64 {
        self.quantity - self.free_quantity
    }

    #[inline]
    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// Validates both quantities together, then writes them.
    fn set_quantities(&mut self, quantity: i64, free_quantity: i64) -> ValidationResult<()> {
        validate_quantity(quantity)?;
        validate_free_quantity(free_quantity, quantity)?;
        self.quantity = quantity;
        self.free_quantity = free_quantity;
        Ok(())
    }
}

// =============================================================================
// Cart Ledger
// =============================================================================

/// Product id → item map, in insertion order.
///
/// Reads are public; writes are only reachable through [`Cart`] and the
/// settlement pass, both of which work on a staged copy.
#[derive(Debug, Clone, Default)]
pub struct CartLedger {
    items: Vec<CartItem>,
}

impl CartLedger {
    pub fn get(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.get(product_id).is_some()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `quantity` over every item, free units included.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Value copy of the current items.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.items
            .iter()
            .map(|i| (i.product_id, i.clone()))
            .collect()
    }

    fn get_mut(&mut self, product_id: ProductId) -> CoreResult<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or(CoreError::ItemNotInCart(product_id))
    }

    pub(crate) fn insert(&mut self, item: CartItem) -> CoreResult<()> {
        if self.contains(item.product_id) {
            return Err(CoreError::ItemAlreadyInCart(item.product_id));
        }
        self.items.push(item);
        Ok(())
    }

    /// Absolute set. `is_free` makes the whole quantity promotional.
    pub(crate) fn set(&mut self, product_id: ProductId, quantity: i64, is_free: bool) -> CoreResult<()> {
        let free_quantity = if is_free { quantity } else { 0 };
        self.get_mut(product_id)?
            .set_quantities(quantity, free_quantity)?;
        Ok(())
    }

    /// Relative change. With `is_free` the free quantity moves by the same delta.
    pub(crate) fn adjust(&mut self, product_id: ProductId, delta: i64, is_free: bool) -> CoreResult<()> {
        let item = self.get_mut(product_id)?;
        let quantity = checked_quantity("quantity", item.quantity.checked_add(delta))?;
        let free_quantity = if is_free {
            checked_quantity("free_quantity", item.free_quantity.checked_add(delta))?
        } else {
            item.free_quantity
        };
        item.set_quantities(quantity, free_quantity)?;
        Ok(())
    }

    /// Relative change that creates the line when it is missing.
    ///
    /// Creation requires the product to exist in `products`. Only
    /// [`CoreError::ItemNotInCart`] triggers creation; any other error from
    /// the adjustment is returned as-is.
    pub(crate) fn add_or_adjust(
        &mut self,
        products: &ProductCatalog,
        product_id: ProductId,
        delta: i64,
        is_free: bool,
    ) -> CoreResult<()> {
        match self.adjust(product_id, delta, is_free) {
            Err(CoreError::ItemNotInCart(_)) => {
                products.get(product_id)?;
                let free_quantity = if is_free { delta } else { 0 };
                let item = CartItem::new(product_id, delta, free_quantity)?;
                self.items.push(item);
                Ok(())
            }
            other => other,
        }
    }

    pub(crate) fn remove(&mut self, product_id: ProductId) -> CoreResult<CartItem> {
        let index = self
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or(CoreError::ItemNotInCart(product_id))?;
        Ok(self.items.remove(index))
    }

    /// Drops every zero-quantity item and returns their ids.
    pub(crate) fn purge_empty(&mut self) -> Vec<ProductId> {
        let purged: Vec<ProductId> = self
            .items
            .iter()
            .filter(|i| i.quantity == 0)
            .map(|i| i.product_id)
            .collect();
        self.items.retain(|i| i.quantity != 0);
        purged
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A shopping cart session.
///
/// The cart does not own the catalog; every operation that needs product,
/// discount or promotion data borrows a [`Catalog`].
///
/// ## Example
/// ```rust
/// use till_core::{Cart, Catalog, ItemOptions, NewProduct, NewPromotion, ProductId};
///
/// let mut catalog = Catalog::new();
/// catalog.add_products(vec![
///     NewProduct::new("Product 1", 50).with_id(1),
///     NewProduct::new("Product 2", 150).with_id(2),
/// ]).unwrap();
/// catalog.add_promotion(NewPromotion::new(1, 2).get_quantity(5)).unwrap();
///
/// let mut cart = Cart::new();
/// cart.add(&catalog, ProductId::new(1), ItemOptions::paid()).unwrap();
///
/// let freebie = cart.get(ProductId::new(2)).unwrap();
/// assert_eq!(freebie.free_quantity(), 5);
/// assert_eq!(cart.subtotal(&catalog).unwrap().cents(), 50);
/// ```
#[derive(Debug, Clone)]
pub struct Cart {
    id: Uuid,
    created_at: DateTime<Utc>,
    ledger: CartLedger,
    pub(crate) applied_discounts: Vec<Discount>,
    previous_snapshot: LedgerSnapshot,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    /// Creates an empty cart with a fresh session id.
    pub fn new() -> Self {
        Cart {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            ledger: CartLedger::default(),
            applied_discounts: Vec::new(),
            previous_snapshot: LedgerSnapshot::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn ledger(&self) -> &CartLedger {
        &self.ledger
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Adds a new line with quantity 1 (free when `options.is_free`).
    ///
    /// ## Errors
    /// - `ProductNotFound` if the product is not in the catalog
    /// - `ItemAlreadyInCart` if the product already has a line
    pub fn add(
        &mut self,
        catalog: &Catalog,
        product_id: ProductId,
        options: ItemOptions,
    ) -> CoreResult<Option<&CartItem>> {
        debug!(product_id = %product_id, is_free = options.is_free, "Adding item to cart");
        catalog.product(product_id)?;
        let free_quantity = if options.is_free { 1 } else { 0 };
        let item = CartItem::new(product_id, 1, free_quantity)?;

        self.commit(catalog, options, |ledger| ledger.insert(item))?;
        Ok(self.ledger.get(product_id))
    }

    /// Sets the quantity of an existing line.
    ///
    /// With `options.is_free` the whole quantity becomes free quantity,
    /// otherwise the line's free quantity is reset before settlement
    /// re-grants whatever promotions apply.
    pub fn update(
        &mut self,
        catalog: &Catalog,
        product_id: ProductId,
        quantity: i64,
        options: ItemOptions,
    ) -> CoreResult<Option<&CartItem>> {
        debug!(product_id = %product_id, quantity, is_free = options.is_free, "Updating cart item");
        self.commit(catalog, options, |ledger| {
            ledger.set(product_id, quantity, options.is_free)
        })?;
        Ok(self.ledger.get(product_id))
    }

    /// Moves the quantity of an existing line by `delta`.
    ///
    /// ## Errors
    /// - `ItemNotInCart` if the line does not exist
    /// - `Validation` if the quantity would go negative or the free
    ///   quantity would exceed the quantity
    pub fn update_by_relative(
        &mut self,
        catalog: &Catalog,
        product_id: ProductId,
        delta: i64,
        options: ItemOptions,
    ) -> CoreResult<Option<&CartItem>> {
        debug!(product_id = %product_id, delta, is_free = options.is_free, "Adjusting cart item");
        self.commit(catalog, options, |ledger| {
            ledger.adjust(product_id, delta, options.is_free)
        })?;
        Ok(self.ledger.get(product_id))
    }

    /// Like [`Cart::update_by_relative`], creating the line with
    /// `quantity = delta` when it is not in the cart yet.
    pub fn add_or_update_by_relative(
        &mut self,
        catalog: &Catalog,
        product_id: ProductId,
        delta: i64,
        options: ItemOptions,
    ) -> CoreResult<Option<&CartItem>> {
        debug!(product_id = %product_id, delta, is_free = options.is_free, "Adding or adjusting cart item");
        self.commit(catalog, options, |ledger| {
            ledger.add_or_adjust(catalog.products(), product_id, delta, options.is_free)
        })?;
        Ok(self.ledger.get(product_id))
    }

    /// Deletes a line. Always settles, so freebies it earned are clawed back.
    pub fn remove(&mut self, catalog: &Catalog, product_id: ProductId) -> CoreResult<CartItem> {
        debug!(product_id = %product_id, "Removing cart item");
        let mut removed = None;
        self.commit(catalog, ItemOptions::paid(), |ledger| {
            removed = Some(ledger.remove(product_id)?);
            Ok(())
        })?;
        removed.ok_or(CoreError::ItemNotInCart(product_id))
    }

    /// Clears items, applied discounts and the settlement snapshot.
    pub fn destroy(&mut self) {
        debug!(cart_id = %self.id, "Destroying cart");
        self.ledger.clear();
        self.applied_discounts.clear();
        self.previous_snapshot.clear();
    }

    /// Runs `mutate` and the settlement pass against a staged ledger and
    /// swaps it in only if both succeed.
    fn commit<F>(&mut self, catalog: &Catalog, options: ItemOptions, mutate: F) -> CoreResult<()>
    where
        F: FnOnce(&mut CartLedger) -> CoreResult<()>,
    {
        let mut staged = self.ledger.clone();
        mutate(&mut staged)?;

        if options.no_emit {
            let purged = staged.purge_empty();
            self.ledger = staged;
            debug!(purged = purged.len(), "Committed without settlement");
            return Ok(());
        }

        let settlement = Reconciler::new(catalog).settle(&mut staged, &self.previous_snapshot)?;
        self.ledger = staged;
        self.previous_snapshot = settlement.snapshot;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn get(&self, product_id: ProductId) -> Option<&CartItem> {
        self.ledger.get(product_id)
    }

    pub fn items(&self) -> &[CartItem] {
        self.ledger.items()
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.ledger.contains(product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Number of distinct products in the cart.
    pub fn unique_count(&self) -> usize {
        self.ledger.len()
    }

    /// Sum of quantities, free units included.
    pub fn total_items_count(&self) -> i64 {
        self.ledger.total_quantity()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
