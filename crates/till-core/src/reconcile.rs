//! # Promotion Reconciliation
//!
//! Re-derives promotional free quantities after every settled cart write.
//!
//! ## Settlement Pass
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. GRANT      for every item X, for every rule buy X → get Y:         │
//! │                  target[Y] += rule.grant(X.quantity, X.free)            │
//! │                (summed across the whole ledger, absolute values)        │
//! │                                                                         │
//! │  2. SETTLE     for every target Y:                                      │
//! │                  delta = target[Y] - Y.free   (0 when Y is absent)      │
//! │                  Y.quantity += delta; Y.free += delta                   │
//! │                (creates Y when missing)                                 │
//! │                                                                         │
//! │  3. PURGE      drop zero-quantity items                                 │
//! │                                                                         │
//! │  4. CASCADE    for every X in the previous snapshot but not now:        │
//! │                  revoke what X's rules granted, unless step 2 already   │
//! │                  settled that target                                    │
//! │                                                                         │
//! │  5. PURGE + SNAPSHOT                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal writes go straight to the ledger, so one external mutation
//! produces exactly one flat pass.
//!
//! ## Why the quantities stay valid
//! Settling Y to `free = target` moves `quantity` by the same delta, so the
//! new quantity is `paid + target >= target >= 0`. A cascade revocation is
//! capped at Y's current free quantity.

use std::collections::BTreeMap;

use tracing::debug;

use crate::cart::{CartItem, CartLedger, LedgerSnapshot};
use crate::catalog::Catalog;
use crate::error::CoreResult;
use crate::types::ProductId;
use crate::validation::checked_quantity;

// =============================================================================
// Settlement Result
// =============================================================================

/// One free-quantity write made by a settlement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeAdjustment {
    pub product_id: ProductId,
    pub delta: i64,
}

/// What a settlement pass changed.
#[derive(Debug, Clone, Default)]
pub struct Settlement {
    /// Free-quantity writes, grants first then cascade revocations.
    pub adjustments: Vec<FreeAdjustment>,
    /// Items dropped because their quantity reached zero.
    pub purged: Vec<ProductId>,
    /// The settled ledger; becomes the next pass's previous snapshot.
    pub snapshot: LedgerSnapshot,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Runs settlement passes against a catalog's promotion rules.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    catalog: &'a Catalog,
}

impl<'a> Reconciler<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Reconciler { catalog }
    }

    /// Absolute free quantity every promotion target should hold.
    ///
    /// Every rule keyed on a present item registers its target, even when
    /// its grant is zero, so an unmet threshold settles the target back down.
    ///
    /// ## Errors
    /// `OutOfRange` when a grant or an aggregated target leaves the `i64`
    /// range.
    pub fn grant_targets(&self, ledger: &CartLedger) -> CoreResult<BTreeMap<ProductId, i64>> {
        let mut targets = BTreeMap::new();

        for item in ledger.items() {
            for rule in self.catalog.promotions().rules_for(item.product_id()) {
                let grant = rule.grant(item.quantity(), item.free_quantity())?;
                let target = targets.entry(rule.get_product_id()).or_insert(0i64);
                *target = checked_quantity("free_quantity", target.checked_add(grant))?;
            }
        }

        Ok(targets)
    }

    /// Runs one full settlement pass over `ledger`.
    ///
    /// `previous` is the snapshot taken at the end of the last pass and is
    /// only used to detect triggers that have vanished since.
    pub fn settle(&self, ledger: &mut CartLedger, previous: &LedgerSnapshot) -> CoreResult<Settlement> {
        let products = self.catalog.products();
        let mut settlement = Settlement::default();

        // Grant
        let targets = self.grant_targets(ledger)?;
        for (&target, &goal) in &targets {
            let held = ledger.get(target).map_or(0, CartItem::free_quantity);
            let delta = goal - held;
            if delta == 0 {
                continue;
            }
            ledger.add_or_adjust(products, target, delta, true)?;
            settlement.adjustments.push(FreeAdjustment {
                product_id: target,
                delta,
            });
        }
        settlement.purged.extend(ledger.purge_empty());

        // Cascade
        let vanished: Vec<&CartItem> = previous
            .values()
            .filter(|item| !ledger.contains(item.product_id()))
            .collect();
        for gone in vanished {
            for rule in self.catalog.promotions().rules_for(gone.product_id()) {
                let target = rule.get_product_id();
                if targets.contains_key(&target) {
                    continue;
                }
                let held = ledger.get(target).map_or(0, CartItem::free_quantity);
                let revoke = rule.grant(gone.quantity(), gone.free_quantity())?.min(held);
                if revoke <= 0 {
                    continue;
                }
                ledger.add_or_adjust(products, target, -revoke, true)?;
                settlement.adjustments.push(FreeAdjustment {
                    product_id: target,
                    delta: -revoke,
                });
            }
        }
        settlement.purged.extend(ledger.purge_empty());

        settlement.snapshot = ledger.snapshot();
        debug!(
            targets = targets.len(),
            adjustments = settlement.adjustments.len(),
            purged = settlement.purged.len(),
            items = ledger.len(),
            "Settled cart"
        );

        Ok(settlement)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::cart::{Cart, ItemOptions};
    use crate::catalog::Catalog;
    use crate::error::{CoreError, ValidationError};
    use crate::types::{NewProduct, NewPromotion, ProductId};

    fn catalog_with(rules: Vec<NewPromotion>) -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .add_products(vec![
                NewProduct::new("Product 1", 50).with_id(1),
                NewProduct::new("Product 2", 150).with_id(2),
                NewProduct::new("Product 3", 250).with_id(3),
            ])
            .unwrap();
        catalog.add_promotions(rules).unwrap();
        catalog
    }

    fn id(n: u64) -> ProductId {
        ProductId::new(n)
    }

    fn free_of(cart: &Cart, n: u64) -> i64 {
        cart.get(id(n)).map_or(0, |i| i.free_quantity())
    }

    #[test]
    fn test_repeating_rule_scales_with_paid_units() {
        let catalog = catalog_with(vec![NewPromotion::new(1, 2).buy_quantity(2)]);
        let mut cart = Cart::new();

        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();
        assert!(!cart.contains(id(2)));

        cart.update(&catalog, id(1), 2, ItemOptions::paid()).unwrap();
        assert_eq!(free_of(&cart, 2), 1);

        cart.update(&catalog, id(1), 7, ItemOptions::paid()).unwrap();
        assert_eq!(free_of(&cart, 2), 3);

        cart.update(&catalog, id(1), 1, ItemOptions::paid()).unwrap();
        assert!(!cart.contains(id(2)));
    }

    #[test]
    fn test_claw_back_keeps_paid_units() {
        let catalog = catalog_with(vec![NewPromotion::new(1, 2).get_quantity(2)]);
        let mut cart = Cart::new();

        cart.add(&catalog, id(2), ItemOptions::paid()).unwrap();
        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();
        let item = cart.get(id(2)).unwrap();
        assert_eq!(item.quantity(), 3);
        assert_eq!(item.free_quantity(), 2);

        cart.remove(&catalog, id(1)).unwrap();
        let item = cart.get(id(2)).unwrap();
        assert_eq!(item.quantity(), 1);
        assert_eq!(item.free_quantity(), 0);
    }

    #[test]
    fn test_once_rule_is_flat_and_clawed_back_below_threshold() {
        let catalog = catalog_with(vec![NewPromotion::new(1, 2)
            .buy_quantity(3)
            .get_quantity(5)
            .once()]);
        let mut cart = Cart::new();

        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();
        assert_eq!(free_of(&cart, 2), 0);

        cart.update(&catalog, id(1), 9, ItemOptions::paid()).unwrap();
        assert_eq!(free_of(&cart, 2), 5);

        cart.update(&catalog, id(1), 2, ItemOptions::paid()).unwrap();
        assert!(!cart.contains(id(2)));
    }

    #[test]
    fn test_mixed_once_rules_net_to_met_grants() {
        let catalog = catalog_with(vec![
            NewPromotion::new(1, 2).get_quantity(4).once(),
            NewPromotion::new(1, 2).buy_quantity(5).get_quantity(10).once(),
        ]);
        let mut cart = Cart::new();

        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();
        cart.update(&catalog, id(1), 5, ItemOptions::paid()).unwrap();
        assert_eq!(free_of(&cart, 2), 14);

        cart.update(&catalog, id(1), 2, ItemOptions::paid()).unwrap();
        assert_eq!(free_of(&cart, 2), 4);
    }

    #[test]
    fn test_targets_aggregate_across_triggers() {
        let catalog = catalog_with(vec![
            NewPromotion::new(1, 3).get_quantity(2),
            NewPromotion::new(2, 3).get_quantity(3),
        ]);
        let mut cart = Cart::new();

        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();
        cart.add(&catalog, id(2), ItemOptions::paid()).unwrap();
        assert_eq!(free_of(&cart, 3), 5);

        // Product 1 vanishes, product 2 still grants its share
        cart.remove(&catalog, id(1)).unwrap();
        assert_eq!(free_of(&cart, 3), 3);
        assert_eq!(cart.get(id(3)).unwrap().quantity(), 3);
    }

    #[test]
    fn test_buy_item_free_units_do_not_earn() {
        let catalog = catalog_with(vec![NewPromotion::new(1, 2)]);
        let mut cart = Cart::new();

        cart.add(&catalog, id(1), ItemOptions::free()).unwrap();
        assert!(!cart.contains(id(2)));

        cart.update_by_relative(&catalog, id(1), 2, ItemOptions::paid())
            .unwrap();
        assert_eq!(free_of(&cart, 2), 2);
    }

    #[test]
    fn test_self_targeting_rule_is_stable() {
        let catalog = catalog_with(vec![NewPromotion::new(1, 1)]);
        let mut cart = Cart::new();

        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();
        let item = cart.get(id(1)).unwrap();
        assert_eq!((item.quantity(), item.free_quantity()), (2, 1));

        cart.update_by_relative(&catalog, id(1), 0, ItemOptions::paid())
            .unwrap();
        let item = cart.get(id(1)).unwrap();
        assert_eq!((item.quantity(), item.free_quantity()), (2, 1));
    }

    #[test]
    fn test_silent_removal_is_seen_by_next_pass() {
        let catalog = catalog_with(vec![NewPromotion::new(1, 2).get_quantity(5)]);
        let mut cart = Cart::new();

        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();
        cart.add(&catalog, id(3), ItemOptions::paid()).unwrap();
        assert_eq!(free_of(&cart, 2), 5);

        cart.update(&catalog, id(1), 0, ItemOptions::paid().silent())
            .unwrap();
        assert_eq!(free_of(&cart, 2), 5);

        cart.update(&catalog, id(3), 2, ItemOptions::paid()).unwrap();
        assert!(!cart.contains(id(2)));
    }

    #[test]
    fn test_missing_target_product_fails_atomically() {
        let mut catalog = catalog_with(vec![NewPromotion::new(1, 2)]);
        let mut cart = Cart::new();
        cart.add(&catalog, id(3), ItemOptions::paid()).unwrap();

        // Drops the rule along with the product, so the grant never fires
        catalog.remove_product(id(2)).unwrap();
        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();
        assert!(!cart.contains(id(2)));

        let err = cart.add(&catalog, id(2), ItemOptions::paid()).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(_)));
        assert_eq!(cart.unique_count(), 2);
    }

    #[test]
    fn test_oversized_grant_rejects_the_write() {
        let half = i64::MAX / 2;
        let catalog = catalog_with(vec![NewPromotion::new(1, 2).get_quantity(half)]);
        let mut cart = Cart::new();

        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();
        assert_eq!(free_of(&cart, 2), half);

        let err = cart.update(&catalog, id(1), 3, ItemOptions::paid()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(cart.get(id(1)).unwrap().quantity(), 1);
        assert_eq!(free_of(&cart, 2), half);
    }

    #[test]
    fn test_aggregated_target_overflow_rejects_the_write() {
        let catalog = catalog_with(vec![
            NewPromotion::new(1, 3).get_quantity(i64::MAX).once(),
            NewPromotion::new(2, 3).get_quantity(1).once(),
        ]);
        let mut cart = Cart::new();
        cart.add(&catalog, id(1), ItemOptions::paid()).unwrap();

        let err = cart.add(&catalog, id(2), ItemOptions::paid()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert!(!cart.contains(id(2)));
        assert_eq!(free_of(&cart, 3), i64::MAX);
    }

    #[test]
    fn test_grant_on_top_of_paid_units_overflow() {
        let catalog = catalog_with(vec![NewPromotion::new(1, 2).get_quantity(i64::MAX).once()]);
        let mut cart = Cart::new();
        cart.add(&catalog, id(2), ItemOptions::paid()).unwrap();

        // 1 paid unit + i64::MAX free units does not fit
        let err = cart.add(&catalog, id(1), ItemOptions::paid()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert!(!cart.contains(id(1)));
        assert_eq!(cart.get(id(2)).unwrap().quantity(), 1);
    }
}
