//! # Session Replay
//!
//! Feeds scripted [`Step`]s through the cart API in order. The first step
//! the cart rejects stops the replay; earlier steps stay applied.

use tracing::{debug, info};

use till_core::{Cart, Catalog, CoreResult};

use crate::error::{CliError, CliResult};
use crate::seed::Step;

/// Replays `steps` against `cart`. Step numbers in errors are 1-based.
pub fn replay(catalog: &Catalog, cart: &mut Cart, steps: &[Step]) -> CliResult<()> {
    info!(cart_id = %cart.id(), steps = steps.len(), "Replaying cart session");

    for (index, step) in steps.iter().enumerate() {
        apply(catalog, cart, step).map_err(|source| CliError::Step {
            index: index + 1,
            op: step.op(),
            source,
        })?;
        debug!(
            step = index + 1,
            op = step.op(),
            unique = cart.unique_count(),
            total_items = cart.total_items_count(),
            "Step applied"
        );
    }

    Ok(())
}

fn apply(catalog: &Catalog, cart: &mut Cart, step: &Step) -> CoreResult<()> {
    match step {
        Step::Add {
            product_id,
            options,
        } => {
            cart.add(catalog, *product_id, *options)?;
        }
        Step::Update {
            product_id,
            quantity,
            options,
        } => {
            cart.update(catalog, *product_id, *quantity, *options)?;
        }
        Step::UpdateByRelative {
            product_id,
            delta,
            options,
        } => {
            cart.update_by_relative(catalog, *product_id, *delta, *options)?;
        }
        Step::AddOrUpdateByRelative {
            product_id,
            delta,
            options,
        } => {
            cart.add_or_update_by_relative(catalog, *product_id, *delta, *options)?;
        }
        Step::Remove { product_id } => {
            cart.remove(catalog, *product_id)?;
        }
        Step::ApplyDiscount { name } => {
            cart.apply_discount(catalog, name)?;
        }
        Step::RemoveDiscount { name } => {
            cart.remove_discount(name);
        }
        Step::Destroy => cart.destroy(),
    }
    Ok(())
}
