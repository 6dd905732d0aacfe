//! Stock ledger: debit and credit of per-location quantities.
//!
//! Debit consumes from the location currently holding the most of the product
//! first, then the next, until satisfied; ties break on ascending location id
//! so allocation is deterministic. If total stock is short, nothing is written
//! and the shortfall is reported.
//!
//! Credit returns every unit to the single location currently holding the most
//! of the product, mirroring the debit ordering. This deliberately loses the
//! provenance of which location a unit was originally debited from; total
//! conservation is what the engine guarantees, not per-location history. If a
//! provenance requirement ever lands, this module is the one place to change.

use tracing::{debug, warn};

use packhouse_core::ProductId;

use crate::error::EngineError;
use crate::models::LocationStock;
use crate::store::FulfillmentTx;

/// Withdraw `quantity` units of a product from stock.
///
/// Consumes from the highest-quantity location first. Writes nothing when the
/// product's total available stock is short.
///
/// # Errors
///
/// Returns [`EngineError::InsufficientStock`] naming the unsatisfied remainder
/// when available stock is less than requested, or a persistence error from
/// the store.
pub async fn debit<T: FulfillmentTx>(
    tx: &mut T,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), EngineError> {
    if quantity == 0 {
        return Ok(());
    }

    let rows = tx.stock_for_product(product_id).await?;
    let (changed, shortfall) = plan_debits(rows, quantity);

    if shortfall > 0 {
        debug!(%product_id, quantity, shortfall, "debit short, aborting");
        return Err(EngineError::InsufficientStock {
            product_id,
            shortfall,
        });
    }

    for row in changed {
        tx.set_stock_quantity(row.location_id, row.product_id, row.quantity)
            .await?;
    }

    debug!(%product_id, quantity, "debited stock");
    Ok(())
}

/// Return `quantity` units of a product to stock.
///
/// Credits the single location currently holding the most of the product. A
/// product with no stock rows at all has nowhere to put the units; they are
/// dropped with a warning, matching the behavior this engine replaces.
///
/// # Errors
///
/// Returns a persistence error from the store.
pub async fn credit<T: FulfillmentTx>(
    tx: &mut T,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), EngineError> {
    if quantity == 0 {
        return Ok(());
    }

    let rows = tx.stock_for_product(product_id).await?;
    let Some(target) = pick_credit_target(&rows) else {
        warn!(%product_id, quantity, "no stock location for product, dropping credited units");
        return Ok(());
    };

    tx.set_stock_quantity(target.location_id, product_id, target.quantity + quantity)
        .await?;

    debug!(%product_id, quantity, location = %target.location_id, "credited stock");
    Ok(())
}

/// Compute which stock rows a debit touches and what it leaves unsatisfied.
///
/// Returns the rows with their post-debit quantities (only rows that change)
/// and the shortfall; a shortfall of 0 means fully satisfied.
fn plan_debits(mut rows: Vec<LocationStock>, requested: i32) -> (Vec<LocationStock>, i32) {
    sort_for_allocation(&mut rows);

    let mut remaining = requested;
    let mut changed = Vec::new();

    for mut row in rows {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(row.quantity);
        if take > 0 {
            row.quantity -= take;
            remaining -= take;
            changed.push(row);
        }
    }

    (changed, remaining)
}

/// The row a credit goes to: highest quantity, ties on lowest location id.
fn pick_credit_target(rows: &[LocationStock]) -> Option<LocationStock> {
    let mut sorted = rows.to_vec();
    sort_for_allocation(&mut sorted);
    sorted.into_iter().next()
}

/// Descending quantity, ascending location id. The store already returns rows
/// in this order, but allocation correctness should not depend on it.
fn sort_for_allocation(rows: &mut [LocationStock]) {
    rows.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then(a.location_id.cmp(&b.location_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use packhouse_core::LocationId;

    fn row(location: i32, product: i32, quantity: i32) -> LocationStock {
        LocationStock {
            location_id: LocationId::new(location),
            product_id: ProductId::new(product),
            quantity,
        }
    }

    #[test]
    fn debit_consumes_highest_location_first() {
        // L1:5, L2:3, request 6 -> L1 drained, L2 down by 1
        let (changed, shortfall) = plan_debits(vec![row(1, 1, 5), row(2, 1, 3)], 6);
        assert_eq!(shortfall, 0);
        assert_eq!(changed, vec![row(1, 1, 0), row(2, 1, 2)]);
    }

    #[test]
    fn debit_reports_shortfall_without_partial_rows_applied_by_caller() {
        let (changed, shortfall) = plan_debits(vec![row(1, 1, 5), row(2, 1, 3)], 10);
        assert_eq!(shortfall, 2);
        // the plan still describes the partial consumption; debit() discards
        // it when shortfall > 0
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn debit_tie_breaks_on_location_id() {
        let (changed, shortfall) = plan_debits(vec![row(9, 1, 4), row(2, 1, 4)], 3);
        assert_eq!(shortfall, 0);
        assert_eq!(changed, vec![row(2, 1, 1)]);
    }

    #[test]
    fn debit_exact_total_drains_everything() {
        let (changed, shortfall) = plan_debits(vec![row(1, 1, 2), row(2, 1, 2)], 4);
        assert_eq!(shortfall, 0);
        assert!(changed.iter().all(|r| r.quantity == 0));
    }

    #[test]
    fn debit_with_no_rows_is_all_shortfall() {
        let (changed, shortfall) = plan_debits(Vec::new(), 5);
        assert!(changed.is_empty());
        assert_eq!(shortfall, 5);
    }

    #[test]
    fn credit_targets_highest_quantity_location() {
        let target = pick_credit_target(&[row(1, 1, 2), row(2, 1, 7)]).expect("target");
        assert_eq!(target.location_id, LocationId::new(2));
    }

    #[test]
    fn credit_with_no_rows_has_no_target() {
        assert!(pick_credit_target(&[]).is_none());
    }
}
