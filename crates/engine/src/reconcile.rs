//! Order reconciliation: transform current order-line state into desired state.
//!
//! Given the desired line set for an order, each line lands in exactly one
//! transition:
//!
//! - absent -> present: create the line (debit the full quantity)
//! - present -> larger quantity: debit the delta
//! - present -> smaller quantity: credit the delta
//! - present -> same quantity: no-op
//! - present -> absent from the desired set: tombstone (credit the full quantity)
//! - tombstoned -> present again: un-tombstone, treated as a fresh create
//!
//! Matching is by live-product identity, never snapshot identity: a payload
//! may reference the live product while the stored line references its
//! snapshot. All snapshot resolution happens before any stock delta, so a
//! shortfall aborts with only cheap-to-discard snapshot writes staged.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::debug;

use packhouse_core::ProductId;

use crate::db::RepositoryError;
use crate::error::{EngineError, EntityKind};
use crate::models::{LineInput, LineRef, Order, OrderLine, Product, ProductSnapshot};
use crate::snapshot;
use crate::store::FulfillmentTx;
use crate::ledger;

/// A desired line resolved to live-product identity.
struct ResolvedLine {
    product_id: ProductId,
    product: Option<Product>,
    snapshot: Option<ProductSnapshot>,
    quantity: i32,
}

/// A desired line with its snapshot materialized.
struct PlannedLine {
    product_id: ProductId,
    snapshot: ProductSnapshot,
    quantity: i32,
}

/// Reconcile an order's lines against the desired set.
///
/// Works for new orders (no current lines; every desired line is a create) and
/// existing ones alike. The caller owns the surrounding transaction; on any
/// error the whole unit of work must be rolled back.
///
/// # Errors
///
/// [`EngineError::InvalidQuantity`] for a negative desired quantity,
/// [`EngineError::NotFound`] for a dangling product or snapshot reference,
/// [`EngineError::InsufficientStock`] when a debit cannot be satisfied, or a
/// persistence error from the store.
pub async fn reconcile_lines<T: FulfillmentTx>(
    tx: &mut T,
    order: &Order,
    desired: &[LineInput],
) -> Result<(), EngineError> {
    let resolved = resolve_lines(tx, desired).await?;

    // Snapshots first, stock second: a shortfall must abort before anything
    // expensive to undo has happened.
    let planned = materialize_snapshots(tx, resolved).await?;
    let current = current_lines_by_product(tx, order).await?;

    let desired_products: HashSet<ProductId> = planned.iter().map(|p| p.product_id).collect();

    for line in &planned {
        apply_line(tx, order, line, current.get(&line.product_id)).await?;
    }

    // Any current active line with no desired counterpart is tombstoned and
    // its full remaining quantity returned to stock.
    for (product_id, line) in &current {
        if line.is_active() && !desired_products.contains(product_id) {
            debug!(order = %order.id, line = %line.id, %product_id, "tombstoning line");
            tx.set_order_line_tombstone(line.id, Some(Utc::now())).await?;
            ledger::credit(tx, *product_id, line.quantity).await?;
        }
    }

    Ok(())
}

/// Resolve every input to live-product identity, validating quantities.
///
/// When one payload references the same product more than once the last entry
/// wins, keeping the position of the first.
async fn resolve_lines<T: FulfillmentTx>(
    tx: &mut T,
    desired: &[LineInput],
) -> Result<Vec<ResolvedLine>, EngineError> {
    let mut lines: Vec<ResolvedLine> = Vec::with_capacity(desired.len());
    let mut index: HashMap<ProductId, usize> = HashMap::new();

    for input in desired {
        if input.quantity < 0 {
            return Err(EngineError::InvalidQuantity {
                line: input.line,
                quantity: input.quantity,
            });
        }

        let resolved = match input.line {
            LineRef::Product(product_id) => {
                let product = tx.product(product_id).await?;
                let snapshot = tx.product_snapshot_for(product_id).await?;
                // A live product that was deleted after being snapshotted can
                // still be ordered through its snapshot; a product the catalog
                // has never known cannot.
                if product.is_none() && snapshot.is_none() {
                    return Err(EngineError::not_found(EntityKind::Product, product_id));
                }
                ResolvedLine {
                    product_id,
                    product,
                    snapshot,
                    quantity: input.quantity,
                }
            }
            LineRef::Snapshot(snapshot_id) => {
                let snapshot = tx
                    .product_snapshot(snapshot_id)
                    .await?
                    .ok_or_else(|| {
                        EngineError::not_found(EntityKind::ProductSnapshot, snapshot_id)
                    })?;
                let product_id = snapshot.product_id;
                ResolvedLine {
                    product_id,
                    product: tx.product(product_id).await?,
                    snapshot: Some(snapshot),
                    quantity: input.quantity,
                }
            }
        };

        match index.get(&resolved.product_id) {
            Some(&at) => {
                let Some(slot) = lines.get_mut(at) else {
                    // index entries always point into `lines`
                    continue;
                };
                *slot = resolved;
            }
            None => {
                index.insert(resolved.product_id, lines.len());
                lines.push(resolved);
            }
        }
    }

    Ok(lines)
}

/// Ensure every resolved line has a product snapshot, creating missing ones.
async fn materialize_snapshots<T: FulfillmentTx>(
    tx: &mut T,
    resolved: Vec<ResolvedLine>,
) -> Result<Vec<PlannedLine>, EngineError> {
    let mut planned = Vec::with_capacity(resolved.len());

    for line in resolved {
        let snapshot = match line.snapshot {
            Some(snapshot) => snapshot,
            None => {
                // resolve_lines guarantees a product when no snapshot exists
                let product = line.product.as_ref().ok_or_else(|| {
                    EngineError::not_found(EntityKind::Product, line.product_id)
                })?;
                snapshot::get_or_create_product(tx, product).await?
            }
        };
        planned.push(PlannedLine {
            product_id: line.product_id,
            snapshot,
            quantity: line.quantity,
        });
    }

    Ok(planned)
}

/// Load the order's lines (tombstoned included), keyed by live-product id.
async fn current_lines_by_product<T: FulfillmentTx>(
    tx: &mut T,
    order: &Order,
) -> Result<HashMap<ProductId, OrderLine>, EngineError> {
    let mut by_product = HashMap::new();

    for line in tx.order_lines(order.id).await? {
        let snapshot = tx
            .product_snapshot(line.product_snapshot_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "order line {} references missing product snapshot {}",
                    line.id, line.product_snapshot_id
                ))
            })?;
        by_product.insert(snapshot.product_id, line);
    }

    Ok(by_product)
}

/// Apply one desired line's transition.
async fn apply_line<T: FulfillmentTx>(
    tx: &mut T,
    order: &Order,
    desired: &PlannedLine,
    current: Option<&OrderLine>,
) -> Result<(), EngineError> {
    match current {
        None => {
            debug!(
                order = %order.id,
                product = %desired.product_id,
                quantity = desired.quantity,
                "creating line"
            );
            tx.insert_order_line(order.id, desired.snapshot.id, desired.quantity)
                .await?;
            ledger::debit(tx, desired.product_id, desired.quantity).await?;
        }
        Some(line) if line.is_active() => {
            let delta = desired.quantity - line.quantity;
            if delta == 0 {
                return Ok(());
            }
            debug!(
                order = %order.id,
                line = %line.id,
                from = line.quantity,
                to = desired.quantity,
                "adjusting line quantity"
            );
            if delta > 0 {
                ledger::debit(tx, desired.product_id, delta).await?;
            } else {
                ledger::credit(tx, desired.product_id, -delta).await?;
            }
            tx.set_order_line_quantity(line.id, desired.quantity).await?;
        }
        Some(line) => {
            // Tombstoned line coming back: its stock was returned when it was
            // tombstoned, so this is a fresh create wearing an old row.
            debug!(
                order = %order.id,
                line = %line.id,
                quantity = desired.quantity,
                "restoring tombstoned line"
            );
            tx.set_order_line_tombstone(line.id, None).await?;
            tx.set_order_line_quantity(line.id, desired.quantity).await?;
            ledger::debit(tx, desired.product_id, desired.quantity).await?;
        }
    }

    Ok(())
}
