//! Caller-facing fulfillment operations.
//!
//! This module is the transaction coordinator: every public operation begins
//! one unit of work against the store, runs entirely inside it, and commits
//! only if every step succeeded. On any error the unit of work is discarded,
//! leaving stock and snapshot tables exactly as they were. A commit failure
//! surfaces as [`EngineError::Persistence`], distinct from business failures.

use chrono::Utc;
use tracing::{info, instrument, warn};

use packhouse_core::{OrderId, StateId};

use crate::db::RepositoryError;
use crate::error::{EngineError, EntityKind};
use crate::models::{CreateOrderInput, LineView, Order, OrderView, UpdateOrderInput};
use crate::reconcile;
use crate::snapshot;
use crate::store::{FulfillmentStore, FulfillmentTx};

/// State newly placed orders start in when the caller names none.
pub const DEFAULT_STATE_ID: StateId = StateId::new(1);

/// The fulfillment service, generic over its backing store.
pub struct FulfillmentService<S> {
    store: S,
}

impl<S: FulfillmentStore> FulfillmentService<S> {
    /// Create a new fulfillment service.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Place a new order for a customer.
    ///
    /// Takes customer and address snapshots, creates the order, and reconciles
    /// the desired lines (every one a create). A missing `state_id` defaults
    /// to [`DEFAULT_STATE_ID`].
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for a missing customer, state, or product;
    /// [`EngineError::InsufficientStock`] / [`EngineError::InvalidQuantity`]
    /// from reconciliation; [`EngineError::Persistence`] on storage failure.
    #[instrument(skip(self, input), fields(customer = %input.customer_id))]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderView, EngineError> {
        let mut tx = self.store.begin().await?;
        let result = create_order_tx(&mut tx, &input).await;
        let view = finish(tx, result).await?;
        info!(order = %view.order.id, "order created");
        Ok(view)
    }

    /// Update an existing order to the desired line set and state.
    ///
    /// Lines absent from `input.lines` are tombstoned and their stock
    /// returned; tombstoned lines that reappear are restored.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for a missing order, state, or product;
    /// [`EngineError::InsufficientStock`] / [`EngineError::InvalidQuantity`]
    /// from reconciliation; [`EngineError::Persistence`] on storage failure.
    #[instrument(skip(self, input), fields(order = %order_id))]
    pub async fn update_order(
        &self,
        order_id: OrderId,
        input: UpdateOrderInput,
    ) -> Result<OrderView, EngineError> {
        let mut tx = self.store.begin().await?;
        let result = update_order_tx(&mut tx, order_id, &input).await;
        let view = finish(tx, result).await?;
        info!(order = %order_id, "order updated");
        Ok(view)
    }

    /// Fetch one order with its snapshots and active line quantities.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] when the order does not exist;
    /// [`EngineError::Persistence`] on storage failure.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderView, EngineError> {
        let mut tx = self.store.begin().await?;
        let result = load_view(&mut tx, order_id).await;
        finish(tx, result).await
    }

    /// List all orders with their active line quantities.
    ///
    /// # Errors
    ///
    /// [`EngineError::Persistence`] on storage failure.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderView>, EngineError> {
        let mut tx = self.store.begin().await?;
        let result = load_all_views(&mut tx).await;
        finish(tx, result).await
    }
}

/// Commit on success, roll back on error.
///
/// A failed rollback is logged but never masks the original error.
async fn finish<T: FulfillmentTx, V>(tx: T, result: Result<V, EngineError>) -> Result<V, EngineError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed after aborted unit of work");
            }
            Err(err)
        }
    }
}

async fn create_order_tx<T: FulfillmentTx>(
    tx: &mut T,
    input: &CreateOrderInput,
) -> Result<OrderView, EngineError> {
    let customer = tx
        .customer(input.customer_id)
        .await?
        .ok_or_else(|| EngineError::not_found(EntityKind::Customer, input.customer_id))?;

    let state_id = input.state_id.unwrap_or(DEFAULT_STATE_ID);
    ensure_state_exists(tx, state_id).await?;

    let address_snapshot = snapshot::get_or_create_address(tx, &customer.address).await?;
    let customer_snapshot =
        snapshot::get_or_create_customer(tx, &customer, address_snapshot.id).await?;

    let order = tx
        .insert_order(Utc::now(), customer.id, customer_snapshot.id, state_id)
        .await?;

    reconcile::reconcile_lines(tx, &order, &input.lines).await?;

    load_view(tx, order.id).await
}

async fn update_order_tx<T: FulfillmentTx>(
    tx: &mut T,
    order_id: OrderId,
    input: &UpdateOrderInput,
) -> Result<OrderView, EngineError> {
    let order = tx
        .order(order_id)
        .await?
        .ok_or_else(|| EngineError::not_found(EntityKind::Order, order_id))?;

    ensure_state_exists(tx, input.state_id).await?;

    reconcile::reconcile_lines(tx, &order, &input.lines).await?;

    if order.state_id != input.state_id {
        tx.set_order_state(order.id, input.state_id).await?;
    }

    load_view(tx, order_id).await
}

async fn ensure_state_exists<T: FulfillmentTx>(
    tx: &mut T,
    state_id: StateId,
) -> Result<(), EngineError> {
    tx.state(state_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| EngineError::not_found(EntityKind::State, state_id))
}

/// Assemble the caller-facing view of one order.
///
/// References from a committed order to its snapshots and state are expected
/// to hold; a miss is data corruption, not a business `NotFound`.
async fn load_view<T: FulfillmentTx>(tx: &mut T, order_id: OrderId) -> Result<OrderView, EngineError> {
    let order = tx
        .order(order_id)
        .await?
        .ok_or_else(|| EngineError::not_found(EntityKind::Order, order_id))?;

    view_of(tx, order).await
}

async fn load_all_views<T: FulfillmentTx>(tx: &mut T) -> Result<Vec<OrderView>, EngineError> {
    let orders = tx.orders().await?;
    let mut views = Vec::with_capacity(orders.len());
    for order in orders {
        views.push(view_of(tx, order).await?);
    }
    Ok(views)
}

async fn view_of<T: FulfillmentTx>(tx: &mut T, order: Order) -> Result<OrderView, EngineError> {
    let state = tx.state(order.state_id).await?.ok_or_else(|| {
        corrupt(format!("order {} references missing state {}", order.id, order.state_id))
    })?;

    let customer = tx
        .customer_snapshot(order.customer_snapshot_id)
        .await?
        .ok_or_else(|| {
            corrupt(format!(
                "order {} references missing customer snapshot {}",
                order.id, order.customer_snapshot_id
            ))
        })?;

    let address = tx
        .address_snapshot(customer.address_snapshot_id)
        .await?
        .ok_or_else(|| {
            corrupt(format!(
                "customer snapshot {} references missing address snapshot {}",
                customer.id, customer.address_snapshot_id
            ))
        })?;

    let mut lines = Vec::new();
    for line in tx.order_lines(order.id).await? {
        if !line.is_active() {
            continue;
        }
        let product = tx
            .product_snapshot(line.product_snapshot_id)
            .await?
            .ok_or_else(|| {
                corrupt(format!(
                    "order line {} references missing product snapshot {}",
                    line.id, line.product_snapshot_id
                ))
            })?;
        lines.push(LineView {
            line_id: line.id,
            product,
            quantity: line.quantity,
        });
    }

    Ok(OrderView {
        order,
        state,
        customer,
        address,
        lines,
    })
}

fn corrupt(message: String) -> EngineError {
    EngineError::Persistence(RepositoryError::DataCorruption(message))
}
