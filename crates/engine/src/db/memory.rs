//! In-memory store for tests and local development.
//!
//! Transactions take a working copy of the whole state under an owned mutex
//! guard; commit writes the copy back, rollback just drops it. Holding the
//! guard for the lifetime of the transaction serializes all units of work,
//! which more than satisfies the engine's per-product serialization
//! requirement.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use packhouse_core::{
    AddressSnapshotId, CustomerId, CustomerSnapshotId, LocationId, OrderId, OrderLineId,
    ProductId, ProductSnapshotId, StateId,
};

use super::RepositoryError;
use crate::models::{
    Address, AddressSnapshot, Customer, CustomerSnapshot, LocationStock, Order, OrderLine,
    Product, ProductSnapshot, State,
};
use crate::store::{FulfillmentStore, FulfillmentTx};

/// Everything the store holds, keyed by raw id for deterministic iteration.
#[derive(Debug, Default, Clone)]
struct MemoryState {
    products: BTreeMap<i32, Product>,
    customers: BTreeMap<i32, Customer>,
    states: BTreeMap<i32, State>,
    /// (product id, location id) -> quantity
    stock: BTreeMap<(i32, i32), i32>,
    orders: BTreeMap<i32, Order>,
    order_lines: BTreeMap<i32, OrderLine>,
    product_snapshots: BTreeMap<i32, ProductSnapshot>,
    address_snapshots: BTreeMap<i32, AddressSnapshot>,
    customer_snapshots: BTreeMap<i32, CustomerSnapshot>,
    next_id: i32,
}

impl MemoryState {
    fn alloc_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// An in-memory [`FulfillmentStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a catalog state.
    pub async fn seed_state(&self, state: State) {
        let mut guard = self.state.lock().await;
        guard.states.insert(state.id.as_i32(), state);
    }

    /// Insert or replace a live product. Replacing simulates a catalog edit;
    /// existing snapshots must not change.
    pub async fn seed_product(&self, product: Product) {
        let mut guard = self.state.lock().await;
        guard.products.insert(product.id.as_i32(), product);
    }

    /// Insert or replace a live customer with their address.
    pub async fn seed_customer(&self, customer: Customer) {
        let mut guard = self.state.lock().await;
        guard.customers.insert(customer.id.as_i32(), customer);
    }

    /// Create or overwrite one stock row.
    pub async fn set_stock(&self, location_id: LocationId, product_id: ProductId, quantity: i32) {
        let mut guard = self.state.lock().await;
        guard
            .stock
            .insert((product_id.as_i32(), location_id.as_i32()), quantity);
    }

    /// Quantity at one location, if the row exists.
    pub async fn stock_at(&self, location_id: LocationId, product_id: ProductId) -> Option<i32> {
        let guard = self.state.lock().await;
        guard
            .stock
            .get(&(product_id.as_i32(), location_id.as_i32()))
            .copied()
    }

    /// Sum of all location quantities for a product.
    pub async fn total_stock(&self, product_id: ProductId) -> i64 {
        let guard = self.state.lock().await;
        guard
            .stock
            .iter()
            .filter(|((product, _), _)| *product == product_id.as_i32())
            .map(|(_, quantity)| i64::from(*quantity))
            .sum()
    }

    /// How many product snapshots exist.
    pub async fn product_snapshot_count(&self) -> usize {
        self.state.lock().await.product_snapshots.len()
    }

    /// How many order lines exist, tombstoned included.
    pub async fn order_line_count(&self) -> usize {
        self.state.lock().await.order_lines.len()
    }
}

#[async_trait]
impl FulfillmentStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx { guard, work })
    }
}

/// A unit of work over a working copy of the store.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl FulfillmentTx for MemoryTx {
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.work.products.get(&id.as_i32()).cloned())
    }

    async fn customer(&mut self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.work.customers.get(&id.as_i32()).cloned())
    }

    async fn state(&mut self, id: StateId) -> Result<Option<State>, RepositoryError> {
        Ok(self.work.states.get(&id.as_i32()).cloned())
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.work.orders.get(&id.as_i32()).cloned())
    }

    async fn orders(&mut self) -> Result<Vec<Order>, RepositoryError> {
        Ok(self.work.orders.values().cloned().collect())
    }

    async fn insert_order(
        &mut self,
        created_at: DateTime<Utc>,
        customer_id: CustomerId,
        customer_snapshot_id: CustomerSnapshotId,
        state_id: StateId,
    ) -> Result<Order, RepositoryError> {
        let id = OrderId::new(self.work.alloc_id());
        let order = Order {
            id,
            created_at,
            customer_id,
            customer_snapshot_id,
            state_id,
        };
        self.work.orders.insert(id.as_i32(), order.clone());
        Ok(order)
    }

    async fn set_order_state(
        &mut self,
        id: OrderId,
        state_id: StateId,
    ) -> Result<(), RepositoryError> {
        let order = self
            .work
            .orders
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        order.state_id = state_id;
        Ok(())
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        Ok(self
            .work
            .order_lines
            .values()
            .filter(|line| line.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        product_snapshot_id: ProductSnapshotId,
        quantity: i32,
    ) -> Result<OrderLine, RepositoryError> {
        let duplicate = self.work.order_lines.values().any(|line| {
            line.order_id == order_id && line.product_snapshot_id == product_snapshot_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "order {order_id} already has a line for snapshot {product_snapshot_id}"
            )));
        }

        let id = OrderLineId::new(self.work.alloc_id());
        let line = OrderLine {
            id,
            order_id,
            product_snapshot_id,
            quantity,
            tombstoned_at: None,
        };
        self.work.order_lines.insert(id.as_i32(), line.clone());
        Ok(line)
    }

    async fn set_order_line_quantity(
        &mut self,
        id: OrderLineId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let line = self
            .work
            .order_lines
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        line.quantity = quantity;
        Ok(())
    }

    async fn set_order_line_tombstone(
        &mut self,
        id: OrderLineId,
        tombstoned_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let line = self
            .work
            .order_lines
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;
        line.tombstoned_at = tombstoned_at;
        Ok(())
    }

    async fn product_snapshot(
        &mut self,
        id: ProductSnapshotId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError> {
        Ok(self.work.product_snapshots.get(&id.as_i32()).cloned())
    }

    async fn product_snapshot_for(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError> {
        Ok(self
            .work
            .product_snapshots
            .values()
            .find(|snapshot| snapshot.product_id == product_id)
            .cloned())
    }

    async fn insert_product_snapshot(
        &mut self,
        product: &Product,
    ) -> Result<ProductSnapshot, RepositoryError> {
        let id = ProductSnapshotId::new(self.work.alloc_id());
        let snapshot = ProductSnapshot {
            id,
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            sku: product.sku.clone(),
        };
        self.work
            .product_snapshots
            .insert(id.as_i32(), snapshot.clone());
        Ok(snapshot)
    }

    async fn customer_snapshot(
        &mut self,
        id: CustomerSnapshotId,
    ) -> Result<Option<CustomerSnapshot>, RepositoryError> {
        Ok(self.work.customer_snapshots.get(&id.as_i32()).cloned())
    }

    async fn address_snapshot(
        &mut self,
        id: AddressSnapshotId,
    ) -> Result<Option<AddressSnapshot>, RepositoryError> {
        Ok(self.work.address_snapshots.get(&id.as_i32()).cloned())
    }

    async fn find_address_snapshot(
        &mut self,
        street: &str,
        city: &str,
        zip: &str,
    ) -> Result<Option<AddressSnapshot>, RepositoryError> {
        Ok(self
            .work
            .address_snapshots
            .values()
            .find(|snapshot| {
                snapshot.street == street && snapshot.city == city && snapshot.zip == zip
            })
            .cloned())
    }

    async fn insert_address_snapshot(
        &mut self,
        address: &Address,
    ) -> Result<AddressSnapshot, RepositoryError> {
        let id = AddressSnapshotId::new(self.work.alloc_id());
        let snapshot = AddressSnapshot {
            id,
            street: address.street.clone(),
            city: address.city.clone(),
            zip: address.zip.clone(),
        };
        self.work
            .address_snapshots
            .insert(id.as_i32(), snapshot.clone());
        Ok(snapshot)
    }

    async fn find_customer_snapshot(
        &mut self,
        first_name: &str,
        last_name: &str,
        address_snapshot_id: AddressSnapshotId,
    ) -> Result<Option<CustomerSnapshot>, RepositoryError> {
        Ok(self
            .work
            .customer_snapshots
            .values()
            .find(|snapshot| {
                snapshot.first_name == first_name
                    && snapshot.last_name == last_name
                    && snapshot.address_snapshot_id == address_snapshot_id
            })
            .cloned())
    }

    async fn insert_customer_snapshot(
        &mut self,
        customer: &Customer,
        address_snapshot_id: AddressSnapshotId,
    ) -> Result<CustomerSnapshot, RepositoryError> {
        let id = CustomerSnapshotId::new(self.work.alloc_id());
        let snapshot = CustomerSnapshot {
            id,
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            address_snapshot_id,
        };
        self.work
            .customer_snapshots
            .insert(id.as_i32(), snapshot.clone());
        Ok(snapshot)
    }

    async fn stock_for_product(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<LocationStock>, RepositoryError> {
        let mut rows: Vec<LocationStock> = self
            .work
            .stock
            .iter()
            .filter(|((product, _), _)| *product == product_id.as_i32())
            .map(|((_, location), quantity)| LocationStock {
                location_id: LocationId::new(*location),
                product_id,
                quantity: *quantity,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then(a.location_id.cmp(&b.location_id))
        });
        Ok(rows)
    }

    async fn set_stock_quantity(
        &mut self,
        location_id: LocationId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let slot = self
            .work
            .stock
            .get_mut(&(product_id.as_i32(), location_id.as_i32()))
            .ok_or(RepositoryError::NotFound)?;
        *slot = quantity;
        Ok(())
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        *self.guard = self.work;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
