//! Storage seam for the fulfillment engine.
//!
//! [`FulfillmentStore`] hands out one [`FulfillmentTx`] per unit of work. All
//! loads and writes a reconciliation performs go through the transaction, and
//! nothing is observable outside it until `commit`. Backends must serialize
//! concurrent units of work that touch the same product's stock rows; the
//! `PostgreSQL` adapter does this with row locks, the in-memory adapter with a
//! store-wide mutex.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use packhouse_core::{
    AddressSnapshotId, CustomerId, CustomerSnapshotId, LocationId, OrderId, OrderLineId,
    ProductId, ProductSnapshotId, StateId,
};

use crate::db::RepositoryError;
use crate::models::{
    Address, AddressSnapshot, Customer, CustomerSnapshot, LocationStock, Order, OrderLine,
    Product, ProductSnapshot, State,
};

/// A transactional unit of work against the backing store.
///
/// Read methods return `None` for absent entities; referential breakage inside
/// the store (e.g. a line pointing at a missing snapshot) is reported as
/// [`RepositoryError::DataCorruption`] by the caller, not here.
#[async_trait]
pub trait FulfillmentTx: Send {
    // ---- Catalog (read-only collaborators) ----

    /// Load a live product.
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Load a live customer with their current address embedded.
    async fn customer(&mut self, id: CustomerId) -> Result<Option<Customer>, RepositoryError>;

    /// Load an order state.
    async fn state(&mut self, id: StateId) -> Result<Option<State>, RepositoryError>;

    // ---- Orders ----

    /// Load an order.
    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Load all orders, in id order.
    async fn orders(&mut self) -> Result<Vec<Order>, RepositoryError>;

    /// Insert a new order and return it with its assigned id.
    async fn insert_order(
        &mut self,
        created_at: DateTime<Utc>,
        customer_id: CustomerId,
        customer_snapshot_id: CustomerSnapshotId,
        state_id: StateId,
    ) -> Result<Order, RepositoryError>;

    /// Move an order to a new state.
    async fn set_order_state(
        &mut self,
        id: OrderId,
        state_id: StateId,
    ) -> Result<(), RepositoryError>;

    // ---- Order lines ----

    /// Load all lines of an order, tombstoned ones included, in line-id order.
    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError>;

    /// Insert a new active line and return it with its assigned id.
    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        product_snapshot_id: ProductSnapshotId,
        quantity: i32,
    ) -> Result<OrderLine, RepositoryError>;

    /// Overwrite a line's quantity.
    async fn set_order_line_quantity(
        &mut self,
        id: OrderLineId,
        quantity: i32,
    ) -> Result<(), RepositoryError>;

    /// Set or clear a line's tombstone marker.
    async fn set_order_line_tombstone(
        &mut self,
        id: OrderLineId,
        tombstoned_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;

    // ---- Snapshots ----

    /// Load a product snapshot by its own id.
    async fn product_snapshot(
        &mut self,
        id: ProductSnapshotId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError>;

    /// Find the product snapshot for a live product, if one was ever taken.
    async fn product_snapshot_for(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError>;

    /// Insert a snapshot copying the product's current fields.
    async fn insert_product_snapshot(
        &mut self,
        product: &Product,
    ) -> Result<ProductSnapshot, RepositoryError>;

    /// Load a customer snapshot.
    async fn customer_snapshot(
        &mut self,
        id: CustomerSnapshotId,
    ) -> Result<Option<CustomerSnapshot>, RepositoryError>;

    /// Load an address snapshot.
    async fn address_snapshot(
        &mut self,
        id: AddressSnapshotId,
    ) -> Result<Option<AddressSnapshot>, RepositoryError>;

    /// Find an address snapshot by exact field match.
    async fn find_address_snapshot(
        &mut self,
        street: &str,
        city: &str,
        zip: &str,
    ) -> Result<Option<AddressSnapshot>, RepositoryError>;

    /// Insert a snapshot copying the address's current fields.
    async fn insert_address_snapshot(
        &mut self,
        address: &Address,
    ) -> Result<AddressSnapshot, RepositoryError>;

    /// Find a customer snapshot by exact name match plus address snapshot.
    async fn find_customer_snapshot(
        &mut self,
        first_name: &str,
        last_name: &str,
        address_snapshot_id: AddressSnapshotId,
    ) -> Result<Option<CustomerSnapshot>, RepositoryError>;

    /// Insert a snapshot copying the customer's current fields.
    async fn insert_customer_snapshot(
        &mut self,
        customer: &Customer,
        address_snapshot_id: AddressSnapshotId,
    ) -> Result<CustomerSnapshot, RepositoryError>;

    // ---- Stock ----

    /// Load all stock rows for a product, ordered by quantity descending then
    /// location id ascending, locked for the rest of the transaction where the
    /// backend supports row locking.
    async fn stock_for_product(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<LocationStock>, RepositoryError>;

    /// Overwrite one stock row's quantity.
    async fn set_stock_quantity(
        &mut self,
        location_id: LocationId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError>;

    // ---- Unit of work ----

    /// Persist every staged mutation exactly once.
    async fn commit(self) -> Result<(), RepositoryError>;

    /// Discard every staged mutation.
    async fn rollback(self) -> Result<(), RepositoryError>;
}

/// A backing store that can begin transactional units of work.
#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    /// The transaction type this store hands out.
    type Tx: FulfillmentTx;

    /// Begin a new unit of work.
    async fn begin(&self) -> Result<Self::Tx, RepositoryError>;
}
