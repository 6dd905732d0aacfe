//! End-to-end fulfillment tests over the in-memory store.
//!
//! Every scenario drives the public [`FulfillmentService`] operations only;
//! direct store access is limited to seeding and post-hoc inspection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use packhouse_engine::db::RepositoryError;
use packhouse_engine::db::memory::MemoryTx;
use packhouse_engine::models::{
    Address, AddressSnapshot, CreateOrderInput, Customer, CustomerSnapshot, LineInput, LineRef,
    LocationStock, Order, OrderLine, Product, ProductSnapshot, State, UpdateOrderInput,
};
use packhouse_engine::{
    DEFAULT_STATE_ID, EngineError, EntityKind, FulfillmentService, FulfillmentStore,
    FulfillmentTx, MemoryStore,
};

use packhouse_core::{
    AddressSnapshotId, CurrencyCode, CustomerId, CustomerSnapshotId, LocationId, OrderId,
    OrderLineId, Price, ProductId, ProductSnapshotId, StateId,
};

const NORTH: LocationId = LocationId::new(1);
const SOUTH: LocationId = LocationId::new(2);
const APPLES: ProductId = ProductId::new(1);
const CRATES: ProductId = ProductId::new(2);
const ADA: CustomerId = CustomerId::new(1);
const SHIPPED: StateId = StateId::new(2);

fn product(id: ProductId, name: &str, cents: i64, sku: &str) -> Product {
    Product {
        id,
        name: name.to_string(),
        price: Price::from_cents(cents, CurrencyCode::USD),
        sku: sku.to_string(),
    }
}

fn customer(id: CustomerId) -> Customer {
    Customer {
        id,
        first_name: "Ada".to_string(),
        last_name: "Fields".to_string(),
        address: Address {
            id: packhouse_core::AddressId::new(1),
            street: "12 Orchard Lane".to_string(),
            city: "Yakima".to_string(),
            zip: "98901".to_string(),
        },
    }
}

fn lines(entries: &[(ProductId, i32)]) -> Vec<LineInput> {
    entries
        .iter()
        .map(|&(product_id, quantity)| LineInput {
            line: LineRef::Product(product_id),
            quantity,
        })
        .collect()
}

fn create_input(customer_id: CustomerId, entries: &[(ProductId, i32)]) -> CreateOrderInput {
    CreateOrderInput {
        customer_id,
        state_id: None,
        lines: lines(entries),
    }
}

fn update_input(state_id: StateId, entries: &[(ProductId, i32)]) -> UpdateOrderInput {
    UpdateOrderInput {
        state_id,
        lines: lines(entries),
    }
}

/// Seed the standard fixture: two states, one customer, apples split 5/3
/// across two locations, and crates stocked at one.
async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .seed_state(State {
            id: DEFAULT_STATE_ID,
            name: "Pending".to_string(),
        })
        .await;
    store
        .seed_state(State {
            id: SHIPPED,
            name: "Shipped".to_string(),
        })
        .await;
    store.seed_customer(customer(ADA)).await;
    store.seed_product(product(APPLES, "Apples", 299, "AP-001")).await;
    store.seed_product(product(CRATES, "Crates", 1250, "CR-001")).await;
    store.set_stock(NORTH, APPLES, 5).await;
    store.set_stock(SOUTH, APPLES, 3).await;
    store.set_stock(NORTH, CRATES, 10).await;
    store
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_debits_highest_quantity_location_first() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 6)]))
        .await
        .expect("order should be created");

    // 5 from the fuller north location, the remaining 1 from south
    assert_eq!(store.stock_at(NORTH, APPLES).await, Some(0));
    assert_eq!(store.stock_at(SOUTH, APPLES).await, Some(2));

    assert_eq!(view.order.state_id, DEFAULT_STATE_ID);
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].quantity, 6);
    assert_eq!(view.lines[0].product.product_id, APPLES);
    assert_eq!(view.customer.first_name, "Ada");
    assert_eq!(view.address.city, "Yakima");
}

#[tokio::test]
async fn test_create_with_explicit_state() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store);

    let view = service
        .create_order(CreateOrderInput {
            customer_id: ADA,
            state_id: Some(SHIPPED),
            lines: lines(&[(APPLES, 1)]),
        })
        .await
        .expect("order should be created");

    assert_eq!(view.order.state_id, SHIPPED);
    assert_eq!(view.state.name, "Shipped");
}

#[tokio::test]
async fn test_create_shortfall_leaves_no_trace() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let err = service
        .create_order(create_input(ADA, &[(APPLES, 10)]))
        .await
        .expect_err("8 available, 10 requested");

    match err {
        EngineError::InsufficientStock {
            product_id,
            shortfall,
        } => {
            assert_eq!(product_id, APPLES);
            assert_eq!(shortfall, 2);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Rolled back: stock, orders, and snapshots all untouched
    assert_eq!(store.stock_at(NORTH, APPLES).await, Some(5));
    assert_eq!(store.stock_at(SOUTH, APPLES).await, Some(3));
    assert_eq!(store.product_snapshot_count().await, 0);
    assert!(service.list_orders().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_create_all_or_nothing_across_lines() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    // Crates line is satisfiable on its own; the apples line is not
    let err = service
        .create_order(create_input(ADA, &[(CRATES, 4), (APPLES, 9)]))
        .await
        .expect_err("one short line fails the whole order");
    assert!(matches!(err, EngineError::InsufficientStock { .. }));

    assert_eq!(store.stock_at(NORTH, CRATES).await, Some(10));
    assert_eq!(store.stock_at(NORTH, APPLES).await, Some(5));
    assert!(service.list_orders().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_create_duplicate_product_entries_last_wins() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 2), (APPLES, 4)]))
        .await
        .expect("order should be created");

    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].quantity, 4);
    assert_eq!(store.total_stock(APPLES).await, 4);
}

#[tokio::test]
async fn test_create_zero_quantity_line_is_allowed() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 0)]))
        .await
        .expect("zero is a valid desired quantity");

    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].quantity, 0);
    assert_eq!(store.total_stock(APPLES).await, 8);
}

#[tokio::test]
async fn test_create_rejects_negative_quantity() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store);

    let err = service
        .create_order(create_input(ADA, &[(APPLES, -3)]))
        .await
        .expect_err("negative quantity");

    match err {
        EngineError::InvalidQuantity { line, quantity } => {
            assert_eq!(line, LineRef::Product(APPLES));
            assert_eq!(quantity, -3);
        }
        other => panic!("expected InvalidQuantity, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_unknown_customer() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store);

    let err = service
        .create_order(create_input(CustomerId::new(99), &[(APPLES, 1)]))
        .await
        .expect_err("customer 99 does not exist");

    match err {
        EngineError::NotFound { kind, id } => {
            assert_eq!(kind, EntityKind::Customer);
            assert_eq!(id, 99);
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_unknown_product() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store);

    let err = service
        .create_order(create_input(ADA, &[(ProductId::new(42), 1)]))
        .await
        .expect_err("product 42 does not exist");

    assert!(matches!(
        err,
        EngineError::NotFound {
            kind: EntityKind::Product,
            id: 42
        }
    ));
}

// ============================================================================
// Update: quantity transitions
// ============================================================================

#[tokio::test]
async fn test_update_decrease_credits_highest_quantity_location() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 6)]))
        .await
        .expect("create");
    // stock is now north 0 / south 2

    service
        .update_order(view.order.id, update_input(DEFAULT_STATE_ID, &[(APPLES, 2)]))
        .await
        .expect("update");

    // all 4 returned units land on the currently-fullest location
    assert_eq!(store.stock_at(NORTH, APPLES).await, Some(0));
    assert_eq!(store.stock_at(SOUTH, APPLES).await, Some(6));
}

#[tokio::test]
async fn test_update_increase_debits_only_the_delta() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 2)]))
        .await
        .expect("create");
    // stock is now north 3 / south 3

    let updated = service
        .update_order(view.order.id, update_input(DEFAULT_STATE_ID, &[(APPLES, 5)]))
        .await
        .expect("update");

    assert_eq!(updated.lines[0].quantity, 5);
    // delta of 3, tie on quantity broken by lower location id
    assert_eq!(store.stock_at(NORTH, APPLES).await, Some(0));
    assert_eq!(store.stock_at(SOUTH, APPLES).await, Some(3));
}

#[tokio::test]
async fn test_update_same_quantity_is_a_noop() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 4)]))
        .await
        .expect("create");

    let north_before = store.stock_at(NORTH, APPLES).await;
    let south_before = store.stock_at(SOUTH, APPLES).await;

    service
        .update_order(view.order.id, update_input(DEFAULT_STATE_ID, &[(APPLES, 4)]))
        .await
        .expect("update");

    // no stock movement, no new snapshot, no new line row
    assert_eq!(store.stock_at(NORTH, APPLES).await, north_before);
    assert_eq!(store.stock_at(SOUTH, APPLES).await, south_before);
    assert_eq!(store.product_snapshot_count().await, 1);
    assert_eq!(store.order_line_count().await, 1);
}

#[tokio::test]
async fn test_update_shortfall_rolls_back_whole_update() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 2), (CRATES, 1)]))
        .await
        .expect("create");

    // Raising crates is fine; raising apples past availability is not.
    let err = service
        .update_order(
            view.order.id,
            update_input(DEFAULT_STATE_ID, &[(CRATES, 5), (APPLES, 20)]),
        )
        .await
        .expect_err("apples cannot cover 20");
    assert!(matches!(err, EngineError::InsufficientStock { .. }));

    // The crates debit staged earlier in the same unit of work is discarded
    assert_eq!(store.stock_at(NORTH, CRATES).await, Some(9));
    let unchanged = service.get_order(view.order.id).await.expect("get");
    let quantities: Vec<i32> = unchanged.lines.iter().map(|l| l.quantity).collect();
    assert_eq!(quantities, vec![2, 1]);
}

#[tokio::test]
async fn test_update_changes_order_state() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store);

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 1)]))
        .await
        .expect("create");
    assert_eq!(view.order.state_id, DEFAULT_STATE_ID);

    let updated = service
        .update_order(view.order.id, update_input(SHIPPED, &[(APPLES, 1)]))
        .await
        .expect("update");
    assert_eq!(updated.order.state_id, SHIPPED);
    assert_eq!(updated.state.name, "Shipped");
}

#[tokio::test]
async fn test_update_unknown_order() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store);

    let err = service
        .update_order(OrderId::new(777), update_input(DEFAULT_STATE_ID, &[]))
        .await
        .expect_err("no such order");

    assert!(matches!(
        err,
        EngineError::NotFound {
            kind: EntityKind::Order,
            id: 777
        }
    ));
}

// ============================================================================
// Tombstoning
// ============================================================================

#[tokio::test]
async fn test_omitted_line_is_tombstoned_and_stock_returned() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 6), (CRATES, 2)]))
        .await
        .expect("create");

    let updated = service
        .update_order(view.order.id, update_input(DEFAULT_STATE_ID, &[(CRATES, 2)]))
        .await
        .expect("update");

    // Apples line is gone from the view but the row survives as a tombstone
    assert_eq!(updated.lines.len(), 1);
    assert_eq!(updated.lines[0].product.product_id, CRATES);
    assert_eq!(store.order_line_count().await, 2);
    assert_eq!(store.total_stock(APPLES).await, 8);
}

#[tokio::test]
async fn test_reappearing_line_reuses_the_tombstoned_row() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 6)]))
        .await
        .expect("create");

    service
        .update_order(view.order.id, update_input(DEFAULT_STATE_ID, &[]))
        .await
        .expect("tombstone");
    assert_eq!(store.total_stock(APPLES).await, 8);

    let restored = service
        .update_order(view.order.id, update_input(DEFAULT_STATE_ID, &[(APPLES, 3)]))
        .await
        .expect("restore");

    assert_eq!(restored.lines.len(), 1);
    assert_eq!(restored.lines[0].quantity, 3);
    // same row came back rather than a second one being created
    assert_eq!(restored.lines[0].line_id, view.lines[0].line_id);
    assert_eq!(store.order_line_count().await, 1);
    assert_eq!(store.total_stock(APPLES).await, 5);
}

// ============================================================================
// Snapshots
// ============================================================================

#[tokio::test]
async fn test_order_view_survives_catalog_edits() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 1)]))
        .await
        .expect("create");

    // Catalog edit after the order was placed
    store
        .seed_product(product(APPLES, "Honeycrisp Apples", 499, "AP-002"))
        .await;

    let reloaded = service.get_order(view.order.id).await.expect("get");
    assert_eq!(reloaded.lines[0].product.name, "Apples");
    assert_eq!(
        reloaded.lines[0].product.price,
        Price::from_cents(299, CurrencyCode::USD)
    );
    assert_eq!(reloaded.lines[0].product.sku, "AP-001");
}

#[tokio::test]
async fn test_snapshots_are_shared_across_orders() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let first = service
        .create_order(create_input(ADA, &[(APPLES, 1)]))
        .await
        .expect("first order");
    let second = service
        .create_order(create_input(ADA, &[(APPLES, 2)]))
        .await
        .expect("second order");

    // One product snapshot and one customer snapshot serve both orders
    assert_eq!(store.product_snapshot_count().await, 1);
    assert_eq!(first.lines[0].product.id, second.lines[0].product.id);
    assert_eq!(
        first.order.customer_snapshot_id,
        second.order.customer_snapshot_id
    );
}

#[tokio::test]
async fn test_line_can_reference_a_snapshot_directly() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let first = service
        .create_order(create_input(ADA, &[(APPLES, 2)]))
        .await
        .expect("first order");
    let snapshot_id = first.lines[0].product.id;

    let second = service
        .create_order(CreateOrderInput {
            customer_id: ADA,
            state_id: None,
            lines: vec![LineInput {
                line: LineRef::Snapshot(snapshot_id),
                quantity: 3,
            }],
        })
        .await
        .expect("second order via snapshot ref");

    assert_eq!(second.lines[0].product.id, snapshot_id);
    assert_eq!(second.lines[0].product.product_id, APPLES);
    assert_eq!(store.total_stock(APPLES).await, 3);
}

#[tokio::test]
async fn test_unknown_snapshot_reference() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store);

    let err = service
        .create_order(CreateOrderInput {
            customer_id: ADA,
            state_id: None,
            lines: vec![LineInput {
                line: LineRef::Snapshot(packhouse_core::ProductSnapshotId::new(55)),
                quantity: 1,
            }],
        })
        .await
        .expect_err("no such snapshot");

    assert!(matches!(
        err,
        EngineError::NotFound {
            kind: EntityKind::ProductSnapshot,
            id: 55
        }
    ));
}

// ============================================================================
// Persistence failures
// ============================================================================

/// A store whose transactions do all their work normally but fail at commit,
/// like a connection dying at the final round trip.
#[derive(Clone)]
struct BrokenCommitStore {
    inner: MemoryStore,
}

struct BrokenCommitTx {
    inner: MemoryTx,
}

#[async_trait]
impl FulfillmentStore for BrokenCommitStore {
    type Tx = BrokenCommitTx;

    async fn begin(&self) -> Result<Self::Tx, RepositoryError> {
        Ok(BrokenCommitTx {
            inner: self.inner.begin().await?,
        })
    }
}

#[async_trait]
impl FulfillmentTx for BrokenCommitTx {
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.inner.product(id).await
    }

    async fn customer(&mut self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        self.inner.customer(id).await
    }

    async fn state(&mut self, id: StateId) -> Result<Option<State>, RepositoryError> {
        self.inner.state(id).await
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.inner.order(id).await
    }

    async fn orders(&mut self) -> Result<Vec<Order>, RepositoryError> {
        self.inner.orders().await
    }

    async fn insert_order(
        &mut self,
        created_at: DateTime<Utc>,
        customer_id: CustomerId,
        customer_snapshot_id: CustomerSnapshotId,
        state_id: StateId,
    ) -> Result<Order, RepositoryError> {
        self.inner
            .insert_order(created_at, customer_id, customer_snapshot_id, state_id)
            .await
    }

    async fn set_order_state(
        &mut self,
        id: OrderId,
        state_id: StateId,
    ) -> Result<(), RepositoryError> {
        self.inner.set_order_state(id, state_id).await
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        self.inner.order_lines(order_id).await
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        product_snapshot_id: ProductSnapshotId,
        quantity: i32,
    ) -> Result<OrderLine, RepositoryError> {
        self.inner
            .insert_order_line(order_id, product_snapshot_id, quantity)
            .await
    }

    async fn set_order_line_quantity(
        &mut self,
        id: OrderLineId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        self.inner.set_order_line_quantity(id, quantity).await
    }

    async fn set_order_line_tombstone(
        &mut self,
        id: OrderLineId,
        tombstoned_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        self.inner.set_order_line_tombstone(id, tombstoned_at).await
    }

    async fn product_snapshot(
        &mut self,
        id: ProductSnapshotId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError> {
        self.inner.product_snapshot(id).await
    }

    async fn product_snapshot_for(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError> {
        self.inner.product_snapshot_for(product_id).await
    }

    async fn insert_product_snapshot(
        &mut self,
        product: &Product,
    ) -> Result<ProductSnapshot, RepositoryError> {
        self.inner.insert_product_snapshot(product).await
    }

    async fn customer_snapshot(
        &mut self,
        id: CustomerSnapshotId,
    ) -> Result<Option<CustomerSnapshot>, RepositoryError> {
        self.inner.customer_snapshot(id).await
    }

    async fn address_snapshot(
        &mut self,
        id: AddressSnapshotId,
    ) -> Result<Option<AddressSnapshot>, RepositoryError> {
        self.inner.address_snapshot(id).await
    }

    async fn find_address_snapshot(
        &mut self,
        street: &str,
        city: &str,
        zip: &str,
    ) -> Result<Option<AddressSnapshot>, RepositoryError> {
        self.inner.find_address_snapshot(street, city, zip).await
    }

    async fn insert_address_snapshot(
        &mut self,
        address: &Address,
    ) -> Result<AddressSnapshot, RepositoryError> {
        self.inner.insert_address_snapshot(address).await
    }

    async fn find_customer_snapshot(
        &mut self,
        first_name: &str,
        last_name: &str,
        address_snapshot_id: AddressSnapshotId,
    ) -> Result<Option<CustomerSnapshot>, RepositoryError> {
        self.inner
            .find_customer_snapshot(first_name, last_name, address_snapshot_id)
            .await
    }

    async fn insert_customer_snapshot(
        &mut self,
        customer: &Customer,
        address_snapshot_id: AddressSnapshotId,
    ) -> Result<CustomerSnapshot, RepositoryError> {
        self.inner
            .insert_customer_snapshot(customer, address_snapshot_id)
            .await
    }

    async fn stock_for_product(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<LocationStock>, RepositoryError> {
        self.inner.stock_for_product(product_id).await
    }

    async fn set_stock_quantity(
        &mut self,
        location_id: LocationId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        self.inner
            .set_stock_quantity(location_id, product_id, quantity)
            .await
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        // the unit of work is dropped unwritten
        Err(RepositoryError::Database(sqlx::Error::PoolClosed))
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.inner.rollback().await
    }
}

#[tokio::test]
async fn test_commit_failure_surfaces_as_persistence_and_discards_work() {
    let inner = seeded_store().await;
    let service = FulfillmentService::new(BrokenCommitStore {
        inner: inner.clone(),
    });

    let err = service
        .create_order(create_input(ADA, &[(APPLES, 6)]))
        .await
        .expect_err("commit always fails on this store");

    // surfaces as a persistence failure with the generic message, cause intact
    assert!(matches!(err, EngineError::Persistence(_)));
    assert_eq!(err.to_string(), "persistence failure");
    assert!(std::error::Error::source(&err).is_some());

    // everything staged in the unit of work was discarded
    assert_eq!(inner.stock_at(NORTH, APPLES).await, Some(5));
    assert_eq!(inner.stock_at(SOUTH, APPLES).await, Some(3));
    assert_eq!(inner.product_snapshot_count().await, 0);
    assert_eq!(inner.order_line_count().await, 0);
    assert!(
        FulfillmentService::new(inner)
            .list_orders()
            .await
            .expect("list")
            .is_empty()
    );
}

// ============================================================================
// Conservation
// ============================================================================

#[tokio::test]
async fn test_stock_plus_reservations_is_conserved() {
    let store = seeded_store().await;
    let service = FulfillmentService::new(store.clone());

    let total_before = store.total_stock(APPLES).await;

    let view = service
        .create_order(create_input(ADA, &[(APPLES, 6)]))
        .await
        .expect("create");

    for quantity in [2, 7, 0, 5] {
        service
            .update_order(
                view.order.id,
                update_input(DEFAULT_STATE_ID, &[(APPLES, quantity)]),
            )
            .await
            .expect("update");

        let reserved: i64 = service
            .get_order(view.order.id)
            .await
            .expect("get")
            .lines
            .iter()
            .map(|line| i64::from(line.quantity))
            .sum();
        assert_eq!(store.total_stock(APPLES).await + reserved, total_before);
    }
}
