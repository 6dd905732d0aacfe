//! `PostgreSQL` store adapter.
//!
//! Uses runtime-checked queries (`sqlx::query_as` with explicit row structs
//! converted into domain models) so the crate builds without a live database.
//! Stock rows are selected `FOR UPDATE`, which serializes concurrent units of
//! work touching the same product's inventory for the duration of the
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use packhouse_core::{
    AddressId, AddressSnapshotId, CurrencyCode, CustomerId, CustomerSnapshotId, LocationId,
    OrderId, OrderLineId, Price, ProductId, ProductSnapshotId, StateId,
};

use super::RepositoryError;
use crate::models::{
    Address, AddressSnapshot, Customer, CustomerSnapshot, LocationStock, Order, OrderLine,
    Product, ProductSnapshot, State,
};
use crate::store::{FulfillmentStore, FulfillmentTx};

/// A [`FulfillmentStore`] backed by a `PostgreSQL` pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool (e.g., for migrations or seeding).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FulfillmentStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<Self::Tx, RepositoryError> {
        Ok(PgTx {
            tx: self.pool.begin().await?,
        })
    }
}

/// One database transaction.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

// =============================================================================
// Internal Row Types
// =============================================================================

fn parse_price(amount: Decimal, currency_code: &str) -> Result<Price, RepositoryError> {
    let currency: CurrencyCode = currency_code
        .parse()
        .map_err(|_| RepositoryError::DataCorruption(format!("unknown currency {currency_code}")))?;
    Ok(Price::new(amount, currency))
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    price_amount: Decimal,
    currency_code: String,
    sku: String,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            price: parse_price(row.price_amount, &row.currency_code)?,
            sku: row.sku,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    first_name: String,
    last_name: String,
    address_id: AddressId,
    street: String,
    city: String,
    zip: String,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            address: Address {
                id: row.address_id,
                street: row.street,
                city: row.city,
                zip: row.zip,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StateRow {
    id: StateId,
    name: String,
}

impl From<StateRow> for State {
    fn from(row: StateRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    created_at: DateTime<Utc>,
    customer_id: CustomerId,
    customer_snapshot_id: CustomerSnapshotId,
    state_id: StateId,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            customer_id: row.customer_id,
            customer_snapshot_id: row.customer_snapshot_id,
            state_id: row.state_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: OrderLineId,
    order_id: OrderId,
    product_snapshot_id: ProductSnapshotId,
    quantity: i32,
    tombstoned_at: Option<DateTime<Utc>>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_snapshot_id: row.product_snapshot_id,
            quantity: row.quantity,
            tombstoned_at: row.tombstoned_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductSnapshotRow {
    id: ProductSnapshotId,
    product_id: ProductId,
    name: String,
    price_amount: Decimal,
    currency_code: String,
    sku: String,
}

impl TryFrom<ProductSnapshotRow> for ProductSnapshot {
    type Error = RepositoryError;

    fn try_from(row: ProductSnapshotRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            price: parse_price(row.price_amount, &row.currency_code)?,
            sku: row.sku,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AddressSnapshotRow {
    id: AddressSnapshotId,
    street: String,
    city: String,
    zip: String,
}

impl From<AddressSnapshotRow> for AddressSnapshot {
    fn from(row: AddressSnapshotRow) -> Self {
        Self {
            id: row.id,
            street: row.street,
            city: row.city,
            zip: row.zip,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerSnapshotRow {
    id: CustomerSnapshotId,
    first_name: String,
    last_name: String,
    address_snapshot_id: AddressSnapshotId,
}

impl From<CustomerSnapshotRow> for CustomerSnapshot {
    fn from(row: CustomerSnapshotRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            address_snapshot_id: row.address_snapshot_id,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LocationStockRow {
    location_id: LocationId,
    product_id: ProductId,
    quantity: i32,
}

impl From<LocationStockRow> for LocationStock {
    fn from(row: LocationStockRow) -> Self {
        Self {
            location_id: row.location_id,
            product_id: row.product_id,
            quantity: row.quantity,
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

#[async_trait]
impl FulfillmentTx for PgTx {
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price_amount, currency_code, sku
            FROM product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn customer(&mut self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT
                c.id, c.first_name, c.last_name,
                a.id AS address_id, a.street, a.city, a.zip
            FROM customer c
            INNER JOIN address a ON a.id = c.address_id
            WHERE c.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn state(&mut self, id: StateId) -> Result<Option<State>, RepositoryError> {
        let row = sqlx::query_as::<_, StateRow>("SELECT id, name FROM state WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, created_at, customer_id, customer_snapshot_id, state_id
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn orders(&mut self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, created_at, customer_id, customer_snapshot_id, state_id
            FROM orders
            ORDER BY id
            ",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_order(
        &mut self,
        created_at: DateTime<Utc>,
        customer_id: CustomerId,
        customer_snapshot_id: CustomerSnapshotId,
        state_id: StateId,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (created_at, customer_id, customer_snapshot_id, state_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at, customer_id, customer_snapshot_id, state_id
            ",
        )
        .bind(created_at)
        .bind(customer_id)
        .bind(customer_snapshot_id)
        .bind(state_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn set_order_state(
        &mut self,
        id: OrderId,
        state_id: StateId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET state_id = $2 WHERE id = $1")
            .bind(id)
            .bind(state_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT id, order_id, product_snapshot_id, quantity, tombstoned_at
            FROM order_line
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        product_snapshot_id: ProductSnapshotId,
        quantity: i32,
    ) -> Result<OrderLine, RepositoryError> {
        let row = sqlx::query_as::<_, OrderLineRow>(
            r"
            INSERT INTO order_line (order_id, product_snapshot_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING id, order_id, product_snapshot_id, quantity, tombstoned_at
            ",
        )
        .bind(order_id)
        .bind(product_snapshot_id)
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("order_line_order_id_product_snapshot_id_key")
            {
                return RepositoryError::Conflict(
                    "order already has a line for this product snapshot".to_string(),
                );
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }

    async fn set_order_line_quantity(
        &mut self,
        id: OrderLineId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE order_line SET quantity = $2 WHERE id = $1")
            .bind(id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_order_line_tombstone(
        &mut self,
        id: OrderLineId,
        tombstoned_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE order_line SET tombstoned_at = $2 WHERE id = $1")
            .bind(id)
            .bind(tombstoned_at)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn product_snapshot(
        &mut self,
        id: ProductSnapshotId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductSnapshotRow>(
            r"
            SELECT id, product_id, name, price_amount, currency_code, sku
            FROM product_snapshot
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(ProductSnapshot::try_from).transpose()
    }

    async fn product_snapshot_for(
        &mut self,
        product_id: ProductId,
    ) -> Result<Option<ProductSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductSnapshotRow>(
            r"
            SELECT id, product_id, name, price_amount, currency_code, sku
            FROM product_snapshot
            WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(ProductSnapshot::try_from).transpose()
    }

    async fn insert_product_snapshot(
        &mut self,
        product: &Product,
    ) -> Result<ProductSnapshot, RepositoryError> {
        let row = sqlx::query_as::<_, ProductSnapshotRow>(
            r"
            INSERT INTO product_snapshot (product_id, name, price_amount, currency_code, sku)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, product_id, name, price_amount, currency_code, sku
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price.amount)
        .bind(product.price.currency_code.as_str())
        .bind(&product.sku)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn customer_snapshot(
        &mut self,
        id: CustomerSnapshotId,
    ) -> Result<Option<CustomerSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerSnapshotRow>(
            r"
            SELECT id, first_name, last_name, address_snapshot_id
            FROM customer_snapshot
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn address_snapshot(
        &mut self,
        id: AddressSnapshotId,
    ) -> Result<Option<AddressSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressSnapshotRow>(
            r"
            SELECT id, street, city, zip
            FROM address_snapshot
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_address_snapshot(
        &mut self,
        street: &str,
        city: &str,
        zip: &str,
    ) -> Result<Option<AddressSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, AddressSnapshotRow>(
            r"
            SELECT id, street, city, zip
            FROM address_snapshot
            WHERE street = $1 AND city = $2 AND zip = $3
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(street)
        .bind(city)
        .bind(zip)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_address_snapshot(
        &mut self,
        address: &Address,
    ) -> Result<AddressSnapshot, RepositoryError> {
        let row = sqlx::query_as::<_, AddressSnapshotRow>(
            r"
            INSERT INTO address_snapshot (street, city, zip)
            VALUES ($1, $2, $3)
            RETURNING id, street, city, zip
            ",
        )
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.zip)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn find_customer_snapshot(
        &mut self,
        first_name: &str,
        last_name: &str,
        address_snapshot_id: AddressSnapshotId,
    ) -> Result<Option<CustomerSnapshot>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerSnapshotRow>(
            r"
            SELECT id, first_name, last_name, address_snapshot_id
            FROM customer_snapshot
            WHERE first_name = $1 AND last_name = $2 AND address_snapshot_id = $3
            ORDER BY id
            LIMIT 1
            ",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(address_snapshot_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_customer_snapshot(
        &mut self,
        customer: &Customer,
        address_snapshot_id: AddressSnapshotId,
    ) -> Result<CustomerSnapshot, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerSnapshotRow>(
            r"
            INSERT INTO customer_snapshot (first_name, last_name, address_snapshot_id)
            VALUES ($1, $2, $3)
            RETURNING id, first_name, last_name, address_snapshot_id
            ",
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(address_snapshot_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn stock_for_product(
        &mut self,
        product_id: ProductId,
    ) -> Result<Vec<LocationStock>, RepositoryError> {
        // FOR UPDATE serializes concurrent reconciliations over this product
        let rows = sqlx::query_as::<_, LocationStockRow>(
            r"
            SELECT location_id, product_id, quantity
            FROM location_stock
            WHERE product_id = $1
            ORDER BY quantity DESC, location_id ASC
            FOR UPDATE
            ",
        )
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_stock_quantity(
        &mut self,
        location_id: LocationId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE location_stock
            SET quantity = $3
            WHERE location_id = $1 AND product_id = $2
            ",
        )
        .bind(location_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
