//! Snapshot store: get-or-create immutable order-time copies.
//!
//! An existing snapshot is always returned unchanged, even when the live
//! entity has since been edited. That is the point: historical orders keep the
//! fields as they were when first referenced.
//!
//! Lookup keys: live product id for product snapshots; exact street/city/zip
//! match for address snapshots; exact first/last name plus the resolved
//! address-snapshot id for customer snapshots.

use tracing::debug;

use packhouse_core::AddressSnapshotId;

use crate::error::EngineError;
use crate::models::{Address, AddressSnapshot, Customer, CustomerSnapshot, Product, ProductSnapshot};
use crate::store::FulfillmentTx;

/// Get or create the snapshot of a live product.
///
/// # Errors
///
/// Returns a persistence error from the store.
pub async fn get_or_create_product<T: FulfillmentTx>(
    tx: &mut T,
    product: &Product,
) -> Result<ProductSnapshot, EngineError> {
    if let Some(existing) = tx.product_snapshot_for(product.id).await? {
        return Ok(existing);
    }
    let created = tx.insert_product_snapshot(product).await?;
    debug!(product = %product.id, snapshot = %created.id, "created product snapshot");
    Ok(created)
}

/// Get or create the snapshot of an address.
///
/// # Errors
///
/// Returns a persistence error from the store.
pub async fn get_or_create_address<T: FulfillmentTx>(
    tx: &mut T,
    address: &Address,
) -> Result<AddressSnapshot, EngineError> {
    if let Some(existing) = tx
        .find_address_snapshot(&address.street, &address.city, &address.zip)
        .await?
    {
        return Ok(existing);
    }
    let created = tx.insert_address_snapshot(address).await?;
    debug!(address = %address.id, snapshot = %created.id, "created address snapshot");
    Ok(created)
}

/// Get or create the snapshot of a customer, tied to an address snapshot.
///
/// # Errors
///
/// Returns a persistence error from the store.
pub async fn get_or_create_customer<T: FulfillmentTx>(
    tx: &mut T,
    customer: &Customer,
    address_snapshot_id: AddressSnapshotId,
) -> Result<CustomerSnapshot, EngineError> {
    if let Some(existing) = tx
        .find_customer_snapshot(&customer.first_name, &customer.last_name, address_snapshot_id)
        .await?
    {
        return Ok(existing);
    }
    let created = tx
        .insert_customer_snapshot(customer, address_snapshot_id)
        .await?;
    debug!(customer = %customer.id, snapshot = %created.id, "created customer snapshot");
    Ok(created)
}
