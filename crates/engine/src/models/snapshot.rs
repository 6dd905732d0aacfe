//! Immutable historical snapshots.
//!
//! A snapshot copies a mutable entity's fields at first-reference time so that
//! later catalog or customer edits never alter historical orders. Snapshots
//! are deduplicated (one product snapshot per live product; address and
//! customer snapshots by exact field match) and never mutated after creation.

use serde::{Deserialize, Serialize};

use packhouse_core::{
    AddressSnapshotId, CustomerSnapshotId, Price, ProductId, ProductSnapshotId,
};

/// Order-time copy of a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Unique snapshot ID.
    pub id: ProductSnapshotId,
    /// Back-reference to the live product, used for stock lookups.
    pub product_id: ProductId,
    /// Product name as it was at first reference.
    pub name: String,
    /// Price as it was at first reference.
    pub price: Price,
    /// SKU as it was at first reference.
    pub sku: String,
}

/// Order-time copy of a customer address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSnapshot {
    /// Unique snapshot ID.
    pub id: AddressSnapshotId,
    /// Street line.
    pub street: String,
    /// City.
    pub city: String,
    /// Postal code.
    pub zip: String,
}

/// Order-time copy of a customer, referencing an address snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    /// Unique snapshot ID.
    pub id: CustomerSnapshotId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// The address snapshot this customer snapshot points at.
    pub address_snapshot_id: AddressSnapshotId,
}
