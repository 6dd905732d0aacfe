//! Live catalog entities.
//!
//! These rows are owned by the catalog, not by the engine: the engine reads
//! them exactly once per order, at snapshot-creation time, and never writes
//! them. Later edits to a live row have no effect on existing orders.

use serde::{Deserialize, Serialize};

use packhouse_core::{AddressId, CustomerId, LocationId, Price, ProductId, StateId};

/// A live catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current list price.
    pub price: Price,
    /// Stock-keeping unit.
    pub sku: String,
}

/// A customer's postal address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// Unique address ID.
    pub id: AddressId,
    /// Street line.
    pub street: String,
    /// City.
    pub city: String,
    /// Postal code.
    pub zip: String,
}

/// A live customer, with their current address embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique customer ID.
    pub id: CustomerId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Current address.
    pub address: Address,
}

/// An enumerable order status, referenced by orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// Unique state ID.
    pub id: StateId,
    /// Human-readable status name.
    pub name: String,
}

/// A warehouse location that can hold stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Unique location ID.
    pub id: LocationId,
    /// Human-readable location name.
    pub name: String,
}
