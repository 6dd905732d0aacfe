//! Per-location stock rows, the unit of inventory truth.

use serde::{Deserialize, Serialize};

use packhouse_core::{LocationId, ProductId};

/// Quantity of one product held at one location.
///
/// Mutated only by the stock ledger; quantity never goes negative in a
/// committed reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationStock {
    /// The holding location.
    pub location_id: LocationId,
    /// The product held.
    pub product_id: ProductId,
    /// Units on hand.
    pub quantity: i32,
}
