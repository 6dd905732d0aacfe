//! Unified error handling for the fulfillment engine.
//!
//! `NotFound`, `InsufficientStock`, and `InvalidQuantity` are expected business
//! outcomes and carry enough structure for a caller to act on them.
//! `Persistence` wraps storage failures; its `Display` is deliberately generic
//! so driver detail never reaches a caller, while the full cause stays
//! available through `source()` for logging.

use thiserror::Error;

use packhouse_core::ProductId;

use crate::db::RepositoryError;
use crate::models::LineRef;

/// The kinds of entity a [`EngineError::NotFound`] can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Product,
    Customer,
    Address,
    State,
    Order,
    ProductSnapshot,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Product => "product",
            Self::Customer => "customer",
            Self::Address => "address",
            Self::State => "state",
            Self::Order => "order",
            Self::ProductSnapshot => "product snapshot",
        };
        f.write_str(name)
    }
}

/// Errors produced by a reconciliation or order operation.
///
/// Any of these aborts the entire unit of work; the transaction coordinator in
/// [`crate::service`] rolls back before the error reaches the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A referenced entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound {
        /// What kind of entity was looked up.
        kind: EntityKind,
        /// The raw id that missed.
        id: i32,
    },

    /// Available stock across all locations is less than requested.
    #[error("insufficient stock for product {product_id}: short {shortfall}")]
    InsufficientStock {
        /// The product that could not be fully debited.
        product_id: ProductId,
        /// How many units could not be satisfied.
        shortfall: i32,
    },

    /// A desired line carried a negative quantity.
    #[error("invalid quantity {quantity} for line {line:?}")]
    InvalidQuantity {
        /// The offending line reference.
        line: LineRef,
        /// The rejected quantity.
        quantity: i32,
    },

    /// Storage failed; the unit of work was discarded.
    #[error("persistence failure")]
    Persistence(#[from] RepositoryError),
}

impl EngineError {
    /// Shorthand for a [`EngineError::NotFound`] with a typed id.
    pub fn not_found(kind: EntityKind, id: impl Into<i32>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
