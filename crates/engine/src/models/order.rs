//! Orders, order lines, and the caller-facing input/view shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use packhouse_core::{
    CustomerId, CustomerSnapshotId, OrderId, OrderLineId, ProductId, ProductSnapshotId, StateId,
};

use super::catalog::State;
use super::snapshot::{AddressSnapshot, CustomerSnapshot, ProductSnapshot};

/// An order as stored.
///
/// Orders are never physically deleted; status changes go through the state
/// reference and line removal goes through tombstoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// When the order was placed (UTC).
    pub created_at: DateTime<Utc>,
    /// The live customer who placed the order.
    pub customer_id: CustomerId,
    /// The customer snapshot taken at placement time.
    pub customer_snapshot_id: CustomerSnapshotId,
    /// Current order status.
    pub state_id: StateId,
}

/// One line of an order: a product snapshot with a quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Unique line ID.
    pub id: OrderLineId,
    /// Owning order.
    pub order_id: OrderId,
    /// The product snapshot this line reserves.
    pub product_snapshot_id: ProductSnapshotId,
    /// Reserved units; never negative.
    pub quantity: i32,
    /// Set when the line was logically removed; cleared if it comes back.
    pub tombstoned_at: Option<DateTime<Utc>>,
}

impl OrderLine {
    /// Whether this line currently counts toward the order.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.tombstoned_at.is_none()
    }
}

/// Explicit reference for a desired line item.
///
/// A payload either names a live product or an existing product snapshot; the
/// reconciler resolves both to the same live-product identity. The tag makes
/// the choice explicit on the wire instead of inferring it from which optional
/// fields happen to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ref", content = "id", rename_all = "snake_case")]
pub enum LineRef {
    /// Reference a live catalog product by ID.
    Product(ProductId),
    /// Reference an existing product snapshot by ID.
    Snapshot(ProductSnapshotId),
}

/// One desired line item in a create/update payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineInput {
    /// What the line refers to.
    #[serde(flatten)]
    pub line: LineRef,
    /// Desired quantity; must be non-negative.
    pub quantity: i32,
}

/// Input for placing a new order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    /// The live customer placing the order.
    pub customer_id: CustomerId,
    /// Initial status; defaults to the initial state when omitted.
    pub state_id: Option<StateId>,
    /// Desired line items.
    pub lines: Vec<LineInput>,
}

/// Input for updating an existing order.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderInput {
    /// New status for the order.
    pub state_id: StateId,
    /// The complete desired line set; lines absent from it are tombstoned.
    pub lines: Vec<LineInput>,
}

/// An order decorated with its snapshots and active line quantities.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    /// The order itself.
    pub order: Order,
    /// Current status.
    pub state: State,
    /// Customer as they were at placement time.
    pub customer: CustomerSnapshot,
    /// Address as it was at placement time.
    pub address: AddressSnapshot,
    /// Active (non-tombstoned) lines, in line-id order.
    pub lines: Vec<LineView>,
}

/// One active line in an [`OrderView`].
#[derive(Debug, Clone, Serialize)]
pub struct LineView {
    /// The stored line ID.
    pub line_id: OrderLineId,
    /// Product as it was at first reference.
    pub product: ProductSnapshot,
    /// Reserved units.
    pub quantity: i32,
}
