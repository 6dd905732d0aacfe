//! Domain models for the fulfillment engine.
//!
//! Live catalog entities are read-only collaborators; order-side entities and
//! snapshots are owned and mutated by the engine.

pub mod catalog;
pub mod order;
pub mod snapshot;
pub mod stock;

pub use catalog::{Address, Customer, Location, Product, State};
pub use order::{
    CreateOrderInput, LineInput, LineRef, LineView, Order, OrderLine, OrderView,
    UpdateOrderInput,
};
pub use snapshot::{AddressSnapshot, CustomerSnapshot, ProductSnapshot};
pub use stock::LocationStock;
