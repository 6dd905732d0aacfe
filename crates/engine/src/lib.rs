//! Packhouse Engine - order reconciliation and inventory adjustment.
//!
//! Given a desired set of product lines against a new or existing order, the
//! engine reconciles requested quantities against committed per-location
//! stock, materializes immutable order-time snapshots of customer, address,
//! and product data, and applies all changes atomically: inventory and order
//! records never diverge.
//!
//! # Modules
//!
//! - [`models`] - Domain entities, inputs, and views
//! - [`error`] - The engine's error taxonomy
//! - [`store`] - Storage traits ([`FulfillmentStore`], [`FulfillmentTx`])
//! - [`ledger`] - Per-location stock debit/credit
//! - [`snapshot`] - Get-or-create immutable historical copies
//! - [`reconcile`] - The current-state to desired-state line algorithm
//! - [`service`] - Caller-facing operations wrapped in one transaction each
//! - [`db`] - `PostgreSQL` and in-memory store adapters

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod reconcile;
pub mod service;
pub mod snapshot;
pub mod store;

pub use db::{MemoryStore, PgStore, RepositoryError, create_pool};
pub use error::{EngineError, EntityKind};
pub use service::{DEFAULT_STATE_ID, FulfillmentService};
pub use store::{FulfillmentStore, FulfillmentTx};
