//! Warehouse integration
//!
//! A thin REST client plus the three load-side operations: schema
//! provisioning, batched row appends, and external-table registration
//! with materialization.

pub mod client;
pub mod registrar;
pub mod schema;
pub mod writer;

pub use client::{SchemaField, TableId, WarehouseClient};
