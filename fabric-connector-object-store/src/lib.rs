//! Object-store driver implementation of the C4 adapter contract: read-only
//! CSV/Parquet table ingestion over the `object_store` crate, no CDC
//! facility.

pub mod adapter;
pub mod config;
pub mod connection;
pub mod data_ops;
pub mod listing;
pub mod metadata_ops;
pub mod row;
pub mod schema_ops;
pub mod type_table;

use fabric_connector::registry::AdapterRegistry;
use fabric_types::type_registry::TypeConversionRegistry;
use std::sync::Arc;

pub fn register(registry: &AdapterRegistry, types: Arc<TypeConversionRegistry>) {
    registry.register(Arc::new(adapter::ObjectStoreAdapter::new(types)));
}
