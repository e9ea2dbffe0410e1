//! Postgres driver implementation of the C4 adapter contract: WAL-based CDC,
//! `information_schema` discovery, rustls-secured connections.

pub mod adapter;
pub mod connection;
pub mod data_ops;
pub mod metadata_ops;
pub mod replication;
pub mod row;
pub mod schema_ops;
pub mod type_table;

use fabric_connector::registry::AdapterRegistry;
use fabric_types::type_registry::TypeConversionRegistry;
use std::sync::Arc;

/// Builds the Postgres adapter, registers its type table, and hands it to
/// the registry. Called once per process by whatever assembles the full set
/// of adapters (spec §9 "adapters self-register at process init").
pub fn register(registry: &AdapterRegistry, types: Arc<TypeConversionRegistry>) {
    registry.register(Arc::new(adapter::PostgresAdapter::new(types)));
}
