//! MongoDB driver implementation of the C4 adapter contract: change-stream
//! CDC, sampled document discovery in place of catalog introspection.

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

pub fn register(registry: &AdapterRegistry, types: Arc<TypeConversionRegistry>) {
    registry.register(Arc::new(adapter::MongoAdapter::new(types)));
}
