//! `fabric-core`: the engines and environment glue described in spec §4.6
//! onward — Connection Manager, Schema Discovery, Snapshot Engine, CDC
//! Engine, Relationship Supervisor, and the transport-agnostic service
//! facade that composes them. Adapter crates (C5) and shared types (C1-C4,
//! in `fabric-types`/`fabric-connector`) are consumed, not re-implemented
//! here.

pub mod cdc;
pub mod connection_manager;
pub mod environment;
pub mod schema_discovery;
pub mod service;
pub mod snapshot;
pub mod supervisor;

use fabric_connector::registry::AdapterRegistry;
use fabric_types::type_registry::TypeConversionRegistry;
use std::sync::Arc;

/// Registers every known database kind's adapter and type table into the
/// given registries (spec §9 "adapters self-register at process init").
/// Called once at process startup; tests build their own registry with
/// only the adapters (usually just the mock) they need instead of calling
/// this.
pub fn register_all_adapters(registry: &AdapterRegistry, types: Arc<TypeConversionRegistry>) {
    fabric_connector_postgres::register(registry, types.clone());
    fabric_connector_mysql::register(registry, types.clone());
    fabric_connector_mongodb::register(registry, types.clone());
    fabric_connector_redis::register(registry, types.clone());
    fabric_connector_object_store::register(registry, types);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_types::kind::Kind;

    #[test]
    fn register_all_adapters_covers_every_kind() {
        let registry = AdapterRegistry::new();
        let types = Arc::new(TypeConversionRegistry::new());
        register_all_adapters(&registry, types);
        let mut kinds = registry.registered_kinds();
        kinds.sort();
        assert_eq!(kinds, Kind::ALL.to_vec());
    }
}
