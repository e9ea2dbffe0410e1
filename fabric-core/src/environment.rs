//! Abstract collaborators injected from outside the core (spec §6
//! "Environment (abstract)"). `Decryptor` already lives in
//! `fabric_types::connection` since the adapters need it too; `StateStore`
//! and `MetricsSink` are core-only and defined here. `Logger` has no trait
//! of its own — the core talks to the global `tracing` dispatcher directly,
//! the way every adapter crate already does, and whoever boots the process
//! installs the subscriber via `fabric_tracing::init_logging`.

use async_trait::async_trait;
use fabric_types::connection::ConnectionDescriptor;
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::relationship::Relationship;

/// Persists `ConnectionDescriptor`s and `Relationship`s (spec §6 "Persisted
/// state layout"). One implementation per deployment; the core ships only
/// an in-memory one for tests ([`InMemoryStateStore`]).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_descriptor(&self, id: &str) -> Result<Option<ConnectionDescriptor>, FabricError>;
    async fn save_descriptor(&self, descriptor: &ConnectionDescriptor) -> Result<(), FabricError>;
    async fn list_descriptors(&self) -> Result<Vec<ConnectionDescriptor>, FabricError>;
    async fn delete_descriptor(&self, id: &str) -> Result<(), FabricError>;

    async fn load_relationship(&self, id: &str) -> Result<Option<Relationship>, FabricError>;
    async fn save_relationship(&self, relationship: &Relationship) -> Result<(), FabricError>;
    async fn list_relationships(&self) -> Result<Vec<Relationship>, FabricError>;
    async fn delete_relationship(&self, id: &str) -> Result<(), FabricError>;
}

/// Counters for connects/disconnects/errors/active-count (spec §4.6
/// "Expose counters ... for the metrics collaborator"). A no-op
/// implementation is provided for callers that don't care.
pub trait MetricsSink: Send + Sync {
    fn incr_connects(&self, kind: Kind);
    fn incr_disconnects(&self, kind: Kind);
    fn incr_errors(&self, kind: Kind);
    fn incr_events_applied(&self, relationship_id: &str);
}

pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn incr_connects(&self, _kind: Kind) {}
    fn incr_disconnects(&self, _kind: Kind) {}
    fn incr_errors(&self, _kind: Kind) {}
    fn incr_events_applied(&self, _relationship_id: &str) {}
}

/// Process-wide, read-mostly store guarded by a single lock (spec §5
/// "Shared resources ... mutations are serialized"). Good enough for tests
/// and single-process deployments; a durable `StateStore` backs production
/// ones.
pub mod in_memory {
    use super::*;
    use parking_lot::RwLock;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct InMemoryStateStore {
        descriptors: RwLock<HashMap<String, ConnectionDescriptor>>,
        relationships: RwLock<HashMap<String, Relationship>>,
    }

    impl InMemoryStateStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl StateStore for InMemoryStateStore {
        async fn load_descriptor(&self, id: &str) -> Result<Option<ConnectionDescriptor>, FabricError> {
            Ok(self.descriptors.read().get(id).cloned())
        }
        async fn save_descriptor(&self, descriptor: &ConnectionDescriptor) -> Result<(), FabricError> {
            self.descriptors.write().insert(descriptor.id.clone(), descriptor.clone());
            Ok(())
        }
        async fn list_descriptors(&self) -> Result<Vec<ConnectionDescriptor>, FabricError> {
            Ok(self.descriptors.read().values().cloned().collect())
        }
        async fn delete_descriptor(&self, id: &str) -> Result<(), FabricError> {
            self.descriptors.write().remove(id);
            Ok(())
        }

        async fn load_relationship(&self, id: &str) -> Result<Option<Relationship>, FabricError> {
            Ok(self.relationships.read().get(id).cloned())
        }
        async fn save_relationship(&self, relationship: &Relationship) -> Result<(), FabricError> {
            self.relationships.write().insert(relationship.id.clone(), relationship.clone());
            Ok(())
        }
        async fn list_relationships(&self) -> Result<Vec<Relationship>, FabricError> {
            Ok(self.relationships.read().values().cloned().collect())
        }
        async fn delete_relationship(&self, id: &str) -> Result<(), FabricError> {
            self.relationships.write().remove(id);
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use fabric_connector::test_util::sample_descriptor;

        #[tokio::test]
        async fn round_trips_a_descriptor() {
            let store = InMemoryStateStore::new();
            let descriptor = sample_descriptor("c1");
            store.save_descriptor(&descriptor).await.unwrap();
            let loaded = store.load_descriptor("c1").await.unwrap().unwrap();
            assert_eq!(loaded.id, "c1");
            assert!(store.load_descriptor("missing").await.unwrap().is_none());
        }
    }
}

pub use in_memory::InMemoryStateStore;
