//! Transport-agnostic service surface (spec §6): the facade a gRPC, HTTP,
//! or in-process caller sits on top of. Operations are grouped by
//! collaborator — Connection, Metadata & Schema, Data, Replication — and
//! compose `ConnectionManager`, `SchemaDiscovery`, and
//! `RelationshipSupervisor` rather than reimplementing any of their logic.

use crate::connection_manager::ConnectionManager;
use crate::environment::StateStore;
use crate::schema_discovery::{DeployOptions, DeployReport, SchemaDiscovery};
use crate::snapshot::ProgressTick;
use crate::supervisor::RelationshipSupervisor;
use fabric_connector::adapter::{DatabaseMetadata, ExecuteResult, Row, RowBatchStream, WhereClause};
use fabric_connector::context::OpContext;
use fabric_types::connection::{AuthConfig, ConnectionDescriptor, LiveConnection, TlsConfig};
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::relationship::Relationship;
use fabric_types::schema::UnifiedSchema;
use serde_json::Value;
use std::sync::Arc;

/// Sparse update applied on top of a stored `ConnectionDescriptor`
/// (`UpdateDescriptor(id, delta)`, spec §6). Every field left `None` keeps
/// the descriptor's current value; an inner `Some(None)` clears an
/// optional field rather than leaving it untouched.
#[derive(Clone, Debug, Default)]
pub struct DescriptorDelta {
    pub host: Option<String>,
    pub port: Option<Option<u16>>,
    pub auth: Option<AuthConfig>,
    pub tls: Option<TlsConfig>,
    pub database_name: Option<Option<String>>,
}

fn apply_delta(mut descriptor: ConnectionDescriptor, delta: DescriptorDelta) -> ConnectionDescriptor {
    if let Some(host) = delta.host {
        descriptor.host = host;
    }
    if let Some(port) = delta.port {
        descriptor.port = port;
    }
    if let Some(auth) = delta.auth {
        descriptor.auth = auth;
    }
    if let Some(tls) = delta.tls {
        descriptor.tls = tls;
    }
    if let Some(database_name) = delta.database_name {
        descriptor.database_name = database_name;
    }
    descriptor
}

/// `ExecuteCommand(id, command) → bytes` (spec §6) wrapped with the row
/// count the adapter reports alongside its opaque result bytes.
#[derive(Clone, Debug)]
pub struct CommandResult {
    pub rows_affected: u64,
    pub bytes: Vec<u8>,
}

impl From<ExecuteResult> for CommandResult {
    fn from(result: ExecuteResult) -> Self {
        Self { rows_affected: result.rows_affected, bytes: result.bytes }
    }
}

pub struct FabricService {
    connections: Arc<ConnectionManager>,
    schema: Arc<SchemaDiscovery>,
    supervisor: Arc<RelationshipSupervisor>,
    state_store: Arc<dyn StateStore>,
}

impl FabricService {
    pub fn new(
        connections: Arc<ConnectionManager>,
        schema: Arc<SchemaDiscovery>,
        supervisor: Arc<RelationshipSupervisor>,
        state_store: Arc<dyn StateStore>,
    ) -> Self {
        Self { connections, schema, supervisor, state_store }
    }

    // -- Connection -------------------------------------------------------

    pub async fn connect_instance(&self, descriptor: ConnectionDescriptor, ctx: &OpContext) -> Result<LiveConnection, FabricError> {
        self.state_store.save_descriptor(&descriptor).await?;
        self.connections.connect_instance(descriptor, ctx).await
    }

    pub async fn connect_database(&self, descriptor: ConnectionDescriptor, ctx: &OpContext) -> Result<LiveConnection, FabricError> {
        self.state_store.save_descriptor(&descriptor).await?;
        self.connections.connect(descriptor, ctx).await
    }

    pub fn disconnect(&self, id: &str) {
        self.connections.disconnect(id);
    }

    pub async fn reconnect(&self, id: &str, ctx: &OpContext) -> Result<LiveConnection, FabricError> {
        self.connections.reconnect(id, ctx).await
    }

    pub async fn update_descriptor(&self, id: &str, delta: DescriptorDelta) -> Result<ConnectionDescriptor, FabricError> {
        let current = self
            .state_store
            .load_descriptor(id)
            .await?
            .ok_or_else(|| FabricError::NotFound { resource: id.to_string() })?;
        let updated = apply_delta(current, delta);
        self.state_store.save_descriptor(&updated).await?;
        Ok(updated)
    }

    // -- Metadata & Schema --------------------------------------------------

    pub async fn get_database_metadata(&self, id: &str, ctx: &OpContext) -> Result<DatabaseMetadata, FabricError> {
        self.connections.execute(id, |conn| async move { conn.metadata_ops().collect_database_metadata(ctx).await }).await
    }

    pub async fn get_schema(&self, id: &str, ctx: &OpContext) -> Result<UnifiedSchema, FabricError> {
        self.schema.discover(id, ctx).await
    }

    pub async fn deploy_schema(
        &self,
        target_id: &str,
        target_kind: Kind,
        schema: &UnifiedSchema,
        options: DeployOptions,
    ) -> Result<DeployReport, FabricError> {
        self.schema.deploy(target_id, target_kind, schema, options).await
    }

    // -- Data ---------------------------------------------------------------

    pub async fn fetch_data(&self, id: &str, container: &str, limit: Option<u64>, ctx: &OpContext) -> Result<Vec<Row>, FabricError> {
        self.connections.execute(id, |conn| async move { conn.data_ops().fetch(container, limit, ctx).await }).await
    }

    pub async fn stream_data(&self, id: &str, container: &str, batch_size: u32, parallelism: u32) -> Result<RowBatchStream, FabricError> {
        self.connections.execute(id, |conn| async move { conn.data_ops().stream(container, batch_size, parallelism).await }).await
    }

    pub async fn insert_data(&self, id: &str, container: &str, rows: Vec<Row>, ctx: &OpContext) -> Result<u64, FabricError> {
        self.connections.execute(id, |conn| async move { conn.data_ops().insert(container, rows, ctx).await }).await
    }

    /// `InsertStream(id, container) → client stream` (spec §6): drains a
    /// caller-fed channel of row batches, inserting each one as it arrives,
    /// and returns the running total once the channel closes.
    pub async fn insert_stream(
        &self,
        id: &str,
        container: &str,
        mut batches: tokio::sync::mpsc::Receiver<Vec<Row>>,
        ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        let mut total = 0u64;
        while let Some(batch) = batches.recv().await {
            if batch.is_empty() {
                continue;
            }
            total += self.connections.execute(id, |conn| async move { conn.data_ops().insert(container, batch, ctx).await }).await?;
        }
        Ok(total)
    }

    pub async fn execute_command(&self, id: &str, command: &str, args: &[Value], ctx: &OpContext) -> Result<CommandResult, FabricError> {
        self.connections
            .execute(id, |conn| async move { conn.data_ops().execute(command, args, ctx).await })
            .await
            .map(CommandResult::from)
    }

    /// `WipeDatabase(id)` (spec §6): deletes every row of every container,
    /// leaving structure in place. Not transactional across containers — a
    /// failure partway leaves the earlier containers already wiped.
    pub async fn wipe_database(&self, id: &str, ctx: &OpContext) -> Result<(), FabricError> {
        let containers = self.connections.execute(id, |conn| async move { conn.schema_ops().list_containers(ctx).await }).await?;
        for container in containers {
            self.connections
                .execute(id, |conn| {
                    let container = container.clone();
                    async move { conn.data_ops().delete(&container, &WhereClause::default(), ctx).await }
                })
                .await?;
        }
        Ok(())
    }

    // -- Replication ----------------------------------------------------

    pub async fn create_relationship(&self, relationship: Relationship) -> Result<(), FabricError> {
        self.supervisor.create(relationship).await
    }

    /// `StartRelationship(id) → stream of progress events` (spec §6): the
    /// snapshot runs on a background task; the returned receiver streams
    /// its progress ticks as they're produced.
    pub fn start_relationship(&self, id: &str) -> tokio::sync::mpsc::Receiver<ProgressTick> {
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let supervisor = self.supervisor.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            if let Err(err) = supervisor.start(&id, tx).await {
                tracing::warn!(error = %err, relationship_id = %id, "relationship start failed");
            }
        });
        rx
    }

    pub async fn stop_relationship(&self, id: &str) -> Result<(), FabricError> {
        self.supervisor.stop(id).await
    }

    pub async fn resume_relationship(&self, id: &str) -> Result<(), FabricError> {
        self.supervisor.resume(id).await
    }

    pub async fn remove_relationship(&self, id: &str) -> Result<(), FabricError> {
        self.supervisor.remove(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{InMemoryStateStore, NoopMetricsSink};
    use fabric_connector::registry::AdapterRegistry;
    use fabric_connector::test_util::{sample_descriptor, MockAdapter, NoopDecryptor};
    use fabric_types::capability::CapabilityRegistry;
    use fabric_types::config::{CdcConfig, SnapshotConfig};
    use fabric_types::type_registry::TypeConversionRegistry;
    use serde_json::Value as Json;

    fn service() -> FabricService {
        let adapters = Arc::new(AdapterRegistry::new());
        adapters.register(Arc::new(MockAdapter::new()));
        let capabilities = Arc::new(CapabilityRegistry::with_defaults());
        let connections = Arc::new(ConnectionManager::new(
            adapters,
            capabilities.clone(),
            Arc::new(NoopDecryptor),
            Arc::new(NoopMetricsSink),
        ));
        let types = Arc::new(TypeConversionRegistry::new());
        types.register_kind(Kind::Postgres, fabric_connector_postgres::type_table::table());
        let schema = Arc::new(SchemaDiscovery::new(connections.clone(), types));
        let state_store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let supervisor = Arc::new(RelationshipSupervisor::new(
            state_store.clone(),
            connections.clone(),
            capabilities,
            Arc::new(NoopMetricsSink),
            SnapshotConfig::default(),
            CdcConfig::default(),
        ));
        FabricService::new(connections, schema, supervisor, state_store)
    }

    #[tokio::test]
    async fn update_descriptor_applies_a_sparse_delta() {
        let service = service();
        let ctx = OpContext::new();
        let descriptor = sample_descriptor("c1");
        service.connect_database(descriptor.clone(), &ctx).await.unwrap();

        let updated = service
            .update_descriptor("c1", DescriptorDelta { host: Some("new-host".to_string()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(updated.host, "new-host");
        assert_eq!(updated.port, descriptor.port);
    }

    #[tokio::test]
    async fn update_descriptor_on_unknown_id_is_not_found() {
        let service = service();
        let result = service.update_descriptor("missing", DescriptorDelta::default()).await;
        assert!(matches!(result, Err(FabricError::NotFound { .. })));
    }

    #[tokio::test]
    async fn insert_then_fetch_round_trips_through_the_service() {
        let service = service();
        let ctx = OpContext::new();
        service.connect_database(sample_descriptor("c1"), &ctx).await.unwrap();

        let mut row = Row::new();
        row.insert("id".to_string(), Json::from(1));
        service.insert_data("c1", "users", vec![row], &ctx).await.unwrap();

        let rows = service.fetch_data("c1", "users", None, &ctx).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn insert_stream_sums_every_batch() {
        let service = service();
        let ctx = OpContext::new();
        service.connect_database(sample_descriptor("c1"), &ctx).await.unwrap();

        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let mut row = Row::new();
        row.insert("id".to_string(), Json::from(1));
        tx.send(vec![row.clone(), row.clone()]).await.unwrap();
        tx.send(vec![row]).await.unwrap();
        drop(tx);

        let total = service.insert_stream("c1", "users", rx, &ctx).await.unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn wipe_database_clears_every_discovered_container() {
        use fabric_types::schema::{Container, Field, UnifiedType};

        let service = service();
        let ctx = OpContext::new();
        service.connect_database(sample_descriptor("c1"), &ctx).await.unwrap();

        let mut container = Container::new("users");
        container.fields.push(Field::new("id", UnifiedType::Int64, false));
        let mut schema = UnifiedSchema::new("db1", Kind::Postgres);
        schema.containers.push(container);
        service
            .connections
            .execute("c1", |conn| async move { conn.schema_ops().create_structure(&schema, &OpContext::new()).await })
            .await
            .unwrap();

        let mut row = Row::new();
        row.insert("id".to_string(), Json::from(1));
        service.insert_data("c1", "users", vec![row], &ctx).await.unwrap();

        service.wipe_database("c1", &ctx).await.unwrap();
        let rows = service.fetch_data("c1", "users", None, &ctx).await.unwrap();
        assert!(rows.is_empty());
    }
}
