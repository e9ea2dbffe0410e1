//! In-memory mock adapter for exercising the Connection Manager and engines
//! without a real driver (spec §9 "test without a live database"; grounded
//! on the source repository's `connector::test_util` harness, recast from a
//! single-trait `Connector` mock into a capability-object mock).

use crate::adapter::{
    Adapter, Connection, Container, DataOps, DatabaseMetadata, ExecuteResult, InstanceConnection, MetadataOps,
    ReplicationOps, Row, RowBatchStream, SchemaOps, UnifiedSchema, WhereClause,
};
use crate::context::OpContext;
use crate::unsupported::Unsupported;
use async_trait::async_trait;
use fabric_types::connection::{ConnectionDescriptor, Decryptor};
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Fixed data a [`MockConnection`] serves from. Tests populate this before
/// attaching the connection to a Connection Manager.
#[derive(Default)]
pub struct MockStore {
    pub containers: Mutex<Vec<Container>>,
    pub rows: Mutex<HashMap<String, Vec<Row>>>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, container: &str, rows: Vec<Row>) {
        self.rows.lock().insert(container.to_string(), rows);
    }
}

struct MockSchemaOps {
    store: Arc<MockStore>,
}

#[async_trait]
impl SchemaOps for MockSchemaOps {
    async fn discover(&self, _ctx: &OpContext) -> Result<UnifiedSchema, FabricError> {
        Ok(UnifiedSchema {
            database_id: "mock".to_string(),
            kind: Kind::Postgres,
            containers: self.store.containers.lock().clone(),
            views: Vec::new(),
            functions: Vec::new(),
        })
    }
    async fn create_structure(&self, schema: &UnifiedSchema, _ctx: &OpContext) -> Result<(), FabricError> {
        *self.store.containers.lock() = schema.containers.clone();
        Ok(())
    }
    async fn list_containers(&self, _ctx: &OpContext) -> Result<Vec<String>, FabricError> {
        Ok(self.store.containers.lock().iter().map(|c| c.name.clone()).collect())
    }
    async fn get_container(&self, name: &str, _ctx: &OpContext) -> Result<Container, FabricError> {
        self.store
            .containers
            .lock()
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| FabricError::NotFound { resource: name.to_string() })
    }
}

struct MockDataOps {
    store: Arc<MockStore>,
}

#[async_trait]
impl DataOps for MockDataOps {
    async fn fetch(&self, container: &str, limit: Option<u64>, _ctx: &OpContext) -> Result<Vec<Row>, FabricError> {
        let rows = self.store.rows.lock().get(container).cloned().unwrap_or_default();
        Ok(match limit {
            Some(n) => rows.into_iter().take(n as usize).collect(),
            None => rows,
        })
    }
    async fn fetch_columns(
        &self,
        container: &str,
        fields: &[String],
        limit: Option<u64>,
        ctx: &OpContext,
    ) -> Result<Vec<Row>, FabricError> {
        let rows = self.fetch(container, limit, ctx).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().filter(|(k, _)| fields.contains(k)).collect())
            .collect())
    }
    async fn insert(&self, container: &str, rows: Vec<Row>, _ctx: &OpContext) -> Result<u64, FabricError> {
        let n = rows.len() as u64;
        self.store.rows.lock().entry(container.to_string()).or_default().extend(rows);
        Ok(n)
    }
    async fn update(
        &self,
        _container: &str,
        rows: Vec<Row>,
        _key_fields: &[String],
        _ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        Ok(rows.len() as u64)
    }
    async fn upsert(
        &self,
        container: &str,
        rows: Vec<Row>,
        _unique_fields: &[String],
        ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        self.insert(container, rows, ctx).await
    }
    async fn delete(&self, container: &str, where_clause: &WhereClause, _ctx: &OpContext) -> Result<u64, FabricError> {
        let mut rows = self.store.rows.lock();
        let entry = rows.entry(container.to_string()).or_default();
        let before = entry.len();
        entry.retain(|row| !where_clause.matches(row));
        Ok((before - entry.len()) as u64)
    }
    async fn execute(&self, _query: &str, _args: &[Value], _ctx: &OpContext) -> Result<ExecuteResult, FabricError> {
        Ok(ExecuteResult { rows_affected: 0, bytes: Vec::new() })
    }
    async fn stream(&self, container: &str, batch_size: u32, _parallelism: u32) -> Result<RowBatchStream, FabricError> {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let rows = self.store.rows.lock().get(container).cloned().unwrap_or_default();
        tokio::spawn(async move {
            for chunk in rows.chunks(batch_size.max(1) as usize) {
                if tx.send(Ok(chunk.to_vec())).await.is_err() {
                    break;
                }
            }
        });
        Ok(RowBatchStream { receiver: rx })
    }
}

struct MockMetadataOps;

#[async_trait]
impl MetadataOps for MockMetadataOps {
    async fn collect_database_metadata(&self, _ctx: &OpContext) -> Result<DatabaseMetadata, FabricError> {
        Ok(DatabaseMetadata::default())
    }
    async fn version(&self, _ctx: &OpContext) -> Result<String, FabricError> {
        Ok("mock-0.0".to_string())
    }
    async fn unique_identifier(&self, _ctx: &OpContext) -> Result<String, FabricError> {
        Ok("mock".to_string())
    }
}

pub struct MockConnection {
    id: String,
    schema_ops: MockSchemaOps,
    data_ops: MockDataOps,
    metadata_ops: MockMetadataOps,
    replication_ops: Unsupported,
}

impl MockConnection {
    pub fn new(id: &str, store: Arc<MockStore>) -> Self {
        Self {
            id: id.to_string(),
            schema_ops: MockSchemaOps { store: store.clone() },
            data_ops: MockDataOps { store },
            metadata_ops: MockMetadataOps,
            replication_ops: Unsupported { kind: "mock".to_string() },
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> Kind {
        Kind::Postgres
    }
    async fn is_alive(&self) -> bool {
        true
    }
    async fn ping(&self, _ctx: &OpContext) -> Result<(), FabricError> {
        Ok(())
    }
    async fn close(&self, _ctx: &OpContext) -> Result<(), FabricError> {
        Ok(())
    }
    fn schema_ops(&self) -> &dyn SchemaOps {
        &self.schema_ops
    }
    fn data_ops(&self) -> &dyn DataOps {
        &self.data_ops
    }
    fn metadata_ops(&self) -> &dyn MetadataOps {
        &self.metadata_ops
    }
    fn replication_ops(&self) -> &dyn ReplicationOps {
        &self.replication_ops
    }
}

pub struct MockAdapter {
    pub store: Arc<MockStore>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self { store: MockStore::new() }
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn kind(&self) -> Kind {
        Kind::Postgres
    }
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        _decryptor: &dyn Decryptor,
        _ctx: &OpContext,
    ) -> Result<Box<dyn Connection>, FabricError> {
        Ok(Box::new(MockConnection::new(&descriptor.id, self.store.clone())))
    }
    async fn connect_instance(
        &self,
        _descriptor: &ConnectionDescriptor,
        _decryptor: &dyn Decryptor,
        _ctx: &OpContext,
    ) -> Result<Box<dyn InstanceConnection>, FabricError> {
        Err(FabricError::unsupported("connect_instance", "mock"))
    }
}

/// A `Decryptor` that treats sealed credentials as already plaintext, for
/// tests that never exercise real secret sealing.
pub struct NoopDecryptor;

impl Decryptor for NoopDecryptor {
    fn decrypt(&self, _tenant_id: &str, sealed: &str) -> Result<String, FabricError> {
        Ok(sealed.to_string())
    }
}

pub fn sample_descriptor(id: &str) -> ConnectionDescriptor {
    ConnectionDescriptor {
        id: id.to_string(),
        kind: Kind::Postgres,
        host: "mock-host".to_string(),
        port: Some(5432),
        auth: fabric_types::connection::AuthConfig {
            username: "svc".to_string(),
            sealed_password: "sealed:x".to_string(),
        },
        tls: Default::default(),
        database_name: Some("app".to_string()),
        tenant_id: "tenant-1".to_string(),
        extra: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_types::schema::{Container, Field, UnifiedType};

    fn sample_container() -> Container {
        let mut container = Container::new("users");
        container.fields.push(Field::new("id", UnifiedType::Int64, false));
        container
    }

    #[tokio::test]
    async fn mock_connection_round_trips_rows() {
        let store = MockStore::new();
        store.containers.lock().push(sample_container());
        let conn = MockConnection::new("mock-1", store);
        let ctx = OpContext::new();

        let mut row = Row::new();
        row.insert("id".to_string(), Value::from(1));
        conn.data_ops().insert("users", vec![row], &ctx).await.unwrap();

        let rows = conn.data_ops().fetch("users", None, &ctx).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn mock_adapter_connects() {
        let adapter = MockAdapter::new();
        let descriptor = sample_descriptor("c1");
        let conn = adapter.connect(&descriptor, &NoopDecryptor, &OpContext::new()).await.unwrap();
        assert!(conn.is_alive().await);
    }

    #[tokio::test]
    async fn mock_adapter_rejects_instance_connect() {
        let adapter = MockAdapter::new();
        let descriptor = sample_descriptor("c1");
        assert!(adapter
            .connect_instance(&descriptor, &NoopDecryptor, &OpContext::new())
            .await
            .is_err());
    }
}
