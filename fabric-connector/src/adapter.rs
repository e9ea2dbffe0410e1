//! C4 — Adapter Framework: the polymorphic capability contract every
//! database driver implementation (C5) must satisfy (spec §4.4).
//!
//! Recast from the source repository's per-capability interface bag (spec
//! §9): a single `Adapter` returns a bounded set of capability objects, and
//! each capability object is itself a small closed contract. An adapter that
//! cannot provide a capability returns the shared `unsupported`
//! implementation from [`crate::unsupported`] rather than `None`, so the
//! core never has to guard against a missing capability object.

use crate::context::OpContext;
use async_trait::async_trait;
use fabric_types::cdc::CdcEvent;
use fabric_types::connection::{ConnectionDescriptor, Decryptor};
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::relationship::MappingRule;
pub use fabric_types::schema::{Container, UnifiedSchema};
use indexmap::IndexMap;
use serde_json::Value;

pub type Row = IndexMap<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Eq(String, Value),
    IsNull(String),
    IsNotNull(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct WhereClause(pub Vec<Predicate>);

impl WhereClause {
    pub fn matches(&self, row: &Row) -> bool {
        self.0.iter().all(|p| match p {
            Predicate::Eq(field, value) => row.get(field) == Some(value),
            Predicate::IsNull(field) => matches!(row.get(field), None | Some(Value::Null)),
            Predicate::IsNotNull(field) => !matches!(row.get(field), None | Some(Value::Null)),
        })
    }
}

/// Builds a `WhereClause` that locates a row by key, rendering `NULL` key
/// values as `IS NULL` predicates rather than `= NULL` (spec §4.9 point 4,
/// §8 boundary behavior).
pub fn key_predicate(key_fields: &[String], row: &Row) -> WhereClause {
    let predicates = key_fields
        .iter()
        .map(|field| match row.get(field) {
            Some(Value::Null) | None => Predicate::IsNull(field.clone()),
            Some(value) => Predicate::Eq(field.clone(), value.clone()),
        })
        .collect();
    WhereClause(predicates)
}

pub struct TableIdentifier {
    pub schema_name: Option<String>,
    pub name: String,
}

impl TableIdentifier {
    pub fn new(schema_name: Option<String>, name: String) -> Self {
        Self { schema_name, name }
    }
}

#[derive(Clone, Debug)]
pub struct ExecuteResult {
    pub rows_affected: u64,
    pub bytes: Vec<u8>,
}

/// `Discover`/`CreateStructure`/container listing (spec §4.4 `SchemaOps`).
#[async_trait]
pub trait SchemaOps: Send + Sync {
    async fn discover(&self, ctx: &OpContext) -> Result<UnifiedSchema, FabricError>;
    async fn create_structure(&self, schema: &UnifiedSchema, ctx: &OpContext) -> Result<(), FabricError>;
    async fn list_containers(&self, ctx: &OpContext) -> Result<Vec<String>, FabricError>;
    async fn get_container(&self, name: &str, ctx: &OpContext) -> Result<Container, FabricError>;
}

/// One finite batch from a `Stream` call; the sequence itself is
/// non-restartable (spec §4.4 `DataOps::Stream`).
pub struct RowBatchStream {
    pub receiver: tokio::sync::mpsc::Receiver<Result<Vec<Row>, FabricError>>,
}

impl RowBatchStream {
    pub async fn next_batch(&mut self) -> Option<Result<Vec<Row>, FabricError>> {
        self.receiver.recv().await
    }
}

#[async_trait]
pub trait DataOps: Send + Sync {
    async fn fetch(&self, container: &str, limit: Option<u64>, ctx: &OpContext) -> Result<Vec<Row>, FabricError>;
    async fn fetch_columns(
        &self,
        container: &str,
        fields: &[String],
        limit: Option<u64>,
        ctx: &OpContext,
    ) -> Result<Vec<Row>, FabricError>;
    async fn insert(&self, container: &str, rows: Vec<Row>, ctx: &OpContext) -> Result<u64, FabricError>;
    async fn update(
        &self,
        container: &str,
        rows: Vec<Row>,
        key_fields: &[String],
        ctx: &OpContext,
    ) -> Result<u64, FabricError>;
    async fn upsert(
        &self,
        container: &str,
        rows: Vec<Row>,
        unique_fields: &[String],
        ctx: &OpContext,
    ) -> Result<u64, FabricError>;
    async fn delete(&self, container: &str, where_clause: &WhereClause, ctx: &OpContext) -> Result<u64, FabricError>;
    async fn execute(&self, query: &str, args: &[Value], ctx: &OpContext) -> Result<ExecuteResult, FabricError>;
    async fn stream(&self, container: &str, batch_size: u32, parallelism: u32) -> Result<RowBatchStream, FabricError>;
}

#[derive(Clone, Debug, Default)]
pub struct DatabaseMetadata {
    pub properties: IndexMap<String, String>,
}

#[async_trait]
pub trait MetadataOps: Send + Sync {
    async fn collect_database_metadata(&self, ctx: &OpContext) -> Result<DatabaseMetadata, FabricError>;
    async fn version(&self, ctx: &OpContext) -> Result<String, FabricError>;
    async fn unique_identifier(&self, ctx: &OpContext) -> Result<String, FabricError>;
}

#[derive(Clone, Debug, Default)]
pub struct AttachConfig {
    /// Resume position, if the relationship already has one persisted.
    pub start_position: Option<String>,
    pub containers: Vec<String>,
}

/// A lazy, potentially infinite, non-restartable sequence of raw change
/// events plus position control (spec §4.4 `CDCSource`).
#[async_trait]
pub trait CdcSource: Send {
    async fn next_raw(&mut self, ctx: &OpContext) -> Result<Option<Vec<u8>>, FabricError>;
    async fn commit(&mut self, position: &str) -> Result<(), FabricError>;
    fn position(&self) -> Option<String>;
    async fn close(&mut self) -> Result<(), FabricError>;
}

#[async_trait]
pub trait ReplicationOps: Send + Sync {
    fn parse_event(&self, raw: &[u8]) -> Result<CdcEvent, FabricError>;
    async fn apply(&self, event: &CdcEvent, ctx: &OpContext) -> Result<(), FabricError>;
    fn transform(&self, row: Row, rules: &[MappingRule]) -> Result<Row, FabricError>;
    async fn attach_source(&self, config: AttachConfig, ctx: &OpContext) -> Result<Box<dyn CdcSource>, FabricError>;
}

/// Per-connection handle, owned exclusively by the Connection Manager (C6).
#[async_trait]
pub trait Connection: Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> Kind;
    async fn is_alive(&self) -> bool;
    async fn ping(&self, ctx: &OpContext) -> Result<(), FabricError>;
    async fn close(&self, ctx: &OpContext) -> Result<(), FabricError>;

    fn schema_ops(&self) -> &dyn SchemaOps;
    fn data_ops(&self) -> &dyn DataOps;
    fn metadata_ops(&self) -> &dyn MetadataOps;
    fn replication_ops(&self) -> &dyn ReplicationOps;
}

/// Instance-level handle (no database selected yet).
#[async_trait]
pub trait InstanceConnection: Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> Kind;
    async fn is_alive(&self) -> bool;
    async fn ping(&self, ctx: &OpContext) -> Result<(), FabricError>;
    async fn close(&self, ctx: &OpContext) -> Result<(), FabricError>;
    async fn list_databases(&self, ctx: &OpContext) -> Result<Vec<String>, FabricError>;
}

/// The entry point each database kind's crate implements and self-registers
/// into the [`crate::registry::AdapterRegistry`] (spec §4.4 `Adapter`, §9
/// "adapters self-register at process init").
#[async_trait]
pub trait Adapter: Send + Sync {
    fn kind(&self) -> Kind;
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        decryptor: &dyn Decryptor,
        ctx: &OpContext,
    ) -> Result<Box<dyn Connection>, FabricError>;
    async fn connect_instance(
        &self,
        descriptor: &ConnectionDescriptor,
        decryptor: &dyn Decryptor,
        ctx: &OpContext,
    ) -> Result<Box<dyn InstanceConnection>, FabricError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_predicate_renders_null_as_is_null() {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::Null);
        let where_clause = key_predicate(&["id".to_string()], &row);
        assert_eq!(where_clause.0[0], Predicate::IsNull("id".to_string()));
    }

    #[test]
    fn key_predicate_renders_present_value_as_eq() {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::from(42));
        let where_clause = key_predicate(&["id".to_string()], &row);
        assert_eq!(where_clause.0[0], Predicate::Eq("id".to_string(), Value::from(42)));
    }
}
