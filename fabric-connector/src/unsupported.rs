//! Shared "unsupported" capability objects. An adapter that cannot provide a
//! capability (e.g. replication on a kind with no CDC facility) returns one
//! of these instead of `None`, so callers never have to guard against a
//! missing capability object (spec §4.4, §9 "Interface-bag per capability").

use crate::adapter::{
    AttachConfig, CdcSource, Container, DatabaseMetadata, DataOps, ExecuteResult, MetadataOps, Row,
    ReplicationOps, RowBatchStream, SchemaOps, UnifiedSchema, WhereClause,
};
use crate::context::OpContext;
use async_trait::async_trait;
use fabric_types::cdc::CdcEvent;
use fabric_types::errors::FabricError;
use fabric_types::relationship::MappingRule;
use serde_json::Value;

pub struct Unsupported {
    pub kind: String,
}

fn err(kind: &str, operation: &str) -> FabricError {
    FabricError::unsupported(operation, kind)
}

#[async_trait]
impl SchemaOps for Unsupported {
    async fn discover(&self, _ctx: &OpContext) -> Result<UnifiedSchema, FabricError> {
        Err(err(&self.kind, "schema.discover"))
    }
    async fn create_structure(&self, _schema: &UnifiedSchema, _ctx: &OpContext) -> Result<(), FabricError> {
        Err(err(&self.kind, "schema.create_structure"))
    }
    async fn list_containers(&self, _ctx: &OpContext) -> Result<Vec<String>, FabricError> {
        Err(err(&self.kind, "schema.list_containers"))
    }
    async fn get_container(&self, _name: &str, _ctx: &OpContext) -> Result<Container, FabricError> {
        Err(err(&self.kind, "schema.get_container"))
    }
}

#[async_trait]
impl DataOps for Unsupported {
    async fn fetch(&self, _container: &str, _limit: Option<u64>, _ctx: &OpContext) -> Result<Vec<Row>, FabricError> {
        Err(err(&self.kind, "data.fetch"))
    }
    async fn fetch_columns(
        &self,
        _container: &str,
        _fields: &[String],
        _limit: Option<u64>,
        _ctx: &OpContext,
    ) -> Result<Vec<Row>, FabricError> {
        Err(err(&self.kind, "data.fetch_columns"))
    }
    async fn insert(&self, _container: &str, _rows: Vec<Row>, _ctx: &OpContext) -> Result<u64, FabricError> {
        Err(err(&self.kind, "data.insert"))
    }
    async fn update(
        &self,
        _container: &str,
        _rows: Vec<Row>,
        _key_fields: &[String],
        _ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        Err(err(&self.kind, "data.update"))
    }
    async fn upsert(
        &self,
        _container: &str,
        _rows: Vec<Row>,
        _unique_fields: &[String],
        _ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        Err(err(&self.kind, "data.upsert"))
    }
    async fn delete(&self, _container: &str, _where_clause: &WhereClause, _ctx: &OpContext) -> Result<u64, FabricError> {
        Err(err(&self.kind, "data.delete"))
    }
    async fn execute(&self, _query: &str, _args: &[Value], _ctx: &OpContext) -> Result<ExecuteResult, FabricError> {
        Err(err(&self.kind, "data.execute"))
    }
    async fn stream(&self, _container: &str, _batch_size: u32, _parallelism: u32) -> Result<RowBatchStream, FabricError> {
        Err(err(&self.kind, "data.stream"))
    }
}

#[async_trait]
impl MetadataOps for Unsupported {
    async fn collect_database_metadata(&self, _ctx: &OpContext) -> Result<DatabaseMetadata, FabricError> {
        Err(err(&self.kind, "metadata.collect_database_metadata"))
    }
    async fn version(&self, _ctx: &OpContext) -> Result<String, FabricError> {
        Err(err(&self.kind, "metadata.version"))
    }
    async fn unique_identifier(&self, _ctx: &OpContext) -> Result<String, FabricError> {
        Err(err(&self.kind, "metadata.unique_identifier"))
    }
}

/// Returned by every adapter that declares `supports_cdc = false` in its
/// [`fabric_types::capability::Capability`] entry (spec §4.4: "Adapters that
/// cannot support CDC return a standard `Unsupported(kind, "replication")`
/// error from every method").
#[async_trait]
impl ReplicationOps for Unsupported {
    fn parse_event(&self, _raw: &[u8]) -> Result<CdcEvent, FabricError> {
        Err(err(&self.kind, "replication"))
    }
    async fn apply(&self, _event: &CdcEvent, _ctx: &OpContext) -> Result<(), FabricError> {
        Err(err(&self.kind, "replication"))
    }
    fn transform(&self, _row: Row, _rules: &[MappingRule]) -> Result<Row, FabricError> {
        Err(err(&self.kind, "replication"))
    }
    async fn attach_source(&self, _config: AttachConfig, _ctx: &OpContext) -> Result<Box<dyn CdcSource>, FabricError> {
        Err(err(&self.kind, "replication"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_replication_rejects_every_method() {
        let ops = Unsupported { kind: "redis".to_string() };
        let ctx = OpContext::new();
        assert!(ops.apply(&sample_event(), &ctx).await.is_err());
        assert!(ops.parse_event(&[]).is_err());
        assert!(ops.attach_source(AttachConfig::default(), &ctx).await.is_err());
    }

    fn sample_event() -> CdcEvent {
        CdcEvent {
            op: fabric_types::cdc::Op::Insert,
            schema: None,
            container: "t".into(),
            new: None,
            old: None,
            commit_ts: chrono::Utc::now(),
            lsn_or_token: "0".into(),
            txn_id: None,
            metadata: Default::default(),
        }
    }
}
