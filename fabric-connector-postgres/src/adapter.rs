//! `Adapter`/`Connection` entry points for Postgres (spec §4.4, §4.6).

use crate::data_ops::PostgresDataOps;
use crate::metadata_ops::PostgresMetadataOps;
use crate::replication::PostgresReplicationOps;
use crate::schema_ops::PostgresSchemaOps;
use async_trait::async_trait;
use fabric_connector::adapter::{
    Connection, DataOps, InstanceConnection, MetadataOps, ReplicationOps, SchemaOps,
};
use fabric_connector::context::OpContext;
use fabric_connector::adapter::Adapter;
use fabric_types::connection::{ConnectionDescriptor, Decryptor};
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::type_registry::TypeConversionRegistry;
use std::sync::Arc;

pub struct PostgresConnection {
    id: String,
    client: Arc<tokio_postgres::Client>,
    schema_ops: PostgresSchemaOps,
    data_ops: PostgresDataOps,
    metadata_ops: PostgresMetadataOps,
    replication_ops: PostgresReplicationOps,
}

#[async_trait]
impl Connection for PostgresConnection {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> Kind {
        Kind::Postgres
    }
    async fn is_alive(&self) -> bool {
        !self.client.is_closed()
    }
    async fn ping(&self, ctx: &OpContext) -> Result<(), FabricError> {
        let client = self.client.clone();
        ctx.run(async move { client.simple_query("SELECT 1").await })
            .await?
            .map_err(|e| FabricError::internal(e))?;
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

pub struct PostgresAdapter {
    types: Arc<TypeConversionRegistry>,
}

impl PostgresAdapter {
    pub fn new(types: Arc<TypeConversionRegistry>) -> Self {
        types.register_kind(Kind::Postgres, crate::type_table::table());
        Self { types }
    }
}

#[async_trait]
impl Adapter for PostgresAdapter {
    fn kind(&self) -> Kind {
        Kind::Postgres
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        decryptor: &dyn Decryptor,
        ctx: &OpContext,
    ) -> Result<Box<dyn Connection>, FabricError> {
        let client = Arc::new(ctx.run(crate::connection::open(descriptor, decryptor)).await??);
        let database_id = descriptor.database_name.clone().unwrap_or_else(|| descriptor.id.clone());
        Ok(Box::new(PostgresConnection {
            id: descriptor.id.clone(),
            client: client.clone(),
            schema_ops: PostgresSchemaOps { client: client.clone(), database_id, types: self.types.clone() },
            data_ops: PostgresDataOps { client: client.clone() },
            metadata_ops: PostgresMetadataOps { client: client.clone() },
            replication_ops: PostgresReplicationOps { client, relationship_id: descriptor.id.clone() },
        }))
    }

    async fn connect_instance(
        &self,
        _descriptor: &ConnectionDescriptor,
        _decryptor: &dyn Decryptor,
        _ctx: &OpContext,
    ) -> Result<Box<dyn InstanceConnection>, FabricError> {
        Err(FabricError::unsupported("connect_instance", "postgres"))
    }
}
