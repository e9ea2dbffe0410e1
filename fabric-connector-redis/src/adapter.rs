//! `Adapter`/`Connection` entry points for Redis (spec §4.4, §4.6). Redis
//! declares `supports_cdc = false`, so `replication_ops` is the shared
//! [`fabric_connector::unsupported::Unsupported`] capability object rather
//! than a real implementation.

use crate::data_ops::RedisDataOps;
use crate::metadata_ops::RedisMetadataOps;
use crate::schema_ops::RedisSchemaOps;
use async_trait::async_trait;
use fabric_connector::adapter::{
    Adapter, Connection, DataOps, InstanceConnection, MetadataOps, ReplicationOps, SchemaOps,
};
use fabric_connector::context::OpContext;
use fabric_connector::unsupported::Unsupported;
use fabric_types::connection::{ConnectionDescriptor, Decryptor};
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::type_registry::TypeConversionRegistry;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct RedisConnection {
    id: String,
    conn: Arc<Mutex<ConnectionManager>>,
    schema_ops: RedisSchemaOps,
    data_ops: RedisDataOps,
    metadata_ops: RedisMetadataOps,
    replication_ops: Unsupported,
}

#[async_trait]
impl Connection for RedisConnection {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> Kind {
        Kind::Redis
    }
    async fn is_alive(&self) -> bool {
        redis::cmd("PING").query_async::<_, String>(&mut *self.conn.lock().await).await.is_ok()
    }
    async fn ping(&self, ctx: &OpContext) -> Result<(), FabricError> {
        let conn = self.conn.clone();
        ctx.run(async move { redis::cmd("PING").query_async::<_, String>(&mut *conn.lock().await).await })
            .await?
            .map(|_| ())
            .map_err(FabricError::internal)
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

pub struct RedisAdapter {
    types: Arc<TypeConversionRegistry>,
}

impl RedisAdapter {
    pub fn new(types: Arc<TypeConversionRegistry>) -> Self {
        types.register_kind(Kind::Redis, crate::type_table::table());
        Self { types }
    }
}

#[async_trait]
impl Adapter for RedisAdapter {
    fn kind(&self) -> Kind {
        Kind::Redis
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        decryptor: &dyn Decryptor,
        ctx: &OpContext,
    ) -> Result<Box<dyn Connection>, FabricError> {
        let conn = ctx.run(crate::connection::open(descriptor, decryptor)).await??;
        let conn = Arc::new(Mutex::new(conn));
        let database_id = descriptor.database_name.clone().unwrap_or_else(|| descriptor.id.clone());
        Ok(Box::new(RedisConnection {
            id: descriptor.id.clone(),
            conn: conn.clone(),
            schema_ops: RedisSchemaOps { conn: conn.clone(), database_id, types: self.types.clone() },
            data_ops: RedisDataOps { conn: conn.clone() },
            metadata_ops: RedisMetadataOps { conn },
            replication_ops: Unsupported { kind: "redis".to_string() },
        }))
    }

    async fn connect_instance(
        &self,
        _descriptor: &ConnectionDescriptor,
        _decryptor: &dyn Decryptor,
        _ctx: &OpContext,
    ) -> Result<Box<dyn InstanceConnection>, FabricError> {
        Err(FabricError::unsupported("connect_instance", "redis"))
    }
}
