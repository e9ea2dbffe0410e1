//! `Adapter`/`Connection` entry points for MySQL (spec §4.4, §4.6).

use crate::data_ops::MysqlDataOps;
use crate::metadata_ops::MysqlMetadataOps;
use crate::replication::MysqlReplicationOps;
use crate::schema_ops::MysqlSchemaOps;
use async_trait::async_trait;
use fabric_connector::adapter::{
    Adapter, Connection, DataOps, InstanceConnection, MetadataOps, ReplicationOps, SchemaOps,
};
use fabric_connector::context::OpContext;
use fabric_types::connection::{ConnectionDescriptor, Decryptor};
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::type_registry::TypeConversionRegistry;
use mysql_async::prelude::Queryable;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct MysqlConnection {
    id: String,
    conn: Arc<Mutex<mysql_async::Conn>>,
    schema_ops: MysqlSchemaOps,
    data_ops: MysqlDataOps,
    metadata_ops: MysqlMetadataOps,
    replication_ops: MysqlReplicationOps,
}

#[async_trait]
impl Connection for MysqlConnection {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> Kind {
        Kind::MySql
    }
    async fn is_alive(&self) -> bool {
        self.conn.lock().await.ping().await.is_ok()
    }
    async fn ping(&self, ctx: &OpContext) -> Result<(), FabricError> {
        let conn = self.conn.clone();
        ctx.run(async move { conn.lock().await.query_drop("SELECT 1").await })
            .await?
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

pub struct MysqlAdapter {
    types: Arc<TypeConversionRegistry>,
}

impl MysqlAdapter {
    pub fn new(types: Arc<TypeConversionRegistry>) -> Self {
        types.register_kind(Kind::MySql, crate::type_table::table());
        Self { types }
    }
}

#[async_trait]
impl Adapter for MysqlAdapter {
    fn kind(&self) -> Kind {
        Kind::MySql
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        decryptor: &dyn Decryptor,
        ctx: &OpContext,
    ) -> Result<Box<dyn Connection>, FabricError> {
        let password = decryptor.decrypt(&descriptor.tenant_id, &descriptor.auth.sealed_password)?;
        let conn = ctx.run(crate::connection::open_with_password(descriptor, &password)).await??;
        let conn = Arc::new(Mutex::new(conn));
        let database_id = descriptor.database_name.clone().unwrap_or_else(|| descriptor.id.clone());
        Ok(Box::new(MysqlConnection {
            id: descriptor.id.clone(),
            conn: conn.clone(),
            schema_ops: MysqlSchemaOps { conn: conn.clone(), database_id, types: self.types.clone() },
            data_ops: MysqlDataOps { conn: conn.clone() },
            metadata_ops: MysqlMetadataOps { conn },
            replication_ops: MysqlReplicationOps { descriptor: descriptor.clone(), password },
        }))
    }

    async fn connect_instance(
        &self,
        _descriptor: &ConnectionDescriptor,
        _decryptor: &dyn Decryptor,
        _ctx: &OpContext,
    ) -> Result<Box<dyn InstanceConnection>, FabricError> {
        Err(FabricError::unsupported("connect_instance", "mysql"))
    }
}
