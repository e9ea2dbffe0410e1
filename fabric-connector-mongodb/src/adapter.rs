//! `Adapter`/`Connection` entry points for MongoDB (spec §4.4, §4.6).

use crate::data_ops::MongoDataOps;
use crate::metadata_ops::MongoMetadataOps;
use crate::replication::MongoReplicationOps;
use crate::schema_ops::MongoSchemaOps;
use async_trait::async_trait;
use fabric_connector::adapter::{
    Adapter, Connection, DataOps, InstanceConnection, MetadataOps, ReplicationOps, SchemaOps,
};
use fabric_connector::context::OpContext;
use fabric_types::connection::{ConnectionDescriptor, Decryptor};
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::type_registry::TypeConversionRegistry;
use std::sync::Arc;

pub struct MongoConnection {
    id: String,
    client: mongodb::Client,
    schema_ops: MongoSchemaOps,
    data_ops: MongoDataOps,
    metadata_ops: MongoMetadataOps,
    replication_ops: MongoReplicationOps,
}

#[async_trait]
impl Connection for MongoConnection {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> Kind {
        Kind::MongoDb
    }
    async fn is_alive(&self) -> bool {
        self.client.database("admin").run_command(bson::doc! { "ping": 1 }, None).await.is_ok()
    }
    async fn ping(&self, ctx: &OpContext) -> Result<(), FabricError> {
        let client = self.client.clone();
        ctx.run(async move { client.database("admin").run_command(bson::doc! { "ping": 1 }, None).await })
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

pub struct MongoInstanceConnection {
    id: String,
    client: mongodb::Client,
}

#[async_trait]
impl InstanceConnection for MongoInstanceConnection {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> Kind {
        Kind::MongoDb
    }
    async fn is_alive(&self) -> bool {
        self.client.database("admin").run_command(bson::doc! { "ping": 1 }, None).await.is_ok()
    }
    async fn ping(&self, ctx: &OpContext) -> Result<(), FabricError> {
        let client = self.client.clone();
        ctx.run(async move { client.database("admin").run_command(bson::doc! { "ping": 1 }, None).await })
            .await?
            .map(|_| ())
            .map_err(FabricError::internal)
    }
    async fn close(&self, _ctx: &OpContext) -> Result<(), FabricError> {
        Ok(())
    }
    async fn list_databases(&self, ctx: &OpContext) -> Result<Vec<String>, FabricError> {
        let client = self.client.clone();
        ctx.run(async move { client.list_database_names(None, None).await })
            .await?
            .map_err(FabricError::internal)
    }
}

pub struct MongoAdapter {
    types: Arc<TypeConversionRegistry>,
}

impl MongoAdapter {
    pub fn new(types: Arc<TypeConversionRegistry>) -> Self {
        types.register_kind(Kind::MongoDb, crate::type_table::table());
        Self { types }
    }
}

#[async_trait]
impl Adapter for MongoAdapter {
    fn kind(&self) -> Kind {
        Kind::MongoDb
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        decryptor: &dyn Decryptor,
        ctx: &OpContext,
    ) -> Result<Box<dyn Connection>, FabricError> {
        let client = ctx.run(crate::connection::open(descriptor, decryptor)).await??;
        let database_id = descriptor.database_name.clone().unwrap_or_else(|| descriptor.id.clone());
        Ok(Box::new(MongoConnection {
            id: descriptor.id.clone(),
            client: client.clone(),
            schema_ops: MongoSchemaOps { client: client.clone(), database_id: database_id.clone(), types: self.types.clone() },
            data_ops: MongoDataOps { client: client.clone(), database_id: database_id.clone() },
            metadata_ops: MongoMetadataOps { client: client.clone(), database_id: database_id.clone() },
            replication_ops: MongoReplicationOps { client, database_id },
        }))
    }

    async fn connect_instance(
        &self,
        descriptor: &ConnectionDescriptor,
        decryptor: &dyn Decryptor,
        ctx: &OpContext,
    ) -> Result<Box<dyn InstanceConnection>, FabricError> {
        let client = ctx.run(crate::connection::open(descriptor, decryptor)).await??;
        Ok(Box::new(MongoInstanceConnection { id: descriptor.id.clone(), client }))
    }
}
