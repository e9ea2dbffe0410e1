//! `Adapter`/`Connection` entry points for the object-store kind (spec §4.4,
//! §4.6). Declares `supports_cdc = false`, so `replication_ops` is the
//! shared [`fabric_connector::unsupported::Unsupported`] capability object.

use crate::config::tables_from_descriptor;
use crate::data_ops::ObjectStoreDataOps;
use crate::metadata_ops::ObjectStoreMetadataOps;
use crate::schema_ops::ObjectStoreSchemaOps;
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
use std::sync::Arc;

pub struct ObjectStoreConnection {
    id: String,
    schema_ops: ObjectStoreSchemaOps,
    data_ops: ObjectStoreDataOps,
    metadata_ops: ObjectStoreMetadataOps,
    replication_ops: Unsupported,
}

#[async_trait]
impl Connection for ObjectStoreConnection {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> Kind {
        Kind::ObjectStore
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

pub struct ObjectStoreAdapter {
    types: Arc<TypeConversionRegistry>,
}

impl ObjectStoreAdapter {
    pub fn new(types: Arc<TypeConversionRegistry>) -> Self {
        types.register_kind(Kind::ObjectStore, crate::type_table::table());
        Self { types }
    }
}

#[async_trait]
impl Adapter for ObjectStoreAdapter {
    fn kind(&self) -> Kind {
        Kind::ObjectStore
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        decryptor: &dyn Decryptor,
        ctx: &OpContext,
    ) -> Result<Box<dyn Connection>, FabricError> {
        let tables = tables_from_descriptor(descriptor)?;
        let (store, root) = ctx.run(crate::connection::open(descriptor, decryptor)).await??;
        let database_id = descriptor.database_name.clone().unwrap_or_else(|| descriptor.id.clone());

        Ok(Box::new(ObjectStoreConnection {
            id: descriptor.id.clone(),
            schema_ops: ObjectStoreSchemaOps {
                store: store.clone(),
                root: root.clone(),
                database_id: database_id.clone(),
                tables: tables.clone(),
                types: self.types.clone(),
            },
            data_ops: ObjectStoreDataOps { store, root: root.clone(), tables },
            metadata_ops: ObjectStoreMetadataOps { database_id, root },
            replication_ops: Unsupported { kind: "object_store".to_string() },
        }))
    }

    async fn connect_instance(
        &self,
        _descriptor: &ConnectionDescriptor,
        _decryptor: &dyn Decryptor,
        _ctx: &OpContext,
    ) -> Result<Box<dyn InstanceConnection>, FabricError> {
        Err(FabricError::unsupported("connect_instance", "object_store"))
    }
}
