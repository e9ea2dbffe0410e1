//! `MetadataOps` for the object-store kind: there is no server to ask for a
//! version, so this reports the configured root location instead (spec §4.4
//! `MetadataOps`).

use async_trait::async_trait;
use fabric_connector::adapter::{DatabaseMetadata, MetadataOps};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use object_store::path::Path as StorePath;

pub struct ObjectStoreMetadataOps {
    pub database_id: String,
    pub root: StorePath,
}

#[async_trait]
impl MetadataOps for ObjectStoreMetadataOps {
    async fn collect_database_metadata(&self, _ctx: &OpContext) -> Result<DatabaseMetadata, FabricError> {
        let mut metadata = DatabaseMetadata::default();
        metadata.properties.insert("root".to_string(), self.root.to_string());
        Ok(metadata)
    }

    async fn version(&self, _ctx: &OpContext) -> Result<String, FabricError> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    async fn unique_identifier(&self, _ctx: &OpContext) -> Result<String, FabricError> {
        Ok(format!("{}:{}", self.database_id, self.root))
    }
}
