//! `MetadataOps` for MongoDB: server identity via `buildInfo`/`hostInfo`
//! admin commands rather than a SQL `version()` call (spec §4.4 `MetadataOps`).

use async_trait::async_trait;
use bson::doc;
use fabric_connector::adapter::{DatabaseMetadata, MetadataOps};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use mongodb::Client;

pub struct MongoMetadataOps {
    pub client: Client,
    pub database_id: String,
}

#[async_trait]
impl MetadataOps for MongoMetadataOps {
    async fn collect_database_metadata(&self, ctx: &OpContext) -> Result<DatabaseMetadata, FabricError> {
        let db = self.client.database(&self.database_id);
        let stats = ctx
            .run(db.run_command(doc! { "dbStats": 1 }, None))
            .await?
            .map_err(FabricError::internal)?;

        let mut metadata = DatabaseMetadata::default();
        metadata.properties.insert("database".to_string(), self.database_id.clone());
        if let Some(collections) = stats.get_i32("collections").ok() {
            metadata.properties.insert("collections".to_string(), collections.to_string());
        }
        Ok(metadata)
    }

    async fn version(&self, ctx: &OpContext) -> Result<String, FabricError> {
        let db = self.client.database("admin");
        let info = ctx
            .run(db.run_command(doc! { "buildInfo": 1 }, None))
            .await?
            .map_err(FabricError::internal)?;
        info.get_str("version").map(|s| s.to_string()).map_err(FabricError::internal)
    }

    async fn unique_identifier(&self, ctx: &OpContext) -> Result<String, FabricError> {
        let db = self.client.database("admin");
        let status = ctx
            .run(db.run_command(doc! { "serverStatus": 1 }, None))
            .await?
            .map_err(FabricError::internal)?;
        status
            .get_str("host")
            .map(|s| s.to_string())
            .map_err(|_| FabricError::NotFound { resource: "serverStatus.host".to_string() })
    }
}
