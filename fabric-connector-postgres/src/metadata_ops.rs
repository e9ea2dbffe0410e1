//! `MetadataOps` for Postgres (spec §4.4 `MetadataOps`).

use async_trait::async_trait;
use fabric_connector::adapter::{DatabaseMetadata, MetadataOps};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio_postgres::Client;

pub struct PostgresMetadataOps {
    pub client: Arc<Client>,
}

#[async_trait]
impl MetadataOps for PostgresMetadataOps {
    async fn collect_database_metadata(&self, ctx: &OpContext) -> Result<DatabaseMetadata, FabricError> {
        let client = self.client.clone();
        let row = ctx
            .run(async move {
                client
                    .query_one("select current_database() as db, current_setting('server_version') as version", &[])
                    .await
            })
            .await?
            .map_err(|e| FabricError::internal(e))?;
        let mut properties = IndexMap::new();
        properties.insert("database".to_string(), row.get::<_, String>("db"));
        properties.insert("server_version".to_string(), row.get::<_, String>("version"));
        Ok(DatabaseMetadata { properties })
    }

    async fn version(&self, ctx: &OpContext) -> Result<String, FabricError> {
        let client = self.client.clone();
        let row = ctx
            .run(async move { client.query_one("select version()", &[]).await })
            .await?
            .map_err(|e| FabricError::internal(e))?;
        Ok(row.get(0))
    }

    async fn unique_identifier(&self, ctx: &OpContext) -> Result<String, FabricError> {
        let client = self.client.clone();
        let row = ctx
            .run(async move { client.query_one("select system_identifier::text from pg_control_system()", &[]).await })
            .await?
            .map_err(|e| FabricError::internal(e))?;
        Ok(row.get(0))
    }
}
