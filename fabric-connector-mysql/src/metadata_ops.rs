//! `MetadataOps` for MySQL (spec §4.4 `MetadataOps`).

use async_trait::async_trait;
use fabric_connector::adapter::{DatabaseMetadata, MetadataOps};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use indexmap::IndexMap;
use mysql_async::prelude::Queryable;
use mysql_async::Conn;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct MysqlMetadataOps {
    pub conn: Arc<Mutex<Conn>>,
}

#[async_trait]
impl MetadataOps for MysqlMetadataOps {
    async fn collect_database_metadata(&self, ctx: &OpContext) -> Result<DatabaseMetadata, FabricError> {
        let conn = self.conn.clone();
        let (db, version): (String, String) = ctx
            .run(async move { conn.lock().await.query_first("select database(), version()").await })
            .await?
            .map_err(FabricError::internal)?
            .unwrap_or_default();
        let mut properties = IndexMap::new();
        properties.insert("database".to_string(), db);
        properties.insert("server_version".to_string(), version);
        Ok(DatabaseMetadata { properties })
    }

    async fn version(&self, ctx: &OpContext) -> Result<String, FabricError> {
        let conn = self.conn.clone();
        let version: Option<String> = ctx
            .run(async move { conn.lock().await.query_first("select version()").await })
            .await?
            .map_err(FabricError::internal)?;
        Ok(version.unwrap_or_default())
    }

    async fn unique_identifier(&self, ctx: &OpContext) -> Result<String, FabricError> {
        let conn = self.conn.clone();
        let id: Option<String> = ctx
            .run(async move { conn.lock().await.query_first("select @@server_uuid").await })
            .await?
            .map_err(FabricError::internal)?;
        Ok(id.unwrap_or_default())
    }
}
