//! `MetadataOps` for Redis: everything comes back as one `INFO` blob rather
//! than a SQL `version()`/system-catalog query (spec §4.4 `MetadataOps`).

use async_trait::async_trait;
use fabric_connector::adapter::{DatabaseMetadata, MetadataOps};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct RedisMetadataOps {
    pub conn: Arc<Mutex<ConnectionManager>>,
}

impl RedisMetadataOps {
    async fn info(&self, ctx: &OpContext) -> Result<String, FabricError> {
        let conn = self.conn.clone();
        ctx.run(async move {
            redis::cmd("INFO").query_async::<_, String>(&mut *conn.lock().await).await
        })
        .await?
        .map_err(FabricError::internal)
    }
}

fn field(info: &str, key: &str) -> Option<String> {
    info.lines().find_map(|line| line.strip_prefix(&format!("{key}:")).map(|v| v.trim().to_string()))
}

#[async_trait]
impl MetadataOps for RedisMetadataOps {
    async fn collect_database_metadata(&self, ctx: &OpContext) -> Result<DatabaseMetadata, FabricError> {
        let info = self.info(ctx).await?;
        let mut metadata = DatabaseMetadata::default();
        if let Some(keys) = field(&info, "db0") {
            metadata.properties.insert("db0".to_string(), keys);
        }
        if let Some(role) = field(&info, "role") {
            metadata.properties.insert("role".to_string(), role);
        }
        Ok(metadata)
    }

    async fn version(&self, ctx: &OpContext) -> Result<String, FabricError> {
        let info = self.info(ctx).await?;
        field(&info, "redis_version").ok_or_else(|| FabricError::NotFound { resource: "redis_version".to_string() })
    }

    async fn unique_identifier(&self, ctx: &OpContext) -> Result<String, FabricError> {
        let info = self.info(ctx).await?;
        field(&info, "run_id").ok_or_else(|| FabricError::NotFound { resource: "run_id".to_string() })
    }
}
