//! `SchemaOps` for Redis: the keyspace is grouped into synthetic containers
//! by key prefix (`orders:1001` -> container `orders`), since Redis itself
//! has no notion of a table or collection (spec §4.7).

use async_trait::async_trait;
use fabric_connector::adapter::{Container, SchemaOps, UnifiedSchema};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use fabric_types::kind::Kind;
use fabric_types::schema::Field;
use fabric_types::type_registry::TypeConversionRegistry;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCAN_COUNT: usize = 200;

pub struct RedisSchemaOps {
    pub conn: Arc<Mutex<ConnectionManager>>,
    pub database_id: String,
    pub types: Arc<TypeConversionRegistry>,
}

#[async_trait]
impl SchemaOps for RedisSchemaOps {
    async fn discover(&self, ctx: &OpContext) -> Result<UnifiedSchema, FabricError> {
        let names = self.list_containers(ctx).await?;
        let mut schema = UnifiedSchema::new(self.database_id.clone(), Kind::Redis);
        for name in names {
            schema.containers.push(self.get_container(&name, ctx).await?);
        }
        schema.canonicalize();
        Ok(schema)
    }

    async fn create_structure(&self, _schema: &UnifiedSchema, _ctx: &OpContext) -> Result<(), FabricError> {
        // Keys are created implicitly on first write; there is no DDL to run.
        Ok(())
    }

    async fn list_containers(&self, ctx: &OpContext) -> Result<Vec<String>, FabricError> {
        let conn = self.conn.clone();
        let keys: Vec<String> = ctx
            .run(async move { scan_all(conn, "*").await })
            .await??;
        let mut containers: BTreeSet<String> = BTreeSet::new();
        for key in keys {
            containers.insert(crate::row::container_of(&key));
        }
        Ok(containers.into_iter().collect())
    }

    async fn get_container(&self, name: &str, ctx: &OpContext) -> Result<Container, FabricError> {
        let conn = self.conn.clone();
        let pattern = format!("{name}:*");
        let keys: Vec<String> = ctx.run(async move { scan_all(conn, &pattern).await }).await??;

        let mut container = Container::new(name.to_string());
        container.fields.push(Field::new("key".to_string(), fabric_types::schema::UnifiedType::String, false));

        let native = if let Some(sample) = keys.first() {
            let conn = self.conn.clone();
            let sample = sample.clone();
            let native: String = ctx
                .run(async move { conn.lock().await.key_type(sample).await })
                .await??;
            native
        } else {
            "string".to_string()
        };
        let (unified_type, _info) = self.types.native(Kind::Redis, &native)?;
        let mut value_field = Field::new("value".to_string(), unified_type, true);
        value_field.native_type = Some(native);
        container.fields.push(value_field);
        Ok(container)
    }
}

async fn scan_all(conn: Arc<Mutex<ConnectionManager>>, pattern: &str) -> Result<Vec<String>, FabricError> {
    let mut guard = conn.lock().await;
    let mut cursor: u64 = 0;
    let mut keys = Vec::new();
    loop {
        let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(&mut *guard)
            .await
            .map_err(FabricError::internal)?;
        keys.extend(batch);
        if next_cursor == 0 {
            break;
        }
        cursor = next_cursor;
    }
    Ok(keys)
}
