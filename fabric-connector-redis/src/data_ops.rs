//! `DataOps` for Redis: `GET`/`SET`/`DEL` stand in for row fetch/mutation,
//! keyed by the `key` field every container's synthetic schema declares
//! (spec §4.4 `DataOps`).

use crate::row::key_value_row;
use async_trait::async_trait;
use fabric_connector::adapter::{DataOps, ExecuteResult, Predicate, Row, RowBatchStream, WhereClause};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct RedisDataOps {
    pub conn: Arc<Mutex<ConnectionManager>>,
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_to_value(s: String) -> Value {
    serde_json::from_str(&s).unwrap_or(Value::String(s))
}

fn keys_from_where(container: &str, where_clause: &WhereClause) -> Vec<String> {
    where_clause
        .0
        .iter()
        .filter_map(|p| match p {
            Predicate::Eq(field, value) if field == "key" => Some(format!("{container}:{}", value_to_string(value))),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl DataOps for RedisDataOps {
    async fn fetch(&self, container: &str, limit: Option<u64>, ctx: &OpContext) -> Result<Vec<Row>, FabricError> {
        let conn = self.conn.clone();
        let pattern = format!("{container}:*");
        let keys: Vec<String> = ctx.run(async move { scan_keys(conn, &pattern).await }).await??;
        let keys = match limit {
            Some(n) => keys.into_iter().take(n as usize).collect(),
            None => keys,
        };

        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            let conn = self.conn.clone();
            let key_clone = key.clone();
            let raw: Option<String> = ctx
                .run(async move { conn.lock().await.get(key_clone).await })
                .await?
                .map_err(FabricError::internal)?;
            let Some(raw) = raw else { continue };
            let short_key = key.split_once(':').map(|(_, rest)| rest.to_string()).unwrap_or(key);
            rows.push(key_value_row(short_key, string_to_value(raw)));
        }
        Ok(rows)
    }

    async fn fetch_columns(
        &self,
        container: &str,
        _fields: &[String],
        limit: Option<u64>,
        ctx: &OpContext,
    ) -> Result<Vec<Row>, FabricError> {
        self.fetch(container, limit, ctx).await
    }

    async fn insert(&self, container: &str, rows: Vec<Row>, ctx: &OpContext) -> Result<u64, FabricError> {
        self.upsert(container, rows, &["key".to_string()], ctx).await
    }

    async fn update(
        &self,
        container: &str,
        rows: Vec<Row>,
        key_fields: &[String],
        ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        self.upsert(container, rows, key_fields, ctx).await
    }

    async fn upsert(
        &self,
        container: &str,
        rows: Vec<Row>,
        _unique_fields: &[String],
        ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        let mut affected = 0u64;
        for row in rows {
            let Some(key) = row.get("key").map(value_to_string) else { continue };
            let value = row.get("value").cloned().unwrap_or(Value::Null);
            let redis_key = format!("{container}:{key}");
            let conn = self.conn.clone();
            let payload = value_to_string(&value);
            ctx.run(async move { conn.lock().await.set::<_, _, ()>(redis_key, payload).await })
                .await?
                .map_err(FabricError::internal)?;
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, container: &str, where_clause: &WhereClause, ctx: &OpContext) -> Result<u64, FabricError> {
        let keys = keys_from_where(container, where_clause);
        if keys.is_empty() {
            return Ok(0);
        }
        let conn = self.conn.clone();
        let deleted: u64 = ctx
            .run(async move { conn.lock().await.del(keys).await })
            .await?
            .map_err(FabricError::internal)?;
        Ok(deleted)
    }

    async fn execute(&self, query: &str, _args: &[Value], ctx: &OpContext) -> Result<ExecuteResult, FabricError> {
        let parts: Vec<&str> = query.split_whitespace().collect();
        let Some((name, args)) = parts.split_first() else {
            return Err(FabricError::unsupported("data.execute requires a command name", "redis"));
        };
        let mut command = redis::cmd(name);
        for arg in args {
            command.arg(*arg);
        }
        let conn = self.conn.clone();
        let reply: redis::Value = ctx
            .run(async move { command.query_async(&mut *conn.lock().await).await })
            .await?
            .map_err(FabricError::internal)?;
        let bytes = format!("{reply:?}").into_bytes();
        Ok(ExecuteResult { rows_affected: 0, bytes })
    }

    async fn stream(&self, container: &str, batch_size: u32, _parallelism: u32) -> Result<RowBatchStream, FabricError> {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let conn = self.conn.clone();
        let container = container.to_string();
        let batch_size = batch_size.max(1) as usize;
        tokio::spawn(async move {
            let pattern = format!("{container}:*");
            let keys = match scan_keys(conn.clone(), &pattern).await {
                Ok(keys) => keys,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            for chunk in keys.chunks(batch_size) {
                let mut batch = Vec::with_capacity(chunk.len());
                for key in chunk {
                    let value: Option<String> = match conn.lock().await.get(key.clone()).await {
                        Ok(v) => v,
                        Err(e) => {
                            let _ = tx.send(Err(FabricError::internal(e))).await;
                            return;
                        }
                    };
                    if let Some(value) = value {
                        let short_key = key.split_once(':').map(|(_, rest)| rest.to_string()).unwrap_or(key.clone());
                        batch.push(key_value_row(short_key, string_to_value(value)));
                    }
                }
                if tx.send(Ok(batch)).await.is_err() {
                    return;
                }
            }
        });
        Ok(RowBatchStream { receiver: rx })
    }
}

async fn scan_keys(conn: Arc<Mutex<ConnectionManager>>, pattern: &str) -> Result<Vec<String>, FabricError> {
    let mut guard = conn.lock().await;
    let mut cursor: u64 = 0;
    let mut keys = Vec::new();
    loop {
        let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(200)
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
