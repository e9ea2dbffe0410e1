//! `DataOps` for MySQL (spec §4.4 `DataOps`).

use crate::row::from_mysql_row;
use async_trait::async_trait;
use fabric_connector::adapter::{DataOps, ExecuteResult, Predicate, Row, RowBatchStream, WhereClause};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use mysql_async::prelude::Queryable;
use mysql_async::Conn;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct MysqlDataOps {
    pub conn: Arc<Mutex<Conn>>,
}

fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn json_to_sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1".to_string() } else { "0".to_string() },
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''").replace('\\', "\\\\")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

fn render_where(where_clause: &WhereClause) -> String {
    if where_clause.0.is_empty() {
        return String::new();
    }
    let clauses: Vec<_> = where_clause
        .0
        .iter()
        .map(|p| match p {
            Predicate::Eq(field, value) => format!("{} = {}", quote_ident(field), json_to_sql_literal(value)),
            Predicate::IsNull(field) => format!("{} IS NULL", quote_ident(field)),
            Predicate::IsNotNull(field) => format!("{} IS NOT NULL", quote_ident(field)),
        })
        .collect();
    format!(" WHERE {}", clauses.join(" AND "))
}

#[async_trait]
impl DataOps for MysqlDataOps {
    async fn fetch(&self, container: &str, limit: Option<u64>, ctx: &OpContext) -> Result<Vec<Row>, FabricError> {
        let mut sql = format!("SELECT * FROM {}", quote_ident(container));
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        let conn = self.conn.clone();
        let rows = ctx
            .run(async move { conn.lock().await.query::<mysql_async::Row, _>(sql).await })
            .await?
            .map_err(FabricError::internal)?;
        Ok(rows.into_iter().map(from_mysql_row).collect())
    }

    async fn fetch_columns(
        &self,
        container: &str,
        fields: &[String],
        limit: Option<u64>,
        ctx: &OpContext,
    ) -> Result<Vec<Row>, FabricError> {
        let columns = fields.iter().map(|f| quote_ident(f)).collect::<Vec<_>>().join(", ");
        let mut sql = format!("SELECT {columns} FROM {}", quote_ident(container));
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        let conn = self.conn.clone();
        let rows = ctx
            .run(async move { conn.lock().await.query::<mysql_async::Row, _>(sql).await })
            .await?
            .map_err(FabricError::internal)?;
        Ok(rows.into_iter().map(from_mysql_row).collect())
    }

    async fn insert(&self, container: &str, rows: Vec<Row>, ctx: &OpContext) -> Result<u64, FabricError> {
        let mut affected = 0u64;
        for row in rows {
            let columns: Vec<_> = row.keys().map(|k| quote_ident(k)).collect();
            let values: Vec<_> = row.values().map(json_to_sql_literal).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(container),
                columns.join(", "),
                values.join(", ")
            );
            let conn = self.conn.clone();
            ctx.run(async move { conn.lock().await.query_drop(sql).await })
                .await?
                .map_err(FabricError::internal)?;
            affected += 1;
        }
        Ok(affected)
    }

    async fn update(
        &self,
        container: &str,
        rows: Vec<Row>,
        key_fields: &[String],
        ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        let mut affected = 0u64;
        for row in rows {
            let where_clause = fabric_connector::adapter::key_predicate(key_fields, &row);
            let where_sql = render_where(&where_clause);
            let assignments: Vec<_> = row
                .iter()
                .filter(|(k, _)| !key_fields.contains(k))
                .map(|(k, v)| format!("{} = {}", quote_ident(k), json_to_sql_literal(v)))
                .collect();
            if assignments.is_empty() {
                continue;
            }
            let sql = format!("UPDATE {} SET {}{}", quote_ident(container), assignments.join(", "), where_sql);
            let conn = self.conn.clone();
            ctx.run(async move { conn.lock().await.query_drop(sql).await })
                .await?
                .map_err(FabricError::internal)?;
            affected += 1;
        }
        Ok(affected)
    }

    async fn upsert(
        &self,
        container: &str,
        rows: Vec<Row>,
        unique_fields: &[String],
        ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        let mut affected = 0u64;
        for row in rows {
            let columns: Vec<_> = row.keys().map(|k| quote_ident(k)).collect();
            let values: Vec<_> = row.values().map(json_to_sql_literal).collect();
            let assignments = row
                .keys()
                .filter(|k| !unique_fields.contains(k))
                .map(|k| format!("{} = VALUES({})", quote_ident(k), quote_ident(k)))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = if assignments.is_empty() {
                format!(
                    "INSERT IGNORE INTO {} ({}) VALUES ({})",
                    quote_ident(container),
                    columns.join(", "),
                    values.join(", ")
                )
            } else {
                format!(
                    "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
                    quote_ident(container),
                    columns.join(", "),
                    values.join(", "),
                    assignments
                )
            };
            let conn = self.conn.clone();
            ctx.run(async move { conn.lock().await.query_drop(sql).await })
                .await?
                .map_err(FabricError::internal)?;
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, container: &str, where_clause: &WhereClause, ctx: &OpContext) -> Result<u64, FabricError> {
        let where_sql = render_where(where_clause);
        let sql = format!("DELETE FROM {}{}", quote_ident(container), where_sql);
        let conn = self.conn.clone();
        ctx.run(async move {
            let mut conn = conn.lock().await;
            conn.query_drop(sql).await?;
            Ok::<u64, mysql_async::Error>(conn.affected_rows())
        })
        .await?
        .map_err(FabricError::internal)
    }

    async fn execute(&self, query: &str, args: &[Value], ctx: &OpContext) -> Result<ExecuteResult, FabricError> {
        if !args.is_empty() {
            return Err(FabricError::unsupported("data.execute with positional args", "mysql"));
        }
        let query = query.to_string();
        let conn = self.conn.clone();
        let rows_affected = ctx
            .run(async move {
                let mut conn = conn.lock().await;
                conn.query_drop(query).await?;
                Ok::<u64, mysql_async::Error>(conn.affected_rows())
            })
            .await?
            .map_err(FabricError::internal)?;
        Ok(ExecuteResult { rows_affected, bytes: Vec::new() })
    }

    async fn stream(&self, container: &str, batch_size: u32, _parallelism: u32) -> Result<RowBatchStream, FabricError> {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let conn = self.conn.clone();
        let container = container.to_string();
        let batch_size = batch_size.max(1);
        tokio::spawn(async move {
            let sql = format!("SELECT * FROM {}", quote_ident(&container));
            let mut conn = conn.lock().await;
            match conn.query::<mysql_async::Row, _>(sql).await {
                Ok(mysql_rows) => {
                    for chunk in mysql_rows.chunks(batch_size as usize) {
                        let batch = chunk.iter().cloned().map(from_mysql_row).collect();
                        if tx.send(Ok(batch)).await.is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(FabricError::internal(e))).await;
                }
            }
        });
        Ok(RowBatchStream { receiver: rx })
    }
}
