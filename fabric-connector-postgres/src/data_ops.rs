//! `DataOps` for Postgres: row fetch/mutation built on dynamic SQL text,
//! parameterized only where `tokio_postgres`'s typed params line up cleanly
//! with our JSON-valued rows (spec §4.4 `DataOps`).

use crate::row::from_pg_row;
use async_trait::async_trait;
use fabric_connector::adapter::{DataOps, ExecuteResult, Predicate, Row, RowBatchStream, WhereClause};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use serde_json::Value;
use std::sync::Arc;
use tokio_postgres::Client;

pub struct PostgresDataOps {
    pub client: Arc<Client>,
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn render_where(where_clause: &WhereClause) -> (String, Vec<String>) {
    if where_clause.0.is_empty() {
        return (String::new(), Vec::new());
    }
    let mut clauses = Vec::new();
    let mut literals = Vec::new();
    for predicate in &where_clause.0 {
        match predicate {
            Predicate::Eq(field, value) => {
                literals.push(json_to_sql_literal(value));
                clauses.push(format!("{} = {}", quote_ident(field), literals.last().unwrap()));
            }
            Predicate::IsNull(field) => clauses.push(format!("{} IS NULL", quote_ident(field))),
            Predicate::IsNotNull(field) => clauses.push(format!("{} IS NOT NULL", quote_ident(field))),
        }
    }
    (format!(" WHERE {}", clauses.join(" AND ")), literals)
}

fn json_to_sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

#[async_trait]
impl DataOps for PostgresDataOps {
    async fn fetch(&self, container: &str, limit: Option<u64>, ctx: &OpContext) -> Result<Vec<Row>, FabricError> {
        let mut sql = format!("SELECT * FROM {}", quote_ident(container));
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        let client = self.client.clone();
        let rows = ctx
            .run(async move { client.query(sql.as_str(), &[]).await })
            .await?
            .map_err(|e| FabricError::internal(e))?;
        Ok(rows.iter().map(from_pg_row).collect())
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
        let client = self.client.clone();
        let rows = ctx
            .run(async move { client.query(sql.as_str(), &[]).await })
            .await?
            .map_err(|e| FabricError::internal(e))?;
        Ok(rows.iter().map(from_pg_row).collect())
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
            let client = self.client.clone();
            affected += ctx
                .run(async move { client.execute(sql.as_str(), &[]).await })
                .await?
                .map_err(|e| FabricError::internal(e))?;
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
            let (where_sql, _) = render_where(&where_clause);
            let assignments: Vec<_> = row
                .iter()
                .filter(|(k, _)| !key_fields.contains(k))
                .map(|(k, v)| format!("{} = {}", quote_ident(k), json_to_sql_literal(v)))
                .collect();
            if assignments.is_empty() {
                continue;
            }
            let sql = format!("UPDATE {} SET {}{}", quote_ident(container), assignments.join(", "), where_sql);
            let client = self.client.clone();
            affected += ctx
                .run(async move { client.execute(sql.as_str(), &[]).await })
                .await?
                .map_err(|e| FabricError::internal(e))?;
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
            let conflict_targets = unique_fields.iter().map(|f| quote_ident(f)).collect::<Vec<_>>().join(", ");
            let assignments = row
                .keys()
                .filter(|k| !unique_fields.contains(k))
                .map(|k| format!("{} = EXCLUDED.{}", quote_ident(k), quote_ident(k)))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = if assignments.is_empty() {
                format!(
                    "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO NOTHING",
                    quote_ident(container),
                    columns.join(", "),
                    values.join(", "),
                    conflict_targets
                )
            } else {
                format!(
                    "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
                    quote_ident(container),
                    columns.join(", "),
                    values.join(", "),
                    conflict_targets,
                    assignments
                )
            };
            let client = self.client.clone();
            affected += ctx
                .run(async move { client.execute(sql.as_str(), &[]).await })
                .await?
                .map_err(|e| FabricError::internal(e))?;
        }
        Ok(affected)
    }

    async fn delete(&self, container: &str, where_clause: &WhereClause, ctx: &OpContext) -> Result<u64, FabricError> {
        let (where_sql, _) = render_where(where_clause);
        let sql = format!("DELETE FROM {}{}", quote_ident(container), where_sql);
        let client = self.client.clone();
        ctx.run(async move { client.execute(sql.as_str(), &[]).await })
            .await?
            .map_err(|e| FabricError::internal(e))
    }

    async fn execute(&self, query: &str, args: &[Value], ctx: &OpContext) -> Result<ExecuteResult, FabricError> {
        if !args.is_empty() {
            return Err(FabricError::unsupported("data.execute with positional args", "postgres"));
        }
        let query = query.to_string();
        let client = self.client.clone();
        let rows_affected = ctx
            .run(async move { client.execute(query.as_str(), &[]).await })
            .await?
            .map_err(|e| FabricError::internal(e))?;
        Ok(ExecuteResult { rows_affected, bytes: Vec::new() })
    }

    async fn stream(&self, container: &str, batch_size: u32, _parallelism: u32) -> Result<RowBatchStream, FabricError> {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let client = self.client.clone();
        let container = container.to_string();
        let batch_size = batch_size.max(1);
        tokio::spawn(async move {
            let sql = format!("SELECT * FROM {}", quote_ident(&container));
            match client.query(sql.as_str(), &[]).await {
                Ok(pg_rows) => {
                    for chunk in pg_rows.chunks(batch_size as usize) {
                        let batch = chunk.iter().map(from_pg_row).collect();
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
