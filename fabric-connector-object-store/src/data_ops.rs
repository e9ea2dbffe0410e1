//! `DataOps` for the object-store kind: read-only ingestion source, so only
//! `fetch`/`fetch_columns`/`stream` do real work (spec §4.4 `DataOps`,
//! `object_store` Non-goals: no mutation surface).

use crate::config::{FileFormat, TableDef};
use crate::listing::list_table_files;
use async_trait::async_trait;
use fabric_connector::adapter::{DataOps, ExecuteResult, Row, RowBatchStream, WhereClause};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;
use serde_json::Value;
use std::sync::Arc;

pub struct ObjectStoreDataOps {
    pub store: Arc<dyn ObjectStore>,
    pub root: StorePath,
    pub tables: Vec<TableDef>,
}

impl ObjectStoreDataOps {
    fn table(&self, name: &str) -> Result<&TableDef, FabricError> {
        self.tables.iter().find(|t| t.name == name).ok_or_else(|| FabricError::NotFound { resource: name.to_string() })
    }

    async fn read_rows(&self, table: &TableDef, limit: Option<u64>, ctx: &OpContext) -> Result<Vec<Row>, FabricError> {
        let files = list_table_files(self.store.as_ref(), &self.root, table, ctx).await?;
        let mut rows = Vec::new();
        for path in files {
            let bytes = ctx
                .run(self.store.get(&path))
                .await?
                .map_err(FabricError::internal)?
                .bytes()
                .await
                .map_err(FabricError::internal)?;
            let mut file_rows = match table.format {
                FileFormat::Csv => crate::row::parse_csv(bytes)?,
                FileFormat::Parquet => crate::row::parse_parquet(bytes)?,
            };
            rows.append(&mut file_rows);
            if let Some(n) = limit {
                if rows.len() as u64 >= n {
                    rows.truncate(n as usize);
                    break;
                }
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl DataOps for ObjectStoreDataOps {
    async fn fetch(&self, container: &str, limit: Option<u64>, ctx: &OpContext) -> Result<Vec<Row>, FabricError> {
        let table = self.table(container)?.clone();
        self.read_rows(&table, limit, ctx).await
    }

    async fn fetch_columns(
        &self,
        container: &str,
        fields: &[String],
        limit: Option<u64>,
        ctx: &OpContext,
    ) -> Result<Vec<Row>, FabricError> {
        let table = self.table(container)?.clone();
        let rows = self.read_rows(&table, limit, ctx).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().filter(|(k, _)| fields.contains(k)).collect())
            .collect())
    }

    async fn insert(&self, _container: &str, _rows: Vec<Row>, _ctx: &OpContext) -> Result<u64, FabricError> {
        Err(FabricError::unsupported("data.insert", "object_store"))
    }

    async fn update(
        &self,
        _container: &str,
        _rows: Vec<Row>,
        _key_fields: &[String],
        _ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        Err(FabricError::unsupported("data.update", "object_store"))
    }

    async fn upsert(
        &self,
        _container: &str,
        _rows: Vec<Row>,
        _unique_fields: &[String],
        _ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        Err(FabricError::unsupported("data.upsert", "object_store"))
    }

    async fn delete(&self, _container: &str, _where_clause: &WhereClause, _ctx: &OpContext) -> Result<u64, FabricError> {
        Err(FabricError::unsupported("data.delete", "object_store"))
    }

    async fn execute(&self, _query: &str, _args: &[Value], _ctx: &OpContext) -> Result<ExecuteResult, FabricError> {
        Err(FabricError::unsupported("data.execute", "object_store"))
    }

    async fn stream(&self, container: &str, batch_size: u32, _parallelism: u32) -> Result<RowBatchStream, FabricError> {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let table = self.table(container)?.clone();
        let store = self.store.clone();
        let root = self.root.clone();
        let batch_size = batch_size.max(1) as usize;
        let ctx = OpContext::new();
        tokio::spawn(async move {
            let files = match list_table_files(store.as_ref(), &root, &table, &ctx).await {
                Ok(files) => files,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };
            for path in files {
                let result = match store.get(&path).await {
                    Ok(result) => result,
                    Err(e) => {
                        let _ = tx.send(Err(FabricError::internal(e))).await;
                        return;
                    }
                };
                let bytes = match result.bytes().await {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(FabricError::internal(e))).await;
                        return;
                    }
                };
                let file_rows = match table.format {
                    FileFormat::Csv => crate::row::parse_csv(bytes),
                    FileFormat::Parquet => crate::row::parse_parquet(bytes),
                };
                let file_rows = match file_rows {
                    Ok(rows) => rows,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };
                for chunk in file_rows.chunks(batch_size) {
                    if tx.send(Ok(chunk.to_vec())).await.is_err() {
                        return;
                    }
                }
            }
        });
        Ok(RowBatchStream { receiver: rx })
    }
}
