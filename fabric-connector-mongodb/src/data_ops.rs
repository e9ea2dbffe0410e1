//! `DataOps` for MongoDB: collections in place of tables, `Document` filters
//! in place of SQL `WHERE` clauses (spec §4.4 `DataOps`).

use crate::row::{from_document, json_to_bson, row_to_document};
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use fabric_connector::adapter::{DataOps, ExecuteResult, Predicate, Row, RowBatchStream, WhereClause};
use fabric_connector::context::OpContext;
use fabric_types::errors::FabricError;
use futures::TryStreamExt;
use mongodb::options::{FindOptions, ReplaceOptions};
use mongodb::Client;
use serde_json::Value;

pub struct MongoDataOps {
    pub client: Client,
    pub database_id: String,
}

impl MongoDataOps {
    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.client.database(&self.database_id).collection(name)
    }
}

fn render_filter(where_clause: &WhereClause) -> Document {
    let mut filter = Document::new();
    for predicate in &where_clause.0 {
        match predicate {
            Predicate::Eq(field, value) => {
                filter.insert(field.clone(), json_to_bson(value));
            }
            Predicate::IsNull(field) => {
                filter.insert(field.clone(), doc! { "$eq": Bson::Null });
            }
            Predicate::IsNotNull(field) => {
                filter.insert(field.clone(), doc! { "$ne": Bson::Null });
            }
        }
    }
    filter
}

fn filter_for_fields(fields: &[String], row: &Row) -> Document {
    let mut filter = Document::new();
    for field in fields {
        let value = row.get(field).cloned().unwrap_or(Value::Null);
        filter.insert(field.clone(), json_to_bson(&value));
    }
    filter
}

#[async_trait]
impl DataOps for MongoDataOps {
    async fn fetch(&self, container: &str, limit: Option<u64>, ctx: &OpContext) -> Result<Vec<Row>, FabricError> {
        let collection = self.collection(container);
        let mut options = FindOptions::builder().build();
        options.limit = limit.map(|n| n as i64);
        let mut cursor = ctx
            .run(collection.find(None, options))
            .await?
            .map_err(FabricError::internal)?;
        let mut rows = Vec::new();
        while let Some(doc) = ctx.run(cursor.try_next()).await?.map_err(FabricError::internal)? {
            rows.push(from_document(doc));
        }
        Ok(rows)
    }

    async fn fetch_columns(
        &self,
        container: &str,
        fields: &[String],
        limit: Option<u64>,
        ctx: &OpContext,
    ) -> Result<Vec<Row>, FabricError> {
        let mut projection = Document::new();
        for field in fields {
            projection.insert(field.clone(), 1);
        }
        let collection = self.collection(container);
        let mut options = FindOptions::builder().projection(projection).build();
        options.limit = limit.map(|n| n as i64);
        let mut cursor = ctx
            .run(collection.find(None, options))
            .await?
            .map_err(FabricError::internal)?;
        let mut rows = Vec::new();
        while let Some(doc) = ctx.run(cursor.try_next()).await?.map_err(FabricError::internal)? {
            rows.push(from_document(doc));
        }
        Ok(rows)
    }

    async fn insert(&self, container: &str, rows: Vec<Row>, ctx: &OpContext) -> Result<u64, FabricError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let docs: Vec<Document> = rows.iter().map(row_to_document).collect();
        let collection = self.collection(container);
        let result = ctx
            .run(collection.insert_many(docs, None))
            .await?
            .map_err(FabricError::internal)?;
        Ok(result.inserted_ids.len() as u64)
    }

    async fn update(
        &self,
        container: &str,
        rows: Vec<Row>,
        key_fields: &[String],
        ctx: &OpContext,
    ) -> Result<u64, FabricError> {
        let collection = self.collection(container);
        let mut affected = 0u64;
        for row in rows {
            let filter = filter_for_fields(key_fields, &row);
            let mut set_doc = Document::new();
            for (key, value) in &row {
                if !key_fields.contains(key) {
                    set_doc.insert(key.clone(), json_to_bson(value));
                }
            }
            if set_doc.is_empty() {
                continue;
            }
            let collection = collection.clone();
            let update = doc! { "$set": set_doc };
            let result = ctx
                .run(collection.update_one(filter, update, None))
                .await?
                .map_err(FabricError::internal)?;
            affected += result.modified_count;
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
        let collection = self.collection(container);
        let mut affected = 0u64;
        for row in rows {
            let filter = filter_for_fields(unique_fields, &row);
            let replacement = row_to_document(&row);
            let options = ReplaceOptions::builder().upsert(true).build();
            let collection = collection.clone();
            let result = ctx
                .run(collection.replace_one(filter, replacement, options))
                .await?
                .map_err(FabricError::internal)?;
            affected += result.modified_count + result.upserted_id.map(|_| 1).unwrap_or(0);
        }
        Ok(affected)
    }

    async fn delete(&self, container: &str, where_clause: &WhereClause, ctx: &OpContext) -> Result<u64, FabricError> {
        let filter = render_filter(where_clause);
        let collection = self.collection(container);
        let result = ctx
            .run(collection.delete_many(filter, None))
            .await?
            .map_err(FabricError::internal)?;
        Ok(result.deleted_count)
    }

    async fn execute(&self, query: &str, _args: &[Value], ctx: &OpContext) -> Result<ExecuteResult, FabricError> {
        let command: Document = serde_json::from_str::<Value>(query)
            .ok()
            .and_then(|v| Document::try_from(v).ok())
            .ok_or_else(|| FabricError::unsupported("data.execute requires a JSON command document", "mongodb"))?;
        let db = self.client.database(&self.database_id);
        let reply = ctx.run(db.run_command(command, None)).await?.map_err(FabricError::internal)?;
        let bytes = serde_json::to_vec(&Bson::Document(reply).into_relaxed_extjson()).unwrap_or_default();
        Ok(ExecuteResult { rows_affected: 0, bytes })
    }

    async fn stream(&self, container: &str, batch_size: u32, _parallelism: u32) -> Result<RowBatchStream, FabricError> {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let collection = self.collection(container);
        let batch_size = batch_size.max(1);
        tokio::spawn(async move {
            let options = FindOptions::builder().batch_size(batch_size).build();
            match collection.find(None, options).await {
                Ok(mut cursor) => {
                    let mut batch = Vec::with_capacity(batch_size as usize);
                    loop {
                        match cursor.try_next().await {
                            Ok(Some(doc)) => {
                                batch.push(from_document(doc));
                                if batch.len() >= batch_size as usize {
                                    if tx.send(Ok(std::mem::take(&mut batch))).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Ok(None) => {
                                if !batch.is_empty() {
                                    let _ = tx.send(Ok(batch)).await;
                                }
                                return;
                            }
                            Err(e) => {
                                let _ = tx.send(Err(FabricError::internal(e))).await;
                                return;
                            }
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
