//! `ReplicationOps`/`CdcSource` for MongoDB: change streams in place of a
//! WAL or binlog (spec §4.4, §4.9). A change stream's resume token stands in
//! for the LSN/offset every other adapter tracks as `position`.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use fabric_connector::adapter::{AttachConfig, CdcSource, ReplicationOps, Row};
use fabric_connector::context::OpContext;
use fabric_types::cdc::{CdcEvent, Op};
use fabric_types::errors::FabricError;
use fabric_types::relationship::MappingRule;
use futures::stream::TryStreamExt;
use mongodb::change_stream::event::{ChangeStreamEvent, OperationType};
use mongodb::change_stream::ChangeStream;
use mongodb::options::ChangeStreamOptions;
use mongodb::Client;
use serde_json::Value;

pub struct MongoCdcSource {
    stream: ChangeStream<ChangeStreamEvent<Document>>,
    position: Option<String>,
}

impl MongoCdcSource {
    pub async fn attach(client: &Client, database_id: &str, config: &AttachConfig) -> Result<Self, FabricError> {
        let db = client.database(database_id);
        let mut options = ChangeStreamOptions::builder().full_document(Some(
            mongodb::options::FullDocumentType::UpdateLookup,
        )).build();
        if let Some(token) = &config.start_position {
            let resume_doc: Document = serde_json::from_str(token).map_err(FabricError::internal)?;
            options.resume_after = Some(resume_doc.into());
        }

        let pipeline: Vec<Document> = if config.containers.is_empty() {
            Vec::new()
        } else {
            vec![doc! { "$match": { "ns.coll": { "$in": config.containers.clone() } } }]
        };

        let stream = db
            .watch(pipeline, options)
            .await
            .map_err(FabricError::internal)?;
        Ok(Self { stream, position: config.start_position.clone() })
    }
}

#[async_trait]
impl CdcSource for MongoCdcSource {
    async fn next_raw(&mut self, ctx: &OpContext) -> Result<Option<Vec<u8>>, FabricError> {
        let Some(event) = ctx.run(self.stream.try_next()).await?.map_err(FabricError::internal)? else {
            return Ok(None);
        };

        let kind = match event.operation_type {
            OperationType::Insert => "insert",
            OperationType::Update | OperationType::Replace => "update",
            OperationType::Delete => "delete",
            _ => return Ok(None),
        };
        let table = event.ns.as_ref().map(|ns| ns.coll.clone()).unwrap_or_default();
        let full_document = event.full_document.map(|doc| Bson::Document(doc).into_relaxed_extjson());
        let document_key = event.document_key.map(|doc| Bson::Document(doc).into_relaxed_extjson());

        let resume_token = self
            .stream
            .resume_token()
            .map(|t| serde_json::to_string(&t.parsed().unwrap_or_default()).unwrap_or_default())
            .unwrap_or_default();
        self.position = Some(resume_token.clone());

        let payload = serde_json::json!({
            "kind": kind,
            "table": table,
            "full_document": full_document,
            "document_key": document_key,
            "resume_token": resume_token,
        });
        Ok(Some(serde_json::to_vec(&payload).map_err(FabricError::internal)?))
    }

    async fn commit(&mut self, _position: &str) -> Result<(), FabricError> {
        // The resume token already advances with every event read; nothing
        // to acknowledge back to the server.
        Ok(())
    }

    fn position(&self) -> Option<String> {
        self.position.clone()
    }

    async fn close(&mut self) -> Result<(), FabricError> {
        Ok(())
    }
}

pub struct MongoReplicationOps {
    pub client: Client,
    pub database_id: String,
}

#[async_trait]
impl ReplicationOps for MongoReplicationOps {
    fn parse_event(&self, raw: &[u8]) -> Result<CdcEvent, FabricError> {
        let value: Value = serde_json::from_slice(raw).map_err(FabricError::internal)?;
        let kind = value.get("kind").and_then(Value::as_str).unwrap_or("insert");
        let op = match kind {
            "insert" => Op::Insert,
            "update" => Op::Update,
            "delete" => Op::Delete,
            other => {
                return Err(FabricError::internal(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("unknown change stream operation '{other}'"),
                )))
            }
        };
        let container = value.get("table").and_then(Value::as_str).unwrap_or_default().to_string();
        let new = value
            .get("full_document")
            .filter(|v| !v.is_null())
            .and_then(Value::as_object)
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Row>());
        let key = value
            .get("document_key")
            .filter(|v| !v.is_null())
            .and_then(Value::as_object)
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Row>());
        let resume_token = value.get("resume_token").and_then(Value::as_str).unwrap_or_default().to_string();

        Ok(CdcEvent {
            op,
            schema: None,
            container,
            new,
            old: if matches!(op, Op::Delete) { key } else { None },
            commit_ts: chrono::Utc::now(),
            lsn_or_token: resume_token,
            txn_id: None,
            metadata: Default::default(),
        })
    }

    async fn apply(&self, _event: &CdcEvent, _ctx: &OpContext) -> Result<(), FabricError> {
        Err(FabricError::unsupported(
            "replication.apply is driven by the CDC engine's DataOps calls, not adapter-side",
            "mongodb",
        ))
    }

    fn transform(&self, row: Row, rules: &[MappingRule]) -> Result<Row, FabricError> {
        fabric_connector::transform::apply(row, rules)
    }

    async fn attach_source(&self, config: AttachConfig, ctx: &OpContext) -> Result<Box<dyn CdcSource>, FabricError> {
        let client = self.client.clone();
        let database_id = self.database_id.clone();
        let source = ctx
            .run(async move { MongoCdcSource::attach(&client, &database_id, &config).await })
            .await??;
        Ok(Box::new(source))
    }
}
