//! `ReplicationOps`/`CdcSource` for Postgres: logical replication slots
//! decoded with the `wal2json` output plugin (spec §4.4, §4.9; grounded on
//! the source repository's `replication_slot_helper::ReplicationSlotHelper`
//! create/drop-slot pattern).

use async_trait::async_trait;
use fabric_connector::adapter::{AttachConfig, CdcSource, ReplicationOps, Row};
use fabric_connector::context::OpContext;
use fabric_types::cdc::{CdcEvent, Op};
use fabric_types::errors::FabricError;
use fabric_types::relationship::MappingRule;
use serde_json::Value;
use std::sync::Arc;
use tokio_postgres::Client;

const PUBLICATION_PREFIX: &str = "fabric_pub_";
const SLOT_PREFIX: &str = "fabric_slot_";

pub fn slot_name(relationship_id: &str) -> String {
    format!("{SLOT_PREFIX}{}", relationship_id.replace('-', "_"))
}

pub fn publication_name(relationship_id: &str) -> String {
    format!("{PUBLICATION_PREFIX}{}", relationship_id.replace('-', "_"))
}

/// Creates the publication and logical replication slot for a relationship,
/// idempotently (a slot that already exists is left untouched).
pub async fn ensure_slot(client: &Client, relationship_id: &str, containers: &[String]) -> Result<(), FabricError> {
    let publication = publication_name(relationship_id);
    let targets = if containers.is_empty() {
        "ALL TABLES".to_string()
    } else {
        format!(
            "TABLE {}",
            containers.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", ")
        )
    };
    let exists: bool = client
        .query_one("select exists(select 1 from pg_publication where pubname = $1)", &[&publication])
        .await
        .map_err(|e| FabricError::internal(e))?
        .get(0);
    if !exists {
        client
            .execute(format!("CREATE PUBLICATION \"{publication}\" FOR {targets}").as_str(), &[])
            .await
            .map_err(|e| FabricError::internal(e))?;
    }

    let slot = slot_name(relationship_id);
    let slot_exists: bool = client
        .query_one("select exists(select 1 from pg_replication_slots where slot_name = $1)", &[&slot])
        .await
        .map_err(|e| FabricError::internal(e))?
        .get(0);
    if !slot_exists {
        client
            .execute(
                "select pg_create_logical_replication_slot($1, 'wal2json')",
                &[&slot],
            )
            .await
            .map_err(|e| FabricError::internal(e))?;
    }
    Ok(())
}

/// Pulls changes off a logical replication slot by polling
/// `pg_logical_slot_get_changes` rather than holding open the streaming
/// replication protocol, trading latency for a connection that behaves like
/// any other pooled client (acceptable per spec §4.9's "at-least-once,
/// position-resumable" contract; no ordering guarantee is lost since
/// `pg_logical_slot_get_changes` returns changes in commit order).
pub struct PostgresCdcSource {
    client: Arc<Client>,
    slot: String,
    position: Option<String>,
}

impl PostgresCdcSource {
    pub fn new(client: Arc<Client>, relationship_id: &str, start_position: Option<String>) -> Self {
        Self {
            client,
            slot: slot_name(relationship_id),
            position: start_position,
        }
    }
}

#[async_trait]
impl CdcSource for PostgresCdcSource {
    async fn next_raw(&mut self, ctx: &OpContext) -> Result<Option<Vec<u8>>, FabricError> {
        let client = self.client.clone();
        let slot = self.slot.clone();
        let rows = ctx
            .run(async move {
                client
                    .query(
                        "select lsn::text, data from pg_logical_slot_peek_changes($1, NULL, 1)",
                        &[&slot],
                    )
                    .await
            })
            .await?
            .map_err(|e| FabricError::internal(e))?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let lsn: String = row.get(0);
        let data: String = row.get(1);
        self.position = Some(lsn);
        Ok(Some(data.into_bytes()))
    }

    async fn commit(&mut self, position: &str) -> Result<(), FabricError> {
        let client = self.client.clone();
        let slot = self.slot.clone();
        let position = position.to_string();
        client
            .query(
                "select lsn from pg_logical_slot_get_changes($1, $2::pg_lsn, 1)",
                &[&slot, &position],
            )
            .await
            .map_err(|e| FabricError::internal(e))?;
        Ok(())
    }

    fn position(&self) -> Option<String> {
        self.position.clone()
    }

    async fn close(&mut self) -> Result<(), FabricError> {
        Ok(())
    }
}

pub struct PostgresReplicationOps {
    pub client: Arc<Client>,
    pub relationship_id: String,
}

#[async_trait]
impl ReplicationOps for PostgresReplicationOps {
    fn parse_event(&self, raw: &[u8]) -> Result<CdcEvent, FabricError> {
        let text = std::str::from_utf8(raw).map_err(|e| FabricError::internal(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        let value: Value = serde_json::from_str(text).map_err(FabricError::internal)?;

        let kind = value.get("kind").and_then(Value::as_str).unwrap_or("insert");
        // wal2json has no first-class truncate op in our closed `Op` set; it
        // surfaces as a whole-container delete with a marker in `metadata`.
        let (op, is_truncate) = match kind {
            "insert" => (Op::Insert, false),
            "update" => (Op::Update, false),
            "delete" => (Op::Delete, false),
            "truncate" => (Op::Delete, true),
            other => return Err(FabricError::internal(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("unknown wal2json kind '{other}'")))),
        };
        let container = value.get("table").and_then(Value::as_str).unwrap_or_default().to_string();
        let new = columns_to_row(value.get("columnnames"), value.get("columnvalues"));
        let old = columns_to_row(value.get("oldkeys").and_then(|k| k.get("keynames")), value.get("oldkeys").and_then(|k| k.get("keyvalues")));
        let lsn = value.get("nextlsn").and_then(Value::as_str).unwrap_or_default().to_string();

        let mut metadata = indexmap::IndexMap::new();
        if is_truncate {
            metadata.insert("truncate".to_string(), Value::Bool(true));
        }

        Ok(CdcEvent {
            op,
            schema: None,
            container,
            new,
            old,
            commit_ts: chrono::Utc::now(),
            lsn_or_token: lsn,
            txn_id: value.get("xid").and_then(Value::as_i64).map(|x| x.to_string()),
            metadata,
        })
    }

    async fn apply(&self, _event: &CdcEvent, _ctx: &OpContext) -> Result<(), FabricError> {
        Err(FabricError::unsupported(
            "replication.apply is driven by the CDC engine's DataOps calls, not adapter-side",
            "postgres",
        ))
    }

    fn transform(&self, row: Row, rules: &[MappingRule]) -> Result<Row, FabricError> {
        fabric_connector::transform::apply(row, rules)
    }

    async fn attach_source(&self, config: AttachConfig, ctx: &OpContext) -> Result<Box<dyn CdcSource>, FabricError> {
        ensure_slot(&self.client, &self.relationship_id, &config.containers).await?;
        let _ = ctx;
        Ok(Box::new(PostgresCdcSource::new(self.client.clone(), &self.relationship_id, config.start_position)))
    }
}

fn columns_to_row(names: Option<&Value>, values: Option<&Value>) -> Option<Row> {
    let names = names?.as_array()?;
    let values = values?.as_array()?;
    let mut row = Row::new();
    for (name, value) in names.iter().zip(values.iter()) {
        if let Some(name) = name.as_str() {
            row.insert(name.to_string(), value.clone());
        }
    }
    Some(row)
}
