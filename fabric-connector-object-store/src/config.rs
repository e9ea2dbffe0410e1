//! Per-table file layout configuration. The object store adapter has no
//! catalog to discover, so these definitions travel inside
//! `ConnectionDescriptor::extra["tables"]` as a JSON array and are the only
//! source of container names this adapter knows about.

use fabric_types::connection::ConnectionDescriptor;
use fabric_types::errors::FabricError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Parquet,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub path: String,
    pub extension: String,
    pub format: FileFormat,
    /// When set, a data file `foo.parquet` is only considered complete once
    /// a sibling `foo.parquet{marker_extension}` file exists (spec §4.9
    /// boundary behavior for partially-written files).
    pub marker_extension: Option<String>,
}

pub fn tables_from_descriptor(descriptor: &ConnectionDescriptor) -> Result<Vec<TableDef>, FabricError> {
    let raw = descriptor
        .extra
        .get("tables")
        .ok_or_else(|| FabricError::NotFound { resource: "connection.extra.tables".to_string() })?;
    serde_json::from_str(raw).map_err(FabricError::internal)
}
