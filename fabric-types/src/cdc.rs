//! The canonical normalized change record every adapter's `ParseEvent`
//! produces (spec §3 `CDCEvent`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Insert,
    Update,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CdcEvent {
    pub op: Op,
    pub schema: Option<String>,
    pub container: String,
    pub new: Option<IndexMap<String, Value>>,
    pub old: Option<IndexMap<String, Value>>,
    pub commit_ts: chrono::DateTime<chrono::Utc>,
    /// Monotone position marker exposed by the source (GLOSSARY "LSN/token").
    pub lsn_or_token: String,
    pub txn_id: Option<String>,
    pub metadata: IndexMap<String, Value>,
}

impl CdcEvent {
    /// The row used to locate the target row for `UPDATE`/`DELETE`: `old` if
    /// the source emits pre-images, else `new` (spec §4.9 step 2d, §8
    /// boundary behavior).
    pub fn locator_row(&self) -> Option<&IndexMap<String, Value>> {
        self.old.as_ref().or(self.new.as_ref())
    }
}
