//! Durable replication relationships and the mapping rules that drive both
//! the Snapshot Engine and the CDC Engine (spec §3 `Relationship`,
//! `MappingRule`).

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipMode {
    OneWay,
    MigrationOnce,
    /// Unimplemented by design (spec §9 Open Questions): conflict-resolution
    /// semantics for true multi-master replication were never specified by
    /// the system this was distilled from, so this mode is a typed
    /// rejection rather than a guess. See `RelationshipSupervisor::create`.
    MultiMasterStub,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipState {
    Pending,
    Snapshotting,
    Live,
    Paused,
    Error,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "alg")]
pub enum HashAlg {
    Sha256,
    Md5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskStyle {
    /// Keep the first and last character, replace the middle with `*`.
    Partial,
    /// Replace every character with `*`.
    Full,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    Identity,
    Upper,
    Lower,
    Hash { alg: HashAlg },
    RegexReplace { pattern: String, replacement: String },
    Cast { to: String },
    Mask { style: MaskStyle },
}

/// One field-level transformation applied, in order, when mapping a source
/// row to a target row (spec §3 `MappingRule`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    pub source_path: String,
    pub target_path: String,
    pub transform: Transform,
}

/// One source-container -> target-container edge inside a relationship
/// (GLOSSARY "Binding").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub source_container: String,
    pub target_container: String,
    pub rules: Vec<MappingRule>,
    /// Fields that uniquely identify a row on the target; when present, the
    /// Snapshot Engine writes via `Upsert` instead of `Insert`, and the CDC
    /// Engine can degrade an `INSERT` that collides into an upsert (spec
    /// §4.8, §4.9 step 3).
    pub unique_fields: Option<Vec<String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipError {
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub source_conn_id: String,
    pub target_conn_id: String,
    pub mode: RelationshipMode,
    pub bindings: Vec<Binding>,
    pub state: RelationshipState,
    pub cdc_position: Option<String>,
    pub cdc_state_blob: Option<Vec<u8>>,
    pub events_processed: u64,
    pub events_pending: u64,
    #[serde(with = "opt_systemtime")]
    pub last_event_at: Option<SystemTime>,
    #[serde(with = "opt_systemtime")]
    pub last_sync_at: Option<SystemTime>,
    pub error: Option<RelationshipError>,
}

impl Relationship {
    pub fn new(
        id: impl Into<String>,
        source_conn_id: impl Into<String>,
        target_conn_id: impl Into<String>,
        mode: RelationshipMode,
        bindings: Vec<Binding>,
    ) -> Self {
        Self {
            id: id.into(),
            source_conn_id: source_conn_id.into(),
            target_conn_id: target_conn_id.into(),
            mode,
            bindings,
            state: RelationshipState::Pending,
            cdc_position: None,
            cdc_state_blob: None,
            events_processed: 0,
            events_pending: 0,
            last_event_at: None,
            last_sync_at: None,
            error: None,
        }
    }

    pub fn binding_for_source(&self, container: &str) -> Option<&Binding> {
        self.bindings
            .iter()
            .find(|b| b.source_container == container)
    }

    /// `events_processed` never decrements (spec §3 invariant).
    pub fn record_event_applied(&mut self, at: SystemTime) {
        self.events_processed += 1;
        self.last_event_at = Some(at);
    }
}

mod opt_systemtime {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(t: &Option<SystemTime>, s: S) -> Result<S::Ok, S::Error> {
        let secs = t.map(|t| t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64());
        secs.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SystemTime>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs.map(|secs| UNIX_EPOCH + std::time::Duration::from_secs_f64(secs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_processed_is_monotonic() {
        let mut rel = Relationship::new("r1", "src", "dst", RelationshipMode::OneWay, vec![]);
        rel.record_event_applied(SystemTime::now());
        rel.record_event_applied(SystemTime::now());
        assert_eq!(rel.events_processed, 2);
    }
}
