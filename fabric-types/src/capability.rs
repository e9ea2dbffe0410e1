//! C1 — Capability Registry: a static, process-wide, read-only catalog of
//! supported database kinds.

use crate::errors::FabricError;
use crate::kind::Kind;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Paradigm {
    Relational,
    Document,
    Graph,
    KeyValue,
    Columnar,
    WideColumn,
    Vector,
    Search,
    ObjectStore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CdcMechanism {
    Wal,
    Binlog,
    LogMiner,
    ChangeStream,
    Trigger,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierQuoteStyle {
    /// `"identifier"`
    DoubleQuote,
    /// `` `identifier` ``
    Backtick,
    /// No quoting convention; identifiers are not SQL-shaped (document paths,
    /// collection names, key prefixes, ...).
    None,
}

impl IdentifierQuoteStyle {
    pub fn quote(&self, identifier: &str) -> String {
        match self {
            IdentifierQuoteStyle::DoubleQuote => format!("\"{}\"", identifier.replace('"', "\"\"")),
            IdentifierQuoteStyle::Backtick => format!("`{}`", identifier.replace('`', "``")),
            IdentifierQuoteStyle::None => identifier.to_string(),
        }
    }
}

/// Per-kind, read-only capability record. See spec §3 "Capability".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Capability {
    pub kind: Kind,
    pub paradigm: Paradigm,
    pub default_port: Option<u16>,
    pub identifier_quote_style: IdentifierQuoteStyle,
    pub supports_cdc: bool,
    pub cdc_mechanism: CdcMechanism,
    pub supports_ssl: bool,
    pub supports_transactions: bool,
    /// True if a single underlying driver connection cannot safely be used
    /// from concurrent callers; the Connection Manager then serializes calls
    /// through a per-connection lock (spec §4.6 concurrency note).
    pub requires_serial_ops: bool,
}

#[derive(Default)]
pub struct CapabilityRegistry {
    entries: RwLock<HashMap<Kind, Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry pre-populated with every kind the fabric ships
    /// adapters for. Tests that need a subset build an empty registry with
    /// `new()` and call `register` directly instead of relying on hidden
    /// global state (spec §9 "Global state").
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        for capability in default_capabilities() {
            registry.register(capability);
        }
        registry
    }

    pub fn register(&self, capability: Capability) {
        self.entries.write().insert(capability.kind, capability);
    }

    pub fn get(&self, kind: Kind) -> Result<Capability, FabricError> {
        self.entries
            .read()
            .get(&kind)
            .cloned()
            .ok_or(FabricError::UnknownKind(kind.to_string()))
    }

    pub fn all(&self) -> Vec<Capability> {
        let mut v: Vec<_> = self.entries.read().values().cloned().collect();
        v.sort_by_key(|c| c.kind);
        v
    }

    pub fn supports(&self, kind: Kind, feature: Feature) -> Result<bool, FabricError> {
        let cap = self.get(kind)?;
        Ok(match feature {
            Feature::Cdc => cap.supports_cdc,
            Feature::Ssl => cap.supports_ssl,
            Feature::Transactions => cap.supports_transactions,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    Cdc,
    Ssl,
    Transactions,
}

fn default_capabilities() -> Vec<Capability> {
    vec![
        Capability {
            kind: Kind::Postgres,
            paradigm: Paradigm::Relational,
            default_port: Some(5432),
            identifier_quote_style: IdentifierQuoteStyle::DoubleQuote,
            supports_cdc: true,
            cdc_mechanism: CdcMechanism::Wal,
            supports_ssl: true,
            supports_transactions: true,
            requires_serial_ops: true,
        },
        Capability {
            kind: Kind::MySql,
            paradigm: Paradigm::Relational,
            default_port: Some(3306),
            identifier_quote_style: IdentifierQuoteStyle::Backtick,
            supports_cdc: true,
            cdc_mechanism: CdcMechanism::Binlog,
            supports_ssl: true,
            supports_transactions: true,
            requires_serial_ops: true,
        },
        Capability {
            kind: Kind::MongoDb,
            paradigm: Paradigm::Document,
            default_port: Some(27017),
            identifier_quote_style: IdentifierQuoteStyle::None,
            supports_cdc: true,
            cdc_mechanism: CdcMechanism::ChangeStream,
            supports_ssl: true,
            supports_transactions: true,
            requires_serial_ops: false,
        },
        Capability {
            kind: Kind::Redis,
            paradigm: Paradigm::KeyValue,
            default_port: Some(6379),
            identifier_quote_style: IdentifierQuoteStyle::None,
            supports_cdc: false,
            cdc_mechanism: CdcMechanism::None,
            supports_ssl: true,
            supports_transactions: false,
            requires_serial_ops: false,
        },
        Capability {
            kind: Kind::ObjectStore,
            paradigm: Paradigm::ObjectStore,
            default_port: None,
            identifier_quote_style: IdentifierQuoteStyle::None,
            supports_cdc: false,
            cdc_mechanism: CdcMechanism::None,
            supports_ssl: true,
            supports_transactions: false,
            requires_serial_ops: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_kind_is_an_error_not_a_panic() {
        let registry = CapabilityRegistry::new();
        let err = registry.get(Kind::Postgres).unwrap_err();
        assert!(matches!(err, FabricError::UnknownKind(_)));
    }

    #[test]
    fn defaults_cover_every_kind() {
        let registry = CapabilityRegistry::with_defaults();
        for kind in Kind::ALL {
            registry.get(kind).unwrap();
        }
        assert_eq!(registry.all().len(), Kind::ALL.len());
    }

    #[test]
    fn quote_styles_escape_embedded_quote_characters() {
        assert_eq!(
            IdentifierQuoteStyle::DoubleQuote.quote(r#"weird"name"#),
            "\"weird\"\"name\""
        );
        assert_eq!(IdentifierQuoteStyle::Backtick.quote("weird`name"), "`weird``name`");
    }
}
