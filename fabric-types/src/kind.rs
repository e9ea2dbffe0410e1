use serde::{Deserialize, Serialize};
use std::fmt;

/// A specific database technology the fabric knows how to speak to.
///
/// Closed by design (spec §9, "Dynamic driver dispatch via string kinds"):
/// the core never branches on a string, it matches this enum and looks the
/// adapter up in the registry. Adding a new database means adding a variant
/// here, a `Capability` entry, a `NativeTypeInfo` table, and an adapter crate
/// — never a new `if kind == "..."` somewhere in the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Postgres,
    MySql,
    MongoDb,
    Redis,
    ObjectStore,
}

impl Kind {
    pub const ALL: [Kind; 5] = [
        Kind::Postgres,
        Kind::MySql,
        Kind::MongoDb,
        Kind::Redis,
        Kind::ObjectStore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Postgres => "postgres",
            Kind::MySql => "mysql",
            Kind::MongoDb => "mongodb",
            Kind::Redis => "redis",
            Kind::ObjectStore => "object_store",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Kind {
    type Err = crate::errors::FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| crate::errors::FabricError::UnknownKind(s.to_string()))
    }
}
